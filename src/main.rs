//! # xtalmap - 晶格与晶体结构映射工具
//!
//! 在父结构 (prim) 与子结构之间寻找低代价的晶格映射和结构映射。
//!
//! ## 子命令
//! - `lattices`   - 晶格映射
//! - `structures` - 结构映射（单文件或批量目录）
//! - `apply`      - 由保存的映射构造映射后的结构
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── xtalmap 库 (parsers/, methods/, info/)
//!   ├── batch/      (批量并行处理)
//!   └── utils/      (输出、日志、进度条)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::output::init_logger(cli.global.verbose);

    if let Err(e) = commands::run(cli.command, &cli.global) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
