//! # 美化输出工具
//!
//! 提供统一的终端输出样式，并把库中的 `log` 诊断信息接入同一套样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块与 `main.rs` 使用
//! - 使用 `colored` crate、`env_logger` 作为 `log` 门面的后端

use colored::{ColoredString, Colorize};
use env_logger::{Builder, Env, Target};
use log::{Level, LevelFilter};
use std::io::Write;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印写出文件消息
pub fn print_written(what: &str, path: &str) {
    println!(
        "{} {} {} {}",
        "[OK]".green().bold(),
        what.dimmed(),
        "->".cyan(),
        path
    );
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// 日志行前缀，与 `print_*` 系列保持一致
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Error => "[ERR]".red().bold(),
        Level::Warn => "[WARN]".yellow().bold(),
        Level::Info => "[*]".blue().bold(),
        Level::Debug => "[DBG]".cyan(),
        Level::Trace => "[TRC]".dimmed(),
    }
}

/// `-v` 次数对应的日志级别
pub fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 构建日志记录器：只输出 `xtalmap` 模块，输出到 stderr
pub fn logger_builder(verbose: u8) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Off)
        .filter_module("xtalmap", verbosity_level(verbose))
        .target(Target::Stderr)
        .format(|buf, record| writeln!(buf, "{} {}", level_tag(record.level()), record.args()));
    builder
}

/// 安装日志记录器（重复安装时忽略），`RUST_LOG` 可追加过滤规则
pub fn init_logger(verbose: u8) {
    let mut builder = logger_builder(verbose);
    builder.parse_env(Env::default());
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), LevelFilter::Warn);
        assert_eq!(verbosity_level(2), LevelFilter::Debug);
        assert_eq!(verbosity_level(9), LevelFilter::Trace);
    }

    #[test]
    fn test_level_tags() {
        colored::control::set_override(false);
        assert_eq!(level_tag(Level::Error).to_string(), "[ERR]");
        assert_eq!(level_tag(Level::Warn).to_string(), "[WARN]");
        assert_eq!(level_tag(Level::Info).to_string(), "[*]");
        colored::control::unset_override();
    }

    #[test]
    fn test_logger_filters_foreign_targets() {
        let logger = logger_builder(2).build();
        let ours = log::Metadata::builder()
            .level(Level::Debug)
            .target("xtalmap::methods::lattice_search")
            .build();
        let foreign = log::Metadata::builder()
            .level(Level::Debug)
            .target("rayon_core")
            .build();
        let too_verbose = log::Metadata::builder()
            .level(Level::Trace)
            .target("xtalmap::methods")
            .build();
        assert!(logger.enabled(&ours));
        assert!(!logger.enabled(&foreign));
        assert!(!logger.enabled(&too_verbose));
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }
}
