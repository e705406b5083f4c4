//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `utils/` 与 xtalmap 库
//! - 子模块: lattices, structures, apply

pub mod apply;
pub mod lattices;
pub mod structures;

use crate::cli::{Commands, GlobalArgs};
use nalgebra::Matrix3;
use xtalmap::error::Result;

/// 执行命令
pub fn run(cmd: Commands, global: &GlobalArgs) -> Result<()> {
    match cmd {
        Commands::Lattices(args) => lattices::execute(args, global),
        Commands::Structures(args) => structures::execute(args, global),
        Commands::Apply(args) => apply::execute(args),
    }
}

/// 整数矩阵的紧凑行表示 `[[a,b,c],[d,e,f],[g,h,i]]`
pub(crate) fn format_matrix(m: &Matrix3<i64>) -> String {
    let rows: Vec<String> = m
        .row_iter()
        .map(|r| format!("[{},{},{}]", r[0], r[1], r[2]))
        .collect();
    format!("[{}]", rows.join(","))
}
