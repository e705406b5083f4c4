//! # apply 子命令 CLI 定义
//!
//! 读取 `structures` 写出的映射结果 JSON，对子结构应用其中一个映射。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/apply.rs`

use clap::Args;
use std::path::PathBuf;

/// apply 子命令参数
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Structure mapping results JSON written by `structures`
    pub mapping: PathBuf,

    /// Child structure file the mapping was found for
    pub child: PathBuf,

    /// Output POSCAR file
    #[arg(short, long, default_value = "mapped.vasp")]
    pub output: PathBuf,

    /// Rank of the mapping to apply (1 = best)
    #[arg(long, default_value_t = 1)]
    pub rank: usize,
}
