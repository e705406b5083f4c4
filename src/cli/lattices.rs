//! # lattices 子命令 CLI 定义
//!
//! 搜索父晶格到子晶格的晶格映射，按晶格代价排序。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/lattices.rs`

use super::CostMethod;
use clap::Args;
use std::path::PathBuf;

/// lattices 子命令参数
#[derive(Args, Debug)]
pub struct LatticesArgs {
    /// Parent structure file (POSCAR); only its lattice is used
    pub parent: PathBuf,

    /// Child structure file (POSCAR); only its lattice is used
    pub child: PathBuf,

    /// Minimum supercell volume in parent cells (default: from volume ratio)
    #[arg(long)]
    pub min_vol: Option<i64>,

    /// Maximum supercell volume in parent cells (default: from volume ratio)
    #[arg(long)]
    pub max_vol: Option<i64>,

    /// Number of lowest-cost mappings to keep (ties are kept)
    #[arg(short, long, default_value_t = 10)]
    pub k_best: usize,

    /// Discard mappings with lattice cost above this value
    #[arg(long, default_value_t = 1e20)]
    pub max_cost: f64,

    /// Lattice cost method
    #[arg(long, value_enum, default_value = "isotropic-strain")]
    pub cost_method: CostMethod,

    /// Reorientation matrix element range [-r, r]
    #[arg(long, default_value_t = 1)]
    pub range: i64,

    /// Write results as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Write results as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
