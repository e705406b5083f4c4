//! # structures 子命令 CLI 定义
//!
//! 搜索 prim 到子结构的结构映射。输入为单个文件时打印结果表，
//! 为目录时批量并行处理并为每个子结构写出映射结果。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/structures.rs`

use super::CostMethod;
use clap::Args;
use std::path::PathBuf;

/// structures 子命令参数
#[derive(Args, Debug)]
pub struct StructuresArgs {
    /// Prim file (prim JSON, or POSCAR with one occupant per site)
    pub prim: PathBuf,

    /// Child structure file or directory of child structures
    pub child: PathBuf,

    /// Number of lowest-cost structure mappings to keep (ties are kept)
    #[arg(short, long, default_value_t = 1)]
    pub k_best: usize,

    /// Discard mappings with total cost above this value
    #[arg(long, default_value_t = 1e20)]
    pub max_total_cost: f64,

    /// Discard lattice mappings with lattice cost above this value
    #[arg(long, default_value_t = 0.3)]
    pub max_lattice_cost: f64,

    /// Lattice mappings explored per supercell volume
    #[arg(long, default_value_t = 10)]
    pub lattice_k_best: usize,

    /// Weight of the lattice cost in the total cost, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub lattice_weight: f64,

    /// Lattice cost method
    #[arg(long, value_enum, default_value = "isotropic-strain")]
    pub cost_method: CostMethod,

    /// Minimum supercell volume in prim cells (default: from site counts)
    #[arg(long)]
    pub min_vol: Option<i64>,

    /// Maximum supercell volume in prim cells (default: from volume ratio)
    #[arg(long)]
    pub max_vol: Option<i64>,

    /// Glob pattern(s) for child files in batch mode, comma separated
    #[arg(short, long, default_value = "*.vasp,POSCAR*,CONTCAR*")]
    pub pattern: String,

    /// Recurse into subdirectories in batch mode
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs in batch mode (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Output directory (batch mode) or JSON file (single mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the ranked results as CSV (single mode)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Also write the mapped structure of the best mapping as POSCAR
    #[arg(long, default_value_t = false)]
    pub write_mapped: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
