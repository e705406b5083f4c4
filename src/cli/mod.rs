//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `lattices`: 父晶格到子晶格的晶格映射
//! - `structures`: prim 到子结构的结构映射（单文件或批量目录）
//! - `apply`: 由保存的映射结果构造映射后的结构
//!
//! 全局参数 `-v`、`--timeout`、`--max-evaluations` 对所有子命令有效。
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: lattices, structures, apply

pub mod apply;
pub mod lattices;
pub mod structures;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use xtalmap::info::LatticeCostMethod;
use xtalmap::methods::SearchBudget;

/// xtalmap - 晶格与晶体结构映射工具
#[derive(Parser)]
#[command(name = "xtalmap")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Find low-cost lattice and structure mappings between crystals", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 全局参数
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Abort a search after this many seconds
    #[arg(long, env = "XTALMAP_TIMEOUT", global = true)]
    pub timeout: Option<f64>,

    /// Abort a search after this many candidate evaluations
    #[arg(long, env = "XTALMAP_MAX_EVALUATIONS", global = true)]
    pub max_evaluations: Option<u64>,
}

impl GlobalArgs {
    /// 由命令行参数构造搜索预算
    pub fn budget(&self) -> SearchBudget {
        let mut budget = SearchBudget::unlimited();
        if let Some(n) = self.max_evaluations {
            budget = budget.with_max_evaluations(n);
        }
        if let Some(secs) = self.timeout.filter(|s| s.is_finite() && *s > 0.0) {
            budget = budget.with_timeout(Duration::from_secs_f64(secs));
        }
        budget
    }
}

/// 晶格代价计算方法
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CostMethod {
    /// Volume-normalised strain, isotropic
    IsotropicStrain,
    /// Strain component that breaks the parent point group
    SymmetryBreakingStrain,
}

impl From<CostMethod> for LatticeCostMethod {
    fn from(method: CostMethod) -> Self {
        match method {
            CostMethod::IsotropicStrain => LatticeCostMethod::IsotropicStrain,
            CostMethod::SymmetryBreakingStrain => LatticeCostMethod::SymmetryBreakingStrain,
        }
    }
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Map a parent lattice onto a child lattice
    Lattices(lattices::LatticesArgs),

    /// Map a prim onto child structures (single file or directory)
    Structures(structures::StructuresArgs),

    /// Build the mapped child structure from a saved mapping
    Apply(apply::ApplyArgs),
}
