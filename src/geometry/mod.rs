//! # 几何与对称性模块
//!
//! 映射搜索所需的底层几何工具。
//!
//! ## 子模块
//! - `integer`: 整数矩阵（行列式、伴随、幺模矩阵枚举）
//! - `reduce`: 晶格约化
//! - `superlattice`: Hermite 标准形枚举与超胞平移
//! - `pbc`: 周期性最短位移
//! - `symmetry`: 晶格点群、因子群、点群标准形
//!
//! ## 依赖关系
//! - 被 `info/`、`methods/` 使用
//! - 使用 `models/`

pub mod integer;
pub mod pbc;
pub mod reduce;
pub mod superlattice;
pub mod symmetry;

pub use pbc::PeriodicCell;
pub use symmetry::{factor_group, internal_translations, lattice_point_group, SymOp};
