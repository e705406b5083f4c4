//! # xtalmap - 晶格与晶体结构映射
//!
//! 寻找父结构 (prim) 与子结构之间的低代价映射：
//! - 晶格映射 `F L1 T N = L2`：形变梯度、超胞变换、重取向
//! - 原子映射：位点到原子的指派、位移与平移
//! - 结构映射：两者组合，按加权代价排序
//!
//! ## 模块结构
//! ```text
//! lib.rs
//!   ├── models/    (晶格、结构、prim)
//!   ├── geometry/  (约化、超晶格枚举、对称性、周期边界)
//!   ├── info/      (映射类型、代价、结果容器、JSON/CSV)
//!   ├── methods/   (映射搜索与结构构造)
//!   ├── parsers/   (POSCAR、prim JSON)
//!   └── error.rs   (错误处理)
//! ```
//!
//! ## 示例
//! ```no_run
//! use std::sync::Arc;
//! use xtalmap::methods::{map_structures, StructureMappingSearchOptions};
//! use xtalmap::parsers::{parse_prim_file, parse_structure_file};
//!
//! # fn main() -> xtalmap::error::Result<()> {
//! let prim = Arc::new(parse_prim_file("prim.json".as_ref())?);
//! let child = parse_structure_file("POSCAR".as_ref())?;
//! let results = map_structures(&prim, &child, &StructureMappingSearchOptions::default())?;
//! if let Some(best) = results.best() {
//!     println!("{}", xtalmap::info::pretty_json(best)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geometry;
pub mod info;
pub mod methods;
pub mod models;
pub mod parsers;

pub use error::{MappingError, Result};
pub use info::{
    has_same_prim, pretty_json, AtomMapping, AtomMappingResults, LatticeMapping,
    LatticeMappingResults, ScoredAtomMapping, ScoredLatticeMapping, ScoredStructureMapping,
    StructureMapping, StructureMappingCost, StructureMappingResults,
};
pub use methods::{
    make_mapped_lattice, make_mapped_structure, map_atoms, map_lattices, map_structures,
};
pub use models::{Lattice, Prim, PrimSite, Site, Structure};
