//! # 映射信息层
//!
//! 不可变的映射记录、带代价的映射、结果集合与代价函数。
//!
//! ## 子模块
//! - `lattice_mapping`: LatticeMapping, ScoredLatticeMapping
//! - `atom_mapping`: AtomMapping, ScoredAtomMapping
//! - `structure_mapping`: StructureMapping, ScoredStructureMapping, has_same_prim
//! - `cost`: 代价函数与 StructureMappingCost
//! - `results`: Scored trait 与 MappingResults 容器
//! - `json`: pretty_json / from_json
//! - `export`: CSV/JSON 导出
//!
//! ## 依赖关系
//! - 被 `methods/`、`commands/` 使用
//! - 使用 `models/`、`geometry/`

pub mod atom_mapping;
pub mod cost;
pub mod export;
pub mod json;
pub mod lattice_mapping;
pub mod results;
pub mod structure_mapping;

pub use atom_mapping::{AtomMapping, AtomMappingResults, ScoredAtomMapping};
pub use cost::{LatticeCostMethod, StructureMappingCost};
pub use json::{from_json, pretty_json};
pub use lattice_mapping::{LatticeMapping, LatticeMappingResults, ScoredLatticeMapping};
pub use results::{MappingResults, Scored};
pub use structure_mapping::{
    has_same_prim, HasPrim, ScoredStructureMapping, StructureMapping, StructureMappingResults,
};
