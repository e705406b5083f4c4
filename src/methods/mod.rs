//! # 映射方法层
//!
//! ## 子模块
//! - `lattice_search`: map_lattices, map_lattices_without_reorientation
//! - `atom_search`: map_atoms
//! - `structure_search`: map_structures
//! - `construct`: make_mapped_lattice, make_mapped_structure
//! - `options`: 搜索选项
//! - `budget`: 搜索预算
//! - `assignment`: 匈牙利算法与 Murty k-best
//! - `search_data`: 超胞位点、试探平移、代价矩阵
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `info/`、`geometry/`、`models/`

pub mod assignment;
pub mod atom_search;
pub mod budget;
pub mod construct;
pub mod lattice_search;
pub mod options;
pub mod search_data;
pub mod structure_search;

pub use atom_search::map_atoms;
pub use budget::SearchBudget;
pub use construct::{make_mapped_lattice, make_mapped_structure};
pub use lattice_search::{map_lattices, map_lattices_without_reorientation};
pub use options::{
    AtomMappingSearchOptions, LatticeMappingSearchOptions, StructureMappingSearchOptions,
};
pub use structure_search::map_structures;
