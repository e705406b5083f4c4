//! # 数据模型模块
//!
//! 定义晶格、结构与参考原胞 (prim) 的统一数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`geometry/`、`info/`、`methods/` 使用
//! - 子模块: structure, prim

pub mod prim;
pub mod structure;

pub use prim::{Prim, PrimSite};
pub use structure::{is_vacancy, Lattice, Site, Structure};
