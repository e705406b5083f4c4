//! # 解析器模块
//!
//! 读取映射输入：子结构（POSCAR）与父结构 prim（prim JSON 或 POSCAR）。
//!
//! ## 依赖关系
//! - 被 `commands/`、`batch/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, prim_json

pub mod poscar;
pub mod prim_json;

use crate::error::{MappingError, Result};
use crate::models::{Prim, Structure};
use std::path::Path;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// 文件名是否像 VASP 结构文件
pub fn is_poscar_like(path: &Path) -> bool {
    if matches!(extension(path).as_str(), "vasp" | "poscar") {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with("POSCAR") || name.starts_with("CONTCAR"))
}

/// 从文件路径推断格式并解析结构
pub fn parse_structure_file(path: &Path) -> Result<Structure> {
    if !path.exists() {
        return Err(MappingError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    if is_poscar_like(path) {
        return poscar::parse_poscar_file(path);
    }
    Err(MappingError::UnsupportedFormat(format!(
        "Cannot determine structure format for: {}",
        path.display()
    )))
}

/// 解析 prim：`.json` 按 prim JSON 读取，VASP 文件按每位点单一占位处理
pub fn parse_prim_file(path: &Path) -> Result<Prim> {
    if !path.exists() {
        return Err(MappingError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    if extension(path) == "json" {
        return prim_json::parse_prim_file(path);
    }
    if is_poscar_like(path) {
        let structure = poscar::parse_poscar_file(path)?;
        return Ok(Prim::from_structure(&structure));
    }
    Err(MappingError::UnsupportedFormat(format!(
        "Cannot determine prim format for: {}",
        path.display()
    )))
}
