//! # 参考原胞 (prim) 数据模型
//!
//! prim 是映射的"父"结构：每个位点可以允许多种占位（包括空位）。
//!
//! ## 依赖关系
//! - 被 `parsers/prim_json.rs`、`geometry/symmetry.rs`、`methods/` 使用
//! - 使用 `models/structure.rs` 的 Lattice, Structure

use crate::error::{MappingError, Result};
use crate::models::structure::{is_vacancy, Lattice, Structure};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// prim 中的一个位点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimSite {
    /// 分数坐标 [x, y, z]
    pub coordinate: [f64; 3],

    /// 允许的占位（有序）
    pub occupants: Vec<String>,
}

impl PrimSite {
    pub fn new(coordinate: [f64; 3], occupants: Vec<String>) -> Self {
        PrimSite {
            coordinate,
            occupants,
        }
    }

    pub fn frac(&self) -> Vector3<f64> {
        Vector3::from(self.coordinate)
    }

    /// 是否允许某种占位
    pub fn allows(&self, occupant: &str) -> bool {
        if is_vacancy(occupant) {
            return self.allows_vacancy();
        }
        self.occupants.iter().any(|o| o == occupant)
    }

    /// 是否允许空位
    pub fn allows_vacancy(&self) -> bool {
        self.occupants.iter().any(|o| is_vacancy(o))
    }
}

/// 参考原胞
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prim {
    /// 名称
    pub name: String,

    /// 晶格 L1
    pub lattice: Lattice,

    /// 基元位点
    pub basis: Vec<PrimSite>,
}

impl Prim {
    pub fn new(name: impl Into<String>, lattice: Lattice, basis: Vec<PrimSite>) -> Self {
        Prim {
            name: name.into(),
            lattice,
            basis,
        }
    }

    /// 由普通结构构造 prim：每个位点只允许当前占位
    pub fn from_structure(structure: &Structure) -> Self {
        let basis = structure
            .sites
            .iter()
            .map(|s| PrimSite::new(s.position, vec![s.occupant.clone()]))
            .collect();
        Prim::new(structure.name.clone(), structure.lattice.clone(), basis)
    }

    /// 位点数
    pub fn n_sites(&self) -> usize {
        self.basis.len()
    }

    /// 各位点的笛卡尔坐标
    pub fn site_coordinate_cart(&self) -> Vec<Vector3<f64>> {
        let l = self.lattice.column_vector_matrix();
        self.basis.iter().map(|s| l * s.frac()).collect()
    }

    /// 各位点允许的占位
    pub fn allowed_occupants(&self) -> Vec<Vec<String>> {
        self.basis.iter().map(|s| s.occupants.clone()).collect()
    }

    /// 允许空位的位点数
    pub fn n_vacancy_sites(&self) -> usize {
        self.basis.iter().filter(|s| s.allows_vacancy()).count()
    }

    /// 检查 prim 是否可用于映射
    pub fn validate(&self) -> Result<()> {
        self.lattice.validate()?;
        if self.basis.is_empty() {
            return Err(MappingError::InvalidInput(format!(
                "prim '{}' has no basis sites",
                self.name
            )));
        }
        for (b, site) in self.basis.iter().enumerate() {
            if site.occupants.is_empty() {
                return Err(MappingError::InvalidInput(format!(
                    "prim '{}' basis site {} allows no occupants",
                    self.name, b
                )));
            }
            if site.coordinate.iter().any(|x| !x.is_finite()) {
                return Err(MappingError::InvalidInput(format!(
                    "prim '{}' basis site {} has a non-finite coordinate",
                    self.name, b
                )));
            }
        }
        Ok(())
    }

    /// 晶格、位点坐标与允许占位均相同
    pub fn approx_eq(&self, other: &Prim) -> bool {
        if !self.lattice.approx_eq(&other.lattice) || self.basis.len() != other.basis.len() {
            return false;
        }
        let tol = self.lattice.tol.max(other.lattice.tol);
        let l = self.lattice.column_vector_matrix();
        self.basis.iter().zip(other.basis.iter()).all(|(a, b)| {
            a.occupants == b.occupants && (l * (a.frac() - b.frac())).norm() < tol
        })
    }
}

impl PartialEq for Prim {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other)
    }
}
