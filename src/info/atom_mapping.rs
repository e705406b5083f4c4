//! # 原子映射
//!
//! 在理想超晶格中，父超胞位点 i 与子结构原子 `permutation[i]` 对应：
//!
//! ```text
//! site[i] + displacement[i] = F⁻¹ * r_child[permutation[i]] + translation   (模超晶格平移)
//! ```
//!
//! `permutation[i] >= 子结构原子数` 表示该位点为隐含空位。
//!
//! ## 依赖关系
//! - 被 `info/structure_mapping.rs`、`methods/` 使用

use crate::error::{MappingError, Result};
use crate::info::json::{vec3, vec3_list};
use crate::info::results::{MappingResults, Scored};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 平移在次序键中的取整精度
const TRANSLATION_KEY_SCALE: f64 = 1e6;

/// 原子映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomMapping {
    /// 每个超胞位点的笛卡尔位移
    #[serde(with = "vec3_list")]
    pub displacement: Vec<Vector3<f64>>,

    /// `permutation[site] = 子结构原子序号`
    pub permutation: Vec<usize>,

    /// 笛卡尔平移
    #[serde(with = "vec3")]
    pub translation: Vector3<f64>,
}

impl AtomMapping {
    /// 创建并检查 permutation 是 `0..n` 的排列
    pub fn new(
        displacement: Vec<Vector3<f64>>,
        permutation: Vec<usize>,
        translation: Vector3<f64>,
    ) -> Result<Self> {
        if displacement.len() != permutation.len() {
            return Err(MappingError::InvalidInput(format!(
                "displacement has {} entries but permutation has {}",
                displacement.len(),
                permutation.len()
            )));
        }
        if !is_permutation(&permutation) {
            return Err(MappingError::InvalidInput(
                "permutation must contain each index 0..n exactly once".to_string(),
            ));
        }
        Ok(AtomMapping {
            displacement,
            permutation,
            translation,
        })
    }

    /// 超胞位点数
    pub fn n_sites(&self) -> usize {
        self.permutation.len()
    }

    /// 被空位占据的位点
    pub fn vacancy_sites(&self, n_atoms: usize) -> Vec<usize> {
        self.permutation
            .iter()
            .enumerate()
            .filter(|(_, &atom)| atom >= n_atoms)
            .map(|(site, _)| site)
            .collect()
    }

    /// 代价相同时的次序键
    pub fn tie_key(&self) -> (Vec<usize>, [i64; 3]) {
        let t = self
            .translation
            .map(|x| (x * TRANSLATION_KEY_SCALE).round() as i64);
        (self.permutation.clone(), [t.x, t.y, t.z])
    }
}

pub(crate) fn is_permutation(permutation: &[usize]) -> bool {
    let mut seen = vec![false; permutation.len()];
    for &p in permutation {
        match seen.get_mut(p) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// 带原子代价的原子映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAtomMapping {
    pub atom_cost: f64,
    pub atom_mapping: AtomMapping,
}

impl ScoredAtomMapping {
    pub fn new(atom_cost: f64, atom_mapping: AtomMapping) -> Self {
        ScoredAtomMapping {
            atom_cost,
            atom_mapping,
        }
    }
}

impl Scored for ScoredAtomMapping {
    type Key = (Vec<usize>, [i64; 3]);

    fn cost(&self) -> f64 {
        self.atom_cost
    }

    fn tie_key(&self) -> Self::Key {
        self.atom_mapping.tie_key()
    }
}

/// 原子映射结果集合
pub type AtomMappingResults = MappingResults<ScoredAtomMapping>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_permutation() {
        let d = vec![Vector3::zeros(); 3];
        assert!(AtomMapping::new(d.clone(), vec![2, 0, 1], Vector3::zeros()).is_ok());
        assert!(AtomMapping::new(d.clone(), vec![0, 0, 1], Vector3::zeros()).is_err());
        assert!(AtomMapping::new(d.clone(), vec![0, 1, 3], Vector3::zeros()).is_err());
        assert!(AtomMapping::new(d, vec![0, 1], Vector3::zeros()).is_err());
    }

    #[test]
    fn test_vacancy_sites() {
        let mapping =
            AtomMapping::new(vec![Vector3::zeros(); 3], vec![1, 2, 0], Vector3::zeros()).unwrap();
        assert_eq!(mapping.vacancy_sites(2), vec![1]);
        assert!(mapping.vacancy_sites(3).is_empty());
    }

    #[test]
    fn test_tie_key_rounds_translation() {
        let a = AtomMapping::new(
            vec![Vector3::zeros()],
            vec![0],
            Vector3::new(0.5, 0.0, 1e-9),
        )
        .unwrap();
        let b = AtomMapping::new(vec![Vector3::zeros()], vec![0], Vector3::new(0.5, 0.0, 0.0))
            .unwrap();
        assert_eq!(a.tie_key(), b.tie_key());
    }
}
