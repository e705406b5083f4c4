//! # 晶格映射
//!
//! 关系：`F * L1 * T * N = L2`
//! - F: 形变梯度（笛卡尔）
//! - T: 父晶格到理想超晶格的整数变换（det T >= 1）
//! - N: 超晶格的重取向幺模矩阵（det N = ±1）
//!
//! 极分解 `F = Q U = V Q`：U 为右伸缩张量，V 为左伸缩张量，Q 为等距变换。
//!
//! ## 依赖关系
//! - 被 `info/structure_mapping.rs`、`methods/` 使用
//! - 使用 `info/cost.rs` 的右伸缩张量、`info/results.rs` 的 Scored

use crate::error::{MappingError, Result};
use crate::geometry::integer;
use crate::info::cost;
use crate::info::json::{mat3_f64, mat3_i64};
use crate::info::results::{MappingResults, Scored};
use crate::models::Lattice;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// 晶格映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeMapping {
    #[serde(with = "mat3_f64")]
    pub deformation_gradient: Matrix3<f64>,

    #[serde(with = "mat3_i64")]
    pub transformation_matrix_to_super: Matrix3<i64>,

    #[serde(with = "mat3_i64")]
    pub reorientation: Matrix3<i64>,
}

impl LatticeMapping {
    /// 创建并检查矩阵性质
    pub fn new(
        deformation_gradient: Matrix3<f64>,
        transformation_matrix_to_super: Matrix3<i64>,
        reorientation: Matrix3<i64>,
    ) -> Result<Self> {
        if deformation_gradient.iter().any(|x| !x.is_finite())
            || deformation_gradient.determinant().abs() < f64::EPSILON
        {
            return Err(MappingError::InvalidInput(
                "deformation gradient must be finite and invertible".to_string(),
            ));
        }
        if integer::det(&transformation_matrix_to_super) < 1 {
            return Err(MappingError::InvalidInput(
                "transformation_matrix_to_super must have a positive determinant".to_string(),
            ));
        }
        if integer::det(&reorientation).abs() != 1 {
            return Err(MappingError::InvalidInput(
                "reorientation must be unimodular".to_string(),
            ));
        }
        Ok(LatticeMapping {
            deformation_gradient,
            transformation_matrix_to_super,
            reorientation,
        })
    }

    /// 恒等映射
    pub fn identity() -> Self {
        LatticeMapping {
            deformation_gradient: Matrix3::identity(),
            transformation_matrix_to_super: Matrix3::identity(),
            reorientation: Matrix3::identity(),
        }
    }

    /// 超胞体积（原胞数）
    pub fn volume(&self) -> i64 {
        integer::det(&self.transformation_matrix_to_super).abs()
    }

    /// 理想超晶格的整数矩阵 `T * N`
    pub fn superlattice_matrix(&self) -> Matrix3<i64> {
        self.transformation_matrix_to_super * self.reorientation
    }

    /// 右伸缩张量 U
    pub fn right_stretch(&self) -> Matrix3<f64> {
        cost::right_stretch(&self.deformation_gradient)
    }

    /// 等距变换 `Q = F U⁻¹`
    pub fn isometry(&self) -> Matrix3<f64> {
        let u = self.right_stretch();
        match u.try_inverse() {
            Some(u_inv) => self.deformation_gradient * u_inv,
            None => Matrix3::identity(),
        }
    }

    /// 左伸缩张量 `V = F Qᵀ`
    pub fn left_stretch(&self) -> Matrix3<f64> {
        self.deformation_gradient * self.isometry().transpose()
    }

    /// 理想超晶格（列向量矩阵）`L1 T N`
    pub fn ideal_superlattice(&self, parent: &Lattice) -> Matrix3<f64> {
        parent.column_vector_matrix() * integer::to_f64(&self.superlattice_matrix())
    }

    /// 形变后的超晶格 `F L1 T N`，应与子晶格相同
    pub fn deformed_superlattice(&self, parent: &Lattice) -> Matrix3<f64> {
        self.deformation_gradient * self.ideal_superlattice(parent)
    }

    /// 是否满足 `F L1 T N ≈ L2`（按子晶格容差）
    pub fn maps(&self, parent: &Lattice, child: &Lattice) -> bool {
        let diff = self.deformed_superlattice(parent) - child.column_vector_matrix();
        diff.amax() < child.tol.max(parent.tol) * 10.0
    }

    /// 代价相同时的次序键：T、N 按行展开
    pub fn tie_key(&self) -> ([i64; 9], [i64; 9]) {
        (
            integer::row_major(&self.transformation_matrix_to_super),
            integer::row_major(&self.reorientation),
        )
    }
}

/// 带晶格代价的晶格映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLatticeMapping {
    pub lattice_cost: f64,
    pub lattice_mapping: LatticeMapping,
}

impl ScoredLatticeMapping {
    pub fn new(lattice_cost: f64, lattice_mapping: LatticeMapping) -> Self {
        ScoredLatticeMapping {
            lattice_cost,
            lattice_mapping,
        }
    }
}

impl Scored for ScoredLatticeMapping {
    type Key = ([i64; 9], [i64; 9]);

    fn cost(&self) -> f64 {
        self.lattice_cost
    }

    fn tie_key(&self) -> Self::Key {
        self.lattice_mapping.tie_key()
    }
}

/// 晶格映射结果集合
pub type LatticeMappingResults = MappingResults<ScoredLatticeMapping>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_z(theta: f64) -> Matrix3<f64> {
        let (s, c) = theta.sin_cos();
        Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_polar_decomposition() {
        let u = Matrix3::new(1.05, 0.01, 0.0, 0.01, 0.98, 0.02, 0.0, 0.02, 1.0);
        let q = rotation_z(0.4);
        let mapping = LatticeMapping::new(q * u, Matrix3::identity(), Matrix3::identity()).unwrap();

        assert!((mapping.right_stretch() - u).amax() < 1e-10);
        assert!((mapping.isometry() - q).amax() < 1e-10);
        let v = mapping.left_stretch();
        assert!((v * mapping.isometry() - mapping.deformation_gradient).amax() < 1e-10);
        assert!((v - v.transpose()).amax() < 1e-10);
    }

    #[test]
    fn test_new_rejects_invalid_matrices() {
        let f = Matrix3::identity();
        let singular_t = Matrix3::new(1, 0, 0, 0, 0, 0, 0, 0, 1);
        assert!(LatticeMapping::new(f, singular_t, Matrix3::identity()).is_err());

        let non_unimodular = Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1);
        assert!(LatticeMapping::new(f, Matrix3::identity(), non_unimodular).is_err());

        assert!(
            LatticeMapping::new(Matrix3::zeros(), Matrix3::identity(), Matrix3::identity())
                .is_err()
        );
    }

    #[test]
    fn test_maps_relation() {
        let parent = Lattice::from_parameters(2.0, 2.0, 2.0, 90.0, 90.0, 90.0);
        let t = Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1);
        let f = Matrix3::from_diagonal_element(1.1);
        let mapping = LatticeMapping::new(f, t, Matrix3::identity()).unwrap();
        let child = Lattice::from_vectors([[4.4, 0.0, 0.0], [0.0, 2.2, 0.0], [0.0, 0.0, 2.2]]);

        assert!(mapping.maps(&parent, &child));
        assert!(!LatticeMapping::identity().maps(&parent, &child));
        assert_eq!(mapping.volume(), 2);
    }

    #[test]
    fn test_results_order_by_tie_key() {
        let mut other = LatticeMapping::identity();
        other.reorientation = Matrix3::new(0, 1, 0, 1, 0, 0, 0, 0, -1);
        let results = LatticeMappingResults::from_unsorted(vec![
            ScoredLatticeMapping::new(0.0, LatticeMapping::identity()),
            ScoredLatticeMapping::new(0.0, other.clone()),
        ]);
        assert_eq!(results.best().unwrap().lattice_mapping, other);
    }
}
