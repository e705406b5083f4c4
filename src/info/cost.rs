//! # 映射代价
//!
//! - 晶格代价：由形变梯度 F 的右伸缩张量 U 计算
//!   - 各向同性应变代价：体积变化不计，只计形状变化
//!   - 对称破缺应变代价：扣除在父晶格点群下不变的应变部分
//! - 原子代价：位移平方均值按每位点体积归一化
//! - 结构代价：晶格代价与原子代价的加权和
//!
//! ## 依赖关系
//! - 被 `info/lattice_mapping.rs`、`methods/` 使用
//! - 使用 `geometry/symmetry.rs` 的 SymOp
//! - 使用 `nalgebra` 的对称特征分解

use crate::geometry::SymOp;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// 默认晶格代价权重
pub const DEFAULT_LATTICE_COST_WEIGHT: f64 = 0.5;

/// 晶格代价计算方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatticeCostMethod {
    /// 各向同性应变代价
    #[default]
    IsotropicStrain,
    /// 对称破缺应变代价
    SymmetryBreakingStrain,
}

impl std::fmt::Display for LatticeCostMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatticeCostMethod::IsotropicStrain => write!(f, "isotropic_strain"),
            LatticeCostMethod::SymmetryBreakingStrain => write!(f, "symmetry_breaking_strain"),
        }
    }
}

/// 右伸缩张量 `U = sqrt(Fᵀ F)`
pub fn right_stretch(f: &Matrix3<f64>) -> Matrix3<f64> {
    let c = f.transpose() * f;
    let eigen = c.symmetric_eigen();
    let sqrt_values = eigen.eigenvalues.map(|x| x.max(0.0).sqrt());
    eigen.eigenvectors * Matrix3::from_diagonal(&sqrt_values) * eigen.eigenvectors.transpose()
}

/// 去除体积变化后的 Biot 应变 `U / det(U)^(1/3) - I`；F 不可逆或反手性时返回 None
fn isovolumic_strain(f: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    if !(f.determinant() > 0.0) {
        return None;
    }
    let u = right_stretch(f);
    let det = u.determinant();
    if !(det > 0.0) {
        return None;
    }
    Some(u / det.cbrt() - Matrix3::identity())
}

/// 各向同性应变代价 `trace(B²) / 3`
pub fn isotropic_strain_cost(f: &Matrix3<f64>) -> f64 {
    match isovolumic_strain(f) {
        Some(b) => (b * b).trace() / 3.0,
        None => f64::INFINITY,
    }
}

/// 对称破缺应变代价：扣除点群平均 `Σ R B Rᵀ / |G|` 后的剩余应变
pub fn symmetry_breaking_strain_cost(f: &Matrix3<f64>, point_group: &[SymOp]) -> f64 {
    let Some(b) = isovolumic_strain(f) else {
        return f64::INFINITY;
    };
    if point_group.is_empty() {
        return (b * b).trace() / 3.0;
    }
    let invariant = point_group
        .iter()
        .fold(Matrix3::zeros(), |acc, op| acc + op.rotation * b * op.rotation.transpose())
        / point_group.len() as f64;
    let breaking = b - invariant;
    (breaking * breaking).trace() / 3.0
}

/// 按所选方法计算晶格代价
pub fn lattice_cost(method: LatticeCostMethod, f: &Matrix3<f64>, point_group: &[SymOp]) -> f64 {
    match method {
        LatticeCostMethod::IsotropicStrain => isotropic_strain_cost(f),
        LatticeCostMethod::SymmetryBreakingStrain => symmetry_breaking_strain_cost(f, point_group),
    }
}

/// 各向同性原子代价 `(V/n)^(-2/3) * Σ|d|² / n`
pub fn isotropic_atom_cost(volume: f64, displacement: &[Vector3<f64>]) -> f64 {
    if displacement.is_empty() {
        return 0.0;
    }
    let n = displacement.len() as f64;
    let volume_per_site = volume.abs() / n;
    let mean_sq = displacement.iter().map(|d| d.norm_squared()).sum::<f64>() / n;
    mean_sq / volume_per_site.powf(2.0 / 3.0)
}

/// 结构映射代价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureMappingCost {
    pub lattice_cost: f64,
    pub atom_cost: f64,
    pub total_cost: f64,
}

impl StructureMappingCost {
    /// 以权重 w 组合：`total = w * lattice_cost + (1 - w) * atom_cost`
    pub fn new(lattice_cost: f64, atom_cost: f64, lattice_cost_weight: f64) -> Self {
        StructureMappingCost {
            lattice_cost,
            atom_cost,
            total_cost: lattice_cost_weight * lattice_cost
                + (1.0 - lattice_cost_weight) * atom_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::lattice_point_group;
    use crate::models::Lattice;

    fn rotation_z(theta: f64) -> Matrix3<f64> {
        let (s, c) = theta.sin_cos();
        Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_right_stretch_removes_rotation() {
        let u = Matrix3::new(1.1, 0.02, 0.0, 0.02, 0.95, 0.0, 0.0, 0.0, 1.0);
        let f = rotation_z(0.3) * u;
        assert!((right_stretch(&f) - u).amax() < 1e-10);
    }

    #[test]
    fn test_isotropic_strain_cost_ignores_rotation_and_volume() {
        assert!(isotropic_strain_cost(&rotation_z(0.7)) < 1e-20);
        assert!(isotropic_strain_cost(&(Matrix3::identity() * 1.3)) < 1e-20);
    }

    #[test]
    fn test_isotropic_strain_cost_of_tetragonal_strain() {
        let f = Matrix3::from_diagonal(&Vector3::new(1.1, 1.0, 1.0));
        let scale = 1.1_f64.cbrt();
        let e = [1.1 / scale - 1.0, 1.0 / scale - 1.0, 1.0 / scale - 1.0];
        let expected = e.iter().map(|x| x * x).sum::<f64>() / 3.0;
        assert!((isotropic_strain_cost(&f) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_deformation_is_infinite() {
        let f = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0));
        assert!(isotropic_strain_cost(&f).is_infinite());
    }

    #[test]
    fn test_symmetry_breaking_cost() {
        let cubic = lattice_point_group(&Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0))
            .unwrap();
        // 立方点群下仅体积应变不变，已被去除，因此四方应变全部计入
        let f = Matrix3::from_diagonal(&Vector3::new(1.05, 1.0, 1.0));
        let full = isotropic_strain_cost(&f);
        let breaking = symmetry_breaking_strain_cost(&f, &cubic);
        assert!(breaking > 0.0);
        assert!(breaking <= full + 1e-15);

        // 四方点群下四方应变是对称保持的
        let tetragonal =
            lattice_point_group(&Lattice::from_parameters(3.0, 3.0, 3.15, 90.0, 90.0, 90.0))
                .unwrap();
        let f = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 1.05));
        assert!(symmetry_breaking_strain_cost(&f, &tetragonal) < 1e-20);
    }

    #[test]
    fn test_isotropic_atom_cost() {
        assert_eq!(isotropic_atom_cost(8.0, &[]), 0.0);
        let d = vec![Vector3::new(0.1, 0.0, 0.0), Vector3::zeros()];
        // V/n = 4, (4)^(-2/3) * 0.01 / 2
        let expected = 0.005 / 4.0_f64.powf(2.0 / 3.0);
        assert!((isotropic_atom_cost(8.0, &d) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_structure_mapping_cost_weighting() {
        let cost = StructureMappingCost::new(0.2, 0.4, 0.5);
        assert!((cost.total_cost - 0.3).abs() < 1e-15);
        let lattice_only = StructureMappingCost::new(0.2, 0.4, 1.0);
        assert!((lattice_only.total_cost - 0.2).abs() < 1e-15);
    }
}
