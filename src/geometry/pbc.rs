//! # 周期性边界条件下的最短位移
//!
//! 先在分数坐标中去掉整数平移（快速法），再在约化基矢的 27 个近邻像中
//! 取最短者（稳健法）。约化基矢保证最短像一定在这 27 个候选之中。
//!
//! ## 依赖关系
//! - 被 `methods/search_data.rs`、`geometry/symmetry.rs` 使用
//! - 使用 `geometry/reduce.rs`

use crate::geometry::reduce;

use nalgebra::{Matrix3, Vector3};

/// 用于计算最短周期像的晶格
#[derive(Debug, Clone)]
pub struct PeriodicCell {
    reduced: Matrix3<f64>,
    reduced_inv: Matrix3<f64>,
    images: Vec<Vector3<f64>>,
}

impl PeriodicCell {
    /// 由列向量矩阵创建；奇异时返回 None
    pub fn new(l: &Matrix3<f64>) -> Option<Self> {
        let reduced = reduce::reduce(l).lattice;
        let reduced_inv = reduced.try_inverse()?;

        let mut images = Vec::with_capacity(27);
        for i in -1..=1 {
            for j in -1..=1 {
                for k in -1..=1 {
                    images.push(reduced * Vector3::new(i as f64, j as f64, k as f64));
                }
            }
        }

        Some(PeriodicCell {
            reduced,
            reduced_inv,
            images,
        })
    }

    /// 最短位移 `to - from`（考虑周期像）
    pub fn min_displacement(&self, from: &Vector3<f64>, to: &Vector3<f64>) -> Vector3<f64> {
        let frac = (self.reduced_inv * (to - from)).map(|x| x - x.round());
        let fast = self.reduced * frac;

        let mut best = fast;
        let mut best_norm = fast.norm_squared();
        for image in &self.images {
            let candidate = fast - image;
            let norm = candidate.norm_squared();
            if norm < best_norm {
                best = candidate;
                best_norm = norm;
            }
        }
        best
    }

    /// 两点在周期意义下的距离
    pub fn min_distance(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        self.min_displacement(a, b).norm()
    }

    /// 位移是否为晶格平移（容差 tol，笛卡尔长度）
    pub fn is_lattice_translation(&self, v: &Vector3<f64>, tol: f64) -> bool {
        self.min_displacement(&Vector3::zeros(), v).norm() < tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_displacement_wraps() {
        let cell = PeriodicCell::new(&Matrix3::from_diagonal_element(4.0)).unwrap();
        let d = cell.min_displacement(&Vector3::new(0.1, 0.0, 0.0), &Vector3::new(3.9, 0.0, 0.0));
        assert!((d - Vector3::new(-0.2, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_min_displacement_skewed_cell() {
        // 强烈剪切的基矢：同一个简单立方晶格
        let l = Matrix3::new(1.0, 5.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let cell = PeriodicCell::new(&l).unwrap();
        let d = cell.min_displacement(&Vector3::zeros(), &Vector3::new(0.9, 0.9, 0.0));
        assert!((d.norm() - (0.02_f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_is_lattice_translation() {
        let cell = PeriodicCell::new(&Matrix3::from_diagonal_element(2.0)).unwrap();
        assert!(cell.is_lattice_translation(&Vector3::new(2.0, -4.0, 0.0), 1e-6));
        assert!(!cell.is_lattice_translation(&Vector3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_singular_cell() {
        assert!(PeriodicCell::new(&Matrix3::zeros()).is_none());
    }
}
