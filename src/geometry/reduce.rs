//! # 晶格约化
//!
//! 将晶格基矢约化为尽量短且接近正交的等价基矢，并记录幺模变换 U，
//! 满足 `L_reduced = L * U`。约化后的基矢使得重取向搜索与点群枚举
//! 只需考虑元素在 {-1, 0, 1} 内的整数矩阵。
//!
//! ## 算法
//! 反复执行两两约化 `b_i -= round(b_i·b_j / b_j·b_j) * b_j`，
//! 直到任意一对基矢都满足 |b_i·b_j| <= |b_j|²/2。
//! 每一步都严格缩短某个基矢，因此必然终止。
//!
//! ## 依赖关系
//! - 被 `geometry/symmetry.rs`、`methods/lattice_search.rs` 使用

use nalgebra::Matrix3;

const MAX_REDUCTION_SWEEPS: usize = 1000;

/// 约化结果
#[derive(Debug, Clone)]
pub struct ReducedLattice {
    /// 约化后的列向量矩阵
    pub lattice: Matrix3<f64>,
    /// 幺模矩阵 U，`lattice = L * U`
    pub transform: Matrix3<i64>,
}

/// 约化列向量矩阵
pub fn reduce(l: &Matrix3<f64>) -> ReducedLattice {
    let mut b = *l;
    let mut u: Matrix3<i64> = Matrix3::identity();

    for _ in 0..MAX_REDUCTION_SWEEPS {
        let mut changed = false;
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    continue;
                }
                let bj = b.column(j).into_owned();
                let norm_sq = bj.norm_squared();
                if norm_sq <= 0.0 {
                    continue;
                }
                let mu = b.column(i).dot(&bj) / norm_sq;
                if mu.abs() <= 0.5 + 1e-9 {
                    continue;
                }
                let q = mu.round();
                let bi = b.column(i) - bj * q;
                b.set_column(i, &bi);
                let ui = u.column(i) - u.column(j) * (q as i64);
                u.set_column(i, &ui);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    ReducedLattice {
        lattice: b,
        transform: u,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::integer;

    #[test]
    fn test_reduce_keeps_orthogonal_basis() {
        let l = Matrix3::from_diagonal(&nalgebra::Vector3::new(2.0, 3.0, 4.0));
        let r = reduce(&l);
        assert_eq!(r.transform, Matrix3::identity());
        assert!((r.lattice - l).amax() < 1e-12);
    }

    #[test]
    fn test_reduce_sheared_cubic() {
        // a, a+b, a+b+c 是简单立方的一组长基矢
        let l = Matrix3::new(1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0);
        let r = reduce(&l);

        for j in 0..3 {
            assert!((r.lattice.column(j).norm() - 1.0).abs() < 1e-9);
        }
        assert_eq!(integer::det(&r.transform).abs(), 1);
        let check = l * integer::to_f64(&r.transform);
        assert!((check - r.lattice).amax() < 1e-9);
    }
}
