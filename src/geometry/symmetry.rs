//! # 晶格点群与结构因子群
//!
//! - 晶格点群：保持度规张量不变的整数矩阵 A（`Aᵀ G A = G`），
//!   在约化基矢下枚举元素属于 {-1, 0, 1} 的候选
//! - 因子群：点群操作中能配以某个平移把 prim 映射到自身的操作
//! - 内部平移：因子群中旋转为恒等的操作的平移部分
//!
//! ## 依赖关系
//! - 被 `info/cost.rs`、`methods/` 使用
//! - 使用 `geometry/reduce.rs`、`geometry/integer.rs`、`geometry/pbc.rs`

use crate::error::{MappingError, Result};
use crate::geometry::pbc::PeriodicCell;
use crate::geometry::{integer, reduce};
use crate::models::{Lattice, Prim};

use nalgebra::{Matrix3, Vector3};

/// 对称操作：`r -> rotation * r + translation`（笛卡尔坐标）
#[derive(Debug, Clone, PartialEq)]
pub struct SymOp {
    /// 晶格分数坐标下的整数旋转矩阵
    pub frac_rotation: Matrix3<i64>,
    /// 笛卡尔旋转矩阵
    pub rotation: Matrix3<f64>,
    /// 笛卡尔平移
    pub translation: Vector3<f64>,
}

impl SymOp {
    /// 恒等操作
    pub fn identity() -> Self {
        SymOp {
            frac_rotation: Matrix3::identity(),
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// 旋转部分是否为恒等
    pub fn is_pure_translation(&self) -> bool {
        self.frac_rotation == Matrix3::identity()
    }

    /// 作用于笛卡尔坐标
    pub fn apply(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * r + self.translation
    }
}

/// 计算晶格点群（恒等操作排在首位）
pub fn lattice_point_group(lattice: &Lattice) -> Result<Vec<SymOp>> {
    lattice.validate()?;

    let reduced = reduce::reduce(&lattice.column_vector_matrix());
    let lr = reduced.lattice;
    let u = reduced.transform;
    let u_inv = integer::inverse_unimodular(&u)
        .ok_or_else(|| MappingError::Other("lattice reduction is not unimodular".to_string()))?;
    let lr_inv = lr.try_inverse().ok_or(MappingError::DegenerateLattice {
        volume: lattice.volume(),
    })?;

    let metric = lr.transpose() * lr;
    let max_len = (0..3).map(|j| lr.column(j).norm()).fold(0.0_f64, f64::max);
    let metric_tol = 2.0 * lattice.tol * max_len;

    let mut ops: Vec<SymOp> = integer::unimodular_matrices(1)
        .into_iter()
        .filter(|a| {
            let af = integer::to_f64(a);
            (af.transpose() * metric * af - metric).amax() < metric_tol
        })
        .map(|a| SymOp {
            frac_rotation: u * a * u_inv,
            rotation: lr * integer::to_f64(&a) * lr_inv,
            translation: Vector3::zeros(),
        })
        .collect();

    ops.sort_by_key(|op| {
        (
            !op.is_pure_translation(),
            integer::row_major(&op.frac_rotation),
        )
    });
    Ok(ops)
}

/// 计算 prim 的因子群（恒等操作排在首位）
pub fn factor_group(prim: &Prim) -> Result<Vec<SymOp>> {
    prim.validate()?;

    let point_group = lattice_point_group(&prim.lattice)?;
    let l = prim.lattice.column_vector_matrix();
    let cell = PeriodicCell::new(&l).ok_or(MappingError::DegenerateLattice {
        volume: prim.lattice.volume(),
    })?;
    let tol = prim.lattice.tol;
    let sites = prim.site_coordinate_cart();
    let occupants = prim.allowed_occupants();

    let mut group = Vec::new();
    for op in &point_group {
        let rotated: Vec<Vector3<f64>> = sites.iter().map(|r| op.apply(r)).collect();
        let mut found: Vec<Vector3<f64>> = Vec::new();

        for (j, site_j) in sites.iter().enumerate() {
            if occupants[j] != occupants[0] {
                continue;
            }
            let t = site_j - rotated[0];
            if found
                .iter()
                .any(|existing| cell.is_lattice_translation(&(t - existing), tol))
            {
                continue;
            }

            let maps_onto_self = rotated.iter().enumerate().all(|(i, r)| {
                sites.iter().enumerate().any(|(k, site_k)| {
                    occupants[k] == occupants[i] && cell.min_distance(&(r + t), site_k) < tol
                })
            });

            if maps_onto_self {
                found.push(t);
                group.push(SymOp {
                    frac_rotation: op.frac_rotation,
                    rotation: op.rotation,
                    translation: t,
                });
            }
        }
    }

    Ok(group)
}

/// 因子群中的内部平移（至少包含零平移）
pub fn internal_translations(factor_group: &[SymOp]) -> Vec<Vector3<f64>> {
    let mut translations: Vec<Vector3<f64>> = factor_group
        .iter()
        .filter(|op| op.is_pure_translation())
        .map(|op| op.translation)
        .collect();
    if translations.is_empty() {
        translations.push(Vector3::zeros());
    }
    translations
}

/// 双陪集 `{ A * M * K }` 中字典序最小的整数矩阵，用作等价类的标准代表
///
/// A 取自左侧点群（作用于 M 的行空间，即父晶格分数坐标），
/// K 取自右侧点群（子晶格分数坐标）；右侧为空时只用恒等操作。
pub fn canonical_form(left: &[SymOp], m: &Matrix3<i64>, right: &[SymOp]) -> Matrix3<i64> {
    let identity = [SymOp::identity()];
    let right = if right.is_empty() { &identity[..] } else { right };
    left.iter()
        .flat_map(|a| {
            let am = a.frac_rotation * m;
            right.iter().map(move |k| am * k.frac_rotation)
        })
        .min_by_key(integer::row_major)
        .unwrap_or(*m)
}
