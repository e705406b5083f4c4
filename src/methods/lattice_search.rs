//! # 晶格映射搜索
//!
//! 枚举 `F * L1 * T * N = L2` 的候选：
//! 1. 体积 n 的每个 Hermite 标准形 T 给出超晶格 `S = L1 * T`
//! 2. 约化 S 与 L2，在约化基矢下枚举元素位于 [-r, r] 的幺模矩阵 N'
//! 3. 还原为原基矢下的重取向 `N = U_s * N' * U_c⁻¹`，`F = L2 * (S * N)⁻¹`
//! 4. 保留 det F > 0 且代价在范围内的候选
//!
//! 候选按 T 并行评估，最后统一排序，在父晶格点群下去重，并截取 k_best。
//!
//! ## 依赖关系
//! - 被 `methods/structure_search.rs`、`commands/lattices.rs` 调用
//! - 使用 `geometry/` 的约化、HNF、点群
//! - 使用 `rayon` 并行评估

use crate::error::{MappingError, Result};
use crate::geometry::integer;
use crate::geometry::reduce::reduce;
use crate::geometry::superlattice::hermite_normal_forms;
use crate::geometry::symmetry::{canonical_form, lattice_point_group};
use crate::geometry::SymOp;
use crate::info::cost::lattice_cost;
use crate::info::lattice_mapping::{LatticeMapping, LatticeMappingResults, ScoredLatticeMapping};
use crate::info::results::{retain_cost_range, sort_scored, truncate_k_best};
use crate::methods::budget::BudgetTracker;
use crate::methods::options::LatticeMappingSearchOptions;
use crate::models::Lattice;

use log::{debug, trace};
use nalgebra::Matrix3;
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::Instant;

/// 搜索父晶格到子晶格的晶格映射
pub fn map_lattices(
    parent: &Lattice,
    child: &Lattice,
    options: &LatticeMappingSearchOptions,
) -> Result<LatticeMappingResults> {
    let tracker = options.budget.start();
    search_lattices(parent, child, options, &tracker)
}

/// 不重取向的晶格映射：`N = I`，`F = L2 * T⁻¹ * L1⁻¹`（T 缺省为单位矩阵）
pub fn map_lattices_without_reorientation(
    parent: &Lattice,
    child: &Lattice,
    transformation_matrix_to_super: Option<Matrix3<i64>>,
) -> Result<LatticeMapping> {
    parent.validate()?;
    child.validate()?;
    let t = transformation_matrix_to_super.unwrap_or_else(Matrix3::identity);
    let t_inv = integer::to_f64(&t).try_inverse().ok_or_else(|| {
        MappingError::InvalidInput("transformation_matrix_to_super is singular".to_string())
    })?;
    let f = child.column_vector_matrix() * t_inv * parent.inverse()?;
    LatticeMapping::new(f, t, Matrix3::identity())
}

/// 默认体积：体积比取整，至少为 1
pub(crate) fn volume_ratio(parent: &Lattice, child: &Lattice) -> i64 {
    let ratio = child.volume().abs() / parent.volume().abs();
    (ratio.round() as i64).max(1)
}

fn volume_range(
    parent: &Lattice,
    child: &Lattice,
    options: &LatticeMappingSearchOptions,
) -> (i64, i64) {
    let n = volume_ratio(parent, child);
    let lo = options
        .min_volume
        .unwrap_or_else(|| n.min(options.max_volume.unwrap_or(n)));
    let hi = options.max_volume.unwrap_or_else(|| lo.max(n));
    (lo, hi)
}

/// 以给定计量器执行晶格搜索（供结构搜索共享预算）
pub(crate) fn search_lattices(
    parent: &Lattice,
    child: &Lattice,
    options: &LatticeMappingSearchOptions,
    tracker: &BudgetTracker,
) -> Result<LatticeMappingResults> {
    options.validate()?;
    parent.validate()?;
    child.validate()?;

    let point_group = match &options.parent_point_group {
        Some(group) => group.clone(),
        None => lattice_point_group(parent)?,
    };

    let transforms: Vec<Matrix3<i64>> = match options.transformation_matrix_to_super {
        Some(t) => {
            if integer::det(&t) < 1 {
                return Err(MappingError::InvalidInput(format!(
                    "transformation_matrix_to_super must have a positive determinant, got {}",
                    integer::det(&t)
                )));
            }
            vec![t]
        }
        None => {
            let (lo, hi) = volume_range(parent, child, options);
            (lo..=hi).flat_map(hermite_normal_forms).collect()
        }
    };

    let l2 = child.column_vector_matrix();
    let child_reduced = reduce(&l2);
    let u_c_inv = integer::inverse_unimodular(&child_reduced.transform)
        .ok_or_else(|| MappingError::Other("lattice reduction is not unimodular".to_string()))?;
    // 每个候选重取向矩阵计一次；在枚举之前检查预算
    let candidates_per_transform = integer::unimodular_candidate_count(options.reorientation_range)
        .ok_or_else(|| {
            MappingError::InvalidInput(format!(
                "reorientation_range {} is too large to enumerate",
                options.reorientation_range
            ))
        })?;
    let planned = (transforms.len() as u64).saturating_mul(candidates_per_transform);
    tracker.check_upfront(planned, "lattice mapping search")?;
    let reorientations = integer::unimodular_matrices(options.reorientation_range);
    debug!(
        "lattice search: {} supercells x {} reorientations",
        transforms.len(),
        reorientations.len()
    );

    let start = Instant::now();
    let context = SearchContext {
        l1: parent.column_vector_matrix(),
        child_reduced: child_reduced.lattice,
        u_c_inv,
        reorientations: &reorientations,
        point_group: &point_group,
        options,
    };

    let per_transform = transforms
        .par_iter()
        .map(|t| {
            tracker.charge(candidates_per_transform)?;
            Ok(context.evaluate(t))
        })
        .collect::<Result<Vec<Vec<ScoredLatticeMapping>>>>()?;

    let mut candidates: Vec<ScoredLatticeMapping> = per_transform.into_iter().flatten().collect();
    trace!(
        "lattice search: {} candidates in range after {:.3} s",
        candidates.len(),
        start.elapsed().as_secs_f64()
    );

    retain_cost_range(&mut candidates, options.min_cost, options.max_cost);
    let child_point_group = lattice_point_group(child)?;
    let mut unique = deduplicate(candidates, &point_group, &child_point_group, options);
    truncate_k_best(&mut unique, options.k_best, options.cost_tol);
    debug!("lattice search: {} mappings kept", unique.len());

    Ok(LatticeMappingResults::from_unsorted(unique))
}

struct SearchContext<'a> {
    l1: Matrix3<f64>,
    child_reduced: Matrix3<f64>,
    u_c_inv: Matrix3<i64>,
    reorientations: &'a [Matrix3<i64>],
    point_group: &'a [SymOp],
    options: &'a LatticeMappingSearchOptions,
}

impl SearchContext<'_> {
    fn evaluate(&self, t: &Matrix3<i64>) -> Vec<ScoredLatticeMapping> {
        let s = self.l1 * integer::to_f64(t);
        let s_reduced = reduce(&s);
        let Some(s_r_inv) = s_reduced.lattice.try_inverse() else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for n_r in self.reorientations {
            let Some(n_r_inv) = integer::inverse_unimodular(n_r) else {
                continue;
            };
            // F * S_r * N' = C_r
            let f = self.child_reduced * integer::to_f64(&n_r_inv) * s_r_inv;
            if !(f.determinant() > 0.0) {
                continue;
            }
            let cost = lattice_cost(self.options.cost_method, &f, self.point_group);
            if cost < self.options.min_cost || cost > self.options.max_cost {
                continue;
            }
            let reorientation = s_reduced.transform * n_r * self.u_c_inv;
            found.push(ScoredLatticeMapping::new(
                cost,
                LatticeMapping {
                    deformation_gradient: f,
                    transformation_matrix_to_super: *t,
                    reorientation,
                },
            ));
        }
        found
    }
}

/// 按对称性去重
///
/// 等价类以 `min_lex{ A * T * N * K }` 标识，A 属于父晶格点群，K 属于子晶格点群
/// （K 只改变子晶格的取向，不改变代价）。每类保留代价最低者；代价在 cost_tol
/// 内并列时优先重取向最接近恒等的候选。候选已按代价排序，
/// 凑足 k_best 个类且超出并列窗口后即停止。
fn deduplicate(
    mut candidates: Vec<ScoredLatticeMapping>,
    parent_point_group: &[SymOp],
    child_point_group: &[SymOp],
    options: &LatticeMappingSearchOptions,
) -> Vec<ScoredLatticeMapping> {
    sort_scored(&mut candidates);

    let preference = |m: &ScoredLatticeMapping| {
        let lm = &m.lattice_mapping;
        (
            integer::distance_from_identity(&lm.reorientation),
            lm.tie_key(),
        )
    };

    let mut classes: HashMap<[i64; 9], usize> = HashMap::new();
    let mut kept: Vec<ScoredLatticeMapping> = Vec::new();
    for candidate in candidates {
        if kept.len() >= options.k_best
            && candidate.lattice_cost > kept[options.k_best - 1].lattice_cost + options.cost_tol
        {
            break;
        }
        let key = integer::row_major(&canonical_form(
            parent_point_group,
            &candidate.lattice_mapping.superlattice_matrix(),
            child_point_group,
        ));
        match classes.get(&key) {
            None => {
                classes.insert(key, kept.len());
                kept.push(candidate);
            }
            Some(&index) => {
                let current = &kept[index];
                if candidate.lattice_cost - current.lattice_cost <= options.cost_tol
                    && preference(&candidate) < preference(current)
                {
                    kept[index] = candidate;
                }
            }
        }
    }

    sort_scored(&mut kept);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{LatticeCostMethod, Scored};
    use crate::methods::budget::SearchBudget;

    fn cubic(a: f64) -> Lattice {
        Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0)
    }

    fn assert_maps(parent: &Lattice, child: &Lattice, results: &LatticeMappingResults) {
        for scored in results {
            let lm = &scored.lattice_mapping;
            let lhs = lm.deformation_gradient * lm.ideal_superlattice(parent);
            assert!((lhs - child.column_vector_matrix()).amax() < 1e-8);
            assert_eq!(integer::det(&lm.reorientation).abs(), 1);
            assert!(integer::det(&lm.transformation_matrix_to_super) >= 1);
        }
    }

    #[test]
    fn test_identical_cubic_lattices() {
        let lattice = cubic(3.0);
        let results =
            map_lattices(&lattice, &lattice, &LatticeMappingSearchOptions::default()).unwrap();

        assert_eq!(results.len(), 1);
        let best = results.best().unwrap();
        assert!(best.lattice_cost < 1e-12);
        let lm = &best.lattice_mapping;
        assert_eq!(lm.transformation_matrix_to_super, Matrix3::identity());
        assert_eq!(lm.reorientation, Matrix3::identity());
        assert!((lm.deformation_gradient - Matrix3::identity()).amax() < 1e-10);
    }

    #[test]
    fn test_strained_child_satisfies_relation() {
        let parent = cubic(3.0);
        let child = Lattice::from_vectors([[3.1, 0.05, 0.0], [0.0, 2.95, 0.0], [0.0, 0.1, 3.02]]);
        let options = LatticeMappingSearchOptions::default().with_k_best(20);
        let results = map_lattices(&parent, &child, &options).unwrap();

        assert!(!results.is_empty());
        assert!(results.is_sorted());
        assert_maps(&parent, &child, &results);
        let costs = results.costs();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_symmetry_equivalent_mappings_collapse() {
        let parent = cubic(3.0);
        let child = Lattice::from_parameters(3.0, 3.0, 6.3, 90.0, 90.0, 90.0);
        let options = LatticeMappingSearchOptions::default()
            .with_volume_range(2, 2)
            .with_cost_range(0.0, 0.05)
            .with_k_best(1000);
        let results = map_lattices(&parent, &child, &options).unwrap();
        assert_maps(&parent, &child, &results);

        let parent_group = lattice_point_group(&parent).unwrap();
        let child_group = lattice_point_group(&child).unwrap();
        let mut keys: Vec<[i64; 9]> = results
            .iter()
            .map(|s| {
                integer::row_major(&canonical_form(
                    &parent_group,
                    &s.lattice_mapping.superlattice_matrix(),
                    &child_group,
                ))
            })
            .collect();
        let n = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), n);

        // 三个 1x1x2 超胞方向在立方对称下等价：最优映射只有一个
        let best = results.best().unwrap().cost();
        let n_best = results.iter().filter(|s| s.cost() < best + 1e-9).count();
        assert_eq!(n_best, 1);
    }

    #[test]
    fn test_symmetry_breaking_cost_uses_parent_group() {
        let parent = cubic(3.0);
        let child = Lattice::from_parameters(3.0, 3.0, 3.1, 90.0, 90.0, 90.0);
        let options = LatticeMappingSearchOptions::default()
            .with_cost_method(LatticeCostMethod::SymmetryBreakingStrain);

        // 四方畸变破坏立方对称
        let cubic_group = map_lattices(&parent, &child, &options).unwrap();
        assert!(cubic_group.best().unwrap().lattice_cost > 1e-6);

        // 只含恒等操作时任何应变都不破缺对称
        let trivial = options.with_parent_point_group(vec![SymOp::identity()]);
        let results = map_lattices(&parent, &child, &trivial).unwrap();
        assert!(results.best().unwrap().lattice_cost < 1e-12);
        assert_maps(&parent, &child, &results);
    }

    #[test]
    fn test_fixed_transformation_matrix() {
        let parent = cubic(2.0);
        let child = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        let t = Matrix3::new(1, 0, 0, 0, 2, 0, 0, 0, 1);
        let options = LatticeMappingSearchOptions::default().with_transformation_matrix_to_super(t);
        let results = map_lattices(&parent, &child, &options).unwrap();

        assert_eq!(results.len(), 1);
        let lm = &results.best().unwrap().lattice_mapping;
        assert_eq!(lm.transformation_matrix_to_super, t);
        assert!(results.best().unwrap().lattice_cost < 1e-12);
        assert_maps(&parent, &child, &results);
    }

    #[test]
    fn test_cost_bounds_give_empty_results() {
        let parent = cubic(3.0);
        let child = Lattice::from_parameters(3.0, 3.0, 4.5, 90.0, 90.0, 90.0);
        let options = LatticeMappingSearchOptions::default().with_cost_range(0.0, 1e-6);
        let results = map_lattices(&parent, &child, &options).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let parent = cubic(3.0);
        let degenerate = Lattice::from_vectors([[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            map_lattices(&parent, &degenerate, &LatticeMappingSearchOptions::default()),
            Err(MappingError::DegenerateLattice { .. })
        ));

        let options = LatticeMappingSearchOptions::default()
            .with_transformation_matrix_to_super(Matrix3::new(1, 0, 0, 0, 0, 0, 0, 0, 1));
        assert!(matches!(
            map_lattices(&parent, &parent, &options),
            Err(MappingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_budget_exhausted_before_search() {
        let lattice = cubic(3.0);
        let options = LatticeMappingSearchOptions::default()
            .with_budget(SearchBudget::unlimited().with_max_evaluations(10));
        assert!(matches!(
            map_lattices(&lattice, &lattice, &options),
            Err(MappingError::BudgetExhausted(_))
        ));
    }

    #[test]
    fn test_large_reorientation_range_is_rejected_before_enumeration() {
        let lattice = cubic(3.0);
        let options = LatticeMappingSearchOptions::default()
            .with_reorientation_range(200)
            .with_budget(SearchBudget::unlimited().with_max_evaluations(1000));
        assert!(matches!(
            map_lattices(&lattice, &lattice, &options),
            Err(MappingError::InvalidInput(_))
        ));

        // 5^9 个候选超出预算，枚举前即返回
        let options = LatticeMappingSearchOptions::default()
            .with_reorientation_range(2)
            .with_budget(SearchBudget::unlimited().with_max_evaluations(1000));
        assert!(matches!(
            map_lattices(&lattice, &lattice, &options),
            Err(MappingError::BudgetExhausted(_))
        ));
    }

    #[test]
    fn test_map_lattices_without_reorientation() {
        let parent = cubic(2.0);
        let child = Lattice::from_vectors([[4.2, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        let t = Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1);
        let lm = map_lattices_without_reorientation(&parent, &child, Some(t)).unwrap();

        assert_eq!(lm.reorientation, Matrix3::identity());
        assert!(lm.maps(&parent, &child));
        assert!((lm.deformation_gradient[(0, 0)] - 1.05).abs() < 1e-12);
    }
}
