//! # 原子映射搜索
//!
//! 固定晶格映射后，把子结构原子指派到父超胞位点：
//! 1. 检查位点数（原子多于位点，或空位不足以补齐，均为映射不一致）
//! 2. 子结构原子变换到理想超晶格 `F⁻¹ r`
//! 3. 对每个试探平移（并行）构建代价矩阵，求前 k 个指派
//! 4. 去除平均位移并折入平移，按原子代价评分
//! 5. 合并、排序、去重、截取 k_best
//!
//! ## 依赖关系
//! - 被 `methods/structure_search.rs` 调用
//! - 使用 `methods/search_data.rs`、`methods/assignment.rs`
//! - 使用 `rayon` 并行处理试探平移

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MappingError, Result};
use crate::info::atom_mapping::{AtomMapping, AtomMappingResults, ScoredAtomMapping};
use crate::info::cost::isotropic_atom_cost;
use crate::info::lattice_mapping::LatticeMapping;
use crate::info::results::{retain_cost_range, sort_scored, truncate_k_best};
use crate::methods::assignment::{k_best_assignments, Assignment};
use crate::methods::budget::BudgetTracker;
use crate::methods::options::AtomMappingSearchOptions;
use crate::methods::search_data::{atoms_in_ideal_frame, PrimSearchData, SupercellSearchData};
use crate::models::{Prim, Structure};

use log::{debug, trace};
use nalgebra::Vector3;
use rayon::prelude::*;

/// 在给定晶格映射下搜索原子映射
pub fn map_atoms(
    prim: &Arc<Prim>,
    child: &Structure,
    lattice_mapping: &LatticeMapping,
    options: &AtomMappingSearchOptions,
) -> Result<AtomMappingResults> {
    let tracker = options.budget.start();
    let prim_data = PrimSearchData::new(Arc::clone(prim))?;
    search_atoms(&prim_data, child, lattice_mapping, options, &tracker)
}

/// 超胞能否容纳子结构原子：原子数不超过位点数，且空位位点足以补齐差额
pub(crate) fn check_site_count(prim: &Prim, volume: usize, n_atoms: usize) -> Result<()> {
    let n_sites = prim.n_sites() * volume;
    if n_atoms > n_sites {
        return Err(MappingError::InconsistentMapping(format!(
            "child has {} atoms but the supercell has only {} sites",
            n_atoms, n_sites
        )));
    }
    let shortfall = n_sites - n_atoms;
    let n_vacancy_sites = prim.n_vacancy_sites() * volume;
    if shortfall > n_vacancy_sites {
        return Err(MappingError::InconsistentMapping(format!(
            "child has {} atoms for {} supercell sites, but only {} sites allow vacancies",
            n_atoms, n_sites, n_vacancy_sites
        )));
    }
    Ok(())
}

/// 以给定 prim 数据与计量器执行原子搜索（供结构搜索复用）
pub(crate) fn search_atoms(
    prim_data: &PrimSearchData,
    child: &Structure,
    lattice_mapping: &LatticeMapping,
    options: &AtomMappingSearchOptions,
    tracker: &BudgetTracker,
) -> Result<AtomMappingResults> {
    options.validate()?;
    child.validate()?;
    let prim = &prim_data.prim;

    if !lattice_mapping.maps(&prim.lattice, &child.lattice) {
        return Err(MappingError::InconsistentMapping(
            "lattice mapping does not map the prim lattice onto the child lattice".to_string(),
        ));
    }
    check_site_count(prim, lattice_mapping.volume() as usize, child.sites.len())?;

    let supercell = SupercellSearchData::new(prim_data, lattice_mapping)?;
    let atoms = atoms_in_ideal_frame(child, lattice_mapping)?;
    let atom_types = child.atom_types();
    let translations = prim_data.trial_translations(&atoms, &atom_types);
    let child_volume = child.lattice.volume().abs();
    debug!(
        "atom search: {} sites, {} atoms, {} trial translations",
        supercell.n_sites(),
        atoms.len(),
        translations.len()
    );

    let per_translation = translations
        .par_iter()
        .map(|t| {
            let displacements = supercell.displacements(&atoms, t);
            let cost = supercell.cost_matrix(prim, &displacements, &atom_types, options.infinity);
            // 原子之后的列是可互换的空位列
            let assignments = k_best_assignments(
                &cost,
                atoms.len(),
                options.k_best,
                options.cost_tol,
                options.infinity,
                tracker,
            )?;
            trace!("translation {:?}: {} assignments", t.as_slice(), assignments.len());
            Ok(assignments
                .into_iter()
                .map(|a| make_scored(&a, &displacements, atoms.len(), t, child_volume))
                .collect::<Vec<_>>())
        })
        .collect::<Result<Vec<Vec<ScoredAtomMapping>>>>()?;

    let mut candidates: Vec<ScoredAtomMapping> = per_translation.into_iter().flatten().collect();
    retain_cost_range(&mut candidates, options.min_cost, options.max_cost);
    let mut unique = deduplicate(candidates, &supercell, prim.lattice.tol);
    truncate_k_best(&mut unique, options.k_best, options.cost_tol);

    Ok(AtomMappingResults::from_unsorted(unique))
}

/// 由指派构造原子映射：去除平均位移并折入平移
fn make_scored(
    assignment: &Assignment,
    displacements: &[Vec<Vector3<f64>>],
    n_atoms: usize,
    translation: &Vector3<f64>,
    child_volume: f64,
) -> ScoredAtomMapping {
    let permutation = assignment.columns.clone();
    let mut displacement: Vec<Vector3<f64>> = permutation
        .iter()
        .enumerate()
        .map(|(site, &atom)| {
            if atom < n_atoms {
                displacements[site][atom]
            } else {
                Vector3::zeros()
            }
        })
        .collect();

    let mut mean = Vector3::zeros();
    if n_atoms > 0 {
        let sum: Vector3<f64> = displacement.iter().sum();
        mean = sum / n_atoms as f64;
        for (d, &atom) in displacement.iter_mut().zip(permutation.iter()) {
            if atom < n_atoms {
                *d -= mean;
            }
        }
    }

    let cost = isotropic_atom_cost(child_volume, &displacement);
    ScoredAtomMapping::new(
        cost,
        AtomMapping {
            displacement,
            permutation,
            translation: translation - mean,
        },
    )
}

/// 去除重复：相同排列且平移相差超晶格平移
fn deduplicate(
    mut candidates: Vec<ScoredAtomMapping>,
    supercell: &SupercellSearchData,
    tol: f64,
) -> Vec<ScoredAtomMapping> {
    sort_scored(&mut candidates);
    let mut seen: HashMap<Vec<usize>, Vec<Vector3<f64>>> = HashMap::new();
    let mut unique = Vec::new();
    for candidate in candidates {
        let mapping = &candidate.atom_mapping;
        let translations = seen.entry(mapping.permutation.clone()).or_default();
        let duplicate = translations
            .iter()
            .any(|t| supercell.cell.is_lattice_translation(&(mapping.translation - t), tol));
        if !duplicate {
            translations.push(mapping.translation);
            unique.push(candidate);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Scored;
    use crate::models::{Lattice, PrimSite, Site};
    use nalgebra::Matrix3;

    fn rocksalt_like() -> Arc<Prim> {
        Arc::new(Prim::new(
            "AB",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![
                PrimSite::new([0.0, 0.0, 0.0], vec!["A".into()]),
                PrimSite::new([0.5, 0.5, 0.5], vec!["B".into(), "Va".into()]),
            ],
        ))
    }

    fn child_with(sites: Vec<Site>) -> Structure {
        Structure::new(
            "child",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            sites,
        )
    }

    #[test]
    fn test_perfect_match_identity_permutation() {
        let child = child_with(vec![
            Site::new("A", [0.0, 0.0, 0.0]),
            Site::new("B", [0.5, 0.5, 0.5]),
        ]);
        let results = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        let best = results.best().unwrap();
        assert!(best.cost() < 1e-20);
        assert_eq!(best.atom_mapping.permutation, vec![0, 1]);
        assert!(best.atom_mapping.translation.norm() < 1e-12);
    }

    #[test]
    fn test_mean_displacement_removed() {
        // 整体平移后的子结构：平均位移为零，平移吸收偏移
        let child = child_with(vec![
            Site::new("B", [0.6, 0.5, 0.5]),
            Site::new("A", [0.1, 0.0, 0.0]),
        ]);
        let results = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        )
        .unwrap();

        let best = results.best().unwrap();
        assert!(best.cost() < 1e-20);
        assert_eq!(best.atom_mapping.permutation, vec![1, 0]);
        let expected = Vector3::new(-0.3, 0.0, 0.0);
        let shift = best.atom_mapping.translation - expected;
        // 平移仅在超晶格平移意义下确定
        let frac = shift / 3.0;
        assert!(frac.iter().all(|x| (x - x.round()).abs() < 1e-9));
    }

    #[test]
    fn test_relation_holds_for_displaced_atoms() {
        let child = child_with(vec![
            Site::new("A", [0.02, 0.0, 0.01]),
            Site::new("B", [0.5, 0.47, 0.5]),
        ]);
        let options = AtomMappingSearchOptions::default().with_k_best(3);
        let results =
            map_atoms(&rocksalt_like(), &child, &LatticeMapping::identity(), &options).unwrap();
        assert!(results.is_sorted());

        let prim = rocksalt_like();
        let sites = prim.site_coordinate_cart();
        let atoms = child.atom_coordinate_cart();
        let cell = crate::geometry::PeriodicCell::new(&prim.lattice.column_vector_matrix()).unwrap();
        for scored in &results {
            let m = &scored.atom_mapping;
            for (i, &atom) in m.permutation.iter().enumerate() {
                let lhs = sites[i] + m.displacement[i];
                let rhs = atoms[atom] + m.translation;
                assert!(cell.min_distance(&lhs, &rhs) < 1e-9);
            }
        }
    }

    #[test]
    fn test_vacancy_fills_shortfall() {
        let child = child_with(vec![Site::new("A", [0.0, 0.0, 0.0])]);
        let results = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        )
        .unwrap();
        let best = results.best().unwrap();
        assert_eq!(best.atom_mapping.permutation, vec![0, 1]);
        assert_eq!(best.atom_mapping.vacancy_sites(1), vec![1]);
    }

    #[test]
    fn test_several_vacancies_give_one_mapping() {
        // 单位点 prim（A 或空位），四倍超胞中只有一个 A 原子：三个空位只有一种排法
        let prim = Arc::new(Prim::new(
            "A-Va",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![PrimSite::new([0.0, 0.0, 0.0], vec!["A".into(), "Va".into()])],
        ));
        let child = Structure::new(
            "child",
            Lattice::from_parameters(12.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![Site::new("A", [0.0, 0.0, 0.0])],
        );
        let lm = LatticeMapping::new(
            Matrix3::identity(),
            Matrix3::new(4, 0, 0, 0, 1, 0, 0, 0, 1),
            Matrix3::identity(),
        )
        .unwrap();
        let results = map_atoms(&prim, &child, &lm, &AtomMappingSearchOptions::default()).unwrap();

        assert_eq!(results.len(), 1);
        let best = results.best().unwrap();
        assert!(best.cost() < 1e-20);
        assert_eq!(best.atom_mapping.permutation, vec![0, 1, 2, 3]);
        assert_eq!(best.atom_mapping.vacancy_sites(1), vec![1, 2, 3]);
    }

    #[test]
    fn test_site_count_mismatch_is_inconsistent() {
        let child = child_with(vec![
            Site::new("A", [0.0, 0.0, 0.0]),
            Site::new("B", [0.5, 0.5, 0.5]),
            Site::new("B", [0.5, 0.0, 0.0]),
        ]);
        let result = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        );
        assert!(matches!(result, Err(MappingError::InconsistentMapping(_))));

        // 两倍超胞只有一个原子：空位位点不足以补齐
        let child = Structure::new(
            "child",
            Lattice::from_parameters(6.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![Site::new("A", [0.0, 0.0, 0.0])],
        );
        let lm = LatticeMapping::new(
            Matrix3::identity(),
            Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1),
            Matrix3::identity(),
        )
        .unwrap();
        let result = map_atoms(
            &rocksalt_like(),
            &child,
            &lm,
            &AtomMappingSearchOptions::default(),
        );
        assert!(matches!(result, Err(MappingError::InconsistentMapping(_))));
    }

    #[test]
    fn test_vacancy_on_forbidden_site_gives_empty_results() {
        // 缺少 A 原子，但 A 位点不允许空位：位点数可行，指派不可行
        let child = child_with(vec![Site::new("B", [0.5, 0.5, 0.5])]);
        let results = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_inconsistent_lattice_mapping() {
        let child = child_with(vec![
            Site::new("A", [0.0, 0.0, 0.0]),
            Site::new("B", [0.5, 0.5, 0.5]),
        ]);
        let wrong = LatticeMapping::new(
            Matrix3::from_diagonal_element(1.1),
            Matrix3::identity(),
            Matrix3::identity(),
        )
        .unwrap();
        let result = map_atoms(
            &rocksalt_like(),
            &child,
            &wrong,
            &AtomMappingSearchOptions::default(),
        );
        assert!(matches!(result, Err(MappingError::InconsistentMapping(_))));
    }

    #[test]
    fn test_unknown_species_gives_empty_results() {
        let child = child_with(vec![
            Site::new("A", [0.0, 0.0, 0.0]),
            Site::new("C", [0.5, 0.5, 0.5]),
        ]);
        let results = map_atoms(
            &rocksalt_like(),
            &child,
            &LatticeMapping::identity(),
            &AtomMappingSearchOptions::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }
}
