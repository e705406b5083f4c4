//! # 结构映射搜索
//!
//! 组合晶格映射搜索与原子映射搜索：
//! 1. 按位点数确定体积范围，跳过原子放不下或空位不足的体积
//! 2. 每个体积搜索 lattice_k_best 个晶格映射
//! 3. 对每个晶格映射（并行）搜索原子映射，按加权总代价评分
//! 4. 总代价排序、截取 k_best
//!
//! 所有子搜索共享同一个预算计量器。
//!
//! ## 依赖关系
//! - 被 `commands/structures.rs` 调用
//! - 使用 `methods/lattice_search.rs`、`methods/atom_search.rs`

use std::sync::Arc;
use std::time::Instant;

use crate::error::{MappingError, Result};
use crate::info::cost::StructureMappingCost;
use crate::info::lattice_mapping::ScoredLatticeMapping;
use crate::info::results::{retain_cost_range, sort_scored, truncate_k_best};
use crate::info::structure_mapping::{
    ScoredStructureMapping, StructureMapping, StructureMappingResults,
};
use crate::methods::atom_search::{check_site_count, search_atoms};
use crate::methods::lattice_search::{search_lattices, volume_ratio};
use crate::methods::options::StructureMappingSearchOptions;
use crate::methods::search_data::PrimSearchData;
use crate::models::{Prim, Structure};

use log::debug;
use rayon::prelude::*;

/// 搜索 prim 到子结构的结构映射
pub fn map_structures(
    prim: &Arc<Prim>,
    child: &Structure,
    options: &StructureMappingSearchOptions,
) -> Result<StructureMappingResults> {
    options.validate()?;
    prim.validate()?;
    child.validate()?;

    let tracker = options.budget.start();
    let start = Instant::now();
    let prim_data = PrimSearchData::new(Arc::clone(prim))?;

    let n_atoms = child.sites.len() as i64;
    let n_prim_sites = prim.n_sites() as i64;
    let min_volume = options
        .min_volume
        .unwrap_or_else(|| ((n_atoms + n_prim_sites - 1) / n_prim_sites).max(1));
    let max_volume = options
        .max_volume
        .unwrap_or_else(|| min_volume.max(volume_ratio(&prim.lattice, &child.lattice)));
    if min_volume > max_volume {
        return Err(MappingError::InvalidInput(format!(
            "min_volume {} is greater than max_volume {}",
            min_volume, max_volume
        )));
    }

    let mut lattice_mappings: Vec<ScoredLatticeMapping> = Vec::new();
    for volume in min_volume..=max_volume {
        if let Err(e) = check_site_count(prim, volume as usize, child.sites.len()) {
            debug!("structure search: skip volume {}: {}", volume, e);
            continue;
        }
        let lattice_options = options.lattice_options(volume, volume);
        let found = search_lattices(&prim.lattice, &child.lattice, &lattice_options, &tracker)?;
        lattice_mappings.extend(found);
    }
    debug!(
        "structure search: {} lattice mappings over volumes {}..={}",
        lattice_mappings.len(),
        min_volume,
        max_volume
    );

    let weight = options.lattice_cost_weight;
    let atom_options = options.atom_options();
    let per_lattice = lattice_mappings
        .par_iter()
        .filter(|lm| weight * lm.lattice_cost <= options.max_total_cost)
        .map(|scored_lattice| {
            let atoms = search_atoms(
                &prim_data,
                child,
                &scored_lattice.lattice_mapping,
                &atom_options,
                &tracker,
            )?;
            atoms
                .into_iter()
                .map(|scored_atom| {
                    let cost = StructureMappingCost::new(
                        scored_lattice.lattice_cost,
                        scored_atom.atom_cost,
                        weight,
                    );
                    let mapping = StructureMapping::new(
                        Arc::clone(prim),
                        scored_lattice.lattice_mapping.clone(),
                        scored_atom.atom_mapping,
                    )?;
                    Ok(ScoredStructureMapping::new(cost, mapping))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<Vec<ScoredStructureMapping>>>>()?;

    let mut candidates: Vec<ScoredStructureMapping> = per_lattice.into_iter().flatten().collect();
    retain_cost_range(&mut candidates, options.min_total_cost, options.max_total_cost);
    sort_scored(&mut candidates);
    truncate_k_best(&mut candidates, options.k_best, options.cost_tol);
    debug!(
        "structure search: {} mappings kept after {:.3} s ({} evaluations)",
        candidates.len(),
        start.elapsed().as_secs_f64(),
        tracker.evaluations()
    );

    Ok(StructureMappingResults::from_unsorted(candidates))
}
