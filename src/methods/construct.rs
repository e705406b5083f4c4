//! # 由映射构造结构
//!
//! - `make_mapped_lattice`: 去除等距变换后的子晶格 `Qᵀ L2 = U L1 T N`
//! - `make_mapped_structure`: 按父超胞位点顺序排列的子结构，
//!   位置为 `U (site + displacement)`，隐含空位记为 `Va`
//!
//! ## 依赖关系
//! - 被 `commands/apply.rs`、`commands/structures.rs` 调用
//! - 使用 `methods/search_data.rs` 的超胞位点

use crate::error::{MappingError, Result};
use crate::info::atom_mapping::is_permutation;
use crate::info::lattice_mapping::LatticeMapping;
use crate::info::structure_mapping::StructureMapping;
use crate::methods::search_data::{PrimSearchData, SupercellSearchData};
use crate::models::{Lattice, Site, Structure};

/// 隐含空位的占位名称
pub const VACANCY: &str = "Va";

/// 子晶格在父晶格参考系中的表示 `Qᵀ L2`
///
/// 映射不满足 `F L1 T N = L2` 时返回映射不一致。
pub fn make_mapped_lattice(
    parent_lattice: &Lattice,
    child_lattice: &Lattice,
    lattice_mapping: &LatticeMapping,
) -> Result<Lattice> {
    child_lattice.validate()?;
    if !lattice_mapping.maps(parent_lattice, child_lattice) {
        return Err(MappingError::InconsistentMapping(
            "child lattice does not satisfy F * L1 * T * N = L2".to_string(),
        ));
    }
    let q = lattice_mapping.isometry();
    let mapped = q.transpose() * child_lattice.column_vector_matrix();
    Ok(Lattice::from_column_matrix(&mapped).with_tol(child_lattice.tol))
}

/// 按结构映射构造映射后的子结构
pub fn make_mapped_structure(
    child: &Structure,
    structure_mapping: &StructureMapping,
) -> Result<Structure> {
    let prim = &structure_mapping.prim;
    let lm = &structure_mapping.lattice_mapping;
    let am = &structure_mapping.atom_mapping;

    if !lm.maps(&prim.lattice, &child.lattice) {
        return Err(MappingError::InconsistentMapping(
            "child lattice does not satisfy F * L1 * T * N = L2".to_string(),
        ));
    }
    let n_sites = structure_mapping.n_supercell_sites();
    if am.permutation.len() != n_sites || am.displacement.len() != n_sites {
        return Err(MappingError::InconsistentMapping(format!(
            "atom mapping has {} entries but the supercell has {} sites",
            am.permutation.len(),
            n_sites
        )));
    }
    if child.sites.len() > n_sites {
        return Err(MappingError::InconsistentMapping(format!(
            "child has {} atoms but the supercell has only {} sites",
            child.sites.len(),
            n_sites
        )));
    }
    if !is_permutation(&am.permutation) {
        return Err(MappingError::InconsistentMapping(
            "permutation has repeated or out-of-range indices".to_string(),
        ));
    }

    let prim_data = PrimSearchData::new(prim.clone())?;
    let supercell = SupercellSearchData::new(&prim_data, lm)?;
    let u = lm.right_stretch();
    let lattice = make_mapped_lattice(&prim.lattice, &child.lattice, lm)?;
    let l_inv = lattice.inverse()?;

    let sites = supercell
        .site_coordinate_cart
        .iter()
        .zip(am.permutation.iter().zip(am.displacement.iter()))
        .map(|(site, (&atom, d))| {
            let occupant = child
                .sites
                .get(atom)
                .map_or_else(|| VACANCY.to_string(), |s| s.occupant.clone());
            let frac = l_inv * (u * (site + d));
            Site::new(occupant, [frac.x, frac.y, frac.z])
        })
        .collect();

    Ok(Structure::new(child.name.clone(), lattice, sites))
}
