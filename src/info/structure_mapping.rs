//! # 结构映射
//!
//! 结构映射 = 共享的 prim + 晶格映射 + 相对于该晶格映射理想超晶格的原子映射。
//!
//! ## 依赖关系
//! - 被 `methods/structure_search.rs`、`methods/construct.rs`、`commands/` 使用
//! - 使用 `info/lattice_mapping.rs`、`info/atom_mapping.rs`、`info/cost.rs`

use std::sync::Arc;

use crate::error::{MappingError, Result};
use crate::info::atom_mapping::AtomMapping;
use crate::info::cost::StructureMappingCost;
use crate::info::lattice_mapping::LatticeMapping;
use crate::info::results::{MappingResults, Scored};
use crate::models::Prim;

use serde::{Deserialize, Serialize};

/// 结构映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMapping {
    pub prim: Arc<Prim>,
    pub lattice_mapping: LatticeMapping,
    pub atom_mapping: AtomMapping,
}

impl StructureMapping {
    /// 创建并检查原子映射的位点数与超胞一致
    pub fn new(
        prim: Arc<Prim>,
        lattice_mapping: LatticeMapping,
        atom_mapping: AtomMapping,
    ) -> Result<Self> {
        let expected = n_supercell_sites(&prim, &lattice_mapping);
        if atom_mapping.n_sites() != expected {
            return Err(MappingError::InconsistentMapping(format!(
                "atom mapping has {} sites but the supercell has {}",
                atom_mapping.n_sites(),
                expected
            )));
        }
        Ok(StructureMapping {
            prim,
            lattice_mapping,
            atom_mapping,
        })
    }

    /// 超胞位点数
    pub fn n_supercell_sites(&self) -> usize {
        n_supercell_sites(&self.prim, &self.lattice_mapping)
    }
}

fn n_supercell_sites(prim: &Prim, lattice_mapping: &LatticeMapping) -> usize {
    prim.n_sites() * lattice_mapping.volume() as usize
}

/// 带代价的结构映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStructureMapping {
    pub cost: StructureMappingCost,
    pub structure_mapping: StructureMapping,
}

impl ScoredStructureMapping {
    pub fn new(cost: StructureMappingCost, structure_mapping: StructureMapping) -> Self {
        ScoredStructureMapping {
            cost,
            structure_mapping,
        }
    }

    pub fn lattice_cost(&self) -> f64 {
        self.cost.lattice_cost
    }

    pub fn atom_cost(&self) -> f64 {
        self.cost.atom_cost
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total_cost
    }
}

impl Scored for ScoredStructureMapping {
    type Key = (([i64; 9], [i64; 9]), (Vec<usize>, [i64; 3]));

    fn cost(&self) -> f64 {
        self.cost.total_cost
    }

    fn tie_key(&self) -> Self::Key {
        (
            self.structure_mapping.lattice_mapping.tie_key(),
            self.structure_mapping.atom_mapping.tie_key(),
        )
    }
}

/// 结构映射结果集合
pub type StructureMappingResults = MappingResults<ScoredStructureMapping>;

/// 持有 prim 的映射
pub trait HasPrim {
    fn prim(&self) -> &Arc<Prim>;
}

impl HasPrim for StructureMapping {
    fn prim(&self) -> &Arc<Prim> {
        &self.prim
    }
}

impl HasPrim for ScoredStructureMapping {
    fn prim(&self) -> &Arc<Prim> {
        &self.structure_mapping.prim
    }
}

/// 两个映射是否引用同一个 prim（同一 Arc，或在容差内相等）
pub fn has_same_prim<A: HasPrim + ?Sized, B: HasPrim + ?Sized>(a: &A, b: &B) -> bool {
    Arc::ptr_eq(a.prim(), b.prim()) || a.prim().approx_eq(b.prim())
}
