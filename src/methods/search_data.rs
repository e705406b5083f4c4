//! # 原子映射搜索数据
//!
//! - `PrimSearchData`: 与晶格映射无关的 prim 数据（位点、允许占位、内部平移）
//! - `SupercellSearchData`: 给定晶格映射后的理想超胞位点
//! - 试探平移、最短位移与指派代价矩阵
//!
//! 超胞位点按子晶格优先编号：`index = b * n_cells + cell`，
//! cell 为超胞内原胞平移按字典序排列后的序号。
//!
//! ## 依赖关系
//! - 被 `methods/atom_search.rs`、`methods/construct.rs` 使用
//! - 使用 `geometry/` 的 PeriodicCell、SupercellTranslations、因子群

use std::sync::Arc;

use crate::error::{MappingError, Result};
use crate::geometry::integer;
use crate::geometry::superlattice::SupercellTranslations;
use crate::geometry::{factor_group, internal_translations, PeriodicCell};
use crate::info::lattice_mapping::LatticeMapping;
use crate::models::{Prim, Structure};

use nalgebra::{DMatrix, Vector3};

/// prim 相关的搜索数据，可在多次原子搜索间共享
#[derive(Debug, Clone)]
pub struct PrimSearchData {
    pub prim: Arc<Prim>,
    pub site_coordinate_cart: Vec<Vector3<f64>>,
    pub internal_translations: Vec<Vector3<f64>>,
    prim_cell: PeriodicCell,
}

impl PrimSearchData {
    pub fn new(prim: Arc<Prim>) -> Result<Self> {
        prim.validate()?;
        let group = factor_group(&prim)?;
        let prim_cell =
            PeriodicCell::new(&prim.lattice.column_vector_matrix()).ok_or(
                MappingError::DegenerateLattice {
                    volume: prim.lattice.volume(),
                },
            )?;
        Ok(PrimSearchData {
            site_coordinate_cart: prim.site_coordinate_cart(),
            internal_translations: internal_translations(&group),
            prim_cell,
            prim,
        })
    }

    fn tol(&self) -> f64 {
        self.prim.lattice.tol
    }

    /// 允许某占位的 prim 位点
    fn allowed_sites(&self, occupant: &str) -> Vec<usize> {
        (0..self.prim.n_sites())
            .filter(|&b| self.prim.basis[b].allows(occupant))
            .collect()
    }

    /// 平移 t 是否与已有平移等价（相差内部平移与 prim 晶格平移）
    fn is_new_translation(&self, t: &Vector3<f64>, existing: &[Vector3<f64>]) -> bool {
        !self.internal_translations.iter().any(|internal| {
            existing
                .iter()
                .any(|u| self.prim_cell.is_lattice_translation(&(t + internal - u), self.tol()))
        })
    }

    /// 试探平移：取允许位点最少的原子，把它平移到每个允许位点上
    ///
    /// 有原子不被任何位点允许时返回空列表。
    pub fn trial_translations(
        &self,
        atom_coordinate_cart: &[Vector3<f64>],
        atom_types: &[String],
    ) -> Vec<Vector3<f64>> {
        let mut best: Option<(usize, Vec<usize>)> = None;
        for (atom, occupant) in atom_types.iter().enumerate() {
            let allowed = self.allowed_sites(occupant);
            if allowed.is_empty() {
                return Vec::new();
            }
            if best.as_ref().map_or(true, |(_, b)| allowed.len() < b.len()) {
                best = Some((atom, allowed));
            }
        }

        let mut translations: Vec<Vector3<f64>> = Vec::new();
        let Some((atom, allowed)) = best else {
            // 子结构全为空位时只需零平移
            translations.push(Vector3::zeros());
            return translations;
        };
        for b in allowed {
            let t = self.site_coordinate_cart[b] - atom_coordinate_cart[atom];
            if self.is_new_translation(&t, &translations) {
                translations.push(t);
            }
        }
        translations
    }
}

/// 给定晶格映射的理想超胞数据
#[derive(Debug, Clone)]
pub struct SupercellSearchData {
    /// 超胞位点笛卡尔坐标（理想超晶格中）
    pub site_coordinate_cart: Vec<Vector3<f64>>,
    /// 每个超胞位点对应的 prim 位点
    pub prim_site_index: Vec<usize>,
    /// 理想超晶格的周期性
    pub cell: PeriodicCell,
}

impl SupercellSearchData {
    pub fn new(prim_data: &PrimSearchData, lattice_mapping: &LatticeMapping) -> Result<Self> {
        let prim = &prim_data.prim;
        let m = lattice_mapping.superlattice_matrix();
        let translations = SupercellTranslations::new(m).ok_or_else(|| {
            MappingError::InvalidInput("superlattice matrix T * N is singular".to_string())
        })?;
        let l1 = prim.lattice.column_vector_matrix();
        let cell = PeriodicCell::new(&(l1 * integer::to_f64(&m))).ok_or(
            MappingError::DegenerateLattice {
                volume: prim.lattice.volume() * integer::det(&m) as f64,
            },
        )?;

        let n_sites = prim.n_sites() * translations.n_cells();
        let mut site_coordinate_cart = Vec::with_capacity(n_sites);
        let mut prim_site_index = Vec::with_capacity(n_sites);
        for (b, site) in prim.basis.iter().enumerate() {
            for u in translations.cells() {
                let frac = site.frac() + u.map(|x| x as f64);
                site_coordinate_cart.push(l1 * frac);
                prim_site_index.push(b);
            }
        }

        Ok(SupercellSearchData {
            site_coordinate_cart,
            prim_site_index,
            cell,
        })
    }

    pub fn n_sites(&self) -> usize {
        self.site_coordinate_cart.len()
    }

    /// 位移矩阵 `d[site][atom]`：`site + d = atom + translation`（最短周期像）
    pub fn displacements(
        &self,
        atom_coordinate_cart: &[Vector3<f64>],
        translation: &Vector3<f64>,
    ) -> Vec<Vec<Vector3<f64>>> {
        self.site_coordinate_cart
            .iter()
            .map(|site| {
                atom_coordinate_cart
                    .iter()
                    .map(|atom| self.cell.min_displacement(site, &(atom + translation)))
                    .collect()
            })
            .collect()
    }

    /// 指派代价矩阵（行为位点，列为原子，不足的列以空位补齐）
    pub fn cost_matrix(
        &self,
        prim: &Prim,
        displacements: &[Vec<Vector3<f64>>],
        atom_types: &[String],
        infinity: f64,
    ) -> DMatrix<f64> {
        let n = self.n_sites();
        let n_atoms = atom_types.len();
        DMatrix::from_fn(n, n, |i, j| {
            let site = &prim.basis[self.prim_site_index[i]];
            if j < n_atoms {
                if site.allows(&atom_types[j]) {
                    displacements[i][j].norm_squared()
                } else {
                    infinity
                }
            } else if site.allows_vacancy() {
                0.0
            } else {
                infinity
            }
        })
    }
}

/// 子结构原子坐标变换到理想超晶格：`F⁻¹ r`
pub fn atoms_in_ideal_frame(
    child: &Structure,
    lattice_mapping: &LatticeMapping,
) -> Result<Vec<Vector3<f64>>> {
    let f_inv = lattice_mapping
        .deformation_gradient
        .try_inverse()
        .ok_or_else(|| {
            MappingError::InvalidInput("deformation gradient is singular".to_string())
        })?;
    Ok(child
        .atom_coordinate_cart()
        .iter()
        .map(|r| f_inv * r)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lattice, PrimSite};
    use nalgebra::Matrix3;

    fn bcc_conventional() -> Arc<Prim> {
        Arc::new(Prim::new(
            "bcc",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![
                PrimSite::new([0.0, 0.0, 0.0], vec!["Fe".into()]),
                PrimSite::new([0.5, 0.5, 0.5], vec!["Fe".into(), "Va".into()]),
            ],
        ))
    }

    #[test]
    fn test_supercell_site_order() {
        let data = PrimSearchData::new(bcc_conventional()).unwrap();
        let t = Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1);
        let lm = LatticeMapping::new(Matrix3::identity(), t, Matrix3::identity()).unwrap();
        let supercell = SupercellSearchData::new(&data, &lm).unwrap();

        assert_eq!(supercell.n_sites(), 4);
        assert_eq!(supercell.prim_site_index, vec![0, 0, 1, 1]);
        assert!((supercell.site_coordinate_cart[1] - Vector3::new(3.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((supercell.site_coordinate_cart[2] - Vector3::new(1.5, 1.5, 1.5)).norm() < 1e-12);
    }

    #[test]
    fn test_trial_translations_deduplicated_by_internal_translation() {
        // 两个位点允许占位不同，无内部平移：Fe 原子两个位点都可去
        let data = PrimSearchData::new(bcc_conventional()).unwrap();
        assert_eq!(data.internal_translations.len(), 1);
        let atoms = vec![Vector3::new(0.1, 0.0, 0.0)];
        let types = vec!["Fe".to_string()];
        assert_eq!(data.trial_translations(&atoms, &types).len(), 2);

        // 占位相同的体心立方：两个平移因内部平移等价
        let prim = Arc::new(Prim::new(
            "bcc",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![
                PrimSite::new([0.0, 0.0, 0.0], vec!["Fe".into()]),
                PrimSite::new([0.5, 0.5, 0.5], vec!["Fe".into()]),
            ],
        ));
        let data = PrimSearchData::new(prim).unwrap();
        assert_eq!(data.trial_translations(&atoms, &types).len(), 1);
    }

    #[test]
    fn test_trial_translations_unknown_species() {
        let data = PrimSearchData::new(bcc_conventional()).unwrap();
        let atoms = vec![Vector3::zeros()];
        assert!(data
            .trial_translations(&atoms, &["Cu".to_string()])
            .is_empty());
    }

    #[test]
    fn test_cost_matrix_vacancy_padding() {
        let data = PrimSearchData::new(bcc_conventional()).unwrap();
        let lm = LatticeMapping::identity();
        let supercell = SupercellSearchData::new(&data, &lm).unwrap();
        let atoms = vec![Vector3::new(0.1, 0.0, 0.0)];
        let types = vec!["Fe".to_string()];
        let d = supercell.displacements(&atoms, &Vector3::zeros());
        let cost = supercell.cost_matrix(&data.prim, &d, &types, 1e20);

        assert!((cost[(0, 0)] - 0.01).abs() < 1e-12);
        // 第 0 个位点不允许空位，第 1 个允许
        assert_eq!(cost[(0, 1)], 1e20);
        assert_eq!(cost[(1, 1)], 0.0);
    }
}
