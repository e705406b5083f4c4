//! # 晶体结构数据模型
//!
//! 定义晶格与结构的统一表示，作为映射搜索的输入。
//!
//! 约定：
//! - `Lattice::matrix` 按行存储 a, b, c 三个晶格向量
//! - 计算时统一使用列向量矩阵 `L = [a | b | c]`，即 `cart = L * frac`
//!
//! ## 依赖关系
//! - 被 `parsers/`、`geometry/`、`methods/` 使用
//! - 使用 `nalgebra` 进行矩阵运算

use crate::error::{MappingError, Result};

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// 默认晶格容差（Å）
pub const DEFAULT_LATTICE_TOL: f64 = 1e-5;

/// 体积低于该值视为退化晶格（Å³）
pub const DEGENERATE_VOLUME_TOL: f64 = 1e-8;

fn default_tol() -> f64 {
    DEFAULT_LATTICE_TOL
}

/// 判断占位名称是否表示空位
pub fn is_vacancy(name: &str) -> bool {
    matches!(name, "Va" | "VA" | "va")
}

/// 晶格参数表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],

    /// 比较坐标与晶格时使用的容差
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let cos_gamma = gamma.to_radians().cos();
        let sin_gamma = gamma.to_radians().sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

        Lattice::from_vectors([a_vec, b_vec, [c1, c2, c3]])
    }

    /// 从晶格向量矩阵创建（行向量 a, b, c）
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice {
            matrix,
            tol: DEFAULT_LATTICE_TOL,
        }
    }

    /// 从列向量矩阵 `[a | b | c]` 创建
    pub fn from_column_matrix(l: &Matrix3<f64>) -> Self {
        let mut matrix = [[0.0; 3]; 3];
        for (j, row) in matrix.iter_mut().enumerate() {
            for (i, x) in row.iter_mut().enumerate() {
                *x = l[(i, j)];
            }
        }
        Lattice::from_vectors(matrix)
    }

    /// 设置容差
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// 列向量矩阵 `L = [a | b | c]`
    pub fn column_vector_matrix(&self) -> Matrix3<f64> {
        let m = &self.matrix;
        Matrix3::new(
            m[0][0], m[1][0], m[2][0], //
            m[0][1], m[1][1], m[2][1], //
            m[0][2], m[1][2], m[2][2],
        )
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let l = self.column_vector_matrix();
        let (a_vec, b_vec, c_vec) = (l.column(0), l.column(1), l.column(2));
        let (a, b, c) = (a_vec.norm(), b_vec.norm(), c_vec.norm());

        let alpha = (b_vec.dot(&c_vec) / (b * c)).acos().to_degrees();
        let beta = (a_vec.dot(&c_vec) / (a * c)).acos().to_degrees();
        let gamma = (a_vec.dot(&b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积（带符号，右手系为正）
    pub fn volume(&self) -> f64 {
        self.column_vector_matrix().determinant()
    }

    /// 度规张量 `G = Lᵀ L`
    pub fn metric(&self) -> Matrix3<f64> {
        let l = self.column_vector_matrix();
        l.transpose() * l
    }

    /// 检查晶格是否可用于映射
    pub fn validate(&self) -> Result<()> {
        if self.matrix.iter().flatten().any(|x| !x.is_finite()) {
            return Err(MappingError::InvalidInput(
                "lattice vectors contain non-finite values".to_string(),
            ));
        }
        if !(self.tol > 0.0) {
            return Err(MappingError::InvalidInput(format!(
                "lattice tolerance must be positive, got {}",
                self.tol
            )));
        }
        let volume = self.volume();
        if volume.abs() < DEGENERATE_VOLUME_TOL {
            return Err(MappingError::DegenerateLattice { volume });
        }
        Ok(())
    }

    /// 列向量矩阵的逆
    pub fn inverse(&self) -> Result<Matrix3<f64>> {
        self.column_vector_matrix()
            .try_inverse()
            .ok_or(MappingError::DegenerateLattice {
                volume: self.volume(),
            })
    }

    /// 分数坐标转笛卡尔坐标
    pub fn frac_to_cart(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.column_vector_matrix() * frac
    }

    /// 笛卡尔坐标转分数坐标（退化晶格时原样返回）
    pub fn cart_to_frac(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        match self.column_vector_matrix().try_inverse() {
            Some(inv) => inv * cart,
            None => *cart,
        }
    }

    /// 由整数变换矩阵生成超晶格 `L * T`
    pub fn make_superlattice(&self, t: &Matrix3<i64>) -> Lattice {
        let s = self.column_vector_matrix() * t.map(|x| x as f64);
        Lattice::from_column_matrix(&s).with_tol(self.tol)
    }

    /// 晶格向量逐一比较是否相同
    pub fn approx_eq(&self, other: &Lattice) -> bool {
        let tol = self.tol.max(other.tol);
        (self.column_vector_matrix() - other.column_vector_matrix()).amax() < tol
    }
}

/// 结构中的一个位点：分数坐标与占位原子
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// 占位原子（元素符号或 `Va`）
    pub occupant: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Site {
    pub fn new(occupant: impl Into<String>, position: [f64; 3]) -> Self {
        Site {
            occupant: occupant.into(),
            position,
        }
    }

    pub fn frac(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 位点列表（顺序有意义）
    pub sites: Vec<Site>,
}

impl Structure {
    pub fn new(name: impl Into<String>, lattice: Lattice, sites: Vec<Site>) -> Self {
        Structure {
            name: name.into(),
            lattice,
            sites,
        }
    }

    /// 计算化学式（空位不计入）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for site in self.sites.iter().filter(|s| !is_vacancy(&s.occupant)) {
            *counts.entry(site.occupant.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 各位点的笛卡尔坐标
    pub fn atom_coordinate_cart(&self) -> Vec<Vector3<f64>> {
        let l = self.lattice.column_vector_matrix();
        self.sites.iter().map(|s| l * s.frac()).collect()
    }

    /// 各位点的占位类型
    pub fn atom_types(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.occupant.clone()).collect()
    }

    /// 计算每位点体积
    pub fn volume_per_site(&self) -> Option<f64> {
        if self.sites.is_empty() {
            return None;
        }
        Some(self.lattice.volume().abs() / self.sites.len() as f64)
    }

    /// 检查结构是否可用于映射
    pub fn validate(&self) -> Result<()> {
        self.lattice.validate()?;
        if self.sites.is_empty() {
            return Err(MappingError::InvalidInput(format!(
                "structure '{}' has no sites",
                self.name
            )));
        }
        if let Some(site) = self
            .sites
            .iter()
            .find(|s| s.position.iter().any(|x| !x.is_finite()))
        {
            return Err(MappingError::InvalidInput(format!(
                "structure '{}' has a non-finite coordinate for '{}'",
                self.name, site.occupant
            )));
        }
        Ok(())
    }

    /// 晶格与位点（顺序、占位、坐标）均相同
    pub fn approx_eq(&self, other: &Structure) -> bool {
        if !self.lattice.approx_eq(&other.lattice) || self.sites.len() != other.sites.len() {
            return false;
        }
        let tol = self.lattice.tol.max(other.lattice.tol);
        let l = self.lattice.column_vector_matrix();
        self.sites.iter().zip(other.sites.iter()).all(|(a, b)| {
            a.occupant == b.occupant && (l * (a.frac() - b.frac())).norm() < tol
        })
    }
}
