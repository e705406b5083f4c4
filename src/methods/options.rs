//! # 搜索选项
//!
//! 三种搜索的参数，均提供 `Default` 与 `with_*` 构建方法，
//! 并可序列化以便在输出中记录一次运行的设置。
//!
//! ## 依赖关系
//! - 被 `methods/`、`commands/` 使用
//! - 使用 `methods/budget.rs` 的 SearchBudget

use crate::error::{MappingError, Result};
use crate::geometry::{integer, SymOp};
use crate::info::cost::{LatticeCostMethod, DEFAULT_LATTICE_COST_WEIGHT};
use crate::info::json::opt_mat3_i64;
use crate::methods::budget::SearchBudget;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// 默认代价上限
pub const DEFAULT_MAX_COST: f64 = 1e20;

/// 默认代价容差
pub const DEFAULT_COST_TOL: f64 = 1e-5;

/// 指派问题中不允许配对的代价
pub const DEFAULT_INFINITY: f64 = 1e20;

/// 结构映射中晶格代价的默认上限
pub const DEFAULT_MAX_LATTICE_COST: f64 = 0.3;

/// 结构映射中每个体积保留的晶格映射数
pub const DEFAULT_LATTICE_K_BEST: usize = 10;

fn check_common(k_best: usize, min_cost: f64, max_cost: f64, cost_tol: f64) -> Result<()> {
    if k_best == 0 {
        return Err(MappingError::InvalidInput(
            "k_best must be at least 1".to_string(),
        ));
    }
    if min_cost.is_nan() || max_cost.is_nan() || min_cost > max_cost {
        return Err(MappingError::InvalidInput(format!(
            "invalid cost range [{}, {}]",
            min_cost, max_cost
        )));
    }
    if !(cost_tol >= 0.0) {
        return Err(MappingError::InvalidInput(format!(
            "cost_tol must be non-negative, got {}",
            cost_tol
        )));
    }
    Ok(())
}

fn check_volume_range(min_volume: Option<i64>, max_volume: Option<i64>) -> Result<()> {
    if let Some(v) = min_volume.filter(|&v| v < 1) {
        return Err(MappingError::InvalidInput(format!(
            "min_volume must be at least 1, got {}",
            v
        )));
    }
    if let (Some(lo), Some(hi)) = (min_volume, max_volume) {
        if lo > hi {
            return Err(MappingError::InvalidInput(format!(
                "min_volume {} is greater than max_volume {}",
                lo, hi
            )));
        }
    }
    Ok(())
}

/// 重取向枚举范围：至少为 1，且候选矩阵个数不溢出
fn check_reorientation_range(range: i64) -> Result<()> {
    if range < 1 {
        return Err(MappingError::InvalidInput(format!(
            "reorientation_range must be at least 1, got {}",
            range
        )));
    }
    if integer::unimodular_candidate_count(range).is_none() {
        return Err(MappingError::InvalidInput(format!(
            "reorientation_range {} is too large to enumerate",
            range
        )));
    }
    Ok(())
}

/// 晶格映射搜索选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeMappingSearchOptions {
    /// 最小超胞体积（原胞数）；缺省由体积比推算
    pub min_volume: Option<i64>,
    /// 最大超胞体积；缺省由体积比推算
    pub max_volume: Option<i64>,
    /// 固定的超胞变换矩阵，设置后忽略体积范围
    #[serde(with = "opt_mat3_i64")]
    pub transformation_matrix_to_super: Option<Matrix3<i64>>,
    /// 重取向矩阵元素范围 [-r, r]
    pub reorientation_range: i64,
    pub k_best: usize,
    pub min_cost: f64,
    pub max_cost: f64,
    pub cost_tol: f64,
    pub cost_method: LatticeCostMethod,
    /// 替代父晶格点群（用于去重与对称破缺代价）
    #[serde(skip)]
    pub parent_point_group: Option<Vec<SymOp>>,
    pub budget: SearchBudget,
}

impl Default for LatticeMappingSearchOptions {
    fn default() -> Self {
        LatticeMappingSearchOptions {
            min_volume: None,
            max_volume: None,
            transformation_matrix_to_super: None,
            reorientation_range: 1,
            k_best: 1,
            min_cost: 0.0,
            max_cost: DEFAULT_MAX_COST,
            cost_tol: DEFAULT_COST_TOL,
            cost_method: LatticeCostMethod::default(),
            parent_point_group: None,
            budget: SearchBudget::default(),
        }
    }
}

impl LatticeMappingSearchOptions {
    pub fn with_volume_range(mut self, min_volume: i64, max_volume: i64) -> Self {
        self.min_volume = Some(min_volume);
        self.max_volume = Some(max_volume);
        self
    }

    pub fn with_transformation_matrix_to_super(mut self, t: Matrix3<i64>) -> Self {
        self.transformation_matrix_to_super = Some(t);
        self
    }

    pub fn with_reorientation_range(mut self, range: i64) -> Self {
        self.reorientation_range = range;
        self
    }

    pub fn with_k_best(mut self, k_best: usize) -> Self {
        self.k_best = k_best;
        self
    }

    pub fn with_cost_range(mut self, min_cost: f64, max_cost: f64) -> Self {
        self.min_cost = min_cost;
        self.max_cost = max_cost;
        self
    }

    pub fn with_cost_tol(mut self, cost_tol: f64) -> Self {
        self.cost_tol = cost_tol;
        self
    }

    pub fn with_cost_method(mut self, method: LatticeCostMethod) -> Self {
        self.cost_method = method;
        self
    }

    pub fn with_parent_point_group(mut self, point_group: Vec<SymOp>) -> Self {
        self.parent_point_group = Some(point_group);
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// 检查参数
    pub fn validate(&self) -> Result<()> {
        check_common(self.k_best, self.min_cost, self.max_cost, self.cost_tol)?;
        check_volume_range(self.min_volume, self.max_volume)?;
        check_reorientation_range(self.reorientation_range)
    }
}

/// 原子映射搜索选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomMappingSearchOptions {
    pub k_best: usize,
    pub min_cost: f64,
    pub max_cost: f64,
    pub cost_tol: f64,
    /// 不允许配对的代价
    pub infinity: f64,
    pub budget: SearchBudget,
}

impl Default for AtomMappingSearchOptions {
    fn default() -> Self {
        AtomMappingSearchOptions {
            k_best: 1,
            min_cost: 0.0,
            max_cost: DEFAULT_MAX_COST,
            cost_tol: DEFAULT_COST_TOL,
            infinity: DEFAULT_INFINITY,
            budget: SearchBudget::default(),
        }
    }
}

impl AtomMappingSearchOptions {
    pub fn with_k_best(mut self, k_best: usize) -> Self {
        self.k_best = k_best;
        self
    }

    pub fn with_cost_range(mut self, min_cost: f64, max_cost: f64) -> Self {
        self.min_cost = min_cost;
        self.max_cost = max_cost;
        self
    }

    pub fn with_cost_tol(mut self, cost_tol: f64) -> Self {
        self.cost_tol = cost_tol;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_common(self.k_best, self.min_cost, self.max_cost, self.cost_tol)?;
        if !(self.infinity > 0.0) {
            return Err(MappingError::InvalidInput(format!(
                "infinity must be positive, got {}",
                self.infinity
            )));
        }
        Ok(())
    }
}

/// 结构映射搜索选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureMappingSearchOptions {
    /// 最小超胞体积；缺省为 ceil(子结构原子数 / prim 位点数)
    pub min_volume: Option<i64>,
    /// 最大超胞体积；缺省同 min_volume 与体积比推算值中的较大者
    pub max_volume: Option<i64>,
    pub reorientation_range: i64,
    pub lattice_cost_method: LatticeCostMethod,
    /// 晶格映射代价上限
    pub max_lattice_cost: f64,
    /// 每次晶格搜索保留的晶格映射数
    pub lattice_k_best: usize,
    pub k_best: usize,
    pub min_total_cost: f64,
    pub max_total_cost: f64,
    /// 总代价中晶格代价的权重
    pub lattice_cost_weight: f64,
    pub cost_tol: f64,
    pub infinity: f64,
    pub budget: SearchBudget,
}

impl Default for StructureMappingSearchOptions {
    fn default() -> Self {
        StructureMappingSearchOptions {
            min_volume: None,
            max_volume: None,
            reorientation_range: 1,
            lattice_cost_method: LatticeCostMethod::default(),
            max_lattice_cost: DEFAULT_MAX_LATTICE_COST,
            lattice_k_best: DEFAULT_LATTICE_K_BEST,
            k_best: 1,
            min_total_cost: 0.0,
            max_total_cost: DEFAULT_MAX_COST,
            lattice_cost_weight: DEFAULT_LATTICE_COST_WEIGHT,
            cost_tol: DEFAULT_COST_TOL,
            infinity: DEFAULT_INFINITY,
            budget: SearchBudget::default(),
        }
    }
}

impl StructureMappingSearchOptions {
    pub fn with_volume_range(mut self, min_volume: i64, max_volume: i64) -> Self {
        self.min_volume = Some(min_volume);
        self.max_volume = Some(max_volume);
        self
    }

    pub fn with_k_best(mut self, k_best: usize) -> Self {
        self.k_best = k_best;
        self
    }

    pub fn with_lattice_k_best(mut self, lattice_k_best: usize) -> Self {
        self.lattice_k_best = lattice_k_best;
        self
    }

    pub fn with_max_lattice_cost(mut self, max_lattice_cost: f64) -> Self {
        self.max_lattice_cost = max_lattice_cost;
        self
    }

    pub fn with_total_cost_range(mut self, min_total_cost: f64, max_total_cost: f64) -> Self {
        self.min_total_cost = min_total_cost;
        self.max_total_cost = max_total_cost;
        self
    }

    pub fn with_lattice_cost_weight(mut self, weight: f64) -> Self {
        self.lattice_cost_weight = weight;
        self
    }

    pub fn with_lattice_cost_method(mut self, method: LatticeCostMethod) -> Self {
        self.lattice_cost_method = method;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_common(
            self.k_best,
            self.min_total_cost,
            self.max_total_cost,
            self.cost_tol,
        )?;
        check_volume_range(self.min_volume, self.max_volume)?;
        if self.lattice_k_best == 0 {
            return Err(MappingError::InvalidInput(
                "lattice_k_best must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.lattice_cost_weight) {
            return Err(MappingError::InvalidInput(format!(
                "lattice_cost_weight must be within [0, 1], got {}",
                self.lattice_cost_weight
            )));
        }
        if self.max_lattice_cost.is_nan() {
            return Err(MappingError::InvalidInput(
                "max_lattice_cost is NaN".to_string(),
            ));
        }
        check_reorientation_range(self.reorientation_range)
    }

    /// 一次晶格搜索所用的选项
    pub(crate) fn lattice_options(&self, min_volume: i64, max_volume: i64) -> LatticeMappingSearchOptions {
        LatticeMappingSearchOptions {
            min_volume: Some(min_volume),
            max_volume: Some(max_volume),
            transformation_matrix_to_super: None,
            reorientation_range: self.reorientation_range,
            k_best: self.lattice_k_best,
            min_cost: 0.0,
            max_cost: self.max_lattice_cost,
            cost_tol: self.cost_tol,
            cost_method: self.lattice_cost_method,
            parent_point_group: None,
            budget: self.budget,
        }
    }

    /// 对给定晶格映射做原子搜索所用的选项
    pub(crate) fn atom_options(&self) -> AtomMappingSearchOptions {
        AtomMappingSearchOptions {
            k_best: self.k_best,
            min_cost: 0.0,
            max_cost: DEFAULT_MAX_COST,
            cost_tol: self.cost_tol,
            infinity: self.infinity,
            budget: self.budget,
        }
    }
}
