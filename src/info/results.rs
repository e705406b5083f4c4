//! # 带代价的映射与结果集合
//!
//! 三类映射共用一个 `Scored` trait 和一个泛型容器 `MappingResults<S>`：
//! - 排序：代价用 `f64::total_cmp` 升序，代价完全相同时按 `tie_key` 决定
//! - 截断：保留前 k 个，并保留与第 k 个代价相差不超过 `cost_tol` 的并列项
//!
//! ## 依赖关系
//! - 被 `info/lattice_mapping.rs`、`info/atom_mapping.rs`、
//!   `info/structure_mapping.rs`、`methods/` 使用

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

/// 带代价的映射
pub trait Scored {
    /// 代价相同时的确定性次序键
    type Key: Ord;

    fn cost(&self) -> f64;

    fn tie_key(&self) -> Self::Key;
}

/// 统一比较器
pub fn compare_scored<S: Scored>(a: &S, b: &S) -> Ordering {
    a.cost()
        .total_cmp(&b.cost())
        .then_with(|| a.tie_key().cmp(&b.tie_key()))
}

/// 按统一比较器排序
pub fn sort_scored<S: Scored>(items: &mut [S]) {
    items.sort_by(compare_scored);
}

/// 仅保留代价在 `[min_cost, max_cost]` 内的项
pub fn retain_cost_range<S: Scored>(items: &mut Vec<S>, min_cost: f64, max_cost: f64) {
    items.retain(|s| s.cost() >= min_cost && s.cost() <= max_cost);
}

/// 保留前 k 项及与第 k 项代价并列（差值不超过 cost_tol）的项；要求已排序
pub fn truncate_k_best<S: Scored>(items: &mut Vec<S>, k_best: usize, cost_tol: f64) {
    if k_best == 0 {
        items.clear();
        return;
    }
    if items.len() <= k_best {
        return;
    }
    let threshold = items[k_best - 1].cost() + cost_tol;
    let keep = k_best
        + items[k_best..]
            .iter()
            .take_while(|s| s.cost() <= threshold)
            .count();
    items.truncate(keep);
}

/// 已排序、已去重的映射结果集合
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingResults<S> {
    data: Vec<S>,
}

// 反序列化后重新排序，外部 JSON 不必有序
impl<'de, S: Scored + Deserialize<'de>> Deserialize<'de> for MappingResults<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw<T> {
            data: Vec<T>,
        }
        let raw = Raw::<S>::deserialize(deserializer)?;
        Ok(MappingResults::from_unsorted(raw.data))
    }
}

impl<S> Default for MappingResults<S> {
    fn default() -> Self {
        MappingResults { data: Vec::new() }
    }
}

impl<S: Scored> MappingResults<S> {
    /// 由任意顺序的项创建（排序后保存）
    pub fn from_unsorted(mut data: Vec<S>) -> Self {
        sort_scored(&mut data);
        MappingResults { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.data.get(index)
    }

    /// 代价最低的项
    pub fn best(&self) -> Option<&S> {
        self.data.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    pub fn costs(&self) -> Vec<f64> {
        self.data.iter().map(Scored::cost).collect()
    }

    /// 是否按统一比较器有序
    pub fn is_sorted(&self) -> bool {
        self.data
            .windows(2)
            .all(|w| compare_scored(&w[0], &w[1]) != Ordering::Greater)
    }
}

impl<S> IntoIterator for MappingResults<S> {
    type Item = S;
    type IntoIter = std::vec::IntoIter<S>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, S> IntoIterator for &'a MappingResults<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
