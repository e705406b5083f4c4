//! # 搜索预算
//!
//! 限制一次搜索的评估次数与耗时。所有并行任务共享同一个计数器，
//! 超出预算时整个调用以 `BudgetExhausted` 失败，不返回部分结果。
//!
//! ## 依赖关系
//! - 被 `methods/` 的各搜索使用

use crate::error::{MappingError, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 搜索预算配置（默认不限）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// 最大评估次数（晶格候选数 + 指派求解次数）
    pub max_evaluations: Option<u64>,
    /// 最长耗时
    pub timeout: Option<Duration>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        SearchBudget::default()
    }

    pub fn with_max_evaluations(mut self, max_evaluations: u64) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 开始计量
    pub fn start(&self) -> BudgetTracker {
        BudgetTracker {
            max_evaluations: self.max_evaluations,
            timeout: self.timeout,
            deadline: self.timeout.map(|t| Instant::now() + t),
            evaluations: AtomicU64::new(0),
        }
    }
}

/// 一次搜索调用中的预算计量器
#[derive(Debug)]
pub struct BudgetTracker {
    max_evaluations: Option<u64>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    evaluations: AtomicU64,
}

impl BudgetTracker {
    /// 在开始工作前检查预计评估数是否超出预算
    pub fn check_upfront(&self, planned: u64, what: &str) -> Result<()> {
        if let Some(max) = self.max_evaluations {
            let used = self.evaluations.load(Ordering::Relaxed);
            if used.saturating_add(planned) > max {
                return Err(MappingError::BudgetExhausted(format!(
                    "{} requires {} evaluations, {} of {} remain",
                    what,
                    planned,
                    max.saturating_sub(used),
                    max
                )));
            }
        }
        self.check_deadline()
    }

    /// 记录 n 次评估
    pub fn charge(&self, n: u64) -> Result<()> {
        let total = self.evaluations.fetch_add(n, Ordering::Relaxed) + n;
        if let Some(max) = self.max_evaluations {
            if total > max {
                return Err(MappingError::BudgetExhausted(format!(
                    "more than {} evaluations",
                    max
                )));
            }
        }
        self.check_deadline()
    }

    /// 检查是否超时
    pub fn check_deadline(&self) -> Result<()> {
        match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() > deadline => {
                Err(MappingError::BudgetExhausted(format!(
                    "timeout of {:.3} s exceeded",
                    timeout.as_secs_f64()
                )))
            }
            _ => Ok(()),
        }
    }

    /// 已记录的评估次数
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}
