//! # 工具函数模块
//!
//! 提供美化输出、日志接入与进度条。
//!
//! ## 依赖关系
//! - 被 `main.rs`、`commands/`、`batch/` 使用
//! - 子模块: output, progress

pub mod output;
pub mod progress;
