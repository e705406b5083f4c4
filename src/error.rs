//! # 统一错误处理模块
//!
//! 定义 xtalmap 的所有错误类型，使用 `thiserror` 派生。
//!
//! 映射相关错误分为三类：
//! - 输入无效（退化晶格、非法参数）：在入口处立即报告
//! - 映射不一致（映射与结构不匹配）：在 `map_atoms` 和构造方法中报告
//! - 搜索无解：不是错误，返回空结果集
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// xtalmap 统一错误类型
#[derive(Error, Debug)]
pub enum MappingError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 映射错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Degenerate lattice: volume {volume:.3e} is below tolerance")]
    DegenerateLattice { volume: f64 },

    #[error("Inconsistent mapping: {0}")]
    InconsistentMapping(String),

    #[error("Search budget exhausted: {0}")]
    BudgetExhausted(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl MappingError {
    /// 是否属于"无法尝试映射"类错误（输入无效或映射不一致）
    pub fn is_mapping_failure(&self) -> bool {
        matches!(
            self,
            MappingError::InvalidInput(_)
                | MappingError::DegenerateLattice { .. }
                | MappingError::InconsistentMapping(_)
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, MappingError>;
