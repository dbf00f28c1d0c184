//! 错误处理
//!
//! 聚合器本身不会失败；这里只覆盖导出、回放和配置这些外围操作

use thiserror::Error;

/// 遥测外围操作的错误类型
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// 文件读写错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 配置错误
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// 遥测结果类型
pub type TelemetryResult<T> = Result<T, TelemetryError>;
