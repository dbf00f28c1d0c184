//! 遥测模块
//!
//! 位置与告警的滚动历史、统计量和导出

pub mod aggregator;
pub mod export;
pub mod records;
pub mod rolling_log;

pub use aggregator::{AggregatorSettings, MovementStatistics, TelemetryAggregator};
pub use export::{ExportDocument, SystemInfo};
pub use records::{
    AlertKind, AlertRecord, EntityId, EntityStatus, PositionRecord, Timestamp, TrackedEntity,
};
pub use rolling_log::RollingLog;
