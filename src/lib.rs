//! Proximity Telemetry - 人畜距离监测
//!
//! 滚动遥测聚合内核：位置与告警历史、移动统计、距离计算和导出

pub mod config;
pub mod error;
pub mod geo;
pub mod monitor;
pub mod telemetry;

pub use anyhow::Result;
pub use error::{TelemetryError, TelemetryResult};
pub use telemetry::TelemetryAggregator;
