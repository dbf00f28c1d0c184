//! 监测模块
//!
//! 距离分类、信号模型、更新接入和位置模拟，围绕遥测聚合器工作

pub mod proximity;
pub mod signal;
pub mod simulator;
pub mod update;

pub use proximity::{DistanceSummary, ProximityThresholds};
pub use signal::{PathLossModel, SignalQuality};
pub use simulator::{PositionSimulator, Scenario};
pub use update::{apply_update, replay_updates, ReplaySummary, UpdateEvent};
