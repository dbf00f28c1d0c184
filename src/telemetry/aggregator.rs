use super::export::{ExportDocument, SystemInfo};
use super::records::{AlertKind, AlertRecord, EntityId, PositionRecord, Timestamp, TrackedEntity};
use super::rolling_log::RollingLog;
use crate::geo::{haversine_distance_meters, GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认滚动日志容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
/// 默认"最近告警"窗口：一小时
pub const DEFAULT_RECENT_ALERT_WINDOW: Duration = Duration::from_millis(3_600_000);
/// 默认移动统计窗口
pub const DEFAULT_MOVEMENT_WINDOW: usize = 10;

/// 聚合器参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorSettings {
    /// 每个滚动日志的最大条数
    pub history_capacity: usize,
    /// `count_recent_alerts` 使用的时间窗口
    pub recent_alert_window: Duration,
    /// 移动统计取最近多少条位置
    pub movement_window: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            recent_alert_window: DEFAULT_RECENT_ALERT_WINDOW,
            movement_window: DEFAULT_MOVEMENT_WINDOW,
        }
    }
}

/// 人员移动统计
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStatistics {
    pub total_distance_meters: f64,
    /// 每次更新的平均移动距离
    pub average_speed_meters_per_update: f64,
    pub update_count: usize,
}

/// 滚动遥测聚合器
///
/// 维护两个互不关联的滚动日志（位置、告警），按需计算统计量。
/// 所有操作都不会失败，也没有内部锁，由持有者在单一线程中调用。
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    settings: AggregatorSettings,
    positions: RollingLog<PositionRecord>,
    alerts: RollingLog<AlertRecord>,
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        Self::new(AggregatorSettings::default())
    }
}

impl TelemetryAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            positions: RollingLog::new(settings.history_capacity),
            alerts: RollingLog::new(settings.history_capacity),
            settings,
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// 记录一次告警
    ///
    /// 不校验距离和时间戳，无法解析的时间戳只会让它不计入时间窗口统计。
    pub fn record_alert(
        &mut self,
        entity_id: impl Into<EntityId>,
        distance: Option<f64>,
        timestamp: impl Into<Timestamp>,
    ) {
        let alert = AlertRecord {
            entity_id: entity_id.into(),
            distance,
            timestamp: timestamp.into(),
            kind: AlertKind::DistanceAlert,
        };

        if let Some(evicted) = self.alerts.push(alert) {
            tracing::trace!("告警日志已满，淘汰实体 {} 的最早告警", evicted.entity_id);
        }

        tracing::debug!("最近告警数（窗口内）: {}", self.count_recent_alerts());
    }

    /// 记录一次位置快照
    pub fn record_position(
        &mut self,
        human: GeoPoint,
        entities: Vec<TrackedEntity>,
        timestamp: impl Into<Timestamp>,
    ) {
        let record = PositionRecord {
            timestamp: timestamp.into(),
            human,
            entities,
        };

        if self.positions.push(record).is_some() {
            tracing::trace!(
                "位置日志已满（容量 {}），淘汰最早记录",
                self.positions.capacity()
            );
        }
    }

    /// 使用默认窗口统计最近告警数
    pub fn count_recent_alerts(&self) -> usize {
        self.count_recent_alerts_within(self.settings.recent_alert_window)
    }

    /// 统计 `[now - window, now]` 内的告警数
    pub fn count_recent_alerts_within(&self, window: Duration) -> usize {
        self.count_recent_alerts_at(Utc::now(), window)
    }

    /// 以给定的 `now` 统计窗口内的告警数，时间戳无法解析的条目不计入
    pub fn count_recent_alerts_at(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let lower = chrono::Duration::from_std(window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window));

        self.alerts
            .iter()
            .filter_map(|alert| alert.timestamp.instant())
            .filter(|at| *at <= now && lower.map_or(true, |lower| *at >= lower))
            .count()
    }

    /// 根据最近的位置记录计算人员移动统计，不足两条时返回 `None`
    pub fn movement_statistics(&self) -> Option<MovementStatistics> {
        if self.positions.len() < 2 {
            return None;
        }

        let recent: Vec<GeoPoint> = self
            .positions
            .latest(self.settings.movement_window.max(2))
            .map(|record| record.human)
            .collect();

        let total_distance_meters: f64 = recent
            .windows(2)
            .map(|pair| haversine_distance_meters(pair[0], pair[1]))
            .sum();
        let update_count = recent.len();

        Some(MovementStatistics {
            total_distance_meters,
            average_speed_meters_per_update: total_distance_meters / (update_count - 1) as f64,
            update_count,
        })
    }

    pub fn positions(&self) -> &RollingLog<PositionRecord> {
        &self.positions
    }

    pub fn alerts(&self) -> &RollingLog<AlertRecord> {
        &self.alerts
    }

    /// 清空两个滚动日志，容量保持不变
    pub fn reset(&mut self) {
        tracing::info!(
            "重置遥测聚合器（位置 {} 条，告警 {} 条）",
            self.positions.len(),
            self.alerts.len()
        );
        self.positions.clear();
        self.alerts.clear();
    }

    /// 生成导出快照，不修改聚合器状态
    pub fn export(&self, system_info: SystemInfo) -> ExportDocument {
        ExportDocument {
            alert_history: self.alerts.to_vec(),
            position_history: self.positions.to_vec(),
            export_time: Utc::now(),
            system_info,
        }
    }
}
