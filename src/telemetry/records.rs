//! 遥测记录类型
//!
//! 位置记录和告警记录一旦写入滚动日志就不再修改

use crate::geo::GeoPoint;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// 调用方提供的原始时间戳
///
/// 保留原始形式，只在时间窗口查询时才解析；解析失败返回 `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Timestamp {
    /// Unix 毫秒
    Millis(i64),
    /// RFC 3339 或不带时区的 ISO-8601（按本机时区处理）
    Text(String),
    #[default]
    Unknown,
}

impl Timestamp {
    /// 解析为 UTC 时刻
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Text(raw) => parse_text(raw),
            Timestamp::Unknown => None,
        }
    }
}

fn parse_text(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        // 夏令时回拨造成的重复时刻取较早者，跳过的时刻视为无法解析
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Text(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Timestamp::Millis(ms)
    }
}

impl From<&str> for Timestamp {
    fn from(raw: &str) -> Self {
        Timestamp::Text(raw.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(raw: String) -> Self {
        Timestamp::Text(raw)
    }
}

impl<T: Into<Timestamp>> From<Option<T>> for Timestamp {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// 被追踪实体的标识（数字或字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Number(n.into())
    }
}

impl From<u32> for EntityId {
    fn from(n: u32) -> Self {
        EntityId::Number(n.into())
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

/// 实体状态
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityStatus {
    Safe,
    Alert,
    #[default]
    Unknown,
    /// 上游发来的其他状态，原样保留
    Other(String),
}

impl EntityStatus {
    pub fn is_alert(&self) -> bool {
        matches!(self, EntityStatus::Alert)
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityStatus::Safe => "safe",
            EntityStatus::Alert => "alert",
            EntityStatus::Unknown => "unknown",
            EntityStatus::Other(s) => s,
        }
    }
}

impl From<String> for EntityStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "safe" => EntityStatus::Safe,
            "alert" => EntityStatus::Alert,
            "unknown" | "" => EntityStatus::Unknown,
            _ => EntityStatus::Other(s),
        }
    }
}

impl From<EntityStatus> for String {
    fn from(status: EntityStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个被追踪实体的一次定位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub status: EntityStatus,
    /// 与人的距离（米），上游可能不提供
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// 信号强度等附加字段
    #[serde(flatten)]
    pub metadata: Map<String, JsonValue>,
}

impl TrackedEntity {
    pub fn new(id: impl Into<EntityId>, position: GeoPoint) -> Self {
        Self {
            id: id.into(),
            lat: position.lat,
            lon: position.lon,
            status: EntityStatus::Unknown,
            distance: None,
            metadata: Map::new(),
        }
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// 一次更新的位置快照
///
/// 写入聚合器时所有权随之转移，调用方无法在写入后再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub timestamp: Timestamp,
    pub human: GeoPoint,
    pub entities: Vec<TrackedEntity>,
}

/// 告警类型，目前只有距离告警
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DistanceAlert,
}

/// 一次距离告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub entity_id: EntityId,
    /// 不做校验：NaN、负数、缺失都原样保存
    pub distance: Option<f64>,
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: AlertKind,
}
