//! 更新事件接入
//!
//! 把外部送来的位置更新转换为聚合器调用

use super::proximity::ProximityThresholds;
use crate::error::TelemetryResult;
use crate::geo::GeoPoint;
use crate::telemetry::{TelemetryAggregator, Timestamp, TrackedEntity};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// 一次位置更新（人员定位 + 所有标签定位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub human: GeoPoint,
    #[serde(default, alias = "cows")]
    pub entities: Vec<TrackedEntity>,
    #[serde(default, alias = "system_time")]
    pub timestamp: Timestamp,
}

/// 回放结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// 成功应用的更新数
    pub applied: usize,
    /// 无法解析而跳过的行数
    pub skipped: usize,
    pub alerts_recorded: usize,
}

/// 应用一次更新：记录位置，并为每个状态为 alert 的实体记录告警
///
/// 返回记录的告警数。
pub fn apply_update(aggregator: &mut TelemetryAggregator, event: UpdateEvent) -> usize {
    let UpdateEvent {
        human,
        entities,
        timestamp,
    } = event;

    let alerts: Vec<_> = entities
        .iter()
        .filter(|entity| entity.status.is_alert())
        .map(|entity| (entity.id.clone(), entity.distance))
        .collect();

    aggregator.record_position(human, entities, timestamp.clone());

    for (entity_id, distance) in &alerts {
        tracing::debug!("实体 {} 距离告警: {:?}m", entity_id, distance);
        aggregator.record_alert(entity_id.clone(), *distance, timestamp.clone());
    }

    alerts.len()
}

/// 逐行回放 JSON 更新
///
/// 空行忽略；无法解析的行计入 `skipped` 并记录警告，不会中断回放。
/// 提供 `classifier` 时先按阈值重新计算距离和状态。
pub async fn replay_updates<R>(
    reader: R,
    aggregator: &mut TelemetryAggregator,
    classifier: Option<&ProximityThresholds>,
) -> TelemetryResult<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut event: UpdateEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("跳过第 {} 行，无法解析更新: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };

        if let Some(thresholds) = classifier {
            thresholds.annotate(event.human, &mut event.entities);
        }

        summary.alerts_recorded += apply_update(aggregator, event);
        summary.applied += 1;
    }

    tracing::info!(
        "回放完成: 应用 {} 条更新，跳过 {} 行，记录 {} 条告警",
        summary.applied,
        summary.skipped,
        summary.alerts_recorded
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{EntityId, EntityStatus};
    use serde_json::json;

    #[test]
    fn test_apply_update_records_alerts() {
        let mut aggregator = TelemetryAggregator::default();
        let event = UpdateEvent {
            human: GeoPoint::new(12.9716, 77.5946),
            entities: vec![
                TrackedEntity::new(1, GeoPoint::new(12.9730, 77.5960))
                    .with_status(EntityStatus::Alert)
                    .with_distance(210.5),
                TrackedEntity::new(2, GeoPoint::new(12.9717, 77.5947))
                    .with_status(EntityStatus::Safe)
                    .with_distance(15.0),
                TrackedEntity::new(3, GeoPoint::new(12.9700, 77.5930))
                    .with_status(EntityStatus::Alert),
            ],
            timestamp: Timestamp::from("2026-10-19T08:30:00"),
        };

        let recorded = apply_update(&mut aggregator, event);

        assert_eq!(recorded, 2);
        assert_eq!(aggregator.positions().len(), 1);
        assert_eq!(aggregator.positions().iter().next().unwrap().entities.len(), 3);

        let alerts: Vec<_> = aggregator.alerts().to_vec();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].entity_id, EntityId::Number(1));
        assert_eq!(alerts[0].distance, Some(210.5));
        assert_eq!(alerts[1].entity_id, EntityId::Number(3));
        assert_eq!(alerts[1].distance, None);
        assert_eq!(alerts[1].timestamp, Timestamp::from("2026-10-19T08:30:00"));
    }

    #[test]
    fn test_update_event_accepts_legacy_field_names() {
        let event: UpdateEvent = serde_json::from_value(json!({
            "human": {
                "lat": 12.9183899,
                "lon": 77.5917152,
                "timestamp": "2026-10-19T08:30:00",
                "positioning_system": "NavIC"
            },
            "cows": [
                {"id": 1, "lat": 12.919, "lon": 77.592, "rssi": -95.1,
                 "signal_quality": "Fair", "distance": 130.2, "status": "alert"}
            ],
            "system_time": "2026-10-19T08:30:00.123456",
            "update_count": 4
        }))
        .unwrap();

        assert_eq!(event.entities.len(), 1);
        assert!(event.entities[0].status.is_alert());
        assert!(event.timestamp.instant().is_some());
    }

    #[tokio::test]
    async fn test_replay_skips_malformed_lines() {
        let input = concat!(
            r#"{"human":{"lat":0.0,"lon":0.0},"entities":[],"timestamp":1792398600000}"#,
            "\n",
            "this is not json\n",
            "\n",
            r#"{"human":{"lat":0.0,"lon":1.0},"entities":[{"id":7,"lat":0.0,"lon":1.01,"status":"alert","distance":1100.0}],"timestamp":1792398720000}"#,
            "\n",
            r#"{"entities":[]}"#,
            "\n",
        );

        let mut aggregator = TelemetryAggregator::default();
        let summary = replay_updates(input.as_bytes(), &mut aggregator, None)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 2,
                skipped: 2,
                alerts_recorded: 1,
            }
        );
        let stats = aggregator.movement_statistics().unwrap();
        assert_eq!(stats.update_count, 2);
    }

    #[tokio::test]
    async fn test_replay_with_classifier() {
        // 没有状态字段的原始定位，由阈值重新分类
        let input = concat!(
            r#"{"human":{"lat":12.9716,"lon":77.5946},"entities":[{"id":1,"lat":12.9717,"lon":77.5946},{"id":2,"lat":12.9736,"lon":77.5946}],"timestamp":"2026-10-19T08:30:00Z"}"#,
            "\n",
        );

        let mut aggregator = TelemetryAggregator::default();
        let thresholds = ProximityThresholds::default();
        let summary = replay_updates(input.as_bytes(), &mut aggregator, Some(&thresholds))
            .await
            .unwrap();

        assert_eq!(summary.alerts_recorded, 1);
        let alert = aggregator.alerts().iter().next().unwrap();
        assert_eq!(alert.entity_id, EntityId::Number(2));
        assert!(alert.distance.unwrap() > 200.0);
    }
}
