use crate::geo::{haversine_distance_meters, GeoPoint};
use crate::telemetry::{EntityStatus, TrackedEntity};
use serde::{Deserialize, Serialize};

/// 距离阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityThresholds {
    /// 超过此距离判为告警
    pub alert_distance_meters: f64,
    /// 安全区半径，仅用于展示
    pub safe_zone_meters: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            alert_distance_meters: 100.0,
            safe_zone_meters: 50.0,
        }
    }
}

/// 一次更新的距离汇总
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub total_entities: usize,
    pub alerts_active: usize,
    pub entities_safe: usize,
    pub min_distance_meters: Option<f64>,
    pub max_distance_meters: Option<f64>,
}

impl ProximityThresholds {
    /// 阈值以内（含）为安全，否则告警；NaN 视为告警
    pub fn classify(&self, distance_meters: f64) -> EntityStatus {
        if distance_meters <= self.alert_distance_meters {
            EntityStatus::Safe
        } else {
            EntityStatus::Alert
        }
    }

    /// 计算每个实体到人的距离并写回 `distance`、`status`
    pub fn annotate(&self, human: GeoPoint, entities: &mut [TrackedEntity]) -> DistanceSummary {
        let mut summary = DistanceSummary {
            total_entities: entities.len(),
            ..Default::default()
        };

        for entity in entities.iter_mut() {
            let distance = haversine_distance_meters(human, entity.position());
            let status = self.classify(distance);

            if status.is_alert() {
                summary.alerts_active += 1;
            } else {
                summary.entities_safe += 1;
            }

            summary.min_distance_meters =
                Some(summary.min_distance_meters.map_or(distance, |d| d.min(distance)));
            summary.max_distance_meters =
                Some(summary.max_distance_meters.map_or(distance, |d| d.max(distance)));

            entity.distance = Some(distance);
            entity.status = status;
        }

        if summary.alerts_active > 0 {
            tracing::warn!(
                "告警: {} 个实体超出安全距离 {}m",
                summary.alerts_active,
                self.alert_distance_meters
            );
        } else {
            tracing::debug!("全部 {} 个实体在安全距离内", summary.total_entities);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset_by_meters;

    #[test]
    fn test_classify_threshold_is_inclusive() {
        let thresholds = ProximityThresholds::default();
        assert_eq!(thresholds.classify(0.0), EntityStatus::Safe);
        assert_eq!(thresholds.classify(100.0), EntityStatus::Safe);
        assert_eq!(thresholds.classify(100.01), EntityStatus::Alert);
        assert_eq!(thresholds.classify(f64::NAN), EntityStatus::Alert);
    }

    #[test]
    fn test_annotate_entities() {
        let thresholds = ProximityThresholds::default();
        let human = GeoPoint::new(12.9716, 77.5946);
        let mut entities = vec![
            TrackedEntity::new(1, offset_by_meters(human, 40.0, 0.0)),
            TrackedEntity::new(2, offset_by_meters(human, 160.0, 90.0)),
            TrackedEntity::new(3, offset_by_meters(human, 250.0, 200.0)),
        ];

        let summary = thresholds.annotate(human, &mut entities);

        assert_eq!(summary.total_entities, 3);
        assert_eq!(summary.alerts_active, 2);
        assert_eq!(summary.entities_safe, 1);
        assert_eq!(entities[0].status, EntityStatus::Safe);
        assert_eq!(entities[1].status, EntityStatus::Alert);
        assert_eq!(entities[2].status, EntityStatus::Alert);

        let min = summary.min_distance_meters.unwrap();
        let max = summary.max_distance_meters.unwrap();
        assert!((min - 40.0).abs() < 1.0, "min {min}");
        assert!((max - 250.0).abs() < 2.0, "max {max}");
        assert_eq!(entities[0].distance, Some(min));
    }

    #[test]
    fn test_annotate_without_entities() {
        let summary = ProximityThresholds::default().annotate(GeoPoint::new(0.0, 0.0), &mut []);
        assert_eq!(summary, DistanceSummary::default());
    }
}
