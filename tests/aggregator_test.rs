//! 聚合器行为测试
//!
//! 通过公开 API 验证滚动历史、时间窗口和移动统计

use chrono::{Duration as ChronoDuration, Local, TimeZone, Utc};
use proximity_telemetry::geo::{haversine_distance_meters, GeoPoint};
use proximity_telemetry::telemetry::{
    AggregatorSettings, EntityId, EntityStatus, Timestamp, TrackedEntity,
};
use proximity_telemetry::TelemetryAggregator;
use std::time::Duration;

#[test]
fn test_bounded_history_keeps_last_arrivals() {
    for n in [0usize, 1, 99, 100, 101, 357] {
        let mut aggregator = TelemetryAggregator::default();
        for i in 0..n {
            aggregator.record_position(GeoPoint::new(0.0, 0.0), vec![], i as i64);
        }

        let positions = aggregator.positions();
        assert_eq!(positions.len(), n.min(100));

        let first_kept = n.saturating_sub(100) as i64;
        let kept: Vec<_> = positions.iter().map(|r| r.timestamp.clone()).collect();
        let expected: Vec<_> = (first_kept..n as i64).map(Timestamp::Millis).collect();
        assert_eq!(kept, expected, "n = {n}");
    }
}

#[test]
fn test_logs_are_independent() {
    let mut aggregator = TelemetryAggregator::new(AggregatorSettings {
        history_capacity: 3,
        ..Default::default()
    });

    for i in 0..5 {
        aggregator.record_alert(i, Some(150.0), Utc::now());
    }
    aggregator.record_position(GeoPoint::new(1.0, 1.0), vec![], Utc::now());

    assert_eq!(aggregator.alerts().len(), 3);
    assert_eq!(aggregator.positions().len(), 1);
}

#[test]
fn test_known_distance_scenario() {
    let mut aggregator = TelemetryAggregator::default();
    aggregator.record_position(GeoPoint::new(0.0, 0.0), vec![], Utc::now());
    aggregator.record_position(GeoPoint::new(0.0, 1.0), vec![], Utc::now());

    let stats = aggregator
        .movement_statistics()
        .expect("two positions give statistics");
    assert_eq!(stats.update_count, 2);
    assert!((stats.total_distance_meters - 111_195.0).abs() <= 111_195.0 * 0.005);
    assert_eq!(
        stats.average_speed_meters_per_update,
        stats.total_distance_meters
    );
}

#[test]
fn test_movement_uses_human_fix_only() {
    let mut aggregator = TelemetryAggregator::default();
    let far_away = |lon: f64| {
        vec![TrackedEntity::new(1, GeoPoint::new(45.0, lon)).with_status(EntityStatus::Alert)]
    };

    aggregator.record_position(GeoPoint::new(10.0, 10.0), far_away(0.0), Utc::now());
    aggregator.record_position(GeoPoint::new(10.0, 10.0), far_away(90.0), Utc::now());
    aggregator.record_position(GeoPoint::new(10.0, 10.0), far_away(-90.0), Utc::now());

    let stats = aggregator.movement_statistics().unwrap();
    assert_eq!(stats.total_distance_meters, 0.0);
    assert_eq!(stats.average_speed_meters_per_update, 0.0);
    assert_eq!(stats.update_count, 3);
}

#[test]
fn test_custom_movement_window() {
    let mut aggregator = TelemetryAggregator::new(AggregatorSettings {
        movement_window: 3,
        ..Default::default()
    });
    let path = [
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(0.0, 0.5),
        GeoPoint::new(0.0, 0.6),
        GeoPoint::new(0.1, 0.6),
    ];
    for p in path {
        aggregator.record_position(p, vec![], Utc::now());
    }

    let stats = aggregator.movement_statistics().unwrap();
    let expected =
        haversine_distance_meters(path[1], path[2]) + haversine_distance_meters(path[2], path[3]);
    assert_eq!(stats.update_count, 3);
    assert!((stats.total_distance_meters - expected).abs() < 1e-6);
}

#[test]
fn test_recent_alert_window_one_hour() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let mut aggregator = TelemetryAggregator::default();

    aggregator.record_alert(1, Some(140.0), now - ChronoDuration::minutes(10));
    aggregator.record_alert(2, Some(160.0), now - ChronoDuration::hours(2));

    assert_eq!(
        aggregator.count_recent_alerts_at(now, Duration::from_millis(3_600_000)),
        1
    );
}

#[test]
fn test_recent_alerts_against_wall_clock() {
    let mut aggregator = TelemetryAggregator::default();
    aggregator.record_alert("a", Some(120.0), Utc::now() - ChronoDuration::minutes(5));
    aggregator.record_alert("b", Some(120.0), Utc::now() - ChronoDuration::hours(3));
    aggregator.record_alert(
        "c",
        Some(120.0),
        (Utc::now() - ChronoDuration::minutes(1)).timestamp_millis(),
    );

    assert_eq!(aggregator.count_recent_alerts(), 2);
    assert_eq!(
        aggregator.count_recent_alerts_within(Duration::from_secs(4 * 3600)),
        3
    );
}

#[test]
fn test_recent_alerts_with_local_naive_timestamps() {
    let mut aggregator = TelemetryAggregator::default();
    let local_iso = |ago: ChronoDuration| {
        (Local::now() - ago)
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    };

    // 上游用本机时间且不带时区
    aggregator.record_alert(1, Some(150.0), local_iso(ChronoDuration::minutes(5)));
    assert_eq!(aggregator.count_recent_alerts(), 1);

    aggregator.record_alert(2, Some(150.0), local_iso(ChronoDuration::hours(3)));
    assert_eq!(aggregator.count_recent_alerts(), 1);
}

#[test]
fn test_malformed_alerts_never_fail() {
    let mut aggregator = TelemetryAggregator::default();

    aggregator.record_alert(1, Some(f64::NAN), "not-a-date");
    aggregator.record_alert(2, None, "not-a-date");
    aggregator.record_alert(3, Some(f64::INFINITY), Timestamp::Unknown);
    aggregator.record_alert(4, Some(-1.0), i64::MAX);

    assert_eq!(aggregator.alerts().len(), 4);
    assert_eq!(aggregator.count_recent_alerts(), 0);

    let ids: Vec<EntityId> = aggregator
        .alerts()
        .iter()
        .map(|a| a.entity_id.clone())
        .collect();
    assert_eq!(ids, (1..=4).map(EntityId::from).collect::<Vec<_>>());

    // 导出也不受非有限数值影响
    let json = aggregator
        .export(Default::default())
        .to_json_pretty()
        .unwrap();
    assert!(json.contains("\"distance\": null"));
}
