//! 位置模拟器
//!
//! 没有接收机硬件时生成人员定位和 LoRa 标签定位。
//! 时间按 `tick * update_interval_secs` 推进，种子固定时结果可复现。

use super::signal::{PathLossModel, SignalQuality};
use super::update::UpdateEvent;
use crate::config::SimulationConfig;
use crate::geo::{offset_by_meters, GeoPoint};
use crate::telemetry::{Timestamp, TrackedEntity};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// 模拟场景
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// 标签距离由 RSSI 估算，限制在 50-200 米
    #[default]
    Normal,
    /// 所有标签放在 120-200 米，必然越过告警阈值
    Alert,
}

/// 位置模拟器
pub struct PositionSimulator<R: Rng = StdRng> {
    settings: SimulationConfig,
    path_loss: PathLossModel,
    scenario: Scenario,
    rng: R,
    tick: u64,
}

impl PositionSimulator<StdRng> {
    /// 使用固定种子创建
    pub fn seeded(settings: SimulationConfig, path_loss: PathLossModel, seed: u64) -> Self {
        Self::new(settings, path_loss, StdRng::seed_from_u64(seed))
    }

    /// 使用系统熵创建
    pub fn from_entropy(settings: SimulationConfig, path_loss: PathLossModel) -> Self {
        Self::new(settings, path_loss, StdRng::from_entropy())
    }
}

impl<R: Rng> PositionSimulator<R> {
    pub fn new(settings: SimulationConfig, path_loss: PathLossModel, rng: R) -> Self {
        Self {
            settings,
            path_loss,
            scenario: Scenario::Normal,
            rng,
            tick: 0,
        }
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    fn base(&self) -> GeoPoint {
        GeoPoint::new(self.settings.base_lat, self.settings.base_lon)
    }

    fn elapsed_secs(&self) -> f64 {
        (self.tick * self.settings.update_interval_secs) as f64
    }

    /// 生成下一次更新
    pub fn next_update(&mut self, now: DateTime<Utc>) -> UpdateEvent {
        let elapsed = self.elapsed_secs();
        let human = self.human_fix(elapsed);
        let entities = match self.scenario {
            Scenario::Normal => self.normal_entities(human, elapsed, now),
            Scenario::Alert => self.alert_entities(human, now),
        };
        self.tick += 1;

        UpdateEvent {
            human,
            entities,
            timestamp: Timestamp::from(now),
        }
    }

    /// 回到初始状态
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    fn human_fix(&mut self, elapsed: f64) -> GeoPoint {
        let range = self.settings.human_movement_range;
        let lat_variation =
            range * (0.5 * (elapsed / 60.0).sin() + 0.3 * self.rng.gen_range(-1.0..=1.0));
        let lon_variation =
            range * (0.5 * (elapsed / 80.0).cos() + 0.3 * self.rng.gen_range(-1.0..=1.0));

        let base = self.base();
        GeoPoint::new(base.lat + lat_variation, base.lon + lon_variation)
    }

    fn normal_entities(
        &mut self,
        human: GeoPoint,
        elapsed: f64,
        now: DateTime<Utc>,
    ) -> Vec<TrackedEntity> {
        let (rssi_min, rssi_max) = (self.settings.rssi_min, self.settings.rssi_max);

        (0..self.settings.entity_count)
            .map(|i| {
                let base_rssi = self.rng.gen_range(rssi_min..=rssi_max);
                let variation = 5.0 * (elapsed / (30.0 + i as f64 * 10.0)).sin();
                let rssi = (base_rssi + variation).clamp(rssi_min, rssi_max);

                let distance = self.path_loss.estimate_distance_meters(rssi).clamp(50.0, 200.0);
                let angle = i as f64 * 120.0 + (elapsed / 10.0) % 360.0;
                let estimated = offset_by_meters(human, distance, angle);

                let noise = self.settings.entity_movement_range;
                let position = GeoPoint::new(
                    estimated.lat + noise * self.rng.gen_range(-0.5..=0.5),
                    estimated.lon + noise * self.rng.gen_range(-0.5..=0.5),
                );

                Self::tag(i, position, rssi, now)
            })
            .collect()
    }

    fn alert_entities(&mut self, human: GeoPoint, now: DateTime<Utc>) -> Vec<TrackedEntity> {
        (0..self.settings.entity_count)
            .map(|i| {
                let distance = self.rng.gen_range(120.0..=200.0);
                let angle = self.rng.gen_range(0.0..360.0);
                let position = offset_by_meters(human, distance, angle);
                let rssi = self
                    .path_loss
                    .rssi_at(distance)
                    .clamp(self.settings.rssi_min, self.settings.rssi_max);

                Self::tag(i, position, rssi, now)
            })
            .collect()
    }

    fn tag(index: u32, position: GeoPoint, rssi: f64, now: DateTime<Utc>) -> TrackedEntity {
        let rounded = (rssi * 10.0).round() / 10.0;
        TrackedEntity::new(index + 1, position)
            .with_metadata("rssi", rounded)
            .with_metadata("signal_quality", SignalQuality::from_rssi(rssi).as_str())
            .with_metadata("timestamp", now.to_rfc3339())
    }
}
