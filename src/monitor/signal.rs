//! LoRa 信号模型
//!
//! 对数距离路径损耗：RSSI = RSSI0 - 10 n log10(d)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 路径损耗模型参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    /// 1 米处的 RSSI（dBm）
    pub reference_rssi_dbm: f64,
    /// 路径损耗指数
    pub path_loss_exponent: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_rssi_dbm: -40.0,
            path_loss_exponent: 2.7,
        }
    }
}

impl PathLossModel {
    /// 由 RSSI 估算距离（米）
    pub fn estimate_distance_meters(&self, rssi_dbm: f64) -> f64 {
        10f64.powf((self.reference_rssi_dbm - rssi_dbm) / (10.0 * self.path_loss_exponent))
    }

    /// 给定距离处的预期 RSSI
    pub fn rssi_at(&self, distance_meters: f64) -> f64 {
        self.reference_rssi_dbm - 10.0 * self.path_loss_exponent * distance_meters.log10()
    }
}

/// 信号质量等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SignalQuality {
    pub fn from_rssi(rssi_dbm: f64) -> Self {
        if rssi_dbm > -70.0 {
            SignalQuality::Excellent
        } else if rssi_dbm > -85.0 {
            SignalQuality::Good
        } else if rssi_dbm > -100.0 {
            SignalQuality::Fair
        } else {
            SignalQuality::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::Poor => "Poor",
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
