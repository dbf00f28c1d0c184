//! 导出快照
//!
//! 一次性把两个滚动日志和少量配置写成可读的 JSON 文件

use super::records::{AlertRecord, PositionRecord};
use crate::error::TelemetryResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 导出文件附带的系统信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// 更新间隔（秒）
    pub update_interval: u64,
    /// 告警距离阈值（米）
    pub distance_threshold: f64,
    pub version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            update_interval: 120,
            distance_threshold: 100.0,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// 导出文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub alert_history: Vec<AlertRecord>,
    pub position_history: Vec<PositionRecord>,
    pub export_time: DateTime<Utc>,
    pub system_info: SystemInfo,
}

impl ExportDocument {
    /// 缩进格式的 JSON
    pub fn to_json_pretty(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 默认文件名，按导出日期命名
    pub fn file_name(&self) -> String {
        format!("proximity_data_{}.json", self.export_time.format("%Y-%m-%d"))
    }

    /// 写入目录，目录不存在时自动创建，返回文件路径
    pub fn write_to_dir(&self, dir: &Path) -> TelemetryResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json_pretty()?)?;

        tracing::info!(
            "已导出 {} 条告警、{} 条位置记录到 {}",
            self.alert_history.len(),
            self.position_history.len(),
            path.display()
        );
        Ok(path)
    }
}
