//! 配置系统模块
//!
//! 统一处理 TOML 配置文件、环境变量、命令行参数

use crate::error::TelemetryError;
use crate::monitor::{PathLossModel, ProximityThresholds, Scenario};
use crate::telemetry::{AggregatorSettings, SystemInfo};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config as ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(name = "proximity-telemetry")]
#[command(about = "人畜距离监测 - 滚动遥测聚合")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 支持的命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 回放 JSON 行格式的更新文件
    Replay {
        /// 输入文件，每行一个更新事件
        #[arg(short, long)]
        input: PathBuf,
        /// 按配置阈值重新计算距离和状态
        #[arg(long)]
        classify: bool,
        /// 结束后导出数据
        #[arg(long)]
        export: bool,
    },
    /// 运行位置模拟
    Simulate {
        /// 更新次数
        #[arg(short = 'n', long, default_value_t = 10)]
        updates: usize,
        /// 模拟场景
        #[arg(short, long, value_enum, default_value_t = Scenario::Normal)]
        scenario: Scenario,
        /// 随机种子
        #[arg(long)]
        seed: Option<u64>,
        /// 两次更新之间的等待（毫秒）
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
        /// 结束后导出数据
        #[arg(long)]
        export: bool,
    },
    /// 输出默认配置
    GenerateConfig,
    /// 重置配置
    ResetConfig,
    /// 生成 shell 补全脚本
    Completions {
        /// 目标 shell
        shell: clap_complete::Shell,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Simulate {
            updates: 10,
            scenario: Scenario::Normal,
            seed: None,
            interval_ms: 0,
            export: false,
        }
    }
}

/// 日志级别
#[derive(clap::ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// 遥测聚合配置
    pub telemetry: TelemetryConfig,
    /// 距离与信号配置
    pub proximity: ProximityConfig,
    /// 模拟配置
    pub simulation: SimulationConfig,
    /// 导出配置
    pub export: ExportConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 遥测聚合配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// 每个滚动日志的容量
    pub history_capacity: usize,
    /// 最近告警统计窗口（秒）
    pub recent_alert_window_secs: u64,
    /// 移动统计取最近多少条位置
    pub movement_window: usize,
}

/// 距离与信号配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// 告警距离（米）
    pub alert_distance_meters: f64,
    /// 安全区半径（米）
    pub safe_zone_meters: f64,
    /// 1 米处 RSSI（dBm）
    pub reference_rssi_dbm: f64,
    /// 路径损耗指数
    pub path_loss_exponent: f64,
}

/// 模拟配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 基准纬度
    pub base_lat: f64,
    /// 基准经度
    pub base_lon: f64,
    /// 标签数量
    pub entity_count: u32,
    /// 更新间隔（秒）
    pub update_interval_secs: u64,
    /// 人员移动幅度（度）
    pub human_movement_range: f64,
    /// 标签移动幅度（度）
    pub entity_movement_range: f64,
    /// 最小 RSSI（dBm）
    pub rssi_min: f64,
    /// 最大 RSSI（dBm）
    pub rssi_max: f64,
}

/// 导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 导出目录
    pub directory: PathBuf,
    /// 写入导出文件的版本号
    pub version: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
    /// 日志输出目录
    pub directory: Option<PathBuf>,
}

/// 日志格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 简洁格式
    Compact,
    /// 详细格式
    Full,
    /// JSON 格式
    Json,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            recent_alert_window_secs: 3600,
            movement_window: 10,
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            alert_distance_meters: 100.0,
            safe_zone_meters: 50.0,
            reference_rssi_dbm: -40.0,
            path_loss_exponent: 2.7,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_lat: 12.9716,
            base_lon: 77.5946,
            entity_count: 2,
            update_interval_secs: 120,
            human_movement_range: 0.001,
            entity_movement_range: 0.002,
            rssi_min: -120.0,
            rssi_max: -30.0,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("exports"),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            directory: None,
        }
    }
}

impl Config {
    /// 从多种配置源加载配置
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();
        Self::load_with_cli(cli)
    }

    /// 使用指定的 CLI 参数加载配置
    pub fn load_with_cli(cli: Cli) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. 首先加载默认配置
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // 2. 加载系统配置文件
        if let Some(system_config) = Self::get_system_config_path() {
            if system_config.exists() {
                builder = builder.add_source(File::from(system_config));
            }
        }

        // 3. 加载用户配置文件
        if let Some(user_config) = Self::get_user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config));
            }
        }

        // 4. 加载指定的配置文件
        if let Some(config_path) = cli.config {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            } else {
                return Err(anyhow!("配置文件不存在: {}", config_path.display()));
            }
        }

        // 5. 加载环境变量（前缀 PROXIMITY_TELEMETRY_）
        builder = builder.add_source(
            Environment::with_prefix("PROXIMITY_TELEMETRY")
                .prefix_separator("_")
                .separator("__"),
        );

        // 6. 构建配置
        let mut config: Config = builder.build()?.try_deserialize()?;

        // 7. 应用命令行参数覆盖
        if let Some(log_level) = cli.log_level {
            config.logging.level = log_level;
        }

        // 8. 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 获取系统配置文件路径
    pub fn get_system_config_path() -> Option<PathBuf> {
        Some(PathBuf::from("/etc/proximity-telemetry/config.toml"))
    }

    /// 获取用户配置文件路径
    pub fn get_user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "proximity-telemetry")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// 生成默认配置文件
    pub fn generate_default_config() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).map_err(|e| anyhow!("生成默认配置失败: {}", e))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| anyhow!("序列化配置失败: {}", e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TelemetryError::InvalidConfig(msg).into()) };

        // 验证遥测参数
        if self.telemetry.history_capacity == 0 {
            return invalid("telemetry.history_capacity 不能为 0".to_string());
        }
        if self.telemetry.movement_window < 2 {
            return invalid(format!(
                "telemetry.movement_window 至少为 2，当前为 {}",
                self.telemetry.movement_window
            ));
        }

        // 验证距离阈值
        let proximity = &self.proximity;
        if !proximity.alert_distance_meters.is_finite() || proximity.alert_distance_meters <= 0.0 {
            return invalid(format!(
                "proximity.alert_distance_meters 必须为正数，当前为 {}",
                proximity.alert_distance_meters
            ));
        }
        if !proximity.safe_zone_meters.is_finite()
            || proximity.safe_zone_meters <= 0.0
            || proximity.safe_zone_meters > proximity.alert_distance_meters
        {
            return invalid(format!(
                "proximity.safe_zone_meters 必须在 (0, {}] 之间，当前为 {}",
                proximity.alert_distance_meters, proximity.safe_zone_meters
            ));
        }
        if !proximity.path_loss_exponent.is_finite() || proximity.path_loss_exponent <= 0.0 {
            return invalid("proximity.path_loss_exponent 必须为正数".to_string());
        }
        if !proximity.reference_rssi_dbm.is_finite() {
            return invalid(format!(
                "proximity.reference_rssi_dbm 必须为有限数值，当前为 {}",
                proximity.reference_rssi_dbm
            ));
        }

        // 验证模拟参数
        let simulation = &self.simulation;
        if !crate::geo::GeoPoint::new(simulation.base_lat, simulation.base_lon).is_valid() {
            return invalid(format!(
                "simulation 基准坐标无效: ({}, {})",
                simulation.base_lat, simulation.base_lon
            ));
        }
        if !simulation.rssi_min.is_finite() || !simulation.rssi_max.is_finite() {
            return invalid(format!(
                "simulation.rssi_min/rssi_max 必须为有限数值，当前为 {} / {}",
                simulation.rssi_min, simulation.rssi_max
            ));
        }
        if simulation.rssi_min >= simulation.rssi_max {
            return invalid(format!(
                "simulation.rssi_min ({}) 必须小于 rssi_max ({})",
                simulation.rssi_min, simulation.rssi_max
            ));
        }

        // 验证日志目录
        if let Some(log_dir) = &self.logging.directory {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
        }

        Ok(())
    }

    /// 聚合器参数
    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            history_capacity: self.telemetry.history_capacity,
            recent_alert_window: Duration::from_secs(self.telemetry.recent_alert_window_secs),
            movement_window: self.telemetry.movement_window,
        }
    }

    /// 距离阈值
    pub fn thresholds(&self) -> ProximityThresholds {
        ProximityThresholds {
            alert_distance_meters: self.proximity.alert_distance_meters,
            safe_zone_meters: self.proximity.safe_zone_meters,
        }
    }

    /// 路径损耗模型
    pub fn path_loss(&self) -> PathLossModel {
        PathLossModel {
            reference_rssi_dbm: self.proximity.reference_rssi_dbm,
            path_loss_exponent: self.proximity.path_loss_exponent,
        }
    }

    /// 导出文件中的系统信息
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            update_interval: self.simulation.update_interval_secs,
            distance_threshold: self.proximity.alert_distance_meters,
            version: self.export.version.clone(),
        }
    }

    /// 初始化日志系统
    ///
    /// 配置了日志目录时返回文件写入器的 guard，调用方需持有到进程结束。
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let level_filter = EnvFilter::builder()
            .with_default_directive(
                LevelFilter::from_level(Level::from(self.logging.level.clone())).into(),
            )
            .from_env_lossy();

        let mut guard = None;

        // 根据格式选择不同的初始化方式
        match self.logging.format {
            LogFormat::Compact => {
                let fmt_layer = fmt::layer().compact();
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "proximity-telemetry.log");
                    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                    guard = Some(worker_guard);
                    let file_layer = fmt::layer()
                        .compact()
                        .with_ansi(false)
                        .with_writer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .try_init()?;
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .try_init()?;
                }
            }
            LogFormat::Full => {
                let fmt_layer = fmt::layer();
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "proximity-telemetry.log");
                    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                    guard = Some(worker_guard);
                    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .try_init()?;
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .try_init()?;
                }
            }
            LogFormat::Json => {
                // 每个事件输出一行 JSON
                let fmt_layer = json_layer(std::io::stdout);
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "proximity-telemetry.log");
                    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                    guard = Some(worker_guard);
                    let file_layer = json_layer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .try_init()?;
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .try_init()?;
                }
            }
        }

        tracing::info!("日志系统已初始化，级别: {:?}", self.logging.level);
        Ok(guard)
    }
}

/// JSON 格式的日志层
fn json_layer<S, W>(writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fmt::layer()
        .json()
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
}
