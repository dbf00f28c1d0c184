use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use proximity_telemetry::config::{Cli, Commands, Config};
use proximity_telemetry::monitor::{apply_update, replay_updates, PositionSimulator, Scenario};
use proximity_telemetry::TelemetryAggregator;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 补全脚本不需要加载配置
    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "proximity-telemetry",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    // 加载配置
    let config = Config::load_with_cli(cli.clone())?;

    // 初始化日志系统
    let _log_guard = config.init_logging()?;

    tracing::info!("Proximity Telemetry Starting...");
    tracing::info!(
        "告警距离: {}m，滚动历史容量: {}",
        config.proximity.alert_distance_meters,
        config.telemetry.history_capacity
    );

    handle_command(cli.command.unwrap_or_default(), &config).await
}

async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Replay {
            input,
            classify,
            export,
        } => {
            let mut aggregator = TelemetryAggregator::new(config.aggregator_settings());
            let file = tokio::fs::File::open(&input)
                .await
                .with_context(|| format!("无法打开更新文件: {}", input.display()))?;

            let thresholds = config.thresholds();
            let summary = replay_updates(
                BufReader::new(file),
                &mut aggregator,
                classify.then_some(&thresholds),
            )
            .await?;

            println!(
                "回放完成: 应用 {} 条，跳过 {} 行，告警 {} 条",
                summary.applied, summary.skipped, summary.alerts_recorded
            );
            report(&aggregator, config, export)?;
        }
        Commands::Simulate {
            updates,
            scenario,
            seed,
            interval_ms,
            export,
        } => {
            let mut aggregator = TelemetryAggregator::new(config.aggregator_settings());
            run_simulation(&mut aggregator, config, updates, scenario, seed, interval_ms).await;
            report(&aggregator, config, export)?;
        }
        Commands::GenerateConfig => {
            println!("{}", Config::generate_default_config()?);
        }
        Commands::ResetConfig => {
            // 重置配置
            let default_config = Config::default();
            if let Some(config_path) = Config::get_user_config_path() {
                default_config.save_to_file(&config_path)?;
                println!("配置已重置到: {}", config_path.display());
            } else {
                println!("无法确定配置文件路径");
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn run_simulation(
    aggregator: &mut TelemetryAggregator,
    config: &Config,
    updates: usize,
    scenario: Scenario,
    seed: Option<u64>,
    interval_ms: u64,
) {
    let mut simulator = match seed {
        Some(seed) => PositionSimulator::seeded(config.simulation.clone(), config.path_loss(), seed),
        None => PositionSimulator::from_entropy(config.simulation.clone(), config.path_loss()),
    }
    .with_scenario(scenario);
    let thresholds = config.thresholds();

    tracing::info!("开始模拟: {} 次更新，场景 {:?}", updates, scenario);

    for n in 1..=updates {
        let mut event = simulator.next_update(chrono::Utc::now());
        let summary = thresholds.annotate(event.human, &mut event.entities);
        tracing::info!(
            "更新 #{} 完成: 人员 {:.6}, {:.6}，告警 {} / {}",
            n,
            event.human.lat,
            event.human.lon,
            summary.alerts_active,
            summary.total_entities
        );
        apply_update(aggregator, event);

        if interval_ms > 0 && n < updates {
            tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

fn report(aggregator: &TelemetryAggregator, config: &Config, export: bool) -> Result<()> {
    println!("最近告警数: {}", aggregator.count_recent_alerts());
    match aggregator.movement_statistics() {
        Some(stats) => println!(
            "移动统计: 总距离 {:.1}m，平均每次更新 {:.1}m（{} 次更新）",
            stats.total_distance_meters, stats.average_speed_meters_per_update, stats.update_count
        ),
        None => println!("移动统计: 位置记录不足"),
    }

    if export {
        let path = aggregator
            .export(config.system_info())
            .write_to_dir(&config.export.directory)?;
        println!("数据已导出到: {}", path.display());
    }

    Ok(())
}
