use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use ingest_pipeline::{AppConfig, Task};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod shutdown;

use app::{AppMode, Application};
use shutdown::ShutdownManager;

fn cli() -> Command {
    let submitter = Arg::new("submitter")
        .short('s')
        .long("submitter")
        .value_name("ID")
        .help("提交者ID，写入编曲记录")
        .default_value("cli");

    Command::new("ingest-pipeline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("歌曲采集任务管道")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径（缺省时按默认路径查找）")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别（覆盖配置文件）")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式（覆盖配置文件）")
                .value_parser(["json", "pretty"])
                .global(true),
        )
        .arg(
            Arg::new("drain-timeout-seconds")
                .long("drain-timeout-seconds")
                .value_name("SECONDS")
                .help("退出前等待进程内任务完成的最长时间")
                .value_parser(clap::value_parser!(u64))
                .default_value("300")
                .global(true),
        )
        .subcommand(Command::new("worker").about("作为Broker Worker运行"))
        .subcommand(
            Command::new("artist")
                .about("提交艺人采集任务")
                .arg(Arg::new("name").value_name("NAME").required(true))
                .arg(submitter.clone()),
        )
        .subcommand(
            Command::new("song")
                .about("提交单曲采集任务")
                .arg(
                    Arg::new("recording-id")
                        .value_name("RECORDING_ID")
                        .required(true),
                )
                .arg(submitter),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = AppConfig::load(config_path).context("加载配置失败")?;

    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.observability.log_format);
    init_logging(log_level, log_format)?;

    let app_mode = parse_app_mode(&matches)?;
    let drain_timeout = Duration::from_secs(
        matches
            .get_one::<u64>("drain-timeout-seconds")
            .copied()
            .unwrap_or(300),
    );

    info!("启动歌曲采集任务管道");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let app = Application::new(config, app_mode, drain_timeout).await?;
    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe();

    let run = app.run(shutdown_rx);
    tokio::pin!(run);

    let result = tokio::select! {
        result = &mut run => result,
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown_manager.shutdown();
            run.await
        }
    };

    if let Err(e) = &result {
        error!("应用运行失败: {e:#}");
    }
    info!("歌曲采集任务管道已退出");
    result
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

fn parse_app_mode(matches: &ArgMatches) -> Result<AppMode> {
    match matches.subcommand() {
        Some(("worker", _)) => Ok(AppMode::Worker),
        Some(("artist", sub)) => Ok(AppMode::Submit(Task::artist_ingest(
            required(sub, "name")?,
            required(sub, "submitter")?,
        ))),
        Some(("song", sub)) => Ok(AppMode::Submit(Task::song_ingest(
            required(sub, "recording-id")?,
            required(sub, "submitter")?,
        ))),
        Some((other, _)) => Err(anyhow::anyhow!("不支持的子命令: {other}")),
        None => Err(anyhow::anyhow!("缺少子命令")),
    }
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("缺少参数: {id}"))
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("监听Ctrl+C信号失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
