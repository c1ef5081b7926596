//! # PulseBot — engagement automation daemon
//!
//! Runs the time-windowed scheduler with safety monitoring over the
//! declared engagement tasks.
//!
//! Usage:
//!   pulsebot                                # run with ~/.pulsebot configs
//!   pulsebot --config-dir ./conf            # custom config directory
//!   pulsebot --health-check facebook        # probe a platform and exit
//!   pulsebot --alert-webhook https://...    # push anomaly alerts

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use pulsebot_core::PulseError;
use pulsebot_core::config::{GatewayConfig, SafetyRules, ScheduleConfig, TasksConfig};
use pulsebot_core::traits::EventSink;
use pulsebot_core::types::ActionRequest;
use pulsebot_gateway::{ActionGateway, HttpTransport};
use pulsebot_safety::{FanoutSink, JsonlSink, SafetyMonitor, WebhookAlerter};
use pulsebot_scheduler::{Scheduler, Task, spawn};

#[derive(Parser)]
#[command(
    name = "pulsebot",
    version,
    about = "⏱️ PulseBot — rate-limited engagement automation"
)]
struct Cli {
    /// Config directory (schedule.toml, safety_rules.toml, gateway.toml, tasks.toml)
    #[arg(long, default_value = "~/.pulsebot")]
    config_dir: String,

    /// Data directory for outcome and safety-event logs
    #[arg(long, default_value = "~/.pulsebot/data")]
    data_dir: String,

    /// Webhook URL that receives anomaly alerts
    #[arg(long)]
    alert_webhook: Option<String>,

    /// Probe a platform's health and exit
    #[arg(long, value_name = "PLATFORM")]
    health_check: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_dir = expand_path(&cli.config_dir);
    let data_dir = expand_path(&cli.data_dir);

    let gateway_cfg = GatewayConfig::load(&config_dir.join("gateway.toml"));
    let transport = Arc::new(HttpTransport::new(&gateway_cfg));
    let gateway = Arc::new(ActionGateway::new(transport, gateway_cfg.clone()));

    // --health-check: one probe, print, exit.
    if let Some(platform) = cli.health_check {
        let health = gateway.check_health(&platform).await;
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    // Outcome/anomaly records go to flat files; anomalies optionally
    // fan out to the alert webhook as well.
    let mut sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(JsonlSink::new(&data_dir))];
    if let Some(url) = cli.alert_webhook.clone() {
        sinks.push(Arc::new(WebhookAlerter::spawn(url)));
    }
    let sink: Arc<dyn EventSink> = Arc::new(FanoutSink::new(sinks));

    let rules = SafetyRules::load(&config_dir.join("safety_rules.toml"));
    let monitor = Arc::new(Mutex::new(SafetyMonitor::new(rules).with_sink(sink)));

    let schedule_path = config_dir.join("schedule.toml");
    let schedule = ScheduleConfig::load(&schedule_path);
    let mut scheduler = Scheduler::new(schedule, monitor.clone())
        .with_config_source(Box::new(move || ScheduleConfig::load(&schedule_path)));

    let tasks_cfg = TasksConfig::load(&config_dir.join("tasks.toml"));
    if tasks_cfg.tasks.is_empty() {
        tracing::warn!("no tasks declared, scheduler will idle");
    }
    for spec in &tasks_cfg.tasks {
        let request = ActionRequest::new(
            &spec.platform,
            &spec.action_type,
            &spec.target,
            &spec.credential,
        );
        let gateway = gateway.clone();
        let monitor = monitor.clone();
        let retries = gateway_cfg.max_retries;
        scheduler.add_task(Task::from_fn(
            &spec.name,
            spec.interval_minutes,
            move || {
                let gateway = gateway.clone();
                let monitor = monitor.clone();
                let request = request.clone();
                async move {
                    let outcome = gateway.execute(&request, retries).await;
                    let success = outcome.success;
                    let kind = outcome.error_kind;
                    monitor.lock().await.observe_outcome(&outcome);
                    if success {
                        Ok(())
                    } else {
                        Err(PulseError::Transport(format!(
                            "{} {} failed: {kind:?}",
                            request.platform, request.action_type
                        )))
                    }
                }
            },
        ))?;
    }

    println!("⏱️ PulseBot v{}", env!("CARGO_PKG_VERSION"));
    println!("   📂 Config: {}", config_dir.display());
    println!("   🗄️ Data:   {}", data_dir.display());
    println!("   📋 Tasks:  {}", scheduler.task_count());
    println!();

    let scheduler = Arc::new(Mutex::new(scheduler));
    let handle = spawn(scheduler.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    handle.stop();
    handle.join().await?;

    // Final safety report for the operator.
    let report = monitor.lock().await.report();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
