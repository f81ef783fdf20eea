use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tankmon_alert::AlertEvaluator;
use tankmon_common::types::{AlertRule, AlertStatus, Channel};
use tankmon_notify::NotificationHub;
use tankmon_server::app;
use tankmon_server::config::{RulesSeedFile, ServerConfig};
use tankmon_server::state::AppState;
use tankmon_storage::MonitorStore;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tankmon-server [config.toml]                          Start the server");
    eprintln!("  tankmon-server init-rules <config.toml> <seed.json>   Initialize alert rules from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    tankmon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-rules") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires <seed.json> argument")
            })?;
            run_init_rules(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn connect_store(config: &ServerConfig) -> Result<Arc<MonitorStore>> {
    std::fs::create_dir_all(&config.database.data_dir)?;
    Ok(Arc::new(MonitorStore::new(&config.database.url).await?))
}

/// Seed alert rules from a JSON file; existing rules are left in place.
async fn run_init_rules(config_path: &str, seed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = connect_store(&config).await?;

    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: RulesSeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    let mut created = 0usize;
    for seed_rule in seed.rules {
        let now = Utc::now();
        let rule = AlertRule {
            id: tankmon_common::id::next_id(),
            name: seed_rule.name.clone(),
            container_id: seed_rule.container_id,
            metric: seed_rule.metric,
            operator: seed_rule.operator,
            threshold: seed_rule.threshold,
            duration_secs: seed_rule.duration_secs.max(0),
            cooldown_secs: seed_rule
                .cooldown_secs
                .unwrap_or(config.alerts.default_cooldown_secs)
                .max(0),
            status: AlertStatus::Active,
            last_triggered_at: None,
            channels: seed_rule.channels.unwrap_or_else(|| vec![Channel::Inapp]),
            webhook_url: seed_rule.webhook_url,
            created_at: now,
            updated_at: now,
        };
        match store.insert_alert_rule(&rule).await {
            Ok(stored) => {
                tracing::info!(rule_id = %stored.id, name = %stored.name, "Seeded alert rule");
                created += 1;
            }
            Err(e) => {
                tracing::warn!(name = %seed_rule.name, error = %e, "Failed to seed alert rule");
            }
        }
    }
    tracing::info!(created, "Alert rule seeding finished");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = connect_store(&config).await?;

    let hub = Arc::new(NotificationHub::new());
    let evaluator = Arc::new(AlertEvaluator::new(store.clone(), hub.clone()));

    let state = AppState {
        store,
        evaluator,
        hub,
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    let app = app::build_http_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received, stopping server");
}
