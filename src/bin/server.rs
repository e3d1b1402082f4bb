use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vmconsole::catalog::{CatalogStore, memory::MemoryCatalog};
use vmconsole::db::services::catalog_service::DbCatalogStore;
use vmconsole::events::EventBus;
use vmconsole::inventory::{AgentClient, Inventory};
use vmconsole::server::config::ServerConfig;
use vmconsole::sync::trigger::DEFAULT_TRIGGER_CAPACITY;
use vmconsole::sync::{Session, SyncOrchestrator, SyncTrigger};
use vmconsole::version::VERSION;
use vmconsole::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Run one sync for this user id, print the summary and exit
    #[arg(long)]
    sync_user: Option<i32>,

    /// Keep the catalog in memory instead of the database (development only)
    #[arg(long)]
    memory_catalog: bool,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "vmconsole.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn build_catalog(config: &ServerConfig, in_memory: bool) -> Result<Arc<dyn CatalogStore>, Box<dyn std::error::Error + Send + Sync>> {
    if in_memory {
        warn!("Using in-memory catalog; rows are lost on exit.");
        return Ok(Arc::new(MemoryCatalog::new()));
    }
    let store = DbCatalogStore::connect(config.require_database_url()?, config.db_max_connections).await?;
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, agent_url = %config.agent_url, "Starting vmconsole server.");

    let catalog = build_catalog(&config, args.memory_catalog).await?;
    let agent = AgentClient::new(config.agent_url.clone(), config.agent_timeout)?;
    let events = EventBus::default();
    let orchestrator = Arc::new(
        SyncOrchestrator::new(Inventory::http(agent), catalog.clone(), events.clone())
            .with_max_concurrent_writes(config.max_concurrent_writes),
    );

    if let Some(user_id) = args.sync_user {
        let summary = orchestrator.sync_all(&Session::user(user_id)).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let jwt_secret = config.require_jwt_secret()?.to_string();

    // Mirror sync events into the log for operators.
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => debug!(event = ?event, "Sync event."),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log subscriber lagged.");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (trigger, trigger_handle) = SyncTrigger::spawn(orchestrator.clone(), DEFAULT_TRIGGER_CAPACITY);

    let app_state = Arc::new(AppState {
        orchestrator,
        catalog,
        trigger,
        jwt_secret,
    });
    let router = create_axum_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal.");
            }
            info!("Shutdown signal received.");
        })
        .await
    {
        error!(error = %e, "HTTP server error.");
    }

    // The router owned the last trigger sender; once it is gone the worker drains and stops.
    if let Err(e) = trigger_handle.await {
        error!(error = %e, "Sync trigger worker panicked.");
    }
    Ok(())
}
