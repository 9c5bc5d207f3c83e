use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use jekyll_hook::notifier::{Mailer, Notifier, SmtpMailer};
use jekyll_hook::pipeline::Orchestrator;
use jekyll_hook::scheduler::TaskScheduler;
use jekyll_hook::{AppState, HookConfig, handlers, load_config};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "hook_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path =
        std::env::var("HOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: HookConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| config.listen.clone());
    let config = Arc::new(config);

    let mailer = match SmtpMailer::from_config(&config.email) {
        Ok(mailer) => mailer.map(|m| Arc::new(m) as Arc<dyn Mailer>),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let notifier = Notifier::new(mailer);

    let orchestrator = Orchestrator::new(Arc::clone(&config), notifier);
    let scheduler = TaskScheduler::start(orchestrator);

    let state = Arc::new(AppState {
        config,
        scheduler,
        start_time: Instant::now(),
        started_at: Utc::now(),
    });

    let app = handlers::router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
