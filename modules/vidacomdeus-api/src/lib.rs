pub mod auth;
pub mod chat;
pub mod db;
pub mod error;
pub mod etl;
pub mod jwt;
pub mod notify;
pub mod password;
pub mod rest;
pub mod snapshot;
pub mod store;

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use vidacomdeus_common::Config;
use vidacomdeus_scraper::{DevotionalScraper, PostSource};

use chat::{ChatResponder, FallbackResponder, OpenAiResponder};
use etl::EtlGuard;
use jwt::JwtService;
use notify::{LogResetNotifier, ResetNotifier};
use store::{EtlRunLog, JsonStore, PatientStore};

pub use rest::router;

/// Embedded migrations under the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vidacomdeus=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt: JwtService,
    pub patients: PatientStore,
    pub etl_runs: EtlRunLog,
    pub responder: Arc<dyn ChatResponder>,
    pub source: Arc<dyn PostSource>,
    pub etl_guard: EtlGuard,
    pub notifier: Arc<dyn ResetNotifier>,
}

impl AppState {
    /// Wire the production services from configuration.
    pub async fn from_config(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let store = Arc::new(JsonStore::open(config.data_dir.clone()).await?);

        let responder: Arc<dyn ChatResponder> = match &config.openai_api_key {
            Some(key) => {
                info!(model = %config.openai_model, "Chat answers use OpenAI");
                Arc::new(OpenAiResponder::new(OpenAi::new(key.clone(), config.openai_model.clone())))
            }
            None => {
                info!("OPENAI_API_KEY not set, chat answers use the fallback responder");
                Arc::new(FallbackResponder)
            }
        };

        let source: Arc<dyn PostSource> =
            Arc::new(DevotionalScraper::new(config.scraper_source_url.clone())?);

        Ok(Self {
            jwt: JwtService::from_config(&config)?,
            patients: PatientStore::new(store.clone(), config.seed_demo_data),
            etl_runs: EtlRunLog::new(store),
            responder,
            source,
            etl_guard: EtlGuard::default(),
            notifier: Arc::new(LogResetNotifier),
            pool,
            config,
        })
    }
}
