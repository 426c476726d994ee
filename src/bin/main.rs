use soquy_bot::{
    Config, Dispatcher, InMemoryBackend, InboundEvent, LedgerBackend, LedgerStore, RemoteBackend,
};
use chrono::Local;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Expense ledger bot starting");

    let config = Config::from_env()?;

    let backend: Arc<dyn LedgerBackend> = match &config.ledger_api_base_url {
        Some(base_url) => {
            info!(%base_url, container = %config.container_id, "using remote tabular backend");
            Arc::new(RemoteBackend::new(
                base_url.clone(),
                config.ledger_api_token.clone(),
                config.container_id.clone(),
            ))
        }
        None => {
            info!("LEDGER_API_BASE_URL not set, using in-memory backend");
            Arc::new(InMemoryBackend::new())
        }
    };

    let now = Local::now().naive_local();
    let store = LedgerStore::new(backend);
    let user_id = *config
        .allowed_user_ids
        .first()
        .expect("config validation guarantees at least one id");
    let dispatcher = Dispatcher::new(store, config, now.date());

    // Walk a few sample events through the pipeline. The chat transport
    // that feeds real events lives outside this crate.
    for text in ["100k cơm @vợ", "50 xăng", "/today", "/month"] {
        let event = InboundEvent {
            event_id: Uuid::new_v4(),
            user_id,
            text: text.to_string(),
            timestamp: Local::now().naive_local(),
        };
        if let Some(reply) = dispatcher.handle(event).await {
            println!("\n>>> {text}\n{}", reply.text);
        }
    }

    Ok(())
}
