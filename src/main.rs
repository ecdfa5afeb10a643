use std::sync::Arc;

use proofstake::api::router::create_router;
use proofstake::clock::SystemClock;
use proofstake::config::AppConfig;
use proofstake::keeper::run_keeper;
use proofstake::services::notifier::Notifier;
use proofstake::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let notifier = match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat)) if config.has_telegram() => {
            tracing::info!("Telegram notifications enabled");
            Some(Arc::new(Notifier::new(token.clone(), chat.clone())))
        }
        _ => None,
    };

    let state = AppState::build(config, Arc::new(SystemClock), notifier)?;
    tracing::info!(
        treasury = %state.config.treasury_account,
        creation_fee_util = state.config.creation_fee_util,
        "Market registry ready"
    );

    // --- Keeper: advances markets past their deadlines ---
    if state.config.keeper_enabled {
        let keeper = state.keeper.clone();
        let pause_flag = state.pause_flag.clone();
        tokio::spawn(async move {
            run_keeper(keeper, pause_flag).await;
        });
    } else {
        tracing::info!("Keeper disabled (KEEPER_ENABLED=false)");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
