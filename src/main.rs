use gymhub::{app, seed, AppConfig, AppState, AvatarStore, TokenConfig};
use sqlx::postgres::PgPoolOptions;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        error!(%panic_info, "Panic");
    }));

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped with a fatal error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    info!("Starting gym management API");

    let token_config = TokenConfig::new(config.jwt_secret.clone(), config.jwt_expire_days);
    let avatar_store = AvatarStore::new(&config.public_dir);

    let state = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL, migrations applied");
            AppState::postgres(pool, token_config, avatar_store)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage");
            AppState::in_memory(token_config, avatar_store)
        }
    };

    if let Some(admin) = &config.admin_seed {
        seed::ensure_super_admin(&state, admin).await?;
    }

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!("Server running on http://{}", config.addr());
    axum::serve(listener, app(state)).await?;
    Ok(())
}
