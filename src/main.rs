use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use divine_referrals::{
    args::Args,
    http_server::{self, AppState},
    metrics::Metrics,
    models::user::UserId,
    services::{
        alert_service::AlertService,
        attempt_ledger::AttemptLedger,
        local_cache::FileCache,
        referral_adapter::ReferralAdapter,
        referral_service::{ReferralService, RewardAmounts},
        referral_validator::ReferralValidator,
    },
    utils::{
        jwt::{issue_operator_token, issue_session_token},
        referral_code::ReferralCodec,
    },
    AppError, AppResult, Config, DbPersistence,
};

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    // Load configuration from --config path (defaults to config/default.toml)
    let config = Config::load(&args.config)?;

    init_logging(&config.logging.level)?;

    let codec = ReferralCodec::new(&config.referral.code_prefix)?;

    if let Some(user_id) = args.encode_code {
        let code = codec.encode(UserId::new(user_id)?)?;
        println!("{}", code);
        return Ok(());
    }

    if let Some(code) = args.decode_code.as_deref() {
        match codec.decode(code) {
            Ok(user_id) => println!("{}", user_id),
            Err(e) => println!("{}", e),
        }
        return Ok(());
    }

    if let Some(user_id) = args.issue_token {
        let token = issue_session_token(&config, UserId::new(user_id)?).map_err(|e| AppError::Server(e.to_string()))?;
        println!("{}", token);
        return Ok(());
    }

    if let Some(operator) = args.issue_operator_token.as_deref() {
        let token = issue_operator_token(&config, operator).map_err(|e| AppError::Server(e.to_string()))?;
        println!("{}", token);
        return Ok(());
    }

    info!("🚀 Starting Divine Referrals v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);

    let db = DbPersistence::new(config.get_database_url(), config.data.max_connections).await?;
    db.migrate().await?;
    info!("Database migrations applied");

    if args.migrate_only {
        info!("Running in migrate-only mode, exiting");
        return Ok(());
    }

    let cache_file = config.get_cache_file();
    info!("Local cache file: {}", cache_file.display());
    let cache = Arc::new(FileCache::open(&cache_file).await?);

    let users = Arc::new(db.users.clone());
    let service = ReferralService::new(
        users.clone(),
        Arc::new(db.referrals.clone()),
        Arc::new(db.earnings.clone()),
        ReferralValidator::new(codec),
        RewardAmounts::from(&config.referral),
    );
    let ledger = AttemptLedger::new(
        cache.clone(),
        Arc::new(db.attempts.clone()),
        config.referral.attempt_ledger_cap,
    );

    let alerts = AlertService::new(config.alert.webhook_url.clone());
    if !alerts.is_enabled() {
        info!("Abuse alert webhook not configured");
    }

    let adapter = ReferralAdapter::new(service, ledger, cache, alerts);

    let server_address = config.get_server_address();
    let state = AppState {
        adapter: Arc::new(adapter),
        users,
        metrics: Arc::new(Metrics::new()),
        config: Arc::new(config),
    };

    info!("🎯 Divine Referrals is now running!");
    info!("HTTP API available at: http://{}", server_address);

    tokio::select! {
        result = http_server::start_server(state, &server_address) => {
            error!("HTTP server exited: {:?}", result);
            result.map_err(|e| AppError::Server(e.to_string()))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping");
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> AppResult<()> {
    let log_level = match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => {
            eprintln!("Invalid log level: {}, defaulting to info", level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("divine_referrals={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Ok(())
}
