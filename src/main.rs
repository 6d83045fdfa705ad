use fibo_panel::{
    logger::{self, LogLevel, LoggerConfig},
    Config,
};
use std::env;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let json_logs = env::var("FIBO_LOG_JSON").map_or(false, |v| v.eq_ignore_ascii_case("true"));
    let level = env::var("FIBO_LOG_LEVEL").ok().and_then(|v| LogLevel::parse(&v));
    if json_logs || level.is_some() {
        let mut logger_config = if json_logs {
            LoggerConfig::production()
        } else {
            LoggerConfig::development()
        };
        if let Some(level) = level {
            logger_config = logger_config.with_level(level);
        }
        logger::init_with_config(logger_config)?;
    } else {
        logger::init()?;
    }

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        log::error!("❌ {}", e);
        return Err(e.into());
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config.server);
    logger::log_config_info(&config);

    fibo_panel::server::run(config).await?;
    Ok(())
}
