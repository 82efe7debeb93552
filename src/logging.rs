//! Console logging setup driven by [`Settings`].
//!
//! Levels are set per target: the root level from `LOG_LEVEL`, the HTTP stack
//! from `SERVER_LOG_LEVEL`, and the two application targets
//! [`REQUEST_LOG_TARGET`] and [`ERROR_LOG_TARGET`] from `REQUEST_LOG_LEVEL` and
//! `ERROR_LOG_LEVEL`. Directives from `RUST_LOG` are appended last and win.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, Settings};

/// Target of the request logging middleware.
pub const REQUEST_LOG_TARGET: &str = "api::requests";
/// Target of the error handling middleware.
pub const ERROR_LOG_TARGET: &str = "api::errors";

/// Builds the `EnvFilter` directive string for the given settings.
pub fn filter_directives(settings: &Settings) -> String {
    let server = settings.server_log_level.as_directive();
    let sqlx = if settings.debug { "debug" } else { "warn" };
    format!(
        "{root},tower_http={server},hyper={server},axum={server},sqlx={sqlx},{req_target}={req},{err_target}={err}",
        root = settings.log_level.as_directive(),
        server = server,
        sqlx = sqlx,
        req_target = REQUEST_LOG_TARGET,
        req = settings.request_log_level.as_directive(),
        err_target = ERROR_LOG_TARGET,
        err = settings.error_log_level.as_directive(),
    )
}

/// Installs the global subscriber. Keep the returned guard alive for the
/// lifetime of the process so buffered lines are flushed on exit.
pub fn init(settings: &Settings) -> anyhow::Result<WorkerGuard> {
    let mut directives = filter_directives(settings);
    if let Ok(extra) = std::env::var("RUST_LOG") {
        if !extra.trim().is_empty() {
            directives.push(',');
            directives.push_str(extra.trim());
        }
    }
    let env_filter = EnvFilter::try_new(&directives)?;
    let (stdout_nb, guard) = tracing_appender::non_blocking(std::io::stdout());

    match settings.log_format {
        LogFormat::Plaintext => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(stdout_nb))
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true).with_writer(stdout_nb))
            .try_init()?,
    }

    tracing::info!(
        app_name = %settings.app_name,
        app_version = %settings.app_version,
        environment = %settings.environment,
        debug = settings.debug,
        "Logging configured for '{}' in '{}' environment using '{}' format.",
        settings.app_name,
        settings.environment,
        settings.log_format,
    );
    Ok(guard)
}
