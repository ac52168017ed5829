//! Tracing subscriber and Sentry setup.
//!
//! Call [`init`] once at process start and keep the returned guard alive
//! until exit; dropping it flushes pending Sentry events.

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, TelemetryConfig};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "voltline_storefront=info";

/// Keeps the Sentry client alive.
#[must_use = "dropping the guard shuts down error tracking"]
pub struct TelemetryGuard {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Forward warnings and errors as Sentry events, info and debug as
/// breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install Sentry (when a DSN is configured) and the global tracing
/// subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. A subscriber that is
/// already installed is left in place.
pub fn init(config: &TelemetryConfig, default_filter: &str) -> TelemetryGuard {
    // Sentry must be initialized before the subscriber
    let sentry = init_sentry(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .try_init()
        .is_ok();

    if sentry.is_some() {
        tracing::info!("Sentry initialized");
    }
    if !installed {
        tracing::debug!("Tracing subscriber already installed");
    }

    TelemetryGuard { _sentry: sentry }
}
