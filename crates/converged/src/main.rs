// # converged - one-shot convergence applier
//
// The converged binary is a thin integration layer only:
// 1. Reading the declaration file and environment overrides
// 2. Initializing the runtime and tracing
// 3. Registering client backends and resolving them once
// 4. Applying the declared batch through the engine and reporting
//
// All convergence logic lives in converge-core.
//
// ## Configuration
//
// - First CLI argument, or `CONVERGE_CONFIG`: path to the JSON
//   declaration file (clients + resources + engine settings)
// - `CONVERGE_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `CONVERGE_DRY_RUN`: "1"/"true" forces dry-run regardless of the file
//
// ## Example
//
// ```bash
// export CONVERGE_LOG_LEVEL=debug
// converged /etc/converge/resources.json
// ```
//
// ## Exit codes
//
// - 0: every declaration converged (predictions count as success)
// - 1: configuration or startup error
// - 2: at least one declaration failed to converge

use anyhow::Result;
use converge_core::{ClientRegistry, ConvergeConfig, ConvergenceEngine, Status};
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the applier
#[derive(Debug, Clone, Copy)]
enum ConvergeExitCode {
    /// Every declaration converged
    Converged = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// At least one declaration failed
    Failed = 2,
}

impl From<ConvergeExitCode> for ExitCode {
    fn from(code: ConvergeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process-level settings, separate from the declaration file
struct Settings {
    config_path: String,
    log_level: String,
    dry_run_override: Option<bool>,
}

impl Settings {
    /// Load settings from the CLI argument and environment variables
    fn from_env() -> Result<Self> {
        let config_path = env::args()
            .nth(1)
            .or_else(|| env::var("CONVERGE_CONFIG").ok())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no declaration file given. \
                    Pass a path or set CONVERGE_CONFIG=/etc/converge/resources.json"
                )
            })?;

        let dry_run_override = match env::var("CONVERGE_DRY_RUN") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                other => anyhow::bail!(
                    "CONVERGE_DRY_RUN '{}' is not valid. Use 1/true or 0/false",
                    other
                ),
            },
            Err(_) => None,
        };

        Ok(Self {
            config_path,
            log_level: env::var("CONVERGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dry_run_override,
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if !std::path::Path::new(&self.config_path).exists() {
            anyhow::bail!("declaration file does not exist: {}", self.config_path);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CONVERGE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ConvergeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    info!("Starting converged");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ConvergeExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        match run(settings).await {
            Ok(code) => code,
            Err(e) => {
                error!("Startup error: {}", e);
                ConvergeExitCode::ConfigError
            }
        }
    })
    .into()
}

/// Load the declaration file, resolve clients, and apply the batch
async fn run(settings: Settings) -> Result<ConvergeExitCode> {
    let mut config = ConvergeConfig::from_file(&settings.config_path)?;
    if let Some(dry_run) = settings.dry_run_override {
        config.engine.dry_run = dry_run;
    }
    config.validate()?;

    info!(
        "Loaded {} declaration(s) from {} (dry-run: {})",
        config.resources.len(),
        settings.config_path,
        config.engine.dry_run
    );

    // Register built-in client backends
    let registry = ClientRegistry::new();
    converge_core::clients::register(&registry);

    #[cfg(feature = "http")]
    {
        debug!("Registering HTTP client backend");
        converge_client_http::register(&registry);
    }

    // Resolve every configured client once, before any convergence call
    let clients = registry.resolve(&config.clients)?;
    info!("Resolved {} client(s)", clients.len());

    let (engine, mut events) = ConvergenceEngine::new(clients, config.engine.clone());

    // Surface engine events at debug level while the batch runs
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("engine event: {:?}", event);
        }
    });

    let report = engine.apply(&config.resources).await?;

    for result in report.iter() {
        match result.status {
            Status::Succeeded if result.has_changes() => {
                info!("{}: {} ({} changed)", result.name, result.message, result.changed.len());
            }
            Status::Succeeded => info!("{}: {}", result.name, result.message),
            Status::Predicted => info!("{}: {} (dry-run)", result.name, result.message),
            Status::Failed => warn!("{}: {}", result.name, result.message),
        }
    }

    let failed = report.failed_count();
    let predicted = report.iter().filter(|r| r.status.is_predicted()).count();
    info!(
        "Converged {} declaration(s), {} predicted, {} failed",
        report.len(),
        predicted,
        failed
    );

    // Close the event channel so the logger task drains and exits
    drop(engine);
    let _ = event_logger.await;

    if failed > 0 {
        Ok(ConvergeExitCode::Failed)
    } else {
        Ok(ConvergeExitCode::Converged)
    }
}
