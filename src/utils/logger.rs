use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Level used when `RUST_LOG` is missing or unparsable
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Sets up the application logger on stdout.
///
/// The level comes from `RUST_LOG` (a single level such as `debug`). Transport crates
/// are capped at `warn` so that request tracing does not drown the sync output.
///
/// # Errors
/// * If a logger is already installed
pub fn setup_logger() -> Result<()> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(DEFAULT_LEVEL);

    Dispatch::new()
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("alloy_transport_http", LevelFilter::Warn)
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}
