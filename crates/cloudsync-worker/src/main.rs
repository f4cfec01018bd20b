use cloudsync_worker::config::loader::{ConfigLocation, load_config};
use cloudsync_worker::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let location = ConfigLocation::resolve(std::env::args().skip(1), |key| {
        std::env::var(key).ok()
    });
    let cfg = match load_config(Some(&location.path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error ({}): {e}", location.path);
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %location.path,
        from = location.origin.as_str(),
        accounts = cfg.accounts.len(),
        workers = cfg.sync.workers,
        "Worker configuration loaded"
    );
    if !observability::apply_logging_level(&cfg.logging.level) {
        tracing::debug!(level = %cfg.logging.level, "Configured log level not applied");
    }

    cloudsync_worker::run(cfg).await
}
