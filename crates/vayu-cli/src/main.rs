use vayu_core::{config, logging};

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Config first so its log filter applies; `copy` reports a broken config.
    let cfg = config::load_or_init();
    let filter = cfg.as_ref().ok().and_then(|c| c.log_filter.clone());
    if let Err(err) = logging::init_file_logging(filter.as_deref()) {
        logging::init_stderr_logging(filter.as_deref());
        tracing::warn!("file logging unavailable: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args(cfg).await {
        eprintln!("vayu error: {:#}", err);
        std::process::exit(1);
    }
}
