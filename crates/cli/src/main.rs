//! `classifier-xml` binary.

use clap::Parser;
use omero_classifier_cli::{CliConfig, execute, init_logging};
use tracing::debug;

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    debug!(
        command = ?config.command,
        default_namespace = %config.default_namespace,
        "Starting classifier-xml"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&config, &mut out)
}
