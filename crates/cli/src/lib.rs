//! # classifier-xml
//!
//! Command line front end for `omero-classifier`: reads OME-XML annotations
//! and reports the classifier entities they hold, or wraps a JSON entity in a
//! new annotation.
//!
//! ```text
//! classifier-xml inspect annotation.xml
//! classifier-xml validate annotation.xml
//! classifier-xml write entity.json --annotation-id 12 --output annotation.xml
//! ```

pub mod commands;
pub mod config;

pub use commands::execute;
pub use config::{CliConfig, Command};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "omero_classifier={level},omero_xml={level},omero_classifier_cli={level}",
            level = level.to_ascii_lowercase()
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
