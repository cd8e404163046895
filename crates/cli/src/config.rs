//! Command line configuration for `classifier-xml`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLASSIFIER_LOG_LEVEL` | info | Log level |
//! | `CLASSIFIER_DEFAULT_NAMESPACE` | http://www.openmicroscopy.org/Schemas/OME/2012-06 | Namespace of written elements |
//!
//! `RUST_LOG`, when set, overrides `CLASSIFIER_LOG_LEVEL`.
//!
//! # Example
//!
//! ```rust
//! use clap::Parser;
//! use omero_classifier_cli::{CliConfig, Command};
//!
//! let config = CliConfig::parse_from(["classifier-xml", "validate", "annotation.xml"]);
//! assert!(matches!(config.command, Command::Validate { .. }));
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use omero_classifier::{OME_NAMESPACE, WriterConfig};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Top-level options shared by every subcommand.
#[derive(Debug, Clone, Parser)]
#[command(name = "classifier-xml")]
#[command(about = "Inspect, validate and write OMERO classifier annotations")]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CLASSIFIER_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Namespace given to unqualified elements when writing.
    #[arg(
        long,
        env = "CLASSIFIER_DEFAULT_NAMESPACE",
        default_value = OME_NAMESPACE,
        global = true
    )]
    pub default_namespace: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every classifier entity in a document as JSON.
    Inspect {
        /// OME-XML document to read.
        file: PathBuf,
    },

    /// Check a document and summarize what it contains.
    Validate {
        /// OME-XML document to read.
        file: PathBuf,
    },

    /// Wrap a JSON entity in a classifier annotation.
    Write {
        /// JSON file holding one entity, e.g. `{"FeatureSet": {...}}`.
        input: PathBuf,

        /// Value of the annotation `ID` attribute.
        #[arg(long)]
        annotation_id: Option<i64>,

        /// Output file. Standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl CliConfig {
    /// Writer settings derived from the command line.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            default_namespace: self.default_namespace.clone(),
            ..WriterConfig::default()
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if self.default_namespace.trim().is_empty() {
            errors.push("Default namespace cannot be empty".to_string());
        } else if self.default_namespace.contains(['{', '}']) {
            errors.push("Default namespace cannot contain braces".to_string());
        }

        if let Command::Write {
            input,
            output: Some(output),
            ..
        } = &self.command
        {
            if input == output {
                errors.push("Output file cannot be the input file".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
