//! Subcommand implementations.
//!
//! Each command writes its report to the given writer so the binary can pass
//! standard output and tests can pass a buffer.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use omero_classifier::json::{from_json_reader, to_json_string_pretty};
use omero_classifier::{ClassifierEntity, Reader, Writer};
use tracing::{debug, info};

use crate::config::{CliConfig, Command};

/// Runs the configured subcommand.
pub fn execute<W: Write>(config: &CliConfig, out: &mut W) -> Result<()> {
    match &config.command {
        Command::Inspect { file } => inspect(file, out),
        Command::Validate { file } => validate(file, out),
        Command::Write {
            input,
            annotation_id,
            output,
        } => write(config, input, *annotation_id, output.as_deref(), out),
    }
}

fn read(file: &Path) -> Result<Reader> {
    Reader::from_path(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn inspect<W: Write>(file: &Path, out: &mut W) -> Result<()> {
    let parsed = read(file)?
        .parse()
        .with_context(|| format!("Invalid classifier document {}", file.display()))?;
    writeln!(out, "{}", to_json_string_pretty(&parsed)?)?;
    Ok(())
}

fn validate<W: Write>(file: &Path, out: &mut W) -> Result<()> {
    let reader = read(file)?;
    let parsed = reader
        .parse()
        .with_context(|| format!("Invalid classifier document {}", file.display()))?;

    info!(file = %file.display(), "Document is valid");
    writeln!(out, "{}: valid", file.display())?;
    writeln!(out, "  namespace: {}", reader.namespace().unwrap_or("(none)"))?;
    writeln!(out, "  FeatureSet: {}", parsed.feature_sets.len())?;
    writeln!(out, "  ClassifierInstance: {}", parsed.classifier_instances.len())?;
    writeln!(out, "  ClassifierPrediction: {}", parsed.classifier_predictions.len())?;
    Ok(())
}

fn write<W: Write>(
    config: &CliConfig,
    input: &Path,
    annotation_id: Option<i64>,
    output: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let entity: ClassifierEntity = from_json_reader(BufReader::new(file))
        .with_context(|| format!("Invalid entity JSON in {}", input.display()))?;
    debug!(kind = entity.tag(), annotation_id, "Loaded entity");

    let writer = Writer::with_config(config.writer_config());
    match output {
        Some(path) => {
            writer
                .write_file(path, Some(&entity), annotation_id)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(kind = entity.tag(), output = %path.display(), "Wrote classifier annotation");
        }
        None => {
            writer.write_to(&mut *out, Some(&entity), annotation_id)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
