//! Writer implementations

// Standard library
use std::io;

// External dependencies
use tracing_subscriber::fmt::writer::BoxMakeWriter;

// Internal crates
use crate::LogResult;
use crate::config::WriterConfig;

/// Create a writer from configuration
pub fn make_writer(config: &WriterConfig) -> LogResult<BoxMakeWriter> {
    let writer: BoxMakeWriter = match config {
        WriterConfig::Stderr => BoxMakeWriter::new(io::stderr),
        WriterConfig::Stdout => BoxMakeWriter::new(io::stdout),

        WriterConfig::Multi(writers) => {
            // For now, use the first writer.
            if writers.is_empty() {
                return Err(crate::Error::Config(
                    "Multi writer needs at least one writer".into(),
                ));
            }
            return make_writer(&writers[0]);
        }
    };

    Ok(writer)
}
