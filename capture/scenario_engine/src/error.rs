use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a player.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The timing configuration cannot drive a reveal.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
}

/// Errors raised while loading a scenario catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("reading catalog {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The catalog is not valid JSON for the scenario schema.
    #[error("parsing catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two scenarios share an id.
    #[error("duplicate scenario id `{0}`")]
    DuplicateId(String),
    /// A scenario has a blank id.
    #[error("scenario with empty id (title `{0}`)")]
    EmptyId(String),
}

/// Errors raised by the scenario browser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// No scenario with this id exists in the catalog.
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
    /// The action needs a selected scenario.
    #[error("no scenario selected")]
    NoSelection,
    /// The player for the selection could not be built.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// A label on the command line or in a file did not name a known value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

impl ParseLabelError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
