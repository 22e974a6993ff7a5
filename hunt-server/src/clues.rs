//! Scavenger hunt clue catalogue.
//!
//! Clues live in a JSON array on disk:
//!
//! ```json
//! [{ "id": 1, "question": "Where do ships go to rest?", "answer": "harbour" }]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single scavenger hunt clue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

/// Errors that can occur while loading the clue catalogue.
#[derive(Debug, Error)]
pub enum ClueError {
    #[error("failed to read clue file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse clue file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load clues from the JSON file at `path`.
pub fn load_clues(path: impl AsRef<Path>) -> Result<Vec<Clue>, ClueError> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|source| ClueError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_slice(&raw).map_err(|source| ClueError::Parse {
        path: path.display().to_string(),
        source,
    })
}
