use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A batch record has neither the key column nor any alias with a value.
    /// The record is skipped; the rest of the batch is still reconciled.
    #[error("record #{index} has no '{key_column}' value (or alias); skipped")]
    MissingKeyColumn { index: usize, key_column: String },

    /// The store exists but could not be read. Nothing was written.
    #[error("failed to read store {}: {source}", .path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the store failed. The file may need manual inspection.
    #[error("failed to write store {}: {source}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid store options: {0}")]
    InvalidOptions(String),
}

impl StoreError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        Self::StoreRead { path: path.into(), source: source.into() }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        Self::StoreWrite { path: path.into(), source: source.into() }
    }

    /// Read failures leave the store untouched; write failures may not.
    pub fn store_may_be_inconsistent(&self) -> bool {
        matches!(self, Self::StoreWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = StoreError::read("projects.csv", io::Error::new(io::ErrorKind::InvalidData, "bad row"));
        assert_eq!(err.to_string(), "failed to read store projects.csv: bad row");
        assert!(!err.store_may_be_inconsistent());

        let err = StoreError::write("projects.csv", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.store_may_be_inconsistent());
    }
}
