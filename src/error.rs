use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid topology {sizes:?}: need at least two layers and every layer must be non-empty")]
    InvalidTopology { sizes: Vec<usize> },
    #[error("shape mismatch in {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch { what: &'static str, expected: (usize, usize), found: (usize, usize) },
    #[error("flat {what} buffer has {found} entries, topology requires {expected}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },
    #[error("deviation {0} is outside of [0, 1]")]
    InvalidDeviation(f32),
    #[error("failed to read brain from {}", path.display())]
    PersistenceRead {
        path:   PathBuf,
        #[source]
        source: BoxedSource,
    },
    #[error("failed to write brain to {}", path.display())]
    PersistenceWrite {
        path:   PathBuf,
        #[source]
        source: BoxedSource,
    },
    #[error("failed to load config from {}", path.display())]
    Config {
        path:   PathBuf,
        #[source]
        source: BoxedSource,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("track has no checkpoints")]
    NoCheckpoints,
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::PersistenceRead { path: path.into(), source: source.into() }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::PersistenceWrite { path: path.into(), source: source.into() }
    }
}
