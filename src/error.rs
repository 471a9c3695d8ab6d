use std::io;

/// Error taxonomy shared by every stage of the engine.
///
/// A headword that is not indexed and a synonym pair that cannot be resolved
/// are *not* errors; they surface as `QueryOutcome::NotIndexed` and as a
/// `PairReport` with empty fields respectively.
#[derive(Debug, thiserror::Error)]
pub enum SimsError {
    /// Corrupt or malformed persisted artifact / input file.
    #[error("{context}: line {line}: {message}")]
    Format {
        context: &'static str,
        line: usize,
        message: String,
    },

    /// A component was used before it was built or loaded.
    #[error("{0} is not ready (build or load it first)")]
    NotReady(&'static str),

    #[error("document id {id} out of range (0..{len})")]
    OutOfRange { id: usize, len: usize },

    #[error("document {doc}: {reason}")]
    MalformedDocument { doc: usize, reason: String },

    #[error("duplicate headword {word:?} (documents {first} and {second})")]
    DuplicateHeadword {
        word: String,
        first: usize,
        second: usize,
    },

    #[error("{what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl SimsError {
    pub(crate) fn format(context: &'static str, line: usize, message: impl Into<String>) -> Self {
        SimsError::Format {
            context,
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimsError>;
