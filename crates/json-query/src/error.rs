use thiserror::Error;

/// Everything the engine can throw, grouped by kind.
///
/// All errors are raised synchronously at the point of detection and none are
/// recovered internally; `Display` renders the single-line message shown to
/// callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ------------------------------------------------------------ Parse
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("unterminated '{0}'")]
    Unterminated(char),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{name}() takes {expected} arguments, got {got}")]
    Arity {
        name: &'static str,
        expected: String,
        got: usize,
    },

    #[error("{name}() argument {index} must be {expected}, got {got}")]
    ArgType {
        name: &'static str,
        index: usize,
        expected: String,
        got: &'static str,
    },

    #[error("bad literal: {0}")]
    BadLiteral(String),

    #[error("projection mixes keyed and bare entries")]
    MixedProjection,

    // ------------------------------------------------------------ Indexing
    #[error("cannot mix key and index entries in one bracket")]
    MixedBracket,

    #[error("recursive search is only defined for names, not {0}")]
    RecursiveKind(&'static str),

    #[error("dot indexer expects a name, string, regex or '*', got {0}")]
    BadDotIndexer(String),

    // ------------------------------------------ Vectorized arithmetic
    #[error("vectorized arithmetic: {0}")]
    VectorizedArithmetic(String),

    // ------------------------------------------------------------ Type
    #[error("type error: {0}")]
    Type(String),

    // ------------------------------------------------------- Mutation
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    // ----------------------------------------------------------- Cast
    #[error("expected {expected}, found {found}")]
    Cast {
        expected: &'static str,
        found: &'static str,
    },
}

impl Error {
    /// Shorthand for container length mismatches.
    pub(crate) fn length_mismatch(left: usize, right: usize) -> Error {
        Error::VectorizedArithmetic(format!(
            "containers have different lengths: {left} vs {right}"
        ))
    }
}
