use core::fmt;
use std::sync::Arc;

/// Error categories raised by the cursor engine.
///
/// Construction errors surface once, when a template is compiled. Everything
/// else is raised from `next_node()` (or the calls that drive it) and always
/// aborts the current call; cursors never turn a failure into an empty or
/// partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unsupported axis / node-test / step combination at template build time.
    Construction,
    /// A predicate failed to evaluate (type error, unknown variable, nested path failure).
    Eval,
    /// Detaching a detached cursor, or driving a cursor after detach.
    PoolMisuse,
    /// `next_node()` called before `set_root()`.
    ContextUndefined,
    /// The document-order comparator could not order two nodes.
    DocumentOrder,
    /// A configured evaluation bound was exceeded.
    ResourceLimit,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Construction => "construction",
            ErrorCode::Eval => "eval",
            ErrorCode::PoolMisuse => "pool-misuse",
            ErrorCode::ContextUndefined => "context-undefined",
            ErrorCode::DocumentOrder => "document-order",
            ErrorCode::ResourceLimit => "resource-limit",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn construction(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Construction, msg)
    }

    pub fn eval(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Eval, msg)
    }

    pub fn pool_misuse(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::PoolMisuse, msg)
    }

    /// Compose an error with a source cause.
    pub fn with_source(mut self, source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_construction(&self) -> bool {
        self.code == ErrorCode::Construction
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
