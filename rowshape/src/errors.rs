use backtrace::Backtrace;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for rowshape operations.
///
/// Each kind names one category of failure so callers can decide whether to
/// retry, skip a row, or abort. Build-time kinds (`DuplicateRename`,
/// `MissingIdentity`, `MissingShape`, `UnsupportedType`, `InvalidFieldName`)
/// are raised while descriptors and migration bundles are constructed, never
/// while rows are processed.
///
/// # Examples
///
/// ```rust
/// use rowshape::errors::{ErrorKind, RowshapeError, RowshapeResult};
///
/// fn example() -> RowshapeResult<()> {
///     Err(RowshapeError::new("no shape for version 3", ErrorKind::MissingShape))
/// }
/// assert!(example().is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Declaration errors
    /// A field was renamed from more than one old name within one version
    DuplicateRename,
    /// A migration step references a version with no registered shape
    MissingShape,
    /// An entity shape has no `id` field
    MissingIdentity,
    /// A field type cannot be stored
    UnsupportedType,
    /// A table or column name is not a valid SQL identifier
    InvalidFieldName,

    // Mapping errors
    /// A required field is absent from the row and has no default
    MissingField,
    /// A stored value cannot be converted to the declared kind
    InvalidDataType,
    /// Generic error while converting between rows, records and entities
    ObjectMappingError,

    // Migration errors
    /// Error while migrating a table between versions
    MigrationError,

    // Backend errors
    /// Error reported by the SQL executor
    BackendError,
    /// The requested row or table was not found
    NotFound,
    /// Generic IO error
    IOError,

    /// The operation is not valid in the current context
    InvalidOperation,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DuplicateRename => write!(f, "Duplicate rename"),
            ErrorKind::MissingShape => write!(f, "Missing shape"),
            ErrorKind::MissingIdentity => write!(f, "Missing identity"),
            ErrorKind::UnsupportedType => write!(f, "Unsupported type"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::MissingField => write!(f, "Missing field"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::MigrationError => write!(f, "Migration error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type shared by every rowshape crate.
///
/// Carries a message, an [ErrorKind], an optional cause and the backtrace
/// captured at construction.
///
/// ```rust
/// use rowshape::errors::{ErrorKind, RowshapeError};
///
/// let cause = RowshapeError::new("disk I/O error", ErrorKind::BackendError);
/// let err = RowshapeError::new_with_cause("failed to rewrite rows", ErrorKind::MigrationError, cause);
/// assert_eq!(err.kind(), &ErrorKind::MigrationError);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct RowshapeError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RowshapeError>>,
    backtrace: Arc<RwLock<Backtrace>>,
}

impl RowshapeError {
    /// Creates a new `RowshapeError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RowshapeError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    /// Creates a new `RowshapeError` wrapping a cause.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RowshapeError) -> Self {
        RowshapeError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&RowshapeError> {
        self.cause.as_deref()
    }
}

impl Display for RowshapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RowshapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RowshapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Result alias used by all fallible rowshape operations.
pub type RowshapeResult<T> = Result<T, RowshapeError>;

impl From<std::io::Error> for RowshapeError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::IOError,
        };
        RowshapeError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::num::ParseIntError> for RowshapeError {
    fn from(err: std::num::ParseIntError) -> Self {
        RowshapeError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<std::num::ParseFloatError> for RowshapeError {
    fn from(err: std::num::ParseFloatError) -> Self {
        RowshapeError::new(
            &format!("Float parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<String> for RowshapeError {
    fn from(msg: String) -> Self {
        RowshapeError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RowshapeError {
    fn from(msg: &str) -> Self {
        RowshapeError::new(msg, ErrorKind::InternalError)
    }
}
