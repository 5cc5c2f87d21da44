use spawner_model::ErrorKind;
use std::fmt::{Display, Formatter};

/// Anything that can say which [`ErrorKind`] a failure belongs to.
///
/// # Example
///
/// ```
/// use spawner_model::ErrorKind;
/// use spawner_provider::AsErrorKind;
/// struct Lookup {
///     found: bool,
/// }
/// impl AsErrorKind for Lookup {
///     fn as_error_kind(&self) -> ErrorKind {
///         if self.found {
///             ErrorKind::NodeGroupExists
///         } else {
///             ErrorKind::NoNodeGroup
///         }
///     }
/// }
/// ```
///
pub trait AsErrorKind {
    fn as_error_kind(&self) -> ErrorKind;
}

impl AsErrorKind for ErrorKind {
    fn as_error_kind(&self) -> ErrorKind {
        *self
    }
}

impl AsErrorKind for &ErrorKind {
    fn as_error_kind(&self) -> ErrorKind {
        **self
    }
}

impl AsErrorKind for spawner_model::Error {
    fn as_error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

/// The error type returned by [`Controller`](crate::Controller) operations.
#[derive(Debug)]
pub struct ProviderError {
    /// The category the caller can branch on.
    kind: ErrorKind,

    /// Any message to be included with the error. This will be included in the formatted display
    /// before `inner`.
    context: Option<String>,

    /// The error that caused this error, e.g. the vendor SDK error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by [`Controller`](crate::Controller) operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new_with_source_and_context<K, S, E>(kind: K, context: S, source: E) -> Self
    where
        K: AsErrorKind,
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind: kind.as_error_kind(),
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<K, E>(kind: K, source: E) -> Self
    where
        K: AsErrorKind,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind: kind.as_error_kind(),
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<K, S>(kind: K, context: S) -> Self
    where
        K: AsErrorKind,
        S: Into<String>,
    {
        Self {
            kind: kind.as_error_kind(),
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }

    /// The human readable message without the kind prefix.
    pub fn message(&self) -> String {
        match (self.context(), self.inner()) {
            (Some(context), Some(inner)) => format!("{}: {}", context, inner),
            (Some(context), None) => context.to_string(),
            (None, Some(inner)) => inner.to_string(),
            (None, None) => self.kind.to_string(),
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message())
    }
}

// Make `ProviderError` function as a standard error.
impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `ProviderError` using a familiar
/// `context` function.
pub trait IntoProviderError<T> {
    /// Convert `self` into a `ProviderError`.
    fn context<K, S>(self, kind: K, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        K: AsErrorKind;
}

// Implement `IntoProviderError` for all standard `Error + Send + Sync + 'static` types.
impl<T, E> IntoProviderError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<K, S>(self, kind: K, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        K: AsErrorKind,
    {
        self.map_err(|e| ProviderError::new_with_source_and_context(kind, message, e))
    }
}

// Implement `IntoProviderError` for options where `None` is converted into an error.
impl<T> IntoProviderError<T> for std::option::Option<T> {
    fn context<K, S>(self, kind: K, message: S) -> Result<T, ProviderError>
    where
        S: Into<String>,
        K: AsErrorKind,
    {
        self.ok_or_else(|| ProviderError::new_with_context(kind, message))
    }
}

impl From<spawner_model::Error> for ProviderError {
    fn from(e: spawner_model::Error) -> Self {
        ProviderError::new_with_source(e.kind(), e)
    }
}
