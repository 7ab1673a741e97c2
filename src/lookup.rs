//! Three-way outcome of a confined operation.

use crate::error::JailError;

/// Outcome of resolving a path or running an operation on it.
///
/// `Absent` covers both "does not exist" and "resolves outside the jail".
/// The two are deliberately indistinguishable so callers cannot probe what
/// lies beyond the jail boundary. Everything else that goes wrong is
/// `Failed`.
///
/// Use [`into_result`](Self::into_result) to get a `Result<Option<T>, _>`
/// that works with `?`.
#[derive(Debug)]
#[must_use = "a Lookup may be Failed; handle it"]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed(JailError),
}

impl<T> Lookup<T> {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The found value, discarding both `Absent` and `Failed`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    /// The error, if this outcome is `Failed`.
    pub fn err(self) -> Option<JailError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Found(_) | Self::Absent => None,
        }
    }

    /// Convert into the `?`-friendly form: `Absent` becomes `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, JailError> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::Absent => Ok(None),
            Self::Failed(err) => Err(err),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::Absent => Lookup::Absent,
            Self::Failed(err) => Lookup::Failed(err),
        }
    }

    pub fn and_then<U, F: FnOnce(T) -> Lookup<U>>(self, f: F) -> Lookup<U> {
        match self {
            Self::Found(value) => f(value),
            Self::Absent => Lookup::Absent,
            Self::Failed(err) => Lookup::Failed(err),
        }
    }

    /// Return the found value or panic with the outcome.
    ///
    /// Meant for tests and examples.
    #[track_caller]
    pub fn unwrap_found(self) -> T {
        match self {
            Self::Found(value) => value,
            Self::Absent => panic!("called `Lookup::unwrap_found()` on an `Absent` value"),
            Self::Failed(err) => {
                panic!("called `Lookup::unwrap_found()` on a `Failed` value: {err}")
            }
        }
    }
}

impl<T> From<Result<Option<T>, JailError>> for Lookup<T> {
    fn from(result: Result<Option<T>, JailError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::Absent,
            Err(err) => Self::Failed(err),
        }
    }
}

impl<T> From<Lookup<T>> for Result<Option<T>, JailError> {
    #[inline]
    fn from(lookup: Lookup<T>) -> Self {
        lookup.into_result()
    }
}
