use std::error::Error;

/// Result type that is being returned from methods that can fail and thus have [`FingerpostError`]s.
pub type FingerpostResult<T> = Result<T, FingerpostError>;

/// Errors that can result from Fingerpost.
// [`Error`] is public, but opaque and easy to keep compatible.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct FingerpostError(#[from] FingerpostErrorKind);

// Accessors for anything we do want to expose publicly.
impl FingerpostError {
    /// Expose the inner error kind.
    ///
    /// This is useful for matching on the error kind.
    pub fn into_inner(self) -> FingerpostErrorKind {
        self.0
    }
}

/// [`FingerpostErrorKind`] describes the errors that can happen while building,
/// reading, or checking an index file.
///
/// This is a non-exhaustive enum, so additional variants may be added in future. It is
/// recommended to match against the wildcard `_` instead of listing all possible variants,
/// to avoid problems when new variants are added.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, displaydoc::Display)]
pub enum FingerpostErrorKind {
    /// An error occurred while reading from or writing to a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The file does not start with the index magic number
    BadMagicNumber,
    /// A word is too long to fit the on-disk 16-bit length field
    WordTooLong,
    /// A document name is too long to fit the on-disk 16-bit length field
    DocumentNameTooLong,
    /// The index outgrew the 32-bit on-disk offset range
    IndexTooLarge,
    /// A string stored in the index file is not valid UTF-8
    CorruptString,
}

impl From<std::io::Error> for FingerpostError {
    fn from(value: std::io::Error) -> Self {
        Self(FingerpostErrorKind::Io(value))
    }
}

trait FingerpostErrorMarker: Error {}

impl<E> From<E> for FingerpostError
where
    E: FingerpostErrorMarker,
    FingerpostErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Self(FingerpostErrorKind::from(value))
    }
}
