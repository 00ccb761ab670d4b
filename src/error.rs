//! Error and status classification
//!
//! Every failure a driver or the reading pipeline can report is a variant
//! of [`Error`]. Variants are split into two families: fatal errors stop
//! reading the stream, while non-fatal ones are notices that can travel
//! alongside data (or replace it for one call) and reading may continue.
use crate::model::DataKind;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors and notices raised while reading or writing swath data
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the underlying byte stream
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// An error from a fixed-layout record parser
    #[error("binary record error: {0}")]
    Binary(#[from] binrw::Error),
    /// The stream is exhausted
    #[error("end of data")]
    Eof,
    /// A file could not be opened
    #[error("unable to open {path}: {source}")]
    OpenFail {
        /// The path that failed to open
        path: std::path::PathBuf,
        /// The underlying i/o error
        source: std::io::Error,
    },
    /// Writing to the output failed
    #[error("write failed: {0}")]
    WriteFail(String),
    /// The format identifier is not registered
    #[error("unknown format id {0}")]
    BadFormat(i32),
    /// The operation does not support this kind of record
    #[error("unsupported data kind {0}")]
    BadKind(DataKind),
    /// A caller-supplied value is out of range
    #[error("bad parameter: {0}")]
    BadParameter(String),
    /// A descriptor (platform, driver) was missing or unusable
    #[error("bad descriptor: {0}")]
    BadDescriptor(String),
    /// A typed cursor ran off the end of its buffer
    #[error("buffer exhausted: needed {needed} bytes at offset {offset} of {len}")]
    BufferExhausted {
        /// Offset at which the read or write was attempted
        offset: usize,
        /// Number of bytes the operation needed
        needed: usize,
        /// Total length of the buffer
        len: usize,
    },
    /// A bin closed without any usable ping
    #[error("no pings binned")]
    NoPingsBinned,
    /// Consecutive pings are separated by more than the configured gap
    #[error("time gap in data")]
    TimeGap,
    /// Navigation falls outside the configured longitude/latitude box
    #[error("position out of bounds")]
    OutOfBounds,
    /// Ping time falls outside the configured time window
    #[error("time out of window")]
    OutOfTime,
    /// Averaged speed is below the configured minimum
    #[error("speed too small")]
    SpeedTooSmall,
    /// A comment record was found where data was expected
    #[error("comment record")]
    Comment,
    /// A record of a kind other than survey data was found
    #[error("non-survey record")]
    Other,
    /// A record could not be understood and was skipped
    #[error("unintelligible record: {0}")]
    Unintelligible(String),
}

impl Error {
    /// Return `true` when reading this stream cannot continue
    ///
    /// ```
    /// # use swathio::Error;
    /// assert!(Error::Eof.is_fatal());
    /// assert!(!Error::TimeGap.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::TimeGap
                | Error::OutOfBounds
                | Error::OutOfTime
                | Error::SpeedTooSmall
                | Error::Comment
                | Error::Other
                | Error::Unintelligible(_)
        )
    }

    /// Return `true` for the end of data
    pub fn is_eof(&self) -> bool {
        match self {
            Error::Eof => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            Error::Binary(e) => e.is_eof(),
            _ => false,
        }
    }

    /// Map an end-of-file i/o error to [`Error::Eof`], passing others through
    pub(crate) fn from_read(e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Eof
        } else {
            Error::Io(e)
        }
    }

    /// Return the error a narrow accessor reports for a non-data store
    pub(crate) fn for_kind(kind: DataKind) -> Error {
        match kind {
            DataKind::Comment => Error::Comment,
            _ => Error::Other,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::BadFormat(7).is_fatal());
        assert!(Error::BadParameter("x".to_string()).is_fatal());
        assert!(!Error::Unintelligible("x".to_string()).is_fatal());
        assert!(!Error::SpeedTooSmall.is_fatal());
    }

    #[test]
    fn test_eof_mapping() {
        let e = Error::from_read(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(matches!(e, Error::Eof));
        assert!(e.is_eof());

        let e = Error::from_read(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!e.is_eof());
    }

    #[test]
    fn test_accessor_errors() {
        assert!(matches!(Error::for_kind(DataKind::Comment), Error::Comment));
        assert!(matches!(Error::for_kind(DataKind::Parameter), Error::Other));
    }
}
