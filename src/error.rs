use std::{error, fmt};

/// Failures surfaced by the fallible lookup and erase operations.
/// Internal structural problems are not represented here; a size or
/// balance violation is an engine bug and the debug checker panics on
/// it instead of returning a corrupted map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// the requested key has no binding in this version of the map
    KeyNotFound,
    /// the requested sorted position is not within 0..len
    RankOutOfRange { rank: usize, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::KeyNotFound => write!(f, "key not found"),
            Error::RankOutOfRange { rank, len } => {
                write!(f, "rank {} out of range for a map of {} elements", rank, len)
            }
        }
    }
}

impl error::Error for Error {}
