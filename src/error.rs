use thiserror::Error;

/// Errors the cache can return to a filesystem caller or to itself while
/// servicing a request. Mirrors the `errno_t` family the original Serena
/// disk cache uses (`ENODEV`, `ENOMEDIUM`, `ENXIO`, `EIO`, `ENOMEM`).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    #[error("session is closed or was never registered")]
    NoDevice,
    #[error("media is absent")]
    NoMedium,
    #[error("operation not possible for this block or geometry")]
    NoSuchDevice,
    #[error("I/O error: short or failed transfer")]
    Io,
    #[error("block allocation failed")]
    NoMemory,
}
