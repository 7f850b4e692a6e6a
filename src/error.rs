use thiserror::Error;

/// Errors produced by trajectory indexing, generic over the engine's own
/// error type. Engine faults are passed through untranslated; the wrapper
/// has no recovery strategy of its own.
#[derive(Error, Debug)]
pub enum TrajError<E>
where
    E: std::error::Error + 'static,
{
    #[error("index {index} is out of bounds for a trajectory of length {len}")]
    OutOfBounds { index: isize, len: usize },
    #[error(transparent)]
    Engine(#[from] E),
}

/// Resolves a possibly-negative index against a sequence of length `len`.
pub(crate) fn resolve_index<E>(index: isize, len: usize) -> Result<usize, TrajError<E>>
where
    E: std::error::Error + 'static,
{
    let mut i = index;
    if i < 0 {
        i += len as isize;
    }
    if i < 0 || i as usize >= len {
        return Err(TrajError::OutOfBounds { index, len });
    }
    Ok(i as usize)
}
