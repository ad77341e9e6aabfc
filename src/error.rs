//! Error reporting: sticky per-thread GL-style errors and fallible-construction
//! errors for renderer setup.

use std::cell::Cell;

use thiserror::Error;

/// The ES 1.1 error kinds recorded by validation failures.
///
/// Errors are sticky per thread: the first kind recorded is kept until a
/// [`take_error`] call consumes it, later kinds are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
    StackOverflow,
    StackUnderflow,
    FramebufferIncompleteAttachment,
    FramebufferIncompleteDimensions,
}

thread_local! {
    static CURRENT_ERROR: Cell<Option<GlError>> = const { Cell::new(None) };
}

/// Records `error` in the calling thread's slot unless one is already pending.
pub fn record_error(error: GlError) {
    CURRENT_ERROR.with(|slot| {
        if slot.get().is_none() {
            log::debug!("error recorded: {error:?}");
            slot.set(Some(error));
        }
    });
}

/// Returns and clears the calling thread's pending error, if any.
pub fn take_error() -> Option<GlError> {
    CURRENT_ERROR.with(|slot| slot.take())
}

/// Returns the pending error without clearing it.
pub fn peek_error() -> Option<GlError> {
    CURRENT_ERROR.with(|slot| slot.get())
}

/// Errors that can occur while constructing or configuring a renderer.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("framebuffer dimensions {0}x{1} are outside 1..=16384")]
    InvalidDimensions(u32, u32),
    #[error("tile size {0} must be a power of two in 4..=256")]
    InvalidTileSize(u32),
    #[error("worker thread count {0} must be in 1..=256")]
    InvalidThreadCount(usize),
    #[error("unrecognized color spec {0:?} (expected ARGB8888 or XRGB8888)")]
    InvalidColorSpec(String),
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}
