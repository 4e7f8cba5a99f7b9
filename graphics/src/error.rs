//! Error type shared by every layer of the bridge.
//!
//! Failures are plain values. Nothing in the driver panics across the host
//! boundary; [`LegacyDriver`](crate::LegacyDriver) turns these into `false`.

use std::fmt;

/// Why a bridge operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// The driver could not be brought up.
    InitializationFailed(String),
    /// A buffer could not be created or written.
    ResourceCreationFailed(String),
    /// The backend refused an allocation.
    OutOfMemory,
    /// The device stopped answering; nothing short of re-initialization helps.
    DeviceLost,
    /// Bad arguments: too few points, an empty mesh, a range past the end.
    InvalidParameter(String),
    /// Handle 0, a handle never issued, or one already removed.
    UnknownHandle(u32),
    /// Used before `init` or after `shutdown`.
    NotInitialized,
    /// Called in a scene phase that does not accept it.
    OutOfOrder {
        operation: &'static str,
        phase: &'static str,
    },
    /// The configured fence timeout elapsed.
    Timeout,
    /// Present failed; the swap chain has to be rebuilt by the host.
    SurfaceLost,
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "driver initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "buffer operation failed: {msg}"),
            Self::OutOfMemory => write!(f, "GPU allocation refused"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid argument: {msg}"),
            Self::UnknownHandle(handle) => write!(f, "unknown static buffer handle {handle}"),
            Self::NotInitialized => write!(f, "driver is not initialized"),
            Self::OutOfOrder { operation, phase } => {
                write!(f, "{operation} is not allowed while {phase}")
            }
            Self::Timeout => write!(f, "timed out waiting for a frame fence"),
            Self::SurfaceLost => write!(f, "presentation surface lost"),
        }
    }
}

impl std::error::Error for GraphicsError {}
