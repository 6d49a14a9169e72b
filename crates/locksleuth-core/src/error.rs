//! Error types for the arena and the kernel query adapter.
use crate::status::NtStatus;
use thiserror::Error;

/// Failures of the private search heap.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The heap primitive could not be resolved from the OS.
    #[error("{0} is not available on this system")]
    Unavailable(&'static str),
    #[error("the search heap could not be created")]
    CreateFailed,
    #[error("the search heap could not be destroyed")]
    DestroyFailed,
}

/// Failures surfaced by the kernel query adapter.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A required `ntdll` entry point is missing on this system.
    #[error("{0} is not available on this system")]
    Unavailable(&'static str),

    #[error("{call} failed: {status}")]
    Status { call: &'static str, status: NtStatus },

    /// The handle table would need a buffer larger than the safety ceiling.
    #[error(
        "{reason} (a {requested} byte buffer exceeds the {ceiling} byte ceiling)",
        reason = NtStatus::INSUFFICIENT_RESOURCES
    )]
    BufferCeiling { requested: usize, ceiling: usize },

    #[error("{reason} (could not allocate {size} bytes)", reason = NtStatus::NO_MEMORY)]
    OutOfMemory { size: usize },

    /// The kernel returned a name whose buffer lies outside the query buffer.
    #[error("object name information is malformed")]
    MalformedName,

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl KernelError {
    /// The closest `NTSTATUS` equivalent, for callers that log raw codes.
    pub fn status(&self) -> NtStatus {
        match self {
            Self::Unavailable(_) | Self::Arena(ArenaError::Unavailable(_)) => {
                NtStatus::PROCEDURE_NOT_FOUND
            }
            Self::Status { status, .. } => *status,
            Self::BufferCeiling { .. } => NtStatus::INSUFFICIENT_RESOURCES,
            Self::OutOfMemory { .. } => NtStatus::NO_MEMORY,
            Self::MalformedName => NtStatus::OBJECT_NAME_INVALID,
            Self::Arena(_) => NtStatus::UNSUCCESSFUL,
        }
    }
}
