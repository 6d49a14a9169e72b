//! NT status codes: diagnostic messages and control-flow classes.
//!
//! [`NtStatus::message`] only ever builds log and report text.
//! [`NtStatus::outcome`] collapses the status space into the few cases the
//! adapter and engine branch on.
use std::borrow::Cow;
use std::fmt;

/// A raw `NTSTATUS` value as returned by an `ntdll` entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtStatus(pub i32);

impl NtStatus {
    pub const SUCCESS: Self = Self(0);
    pub const ALREADY_COMPLETE: Self = Self(0x0000_00FF);
    pub const BUFFER_OVERFLOW: Self = Self(0x8000_0005_u32 as i32);
    pub const UNSUCCESSFUL: Self = Self(0xC000_0001_u32 as i32);
    pub const NOT_IMPLEMENTED: Self = Self(0xC000_0002_u32 as i32);
    pub const INFO_LENGTH_MISMATCH: Self = Self(0xC000_0004_u32 as i32);
    pub const INVALID_HANDLE: Self = Self(0xC000_0008_u32 as i32);
    pub const INVALID_PARAMETER: Self = Self(0xC000_000D_u32 as i32);
    pub const NO_MEMORY: Self = Self(0xC000_0017_u32 as i32);
    pub const ACCESS_DENIED: Self = Self(0xC000_0022_u32 as i32);
    pub const BUFFER_TOO_SMALL: Self = Self(0xC000_0023_u32 as i32);
    pub const OBJECT_TYPE_MISMATCH: Self = Self(0xC000_0024_u32 as i32);
    pub const OBJECT_NAME_INVALID: Self = Self(0xC000_0033_u32 as i32);
    pub const OBJECT_NAME_NOT_FOUND: Self = Self(0xC000_0034_u32 as i32);
    pub const OBJECT_PATH_INVALID: Self = Self(0xC000_0039_u32 as i32);
    pub const SHARING_VIOLATION: Self = Self(0xC000_0043_u32 as i32);
    pub const PROCEDURE_NOT_FOUND: Self = Self(0xC000_007A_u32 as i32);
    pub const INSUFFICIENT_RESOURCES: Self = Self(0xC000_009A_u32 as i32);
    pub const NOT_SUPPORTED: Self = Self(0xC000_00BB_u32 as i32);

    /// `NT_SUCCESS()`: success and informational codes are non-negative.
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    /// Short human-readable description, for diagnostics only.
    pub fn message(self) -> Cow<'static, str> {
        let text = match self {
            Self::UNSUCCESSFUL => "Operation Failed",
            Self::BUFFER_OVERFLOW => "Buffer Overflow",
            Self::NOT_IMPLEMENTED => "Not Implemented",
            Self::INFO_LENGTH_MISMATCH => "Info Length Mismatch",
            Self::INVALID_HANDLE => "Invalid Handle",
            Self::INVALID_PARAMETER => "Invalid Parameter",
            Self::NO_MEMORY => "Not Enough Quota",
            Self::ACCESS_DENIED => "Access Denied",
            Self::BUFFER_TOO_SMALL => "Buffer Too Small",
            Self::OBJECT_TYPE_MISMATCH => "Wrong Type",
            Self::OBJECT_NAME_INVALID => "Object Name Invalid",
            Self::OBJECT_NAME_NOT_FOUND => "Object Name not found",
            Self::OBJECT_PATH_INVALID => "Object Path Invalid",
            Self::SHARING_VIOLATION => "Sharing Violation",
            Self::PROCEDURE_NOT_FOUND => "Procedure not found",
            Self::INSUFFICIENT_RESOURCES => "Insufficient resources",
            Self::NOT_SUPPORTED => "Operation is not supported",
            other => return Cow::Owned(format!("Unknown error 0x{:08x}", other.0 as u32)),
        };
        Cow::Borrowed(text)
    }

    /// Classify this status for control flow.
    pub fn outcome(self) -> Outcome {
        match self {
            Self::INFO_LENGTH_MISMATCH | Self::BUFFER_OVERFLOW | Self::BUFFER_TOO_SMALL => {
                Outcome::BufferTooSmall
            }
            Self::ACCESS_DENIED => Outcome::AccessDenied,
            Self::INSUFFICIENT_RESOURCES | Self::NO_MEMORY => Outcome::InsufficientResources,
            s if s.is_success() => Outcome::Success,
            _ => Outcome::Failure,
        }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// The closed set of status classes the adapter and engine branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Retry with a larger buffer (length mismatch, overflow, too small).
    BufferTooSmall,
    /// Expected for protected processes; memoized by the engine.
    AccessDenied,
    InsufficientResources,
    Failure,
}
