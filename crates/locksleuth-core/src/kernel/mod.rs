//! Kernel query adapter.
//!
//! [`NtApi`] is the raw seam to the handful of `ntdll`/Win32 entry points the
//! search needs. On Windows it is implemented by
//! [`platform::NtDll`](crate::platform::NtDll), a capability table resolved at
//! runtime; unit tests plug in an in-memory fake kernel.
//!
//! The resilient wrappers on top of it (buffer-growth retry, capability
//! checks, the current-process special case) live in [`query`].
pub mod name;
pub mod query;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod fake;

pub use name::ObjectName;
pub use query::{
    duplicate_into_caller, enumerate_handles, open_process, query_object_name, SizeHint,
};
pub use snapshot::{HandleRecord, HandleSnapshot};

use crate::status::NtStatus;
use std::fmt;

/// `SystemExtendedHandleInformation` class for `NtQuerySystemInformation`.
pub const SYSTEM_EXTENDED_HANDLE_INFORMATION: u32 = 64;
/// `ObjectNameInformation` class for `NtQueryObject`.
pub const OBJECT_NAME_INFORMATION: u32 = 1;

pub const PROCESS_DUP_HANDLE: u32 = 0x0040;
pub const PROCESS_QUERY_INFORMATION: u32 = 0x0400;

/// A process-local handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub isize);

impl RawHandle {
    /// `NtCurrentProcess()`: a pseudo-handle that is never closed.
    pub const CURRENT_PROCESS: Self = Self(-1);

    pub fn is_current_process(self) -> bool {
        self == Self::CURRENT_PROCESS
    }
}

/// Coarse `GetFileType` classification of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Disk,
    Char,
    Pipe,
    Remote,
    Unknown,
}

/// Entry points that may be missing on a given OS build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    QuerySystemInformation,
    QueryObject,
    OpenProcess,
    DuplicateObject,
    Close,
}

impl Capability {
    /// Name of the `ntdll` export backing this capability.
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::QuerySystemInformation => "NtQuerySystemInformation",
            Self::QueryObject => "NtQueryObject",
            Self::OpenProcess => "NtOpenProcess",
            Self::DuplicateObject => "NtDuplicateObject",
            Self::Close => "NtClose",
        }
    }
}

/// Raw kernel primitives. Implementations never panic; a missing entry point
/// is reported through [`NtApi::has`] and, if called anyway, as
/// [`NtStatus::PROCEDURE_NOT_FOUND`].
pub trait NtApi {
    fn has(&self, capability: Capability) -> bool;

    fn current_process_id(&self) -> usize;

    /// `NtQuerySystemInformation` into `buffer`.
    fn query_system_information(
        &self,
        class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus;

    /// `NtQueryObject` on a handle valid in the calling process.
    fn query_object(
        &self,
        handle: RawHandle,
        class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus;

    /// `NtOpenProcess` by client id.
    fn open_process(&self, pid: usize, access: u32, process: &mut RawHandle) -> NtStatus;

    /// `NtDuplicateObject` from `source_process` into the calling process.
    fn duplicate_object(
        &self,
        source_process: RawHandle,
        source_handle: usize,
        target: &mut RawHandle,
    ) -> NtStatus;

    fn close(&self, handle: RawHandle) -> NtStatus;

    fn file_type(&self, handle: RawHandle) -> FileType;

    /// Full Win32 image path of the process behind `process`.
    fn image_path(&self, process: RawHandle) -> Option<String>;
}

/// A handle that is closed through the adapter when dropped, unless it is
/// borrowed (the current-process pseudo-handle, or a raw value that already
/// belongs to the caller).
pub struct KernelHandle<'k, K: NtApi> {
    api: &'k K,
    raw: RawHandle,
    owned: bool,
}

impl<'k, K: NtApi> KernelHandle<'k, K> {
    pub fn owned(api: &'k K, raw: RawHandle) -> Self {
        Self {
            api,
            raw,
            owned: !raw.is_current_process(),
        }
    }

    pub fn borrowed(api: &'k K, raw: RawHandle) -> Self {
        Self {
            api,
            raw,
            owned: false,
        }
    }

    pub fn current_process(api: &'k K) -> Self {
        Self::borrowed(api, RawHandle::CURRENT_PROCESS)
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn is_current_process(&self) -> bool {
        self.raw.is_current_process()
    }
}

impl<K: NtApi> Drop for KernelHandle<'_, K> {
    fn drop(&mut self) {
        if self.owned {
            let status = self.api.close(self.raw);
            if !status.is_success() {
                tracing::debug!("NtClose({:#x}) failed: {status}", self.raw.0);
            }
        }
    }
}

impl<K: NtApi> fmt::Debug for KernelHandle<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("raw", &format_args!("{:#x}", self.raw.0))
            .field("owned", &self.owned)
            .finish()
    }
}
