//! Resilient wrappers around the raw [`NtApi`] primitives.
//!
//! Each wrapper checks that its entry point exists before calling it, so a
//! missing export becomes [`KernelError::Unavailable`] rather than a crash.
use super::name::ObjectName;
use super::snapshot::HandleSnapshot;
use super::{
    Capability, KernelHandle, NtApi, RawHandle, OBJECT_NAME_INFORMATION,
    SYSTEM_EXTENDED_HANDLE_INFORMATION,
};
use crate::arena::{Arena, ArenaBuf};
use crate::config::SearchConfig;
use crate::error::KernelError;
use crate::status::Outcome;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Starting guess for the first handle-table query of the process.
pub const INITIAL_ENUMERATION_BUFFER: usize = 0x10000;

/// Remembered starting size for the next handle-table query.
///
/// A successful enumeration records the buffer size it needed so the next
/// search starts there instead of doubling up from the initial guess again.
#[derive(Debug)]
pub struct SizeHint {
    next: AtomicUsize,
}

static GLOBAL_SIZE_HINT: SizeHint = SizeHint::new(INITIAL_ENUMERATION_BUFFER);

impl SizeHint {
    pub const fn new(initial: usize) -> Self {
        Self {
            next: AtomicUsize::new(initial),
        }
    }

    /// The hint shared by every search in this process.
    pub fn global() -> &'static SizeHint {
        &GLOBAL_SIZE_HINT
    }

    pub fn get(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    /// Record `size` as the next starting guess unless it exceeds `cap`.
    pub fn remember(&self, size: usize, cap: usize) {
        if size <= cap {
            self.next.store(size, Ordering::Relaxed);
        }
    }
}

fn require<K: NtApi>(api: &K, capability: Capability) -> Result<(), KernelError> {
    if api.has(capability) {
        Ok(())
    } else {
        Err(KernelError::Unavailable(capability.entry_point()))
    }
}

/// Snapshot every handle in the system.
///
/// Starts from `hint`, doubles the buffer on every length-mismatch status and
/// gives up with [`KernelError::BufferCeiling`] once the next size would pass
/// `config.enumeration_ceiling`.
pub fn enumerate_handles<'a, K: NtApi>(
    api: &K,
    arena: &'a Arena,
    hint: &SizeHint,
    config: &SearchConfig,
) -> Result<HandleSnapshot<'a>, KernelError> {
    require(api, Capability::QuerySystemInformation)?;

    let mut size = hint.get().max(1);
    let mut buffer = arena
        .allocate(size)
        .ok_or(KernelError::OutOfMemory { size })?;

    loop {
        let mut return_length = 0u32;
        let status = api.query_system_information(
            SYSTEM_EXTENDED_HANDLE_INFORMATION,
            &mut buffer,
            &mut return_length,
        );

        match status.outcome() {
            Outcome::Success => break,
            Outcome::BufferTooSmall => {
                // Release the old block before asking for a bigger one.
                drop(buffer);
                let requested = size.saturating_mul(2);
                if requested > config.enumeration_ceiling {
                    tracing::warn!(
                        "handle table would need {requested} bytes, over the {} byte ceiling",
                        config.enumeration_ceiling
                    );
                    return Err(KernelError::BufferCeiling {
                        requested,
                        ceiling: config.enumeration_ceiling,
                    });
                }
                size = requested;
                tracing::debug!("growing handle table buffer to {size} bytes");
                buffer = arena
                    .allocate(size)
                    .ok_or(KernelError::OutOfMemory { size })?;
            }
            _ => {
                return Err(KernelError::Status {
                    call: "NtQuerySystemInformation",
                    status,
                })
            }
        }
    }

    hint.remember(size, config.size_hint_ceiling);
    let snapshot = HandleSnapshot::new(buffer);
    tracing::debug!(
        "handle table: {} entries in a {size} byte buffer",
        snapshot.len()
    );
    Ok(snapshot)
}

/// Open `pid` with `access`.
///
/// The caller's own process is never opened: the current-process
/// pseudo-handle is returned instead, and it is never closed.
pub fn open_process<K: NtApi>(
    api: &K,
    pid: usize,
    access: u32,
) -> Result<KernelHandle<'_, K>, KernelError> {
    if pid == api.current_process_id() {
        return Ok(KernelHandle::current_process(api));
    }
    require(api, Capability::OpenProcess)?;

    let mut raw = RawHandle(0);
    let status = api.open_process(pid, access, &mut raw);
    if status.is_success() {
        Ok(KernelHandle::owned(api, raw))
    } else {
        Err(KernelError::Status {
            call: "NtOpenProcess",
            status,
        })
    }
}

/// Make `source_handle` (valid inside `process`) usable in the caller.
///
/// Handles owned by the caller are already valid and come back borrowed, so
/// they are not closed when the guard drops.
pub fn duplicate_into_caller<'k, K: NtApi>(
    api: &'k K,
    process: &KernelHandle<'k, K>,
    source_handle: usize,
) -> Result<KernelHandle<'k, K>, KernelError> {
    if process.is_current_process() {
        return Ok(KernelHandle::borrowed(api, RawHandle(source_handle as isize)));
    }
    require(api, Capability::DuplicateObject)?;

    let mut raw = RawHandle(0);
    let status = api.duplicate_object(process.raw(), source_handle, &mut raw);
    if status.is_success() {
        Ok(KernelHandle::owned(api, raw))
    } else {
        Err(KernelError::Status {
            call: "NtDuplicateObject",
            status,
        })
    }
}

/// Resolve the kernel object name behind `handle` into `buffer`.
///
/// On a length-class status the buffer is replaced with one of the size the
/// kernel asked for (or double the current size when the reported length is
/// no help) and the query retried, up to `config.name_query_attempts` times.
/// Failure only ever concerns this one handle.
pub fn query_object_name<'b, 'a, K: NtApi>(
    api: &K,
    arena: &'a Arena,
    handle: RawHandle,
    buffer: &'b mut ArenaBuf<'a>,
    config: &SearchConfig,
) -> Result<ObjectName<'b>, KernelError> {
    require(api, Capability::QueryObject)?;

    let mut attempts = config.name_query_attempts;
    let status = loop {
        let mut return_length = 0u32;
        let status =
            api.query_object(handle, OBJECT_NAME_INFORMATION, &mut buffer[..], &mut return_length);
        if status.outcome() != Outcome::BufferTooSmall {
            break status;
        }

        attempts = attempts.saturating_sub(1);
        if attempts == 0 {
            break status;
        }

        let current = buffer.capacity();
        let required = return_length as usize;
        let size = if required > current {
            required
        } else {
            current.saturating_mul(2)
        };
        if size > config.name_buffer_ceiling {
            tracing::debug!("object name for handle {:#x} needs {size} bytes", handle.0);
            break status;
        }
        tracing::debug!("object name buffer: realloc from {current} to {size}");
        // Keep the old buffer if the arena refuses the new one.
        *buffer = arena
            .allocate(size)
            .ok_or(KernelError::OutOfMemory { size })?;
    };

    if !status.is_success() {
        return Err(KernelError::Status {
            call: "NtQueryObject",
            status,
        });
    }
    let buffer: &'b ArenaBuf<'a> = buffer;
    ObjectName::parse(&buffer[..])
}
