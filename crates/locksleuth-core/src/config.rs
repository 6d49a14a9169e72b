//! Search tunables.
//!
//! There is no configuration file. The defaults below are the buffer sizes and
//! retry budgets of a normal search. Tests shrink them to provoke the ceiling
//! and allocation-failure paths.
use crate::kernel::{PROCESS_DUP_HANDLE, PROCESS_QUERY_INFORMATION};

/// Name used in the "could not identify" summary line.
pub const APPLICATION_NAME: &str = "LockSleuth";

/// `PH_LARGE_BUFFER_SIZE`: no handle-table buffer may grow past 256 MiB.
pub const ENUMERATION_CEILING: usize = 256 * 1024 * 1024;

/// Enumeration sizes above this are not remembered for the next search.
pub const SIZE_HINT_CEILING: usize = 0x20_0000;

pub const NAME_BUFFER_INITIAL: usize = 0x200;

/// A `UNICODE_STRING` carries at most 64 KiB of text; leave room for the header.
pub const NAME_BUFFER_CEILING: usize = 0x2_0000;

/// The I/O subsystem sometimes misreports the required name length.
pub const NAME_QUERY_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub application_name: String,
    pub enumeration_ceiling: usize,
    pub size_hint_ceiling: usize,
    pub name_buffer_initial: usize,
    pub name_buffer_ceiling: usize,
    pub name_query_attempts: u32,
    /// Access requested when opening a handle's owning process.
    pub process_access: u32,
    /// Cap on live arena bytes; `None` leaves the heap unbounded.
    pub arena_limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            application_name: APPLICATION_NAME.to_string(),
            enumeration_ceiling: ENUMERATION_CEILING,
            size_hint_ceiling: SIZE_HINT_CEILING,
            name_buffer_initial: NAME_BUFFER_INITIAL,
            name_buffer_ceiling: NAME_BUFFER_CEILING,
            name_query_attempts: NAME_QUERY_ATTEMPTS,
            process_access: PROCESS_DUP_HANDLE | PROCESS_QUERY_INFORMATION,
            arena_limit: None,
        }
    }
}
