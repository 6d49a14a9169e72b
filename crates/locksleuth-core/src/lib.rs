/// LockSleuth Core: find the processes holding a file or volume open.
///
/// The crate walks every open handle in the system, duplicates the ones that
/// refer to disk files into its own process, resolves their kernel object
/// names and reports the owners of those that match a target path.
///
/// # Modules
///
/// - [`arena`]: private growable heap for the large, short-lived buffers.
/// - [`kernel`]: the `NtApi` seam and resilient query wrappers over it.
/// - [`search`]: the search engine and its background worker.
/// - [`platform`]: `ntdll` binding, token privileges, volume device names.
/// - [`status`]: `NTSTATUS` codes, messages and outcome classes.
pub mod arena;
pub mod config;
pub mod error;
pub mod kernel;
pub mod platform;
pub mod search;
pub mod status;

pub use config::SearchConfig;
pub use error::{ArenaError, KernelError};
pub use search::{
    start_search_with, Cancellation, HandleSearch, LockHolder, NeverCancel, Reporter,
    SearchHandle, SearchOptions, SearchOutcome, SearchProgress, SearchStats,
};
#[cfg(windows)]
pub use search::{search, start_search};
pub use status::NtStatus;
