/// Platform-specific functionality: the `ntdll` binding, token privileges,
/// and volume device names.
#[cfg(windows)]
pub mod ntdll;
#[cfg(windows)]
pub mod privilege;
pub mod volume;

#[cfg(windows)]
pub use ntdll::NtDll;
#[cfg(windows)]
pub use privilege::{enable_debug_privilege, is_elevated};
#[cfg(windows)]
pub use volume::{dos_device_name, nt_path};
pub use volume::split_drive;
