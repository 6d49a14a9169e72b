/// Token checks and adjustments for the current process.
///
/// Opening other users' and system processes with duplicate-handle access
/// needs an elevated token, and `SeDebugPrivilege` widens that further.
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, GetLastError, BOOL, ERROR_NOT_ALL_ASSIGNED, HANDLE, LUID};
use windows::Win32::Security::{
    AdjustTokenPrivileges, GetTokenInformation, LookupPrivilegeValueW, TokenElevation,
    LUID_AND_ATTRIBUTES, SE_DEBUG_NAME, SE_PRIVILEGE_ENABLED, TOKEN_ADJUST_PRIVILEGES,
    TOKEN_ACCESS_MASK, TOKEN_ELEVATION, TOKEN_PRIVILEGES, TOKEN_QUERY,
};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

/// The current process token, closed on drop.
struct ProcessToken(HANDLE);

impl ProcessToken {
    fn open(access: TOKEN_ACCESS_MASK) -> windows::core::Result<Self> {
        let mut token = HANDLE::default();
        // SAFETY: the pseudo-handle is always valid; `token` receives a new handle.
        unsafe { OpenProcessToken(GetCurrentProcess(), access, &mut token)? };
        Ok(Self(token))
    }
}

impl Drop for ProcessToken {
    fn drop(&mut self) {
        // SAFETY: the handle came from OpenProcessToken and is closed once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

/// Whether the process token is elevated (running as administrator).
pub fn is_elevated() -> bool {
    let Ok(token) = ProcessToken::open(TOKEN_QUERY) else {
        return false;
    };
    let mut elevation = TOKEN_ELEVATION::default();
    let mut written = 0u32;
    // SAFETY: `elevation` is a TOKEN_ELEVATION and the size passed matches it.
    let queried = unsafe {
        GetTokenInformation(
            token.0,
            TokenElevation,
            Some(&mut elevation as *mut TOKEN_ELEVATION as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut written,
        )
    };
    queried.is_ok() && elevation.TokenIsElevated != 0
}

/// Enable `SeDebugPrivilege` on the process token.
///
/// Fails with `ERROR_NOT_ALL_ASSIGNED` when the token does not hold the
/// privilege at all (any non-elevated session).
pub fn enable_debug_privilege() -> windows::core::Result<()> {
    let token = ProcessToken::open(TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY)?;
    // SAFETY: `token` is open with TOKEN_ADJUST_PRIVILEGES for the whole call.
    unsafe { adjust_debug_privilege(token.0) }
}

unsafe fn adjust_debug_privilege(token: HANDLE) -> windows::core::Result<()> {
    let mut luid = LUID::default();
    LookupPrivilegeValueW(PCWSTR::null(), SE_DEBUG_NAME, &mut luid)?;

    let privileges = TOKEN_PRIVILEGES {
        PrivilegeCount: 1,
        Privileges: [LUID_AND_ATTRIBUTES {
            Luid: luid,
            Attributes: SE_PRIVILEGE_ENABLED,
        }],
    };
    AdjustTokenPrivileges(
        token,
        BOOL::from(false),
        Some(&privileges as *const TOKEN_PRIVILEGES),
        0,
        None,
        None,
    )?;

    // AdjustTokenPrivileges reports success even if nothing was assigned.
    if GetLastError() == ERROR_NOT_ALL_ASSIGNED {
        return Err(ERROR_NOT_ALL_ASSIGNED.to_hresult().into());
    }
    Ok(())
}
