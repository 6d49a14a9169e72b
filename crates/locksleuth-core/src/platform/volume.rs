//! DOS path to NT object name translation.
//!
//! `NtQueryObject` reports file names relative to the volume device
//! (`\Device\HarddiskVolume5\dir\file`), never with a drive letter, so a
//! user-supplied `E:\dir\file` must be rewritten before it can be matched.

/// Split `E:` or `E:\rest` into the upper-case drive letter and the rest.
///
/// A `\\?\` prefix is ignored. Returns `None` for anything that does not
/// start with a drive letter.
pub fn split_drive(path: &str) -> Option<(char, &str)> {
    let path = path.strip_prefix(r"\\?\").unwrap_or(path);
    let mut chars = path.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    if chars.next() != Some(':') {
        return None;
    }
    let rest = &path[2..];
    if !rest.is_empty() && !rest.starts_with(['\\', '/']) {
        // Drive-relative paths such as `E:foo` have no fixed device path.
        return None;
    }
    Some((letter.to_ascii_uppercase(), rest))
}

/// Append a drive-relative remainder to a device name, normalising slashes.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn join_device(device: &str, rest: &str) -> String {
    let mut out = String::with_capacity(device.len() + rest.len());
    out.push_str(device);
    out.extend(rest.chars().map(|c| if c == '/' { '\\' } else { c }));
    out
}

/// The NT device behind a drive letter, e.g. `E:` to `\Device\HarddiskVolume5`.
#[cfg(windows)]
pub fn dos_device_name(drive: &str) -> Option<String> {
    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::QueryDosDeviceW;

    let (letter, _) = split_drive(drive)?;
    let name: Vec<u16> = format!("{letter}:\0").encode_utf16().collect();
    let mut buffer = vec![0u16; 1024];
    // SAFETY: `name` is null-terminated and `buffer` is a valid output slice.
    let written = unsafe { QueryDosDeviceW(PCWSTR(name.as_ptr()), Some(&mut buffer)) };
    if written == 0 {
        tracing::debug!("QueryDosDeviceW({letter}:) failed");
        return None;
    }
    // The result is a list of null-terminated strings; the first is current.
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Some(String::from_utf16_lossy(&buffer[..end]))
}

/// Rewrite `X:\rest` into the form the kernel reports for open files.
#[cfg(windows)]
pub fn nt_path(path: &str) -> Option<String> {
    let (letter, rest) = split_drive(path)?;
    let device = dos_device_name(&format!("{letter}:"))?;
    Some(join_device(&device, rest))
}
