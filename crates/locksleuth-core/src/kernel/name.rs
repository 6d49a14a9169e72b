//! `OBJECT_NAME_INFORMATION` view over an arena buffer.
//!
//! `NtQueryObject(ObjectNameInformation)` writes a `UNICODE_STRING` header
//! whose `Buffer` pointer refers to UTF-16 text placed later in the same
//! buffer. The text is length-prefixed (`Length` is in bytes) and not
//! null-terminated.
use crate::error::KernelError;
use std::fmt;
use std::mem::size_of;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct RawUnicodeString {
    length: u16,
    maximum_length: u16,
    buffer: usize,
}

/// Resolved object name, borrowed from the query buffer.
#[derive(Clone, Copy)]
pub struct ObjectName<'b> {
    bytes: &'b [u8],
}

impl<'b> ObjectName<'b> {
    /// Validate the header in `buffer` and locate the name text.
    pub(crate) fn parse(buffer: &'b [u8]) -> Result<Self, KernelError> {
        if buffer.len() < size_of::<RawUnicodeString>() {
            return Err(KernelError::MalformedName);
        }
        // SAFETY: length checked above; the load is unaligned.
        let header = unsafe { (buffer.as_ptr() as *const RawUnicodeString).read_unaligned() };
        let len = usize::from(header.length);
        if len == 0 {
            return Ok(Self { bytes: &[] });
        }

        let offset = header
            .buffer
            .checked_sub(buffer.as_ptr() as usize)
            .ok_or(KernelError::MalformedName)?;
        let end = offset.checked_add(len).ok_or(KernelError::MalformedName)?;
        if end > buffer.len() || len % 2 != 0 {
            return Err(KernelError::MalformedName);
        }
        Ok(Self {
            bytes: &buffer[offset..end],
        })
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// UTF-16 code units of the name.
    pub fn units(&self) -> impl Iterator<Item = u16> + 'b {
        self.bytes
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
    }

    /// True if the name begins with `prefix` (compared code unit by code unit).
    pub fn starts_with(&self, prefix: &[u16]) -> bool {
        prefix.len() <= self.len() && self.units().zip(prefix).all(|(a, &b)| a == b)
    }

    pub fn to_string_lossy(&self) -> String {
        char::decode_utf16(self.units())
            .map(|r| r.unwrap_or('\u{FFFD}'))
            .collect()
    }
}

impl fmt::Debug for ObjectName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({:?})", self.to_string_lossy())
    }
}

/// Bytes needed to return `name` from `NtQueryObject`.
#[cfg(test)]
pub(crate) fn required_size(name: &[u16]) -> usize {
    size_of::<RawUnicodeString>() + (name.len() + 1) * 2
}

/// Write `name` the way the kernel does. `buffer` must be at least
/// [`required_size`] bytes.
#[cfg(test)]
pub(crate) fn encode(name: &[u16], buffer: &mut [u8]) {
    assert!(buffer.len() >= required_size(name));
    let text = size_of::<RawUnicodeString>();
    let header = RawUnicodeString {
        length: (name.len() * 2) as u16,
        maximum_length: ((name.len() + 1) * 2) as u16,
        buffer: buffer.as_ptr() as usize + text,
    };
    // SAFETY: bounds asserted above; the header write is unaligned.
    unsafe { (buffer.as_mut_ptr() as *mut RawUnicodeString).write_unaligned(header) };
    for (i, unit) in name.iter().chain(std::iter::once(&0)).enumerate() {
        buffer[text + i * 2..text + i * 2 + 2].copy_from_slice(&unit.to_ne_bytes());
    }
}
