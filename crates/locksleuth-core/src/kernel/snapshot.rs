//! System-wide handle table snapshot (`SYSTEM_HANDLE_INFORMATION_EX`).
//!
//! The kernel fills an arena buffer with a small header followed by a packed
//! array of `SYSTEM_HANDLE_TABLE_ENTRY_INFO_EX` records:
//!
//! ```text
//! 0                  : NumberOfHandles  (usize)
//! 1 * usize          : Reserved         (usize)
//! 2 * usize + n * E  : entry n, E = size_of::<RawEntry>()
//!     Object (ptr), UniqueProcessId (usize), HandleValue (usize),
//!     GrantedAccess (u32), CreatorBackTraceIndex (u16),
//!     ObjectTypeIndex (u16), HandleAttributes (u32), Reserved (u32)
//! ```
//!
//! Records are read with unaligned loads and iteration is bounded by whichever
//! is smaller: the reported count or the number of entries that physically fit.
use crate::arena::ArenaBuf;
use std::mem::size_of;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct RawHeader {
    number_of_handles: usize,
    reserved: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct RawEntry {
    object: usize,
    unique_process_id: usize,
    handle_value: usize,
    granted_access: u32,
    creator_back_trace_index: u16,
    object_type_index: u16,
    handle_attributes: u32,
    reserved: u32,
}

/// One live handle in the system. Immutable snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRecord {
    /// Owning process identifier.
    pub pid: usize,
    /// Handle value, only meaningful inside the owning process.
    pub handle_value: usize,
    pub granted_access: u32,
}

/// Arena-owned handle table returned by
/// [`enumerate_handles`](super::enumerate_handles).
#[derive(Debug)]
pub struct HandleSnapshot<'a> {
    buffer: ArenaBuf<'a>,
}

impl<'a> HandleSnapshot<'a> {
    pub(crate) fn new(buffer: ArenaBuf<'a>) -> Self {
        Self { buffer }
    }

    /// Handle count as reported by the kernel.
    pub fn reported_len(&self) -> usize {
        if self.buffer.len() < size_of::<RawHeader>() {
            return 0;
        }
        // SAFETY: the buffer holds at least one header; read_unaligned has no
        // alignment requirement.
        let header = unsafe { (self.buffer.as_ptr() as *const RawHeader).read_unaligned() };
        header.number_of_handles
    }

    /// Number of records that can actually be read.
    pub fn len(&self) -> usize {
        let room = self.buffer.len().saturating_sub(size_of::<RawHeader>()) / size_of::<RawEntry>();
        self.reported_len().min(room)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the backing buffer in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn get(&self, index: usize) -> Option<HandleRecord> {
        if index >= self.len() {
            return None;
        }
        let offset = size_of::<RawHeader>() + index * size_of::<RawEntry>();
        // SAFETY: `index < len()` guarantees the entry lies inside the buffer.
        let raw = unsafe {
            (self.buffer.as_ptr().add(offset) as *const RawEntry).read_unaligned()
        };
        Some(HandleRecord {
            pid: raw.unique_process_id,
            handle_value: raw.handle_value,
            granted_access: raw.granted_access,
        })
    }

    /// Records in table order.
    pub fn records(&self) -> impl Iterator<Item = HandleRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Bytes needed to hold `count` records.
#[cfg(test)]
pub(crate) fn required_size(count: usize) -> usize {
    size_of::<RawHeader>() + count * size_of::<RawEntry>()
}

/// Lay `records` out the way the kernel does. `buffer` must be at least
/// [`required_size`] bytes.
#[cfg(test)]
pub(crate) fn encode(records: &[HandleRecord], buffer: &mut [u8]) {
    assert!(buffer.len() >= required_size(records.len()));
    let header = RawHeader {
        number_of_handles: records.len(),
        reserved: 0,
    };
    // SAFETY: bounds asserted above; writes are unaligned.
    unsafe {
        (buffer.as_mut_ptr() as *mut RawHeader).write_unaligned(header);
        for (i, record) in records.iter().enumerate() {
            let offset = size_of::<RawHeader>() + i * size_of::<RawEntry>();
            let entry = RawEntry {
                object: 0,
                unique_process_id: record.pid,
                handle_value: record.handle_value,
                granted_access: record.granted_access,
                creator_back_trace_index: 0,
                object_type_index: 0,
                handle_attributes: 0,
                reserved: 0,
            };
            (buffer.as_mut_ptr().add(offset) as *mut RawEntry).write_unaligned(entry);
        }
    }
}
