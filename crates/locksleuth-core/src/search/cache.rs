/// Per-process state carried across consecutive handle-table records.
///
/// The handle table is grouped by owning process, so the search keeps the
/// current owner's process handle open while it walks that owner's records
/// and closes it the moment the owner changes.
use crate::kernel::{KernelHandle, NtApi};
use std::fmt;

/// Which process, if any, the search currently holds open.
///
/// At most one process handle is live at a time. The current-process
/// pseudo-handle may sit in [`Open`](Self::Open) but is never closed.
pub enum ProcessSlot<'k, K: NtApi> {
    Closed,
    Open {
        pid: usize,
        process: KernelHandle<'k, K>,
    },
    /// The owner could not be opened; its remaining records are skipped.
    Unreachable { pid: usize },
}

impl<'k, K: NtApi> ProcessSlot<'k, K> {
    pub fn pid(&self) -> Option<usize> {
        match self {
            Self::Closed => None,
            Self::Open { pid, .. } | Self::Unreachable { pid } => Some(*pid),
        }
    }

    /// A record owned by `pid` starts a new process run.
    pub fn is_boundary(&self, pid: usize) -> bool {
        self.pid() != Some(pid)
    }

    pub fn open(&mut self, pid: usize, process: KernelHandle<'k, K>) {
        self.close();
        *self = Self::Open { pid, process };
    }

    pub fn mark_unreachable(&mut self, pid: usize) {
        self.close();
        *self = Self::Unreachable { pid };
    }

    /// Release the held process handle (a no-op for the pseudo-handle).
    pub fn close(&mut self) {
        if let Self::Open { pid, .. } = self {
            tracing::trace!("closing process {pid}");
        }
        *self = Self::Closed;
    }

    pub fn process(&self) -> Option<&KernelHandle<'k, K>> {
        match self {
            Self::Open { process, .. } => Some(process),
            _ => None,
        }
    }
}

impl<K: NtApi> fmt::Debug for ProcessSlot<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("Closed"),
            Self::Open { pid, process } => f
                .debug_struct("Open")
                .field("pid", pid)
                .field("process", process)
                .finish(),
            Self::Unreachable { pid } => f.debug_struct("Unreachable").field("pid", pid).finish(),
        }
    }
}

/// The last process whose open failed with access-denied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DenialMemo(Option<usize>);

impl DenialMemo {
    pub fn remember(&mut self, pid: usize) {
        self.0 = Some(pid);
    }

    pub fn is_denied(&self, pid: usize) -> bool {
        self.0 == Some(pid)
    }
}
