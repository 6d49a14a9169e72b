/// Collaborator seams: where report lines go, and how the caller asks the
/// search to stop.
use super::outcome::LockHolder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sink for human-readable report lines.
pub trait Reporter {
    fn line(&mut self, line: &str);

    /// Called once per discovered holder, after its line (if any) was sent.
    fn holder(&mut self, _holder: &LockHolder) {}
}

impl Reporter for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Poll-style cancellation source, checked at process boundaries.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

impl Cancellation for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl Cancellation for Arc<AtomicBool> {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl Cancellation for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}
