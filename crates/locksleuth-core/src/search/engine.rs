//! The handle search loop.
//!
//! One [`HandleSearch::run`] enumerates every handle in the system, walks the
//! table in order (it is grouped by owning process), and for every disk-file
//! handle whose object name matches the target reports the owning process.
//!
//! Every per-process and per-handle failure only skips that unit of work. The
//! run as a whole never fails: it returns a [`SearchOutcome`] and leaves the
//! diagnostics to the [`Reporter`].
use super::cache::{DenialMemo, ProcessSlot};
use super::matcher::NameMatcher;
use super::outcome::{LockHolder, SearchOptions, SearchOutcome, SearchStats};
use super::report::{Cancellation, Reporter};
use crate::arena::Arena;
use crate::config::SearchConfig;
use crate::error::KernelError;
use crate::kernel::{
    duplicate_into_caller, enumerate_handles, open_process, query_object_name, FileType, NtApi,
    SizeHint,
};
use crate::status::Outcome;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Searches the system handle table for holders of one path.
pub struct HandleSearch<'k, K: NtApi> {
    api: &'k K,
    config: SearchConfig,
    size_hint: &'k SizeHint,
}

impl<'k, K: NtApi> HandleSearch<'k, K> {
    /// A search that shares the process-wide enumeration size hint.
    pub fn new(api: &'k K, config: SearchConfig) -> Self {
        Self::with_size_hint(api, config, SizeHint::global())
    }

    pub fn with_size_hint(api: &'k K, config: SearchConfig, size_hint: &'k SizeHint) -> Self {
        Self {
            api,
            config,
            size_hint,
        }
    }

    /// Find every process holding `target` open.
    ///
    /// `target` is an NT object name such as `\Device\HarddiskVolume5\x.bin`.
    /// Report lines go to `reporter`; `cancel` is polled at every process
    /// boundary. A cancelled search reports "not found".
    pub fn run(
        &self,
        target: &str,
        options: SearchOptions,
        reporter: &mut dyn Reporter,
        cancel: &dyn Cancellation,
    ) -> SearchOutcome {
        let started_at = chrono::Local::now();
        let clock = Instant::now();
        info!(
            "Searching for processes holding {target} (partial: {}, whole volume: {}, ignore self: {})",
            options.partial_match, options.whole_volume, options.ignore_self
        );

        let mut lines = Lines::new(reporter);
        let mut outcome = SearchOutcome {
            found: false,
            cancelled: false,
            holders: Vec::new(),
            stats: SearchStats::default(),
            started_at,
            duration: Duration::ZERO,
        };

        if target.is_empty() {
            warn!("Empty target path, nothing to search for");
        } else {
            match Arena::with_limit(self.config.arena_limit) {
                Ok(arena) => {
                    self.walk(&arena, target, options, &mut lines, cancel, &mut outcome);
                    if let Err(e) = arena.destroy() {
                        warn!("Could not release the search arena: {e}");
                    }
                }
                Err(e) => {
                    let e = KernelError::from(e);
                    warn!("Could not create the search arena: {e}");
                    lines.emit(format!("Warning: Could not enumerate process handles: {e}"));
                }
            }
        }

        outcome.found = !outcome.holders.is_empty() && !outcome.cancelled;
        if outcome.found {
            lines.emit(
                "You should try to close these applications before attempting to reformat the drive."
                    .to_string(),
            );
        } else {
            lines.emit(format!(
                "NOTE: {} was not able to identify the process(es) preventing access to {target}",
                self.config.application_name
            ));
        }

        outcome.duration = clock.elapsed();
        let s = &outcome.stats;
        info!(
            "Search finished in {:.2?}: {} holder(s), {} records, {} opens ({} ok, {} denied), {} duplicated, {} names",
            outcome.duration,
            outcome.holders.len(),
            s.records_examined,
            s.open_attempts,
            s.processes_opened,
            s.processes_denied,
            s.handles_duplicated,
            s.names_resolved,
        );
        outcome
    }

    fn walk(
        &self,
        arena: &Arena,
        target: &str,
        options: SearchOptions,
        lines: &mut Lines<'_>,
        cancel: &dyn Cancellation,
        outcome: &mut SearchOutcome,
    ) {
        let snapshot = match enumerate_handles(self.api, arena, self.size_hint, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Handle enumeration failed: {e}");
                lines.emit(format!("Warning: Could not enumerate process handles: {e}"));
                return;
            }
        };

        let matcher = if options.whole_volume {
            NameMatcher::volume(target)
        } else {
            NameMatcher::new(target, options.partial_match)
        };
        let Some(mut name_buf) = arena.allocate(self.config.name_buffer_initial) else {
            lines.emit("Warning: Could not allocate the object name buffer".to_string());
            return;
        };

        let stats = &mut outcome.stats;
        let mut slot = ProcessSlot::Closed;
        let mut memo = DenialMemo::default();
        let mut last_holder: Option<usize> = None;
        let mut header_sent = false;

        for record in snapshot.records() {
            stats.records_examined += 1;
            let pid = record.pid;

            if slot.is_boundary(pid) {
                slot.close();
                if cancel.is_cancelled() {
                    info!("Search cancelled at process {pid}");
                    outcome.cancelled = true;
                    break;
                }
                if memo.is_denied(pid) {
                    slot.mark_unreachable(pid);
                    continue;
                }

                stats.open_attempts += 1;
                match open_process(self.api, pid, self.config.process_access) {
                    Ok(process) => {
                        stats.processes_opened += 1;
                        slot.open(pid, process);
                    }
                    Err(e) => {
                        debug!("Could not open process {pid}: {e}");
                        if e.status().outcome() == Outcome::AccessDenied {
                            memo.remember(pid);
                            stats.processes_denied += 1;
                        }
                        slot.mark_unreachable(pid);
                        continue;
                    }
                }
            }

            let Some(process) = slot.process() else {
                continue;
            };
            if options.ignore_self && process.is_current_process() {
                continue;
            }

            let handle = match duplicate_into_caller(self.api, process, record.handle_value) {
                Ok(handle) => handle,
                Err(e) => {
                    debug!(
                        "Could not duplicate handle {:#x} of process {pid}: {e}",
                        record.handle_value
                    );
                    continue;
                }
            };
            if !process.is_current_process() {
                stats.handles_duplicated += 1;
            }

            // Name queries on pipes and some device objects can block forever.
            if self.api.file_type(handle.raw()) != FileType::Disk {
                continue;
            }

            let name =
                match query_object_name(self.api, arena, handle.raw(), &mut name_buf, &self.config)
                {
                    Ok(name) => name,
                    Err(e) => {
                        debug!(
                            "Could not query the name of handle {:#x} of process {pid}: {e}",
                            record.handle_value
                        );
                        continue;
                    }
                };
            stats.names_resolved += 1;
            if !matcher.matches(&name) {
                continue;
            }

            if !header_sent {
                lines.emit(format!(
                    "NOTE: The following process(es) are accessing {target}:"
                ));
                header_sent = true;
            }
            if last_holder == Some(pid) {
                continue;
            }
            last_holder = Some(pid);

            let holder = LockHolder {
                pid,
                image_path: self.api.image_path(process.raw()),
                handle_value: record.handle_value,
                granted_access: record.granted_access,
            };
            debug!("Process {pid} holds handle {:#x}", record.handle_value);
            lines.emit(holder.report_line());
            lines.sink.holder(&holder);
            outcome.holders.push(holder);
        }

        // The last owner has no successor record to trigger its close.
        slot.close();
    }
}

/// Report sink that drops a line identical to the one just sent.
struct Lines<'r> {
    sink: &'r mut dyn Reporter,
    last: Option<String>,
}

impl<'r> Lines<'r> {
    fn new(sink: &'r mut dyn Reporter) -> Self {
        Self { sink, last: None }
    }

    fn emit(&mut self, line: String) {
        if self.last.as_deref() == Some(line.as_str()) {
            return;
        }
        self.sink.line(&line);
        self.last = Some(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fake::FakeKernel;
    use crate::kernel::Capability;
    use crate::search::report::NeverCancel;
    use crate::status::NtStatus;
    use std::cell::Cell;

    // ── Helpers ──────────────────────────────────────────────────────

    const SELF_PID: usize = 100;
    const VOLUME: &str = r"\Device\HarddiskVolume5";
    const FILE: &str = r"\Device\HarddiskVolume5\data\report.xlsx";
    const EXPLORER: &str = r"C:\Windows\explorer.exe";
    const NOTEPAD: &str = r"C:\Windows\System32\notepad.exe";
    const HEADER_FILE: &str =
        r"NOTE: The following process(es) are accessing \Device\HarddiskVolume5\data\report.xlsx:";
    const CLOSE_THESE: &str =
        "You should try to close these applications before attempting to reformat the drive.";

    fn not_found(target: &str) -> String {
        format!(
            "NOTE: LockSleuth was not able to identify the process(es) preventing access to {target}"
        )
    }

    fn exact() -> SearchOptions {
        SearchOptions::default()
    }

    fn partial() -> SearchOptions {
        SearchOptions {
            partial_match: true,
            ..SearchOptions::default()
        }
    }

    fn run_with(
        kernel: &FakeKernel,
        config: SearchConfig,
        target: &str,
        options: SearchOptions,
        cancel: &dyn Cancellation,
    ) -> (SearchOutcome, Vec<String>) {
        let hint = SizeHint::new(4096);
        let search = HandleSearch::with_size_hint(kernel, config, &hint);
        let mut lines = Vec::new();
        let outcome = search.run(target, options, &mut lines, cancel);
        (outcome, lines)
    }

    fn run(kernel: &FakeKernel, target: &str, options: SearchOptions) -> (SearchOutcome, Vec<String>) {
        run_with(kernel, SearchConfig::default(), target, options, &NeverCancel)
    }

    /// Cancels on the `limit`-th poll and counts every poll.
    struct CancelAfter {
        polls: Cell<usize>,
        limit: usize,
    }

    impl Cancellation for CancelAfter {
        fn is_cancelled(&self) -> bool {
            self.polls.set(self.polls.get() + 1);
            self.polls.get() >= self.limit
        }
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[test]
    fn no_holder_reports_could_not_identify() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(r"\Device\HarddiskVolume2\other.txt"));

        let (outcome, lines) = run(&kernel, FILE, exact());
        assert!(!outcome.found);
        assert_eq!(lines, vec![not_found(FILE)]);
        assert!(!lines.iter().any(|l| l == CLOSE_THESE));
    }

    #[test]
    fn single_exact_holder_is_found() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(FILE));

        let (outcome, lines) = run(&kernel, FILE, exact());
        assert!(outcome.found);
        assert!(!outcome.cancelled);
        assert_eq!(
            lines,
            vec![
                HEADER_FILE.to_string(),
                format!("o {EXPLORER}"),
                CLOSE_THESE.to_string()
            ]
        );
        assert_eq!(outcome.holders.len(), 1);
        assert_eq!(outcome.holders[0].pid, 200);
        assert_eq!(outcome.holders[0].handle_value, 0x10);
        assert_eq!(outcome.stats.processes_opened, 1);
        assert_eq!(outcome.stats.handles_duplicated, 1);
        assert_eq!(outcome.stats.names_resolved, 1);
    }

    #[test]
    fn partial_mode_matches_longer_names() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(FILE));

        assert!(run(&kernel, VOLUME, partial()).0.found);
        assert!(
            !run(&kernel, VOLUME, exact()).0.found,
            "exact mode must not match a longer name with the same prefix"
        );
    }

    #[test]
    fn partial_mode_rejects_shorter_names() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(r"\Device\HarddiskVolume"));

        assert!(!run(&kernel, VOLUME, partial()).0.found);
    }

    #[test]
    fn whole_volume_skips_sibling_volumes() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(r"\Device\HarddiskVolume50\other.bin"));
        kernel.add_process(300, Some(r"C:\Windows\System32\vmms.exe"));
        kernel.add_handle(300, 0x20, FileType::Disk, Some(FILE));

        let options = SearchOptions {
            whole_volume: true,
            ..SearchOptions::default()
        };
        let (outcome, lines) = run(&kernel, VOLUME, options);
        assert!(outcome.found);
        assert_eq!(outcome.holders.len(), 1);
        assert_eq!(outcome.holders[0].pid, 300);
        assert!(!lines.iter().any(|l| l.contains("explorer.exe")), "{lines:?}");
    }

    #[test]
    fn whole_volume_matches_the_bare_device() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(VOLUME));

        let options = SearchOptions {
            whole_volume: true,
            ..SearchOptions::default()
        };
        assert!(run(&kernel, VOLUME, options).0.found);
    }

    #[test]
    fn unknown_image_is_reported_by_pid() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(4242, None);
        kernel.add_handle(4242, 0x10, FileType::Disk, Some(FILE));

        let (outcome, lines) = run(&kernel, FILE, exact());
        assert!(outcome.found);
        assert_eq!(lines[1], "o Unknown (Process ID 4242)");
    }

    #[test]
    fn consecutive_matches_print_one_line() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_process(201, Some(EXPLORER));
        for value in [0x10, 0x14, 0x18] {
            kernel.add_handle(200, value, FileType::Disk, Some(FILE));
        }
        kernel.add_handle(201, 0x20, FileType::Disk, Some(FILE));

        let (outcome, lines) = run(&kernel, FILE, exact());
        let holder_lines = lines.iter().filter(|l| l.starts_with("o ")).count();
        assert_eq!(holder_lines, 1, "same image path must print once: {lines:?}");
        assert_eq!(outcome.holders.len(), 2, "one holder per process run");
        assert_eq!(outcome.holders[0].handle_value, 0x10);
    }

    #[test]
    fn interleaved_images_print_again() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_process(300, Some(NOTEPAD));
        kernel.add_process(400, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(FILE));
        kernel.add_handle(300, 0x10, FileType::Disk, Some(FILE));
        kernel.add_handle(400, 0x10, FileType::Disk, Some(FILE));

        let (_, lines) = run(&kernel, FILE, exact());
        assert_eq!(
            &lines[1..4],
            &[
                format!("o {EXPLORER}"),
                format!("o {NOTEPAD}"),
                format!("o {EXPLORER}")
            ]
        );
    }

    #[test]
    fn denied_process_is_opened_once() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.deny_process(300);
        for value in 1..=5 {
            kernel.add_handle(300, value * 4, FileType::Disk, Some(FILE));
        }
        kernel.add_handle(200, 0x10, FileType::Disk, Some(r"\Device\Null"));
        kernel.add_handle(300, 0x40, FileType::Disk, Some(FILE));
        kernel.add_handle(300, 0x44, FileType::Disk, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert_eq!(kernel.open_attempts(300), 1, "denied pid must not be retried");
        assert_eq!(outcome.stats.processes_denied, 1);
        assert!(!outcome.found);
    }

    #[test]
    fn other_open_failures_are_retried_at_the_next_run() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.fail_process(300, NtStatus::UNSUCCESSFUL);
        for value in 1..=3 {
            kernel.add_handle(300, value * 4, FileType::Disk, Some(FILE));
        }
        kernel.add_handle(200, 0x10, FileType::Disk, Some(r"\Device\Null"));
        kernel.add_handle(300, 0x40, FileType::Disk, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert_eq!(kernel.open_attempts(300), 2, "one attempt per run, not per record");
        assert_eq!(outcome.stats.processes_denied, 0);
    }

    #[test]
    fn ignore_self_excludes_own_handles() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_handle(SELF_PID, 0x44, FileType::Disk, Some(FILE));

        let options = SearchOptions {
            ignore_self: true,
            ..SearchOptions::default()
        };
        let (outcome, lines) = run(&kernel, FILE, options);
        assert!(!outcome.found, "self-locks must not count");
        assert_eq!(lines, vec![not_found(FILE)]);
        assert!(!kernel.was_name_queried(SELF_PID, 0x44));
    }

    #[test]
    fn own_handles_are_used_in_place() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_handle(SELF_PID, 0x44, FileType::Disk, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert!(outcome.found);
        assert_eq!(outcome.holders[0].pid, SELF_PID);
        assert_eq!(kernel.duplications(), 0, "own handles need no duplication");
        assert_eq!(kernel.open_attempts(SELF_PID), 0);
        assert_eq!(kernel.pseudo_handle_closes(), 0);
        assert_eq!(kernel.bad_closes(), 0, "borrowed handles must not be closed");
    }

    #[test]
    fn non_disk_handles_are_never_name_queried() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Pipe, Some(FILE));
        kernel.add_handle(200, 0x14, FileType::Char, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert!(!outcome.found);
        assert_eq!(kernel.name_queries(), 0);
        assert!(!kernel.was_name_queried(200, 0x10));
    }

    #[test]
    fn failed_name_query_skips_only_that_handle() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, None);
        kernel.add_handle(200, 0x14, FileType::Disk, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert!(outcome.found);
        assert_eq!(outcome.holders[0].handle_value, 0x14);
    }

    #[test]
    fn exited_owner_is_skipped() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(FILE));
        // Process 201 exited between enumeration and open.
        kernel.add_handle(201, 0x10, FileType::Disk, Some(FILE));

        let (outcome, _) = run(&kernel, FILE, exact());
        assert_eq!(outcome.holders.len(), 1);
    }

    #[test]
    fn no_handle_outlives_the_search() {
        let kernel = FakeKernel::new(SELF_PID);
        for pid in [200, 300, 400] {
            kernel.add_process(pid, Some(EXPLORER));
            for value in [0x10, 0x14] {
                kernel.add_handle(pid, value, FileType::Disk, Some(FILE));
            }
        }
        kernel.add_handle(SELF_PID, 0x44, FileType::Disk, Some(FILE));
        kernel.add_process(500, Some(NOTEPAD));
        kernel.add_handle(500, 0x10, FileType::Pipe, None);

        let (outcome, _) = run(&kernel, FILE, exact());
        assert!(outcome.found);
        assert_eq!(kernel.live_handles(), 0, "the last process must be flushed");
        assert!(
            kernel.peak_live_handles() <= 2,
            "at most one process and one duplicate may be open at once"
        );
        assert_eq!(kernel.bad_closes(), 0);
        assert_eq!(kernel.pseudo_handle_closes(), 0);
    }

    #[test]
    fn enumeration_failure_is_reported() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.fail_enumeration(NtStatus::ACCESS_DENIED);

        let (outcome, lines) = run(&kernel, FILE, exact());
        assert!(!outcome.found);
        assert_eq!(
            lines,
            vec![
                "Warning: Could not enumerate process handles: NtQuerySystemInformation failed: Access Denied"
                    .to_string(),
                not_found(FILE)
            ]
        );
    }

    #[test]
    fn missing_capability_is_reported() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.remove_capability(Capability::QuerySystemInformation);

        let (_, lines) = run(&kernel, FILE, exact());
        assert_eq!(
            lines[0],
            "Warning: Could not enumerate process handles: NtQuerySystemInformation is not available on this system"
        );
        assert_eq!(lines[1], not_found(FILE));
    }

    #[test]
    fn empty_target_is_rejected_without_enumerating() {
        let kernel = FakeKernel::new(SELF_PID);
        let (outcome, lines) = run(&kernel, "", exact());
        assert!(!outcome.found);
        assert_eq!(lines, vec![not_found("")]);
        assert!(kernel.enumeration_sizes().is_empty());
    }

    #[test]
    fn name_buffer_allocation_failure_aborts() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        kernel.add_handle(200, 0x10, FileType::Disk, Some(FILE));
        let config = SearchConfig {
            arena_limit: Some(4096 + 0x100),
            ..SearchConfig::default()
        };

        let (outcome, lines) = run_with(&kernel, config, FILE, exact(), &NeverCancel);
        assert!(!outcome.found);
        assert_eq!(
            lines,
            vec![
                "Warning: Could not allocate the object name buffer".to_string(),
                not_found(FILE)
            ]
        );
        assert_eq!(kernel.open_attempts(200), 0);
    }

    #[test]
    fn cancellation_stops_at_the_next_boundary() {
        let kernel = FakeKernel::new(SELF_PID);
        for pid in [200, 300, 400] {
            kernel.add_process(pid, Some(EXPLORER));
            for value in [0x10, 0x14, 0x18] {
                kernel.add_handle(pid, value, FileType::Disk, Some(FILE));
            }
        }
        let cancel = CancelAfter {
            polls: Cell::new(0),
            limit: 2,
        };

        let (outcome, lines) = run_with(&kernel, SearchConfig::default(), FILE, exact(), &cancel);
        assert!(outcome.cancelled);
        assert!(!outcome.found, "a cancelled search reports not found");
        assert_eq!(cancel.polls.get(), 2, "polled once per process boundary");
        assert_eq!(kernel.open_attempts(200), 1);
        assert_eq!(kernel.open_attempts(300), 0);
        assert_eq!(kernel.open_attempts(400), 0);
        assert_eq!(kernel.live_handles(), 0, "cancellation must still clean up");
        assert_eq!(lines.last(), Some(&not_found(FILE)));
    }

    #[test]
    fn repeated_searches_reuse_the_remembered_size() {
        let kernel = FakeKernel::new(SELF_PID);
        kernel.add_process(200, Some(EXPLORER));
        for value in 0..200 {
            kernel.add_handle(200, 4 * (value + 1), FileType::Disk, Some(r"\Device\Null"));
        }
        let hint = SizeHint::new(256);
        let search = HandleSearch::with_size_hint(&kernel, SearchConfig::default(), &hint);

        search.run(FILE, exact(), &mut Vec::<String>::new(), &NeverCancel);
        let first = kernel.enumeration_sizes().len();
        assert!(first > 1);
        search.run(FILE, exact(), &mut Vec::<String>::new(), &NeverCancel);
        assert_eq!(kernel.enumeration_sizes().len(), first + 1);
    }
}
