/// Search module: the handle search engine and its background worker.
///
/// [`HandleSearch`] is the synchronous engine. [`start_search_with`] runs one
/// search on a background thread and streams [`SearchProgress`] messages back,
/// while discovered holders are published into a shared [`LiveHolders`] list
/// the caller can read at any time.
pub mod cache;
pub mod engine;
pub mod matcher;
pub mod outcome;
pub mod progress;
pub mod report;

pub use engine::HandleSearch;
pub use outcome::{LockHolder, SearchOptions, SearchOutcome, SearchStats};
pub use progress::SearchProgress;
pub use report::{Cancellation, NeverCancel, Reporter};

use crate::config::SearchConfig;
use crate::kernel::NtApi;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Holders discovered so far. The search thread takes the write lock once per
/// holder; readers may poll it while the search runs.
pub type LiveHolders = Arc<RwLock<Vec<LockHolder>>>;

/// Maximum number of progress messages that may queue up in the channel.
///
/// A search emits a handful of lines per holder, so this is only reached when
/// the receiver is not being drained; the search thread then blocks.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 1_024;

/// Handle to a running or completed search.
pub struct SearchHandle {
    pub progress_rx: Receiver<SearchProgress>,
    pub live_holders: LiveHolders,
    cancel_flag: Arc<AtomicBool>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl SearchHandle {
    /// Ask the search to stop at the next process boundary.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Forwards report lines and holders from the engine to the channel.
struct ChannelReporter {
    tx: Sender<SearchProgress>,
    live_holders: LiveHolders,
}

impl Reporter for ChannelReporter {
    fn line(&mut self, line: &str) {
        let _ = self.tx.send(SearchProgress::Line(line.to_string()));
    }

    fn holder(&mut self, holder: &LockHolder) {
        self.live_holders.write().push(holder.clone());
        let _ = self.tx.send(SearchProgress::Holder(holder.clone()));
    }
}

/// Start a search for `target` on a background thread using `api`.
pub fn start_search_with<K>(
    api: &'static K,
    target: String,
    options: SearchOptions,
    config: SearchConfig,
) -> SearchHandle
where
    K: NtApi + Sync + 'static,
{
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<SearchProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();
    let live_holders: LiveHolders = Arc::new(RwLock::new(Vec::new()));
    let holders_clone = live_holders.clone();

    let thread = thread::Builder::new()
        .name("locksleuth-search".into())
        .spawn(move || {
            info!("Starting search for {target}");
            let mut reporter = ChannelReporter {
                tx: progress_tx.clone(),
                live_holders: holders_clone,
            };
            let outcome = HandleSearch::new(api, config).run(
                &target,
                options,
                &mut reporter,
                &cancel_clone,
            );
            let _ = progress_tx.send(SearchProgress::Complete { outcome });
        })
        .expect("failed to spawn search thread");

    SearchHandle {
        progress_rx,
        live_holders,
        cancel_flag,
        _thread: Some(thread),
    }
}

/// Start a search against the live system.
#[cfg(windows)]
pub fn start_search(target: String, options: SearchOptions, config: SearchConfig) -> SearchHandle {
    start_search_with(crate::platform::NtDll::get(), target, options, config)
}

/// Search the live system for processes holding `target` open.
///
/// Writes the report to `reporter` and returns whether any holder was found.
#[cfg(windows)]
pub fn search(
    target: &str,
    partial_match: bool,
    ignore_self: bool,
    reporter: &mut dyn Reporter,
    cancel: &dyn Cancellation,
) -> bool {
    let options = SearchOptions {
        partial_match,
        ignore_self,
        ..SearchOptions::default()
    };
    HandleSearch::new(crate::platform::NtDll::get(), SearchConfig::default())
        .run(target, options, reporter, cancel)
        .found
}
