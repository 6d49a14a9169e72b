/// Messages sent from the search thread to the caller via a crossbeam channel.
use super::outcome::{LockHolder, SearchOutcome};

#[derive(Debug)]
pub enum SearchProgress {
    /// One human-readable report line, already deduplicated.
    Line(String),
    /// A newly discovered holder. Also published to the shared holder list.
    Holder(LockHolder),
    /// Always the last message of a search, cancelled or not.
    Complete { outcome: SearchOutcome },
}
