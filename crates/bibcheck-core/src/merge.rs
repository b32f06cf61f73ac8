//! Merge utilities
//!
//! In-place merging of partial results into an accumulator, and draining of
//! deferred work queues.

use std::collections::VecDeque;

use crate::diagnostics::EntryReport;

/// Merge a value into an accumulator of the same type, in place
///
/// The source wins where both sides define the same item.
pub trait MergeInto {
    fn merge_into(self, dest: &mut Self);
}

/// Shallow merge: tags are unioned; within a tag, a category present in the
/// source replaces the destination's payload for that category.
impl MergeInto for EntryReport {
    fn merge_into(self, dest: &mut Self) {
        dest.entry.extend(self.entry);
        for (tag, findings) in self.fields {
            dest.fields.entry(tag).or_default().extend(findings);
        }
    }
}

/// Drain a queue of deferred work in FIFO order, invoking `f` on each item
///
/// Returns the number of items processed.
pub fn drain_queue<T, F>(queue: &mut VecDeque<T>, mut f: F) -> usize
where
    F: FnMut(T),
{
    let mut processed = 0;
    while let Some(item) = queue.pop_front() {
        f(item);
        processed += 1;
    }
    processed
}
