use std::collections::HashMap;

use thiserror::Error;

/// Per-file upload status, keyed by filename within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Queued,
    InFlight,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("A batch may hold at most {limit} files")]
    TooManyFiles { limit: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Unknown file")]
    Unknown,

    #[error("File size exceeds the upload limit")]
    Oversize,

    #[error("File is not in a state that allows this transition")]
    InvalidState,
}

/// Tracks a batch of pending local files through the upload lifecycle.
///
/// All mutation goes through explicit transitions; the driver decides
/// whether entries run one at a time or concurrently. Removing an entry
/// never cancels a request already in flight — a settle arriving for a
/// removed entry is dropped.
pub struct UploadQueue {
    order: Vec<String>,
    sizes: HashMap<String, u64>,
    status: HashMap<String, UploadStatus>,
    max_files: usize,
    max_file_size: u64,
}

impl UploadQueue {
    pub fn new(max_files: usize, max_file_size: u64) -> Self {
        Self {
            order: Vec::new(),
            sizes: HashMap::new(),
            status: HashMap::new(),
            max_files,
            max_file_size,
        }
    }

    /// Add one file as `Idle`. Returns false when the name is already
    /// present (dedup within the batch) or the queue is full.
    pub fn add(&mut self, name: &str, size: u64) -> bool {
        if self.sizes.contains_key(name) || self.order.len() >= self.max_files {
            return false;
        }
        self.order.push(name.to_string());
        self.sizes.insert(name.to_string(), size);
        self.status.insert(name.to_string(), UploadStatus::Idle);
        true
    }

    /// Add a dropped batch. A drop that would push the queue past its
    /// file limit is rejected whole; duplicates inside an accepted drop
    /// are skipped. Returns the number of entries actually added.
    pub fn add_batch(&mut self, files: &[(String, u64)]) -> Result<usize, QueueError> {
        if self.order.len() + files.len() > self.max_files {
            return Err(QueueError::TooManyFiles {
                limit: self.max_files,
            });
        }
        let mut added = 0;
        for (name, size) in files {
            if self.add(name, *size) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Move every `Idle` entry to `Queued`, in preparation for a batch run.
    pub fn enqueue_pending(&mut self) {
        for status in self.status.values_mut() {
            if *status == UploadStatus::Idle {
                *status = UploadStatus::Queued;
            }
        }
    }

    /// The first `Queued` entry in drop order, if any.
    pub fn next_queued(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|name| self.status.get(*name) == Some(&UploadStatus::Queued))
            .map(String::as_str)
    }

    /// All `Queued` entries in drop order.
    pub fn queued_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.status.get(*name) == Some(&UploadStatus::Queued))
            .cloned()
            .collect()
    }

    /// Begin uploading an entry: `Idle`/`Queued` become `InFlight`.
    ///
    /// An entry over the size limit is marked `Failed` right here and the
    /// caller must not issue the request.
    pub fn begin(&mut self, name: &str) -> Result<(), TransitionError> {
        let size = *self.sizes.get(name).ok_or(TransitionError::Unknown)?;
        let status = self.status.get_mut(name).ok_or(TransitionError::Unknown)?;

        match status {
            UploadStatus::Idle | UploadStatus::Queued => {
                if size > self.max_file_size {
                    *status = UploadStatus::Failed(format!(
                        "File size {} exceeds maximum limit of {} bytes",
                        size, self.max_file_size
                    ));
                    return Err(TransitionError::Oversize);
                }
                *status = UploadStatus::InFlight;
                Ok(())
            }
            _ => Err(TransitionError::InvalidState),
        }
    }

    /// Record a successful response. Ignored unless the entry is still
    /// `InFlight` (it may have been removed while the request ran).
    pub fn settle_ok(&mut self, name: &str) {
        if let Some(status) = self.status.get_mut(name) {
            if *status == UploadStatus::InFlight {
                *status = UploadStatus::Succeeded;
            }
        }
    }

    /// Record a failed response. Same late-arrival rules as `settle_ok`.
    pub fn settle_err(&mut self, name: &str, reason: impl Into<String>) {
        if let Some(status) = self.status.get_mut(name) {
            if *status == UploadStatus::InFlight {
                *status = UploadStatus::Failed(reason.into());
            }
        }
    }

    /// Re-enter `InFlight` from `Failed`. Size is intentionally not
    /// re-validated: retry repeats the request the user already asked for.
    pub fn retry(&mut self, name: &str) -> Result<(), TransitionError> {
        let status = self.status.get_mut(name).ok_or(TransitionError::Unknown)?;
        match status {
            UploadStatus::Failed(_) => {
                *status = UploadStatus::InFlight;
                Ok(())
            }
            _ => Err(TransitionError::InvalidState),
        }
    }

    /// Discard an entry from any state.
    pub fn remove(&mut self, name: &str) {
        self.order.retain(|n| n != name);
        self.sizes.remove(name);
        self.status.remove(name);
    }

    /// Drop all `Succeeded` entries from the visible set. The driver
    /// calls this after the display delay.
    pub fn clear_succeeded(&mut self) {
        let done: Vec<String> = self
            .status
            .iter()
            .filter(|(_, s)| **s == UploadStatus::Succeeded)
            .map(|(name, _)| name.clone())
            .collect();
        for name in done {
            self.remove(&name);
        }
    }

    pub fn status(&self, name: &str) -> Option<&UploadStatus> {
        self.status.get(name)
    }

    /// Visible entries in drop order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True once nothing is waiting or running.
    pub fn all_settled(&self) -> bool {
        self.status.values().all(|s| {
            matches!(s, UploadStatus::Succeeded | UploadStatus::Failed(_))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> UploadQueue {
        UploadQueue::new(10, 1024)
    }

    #[test]
    fn add_dedups_by_filename() {
        let mut q = queue();
        assert!(q.add("a.txt", 10));
        assert!(!q.add("a.txt", 999));
        assert_eq!(q.len(), 1);
        // The original entry is untouched by the duplicate drop
        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Idle));
    }

    #[test]
    fn add_batch_rejects_oversized_drops_whole() {
        let mut q = UploadQueue::new(2, 1024);
        q.add("a.txt", 1);

        let batch = vec![("b.txt".to_string(), 1), ("c.txt".to_string(), 1)];
        assert_eq!(
            q.add_batch(&batch),
            Err(QueueError::TooManyFiles { limit: 2 })
        );
        // Nothing from the rejected drop was admitted
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn drop_order_is_preserved() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.add("b.txt", 1);
        q.add("c.txt", 1);
        let names: Vec<&str> = q.names().collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn sequential_dequeue_follows_drop_order() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.add("b.txt", 1);
        q.enqueue_pending();

        assert_eq!(q.next_queued(), Some("a.txt"));
        q.begin("a.txt").unwrap();
        assert_eq!(q.next_queued(), Some("b.txt"));
        q.settle_ok("a.txt");
        q.begin("b.txt").unwrap();
        q.settle_ok("b.txt");
        assert_eq!(q.next_queued(), None);
        assert!(q.all_settled());
    }

    #[test]
    fn oversize_entry_fails_without_starting() {
        let mut q = queue();
        q.add("big.bin", 4096);
        q.enqueue_pending();

        assert_eq!(q.begin("big.bin"), Err(TransitionError::Oversize));
        assert!(matches!(
            q.status("big.bin"),
            Some(UploadStatus::Failed(_))
        ));
        // The failed entry no longer queues
        assert_eq!(q.next_queued(), None);
    }

    #[test]
    fn retry_does_not_revalidate_size() {
        let mut q = queue();
        q.add("big.bin", 4096);
        assert_eq!(q.begin("big.bin"), Err(TransitionError::Oversize));

        // Retry re-enters in-flight even though the size never changed
        q.retry("big.bin").unwrap();
        assert_eq!(q.status("big.bin"), Some(&UploadStatus::InFlight));
    }

    #[test]
    fn retry_requires_failed_state() {
        let mut q = queue();
        q.add("a.txt", 1);
        assert_eq!(q.retry("a.txt"), Err(TransitionError::InvalidState));
        assert_eq!(q.retry("ghost.txt"), Err(TransitionError::Unknown));
    }

    #[test]
    fn failure_then_retry_then_success() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.begin("a.txt").unwrap();
        q.settle_err("a.txt", "network error");
        assert_eq!(
            q.status("a.txt"),
            Some(&UploadStatus::Failed("network error".to_string()))
        );

        q.retry("a.txt").unwrap();
        q.settle_ok("a.txt");
        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Succeeded));
    }

    #[test]
    fn cleared_succeeded_entries_do_not_reappear() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.add("b.txt", 1);
        q.begin("a.txt").unwrap();
        q.settle_ok("a.txt");

        q.clear_succeeded();
        assert_eq!(q.status("a.txt"), None);
        let names: Vec<&str> = q.names().collect();
        assert_eq!(names, vec!["b.txt"]);

        // A late settle for the cleared entry does not resurrect it
        q.settle_ok("a.txt");
        assert_eq!(q.status("a.txt"), None);

        // Only a fresh add brings the name back, as a new idle entry
        assert!(q.add("a.txt", 1));
        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Idle));
    }

    #[test]
    fn removal_is_allowed_from_any_state() {
        let mut q = queue();
        q.add("idle.txt", 1);
        q.add("flying.txt", 1);
        q.add("done.txt", 1);
        q.add("broken.txt", 1);

        q.begin("flying.txt").unwrap();
        q.begin("done.txt").unwrap();
        q.settle_ok("done.txt");
        q.begin("broken.txt").unwrap();
        q.settle_err("broken.txt", "boom");

        for name in ["idle.txt", "flying.txt", "done.txt", "broken.txt"] {
            q.remove(name);
            assert_eq!(q.status(name), None);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn late_settle_after_removal_is_ignored() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.begin("a.txt").unwrap();

        // The user removes the row while the request is still running
        q.remove("a.txt");

        q.settle_ok("a.txt");
        q.settle_err("a.txt", "too late");
        assert_eq!(q.status("a.txt"), None);
        assert!(q.is_empty());
    }

    #[test]
    fn settle_only_touches_in_flight_entries() {
        let mut q = queue();
        q.add("a.txt", 1);

        // Settles against an idle entry are dropped
        q.settle_ok("a.txt");
        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Idle));

        q.begin("a.txt").unwrap();
        q.settle_ok("a.txt");
        // A second, stale settle cannot flip the state again
        q.settle_err("a.txt", "stale");
        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Succeeded));
    }

    #[test]
    fn parallel_settles_touch_only_their_own_entry() {
        let mut q = queue();
        q.add("a.txt", 1);
        q.add("b.txt", 1);
        q.enqueue_pending();
        for name in q.queued_names() {
            q.begin(&name).unwrap();
        }

        // Responses arrive out of submission order
        q.settle_err("b.txt", "timeout");
        q.settle_ok("a.txt");

        assert_eq!(q.status("a.txt"), Some(&UploadStatus::Succeeded));
        assert_eq!(
            q.status("b.txt"),
            Some(&UploadStatus::Failed("timeout".to_string()))
        );
    }
}
