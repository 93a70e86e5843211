//! Accumulated administrator notices, flushed once per digest period.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoticeCategory {
    SensitiveUpload,
    Failure,
    Deletion,
}

impl NoticeCategory {
    pub const ALL: [NoticeCategory; 3] = [
        NoticeCategory::SensitiveUpload,
        NoticeCategory::Failure,
        NoticeCategory::Deletion,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            NoticeCategory::SensitiveUpload => "Sensitive uploads",
            NoticeCategory::Failure => "Failures",
            NoticeCategory::Deletion => "Deletions",
        }
    }
}

impl fmt::Display for NoticeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeCategory::SensitiveUpload => "sensitive_upload",
            NoticeCategory::Failure => "failure",
            NoticeCategory::Deletion => "deletion",
        })
    }
}

#[derive(Debug, Default)]
struct Bucket {
    entries: Vec<String>,
    dropped: usize,
}

/// Notices grouped by category, each category capped at `max_per_category`.
pub struct NotificationBatch {
    buckets: Mutex<BTreeMap<NoticeCategory, Bucket>>,
    max_per_category: usize,
}

impl NotificationBatch {
    pub fn new(max_per_category: usize) -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            max_per_category,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NoticeCategory, Bucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `false` when the category is full and the notice was dropped.
    pub fn record(&self, category: NoticeCategory, message: impl Into<String>) -> bool {
        let mut buckets = self.lock();
        let bucket = buckets.entry(category).or_default();
        if bucket.entries.len() >= self.max_per_category {
            bucket.dropped += 1;
            if bucket.dropped == 1 {
                tracing::warn!(category = %category, cap = self.max_per_category, "Notification category full, dropping notices");
            }
            return false;
        }
        bucket.entries.push(message.into());
        true
    }

    pub fn pending(&self) -> usize {
        self.lock().values().map(|b| b.entries.len()).sum()
    }

    /// Take everything accumulated so far and start a new period.
    pub fn drain(&self) -> Digest {
        let buckets = std::mem::take(&mut *self.lock());
        let mut digest = Digest::default();
        for (category, bucket) in buckets {
            if !bucket.entries.is_empty() {
                digest.entries.insert(category, bucket.entries);
            }
            if bucket.dropped > 0 {
                digest.dropped.insert(category, bucket.dropped);
            }
        }
        digest
    }
}

/// One drained period of notices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Digest {
    pub entries: BTreeMap<NoticeCategory, Vec<String>>,
    pub dropped: BTreeMap<NoticeCategory, usize>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dropped.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn subject(&self) -> String {
        format!("Dossier daily digest: {} notices", self.total())
    }

    pub fn render(&self) -> String {
        let mut body = String::new();
        for category in NoticeCategory::ALL {
            let entries = self.entries.get(&category).map(Vec::as_slice).unwrap_or(&[]);
            let dropped = self.dropped.get(&category).copied().unwrap_or(0);
            if entries.is_empty() && dropped == 0 {
                continue;
            }

            let _ = writeln!(body, "{} ({})", category.title(), entries.len());
            for entry in entries {
                let _ = writeln!(body, "  - {}", entry);
            }
            if dropped > 0 {
                let _ = writeln!(body, "  ... and {} more not listed", dropped);
            }
            body.push('\n');
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_each_category_and_counts_drops() {
        let batch = NotificationBatch::new(2);
        assert!(batch.record(NoticeCategory::Failure, "a"));
        assert!(batch.record(NoticeCategory::Failure, "b"));
        assert!(!batch.record(NoticeCategory::Failure, "c"));
        assert!(batch.record(NoticeCategory::Deletion, "d"));

        let digest = batch.drain();
        assert_eq!(digest.entries[&NoticeCategory::Failure], vec!["a", "b"]);
        assert_eq!(digest.dropped[&NoticeCategory::Failure], 1);
        assert_eq!(digest.total(), 3);
        assert!(digest.render().contains("... and 1 more not listed"));
    }

    #[test]
    fn drain_clears_the_batch() {
        let batch = NotificationBatch::new(10);
        batch.record(NoticeCategory::SensitiveUpload, "file 1");
        assert_eq!(batch.pending(), 1);

        assert!(!batch.drain().is_empty());
        assert_eq!(batch.pending(), 0);
        assert!(batch.drain().is_empty());
    }

    #[test]
    fn render_lists_categories_in_order() {
        let batch = NotificationBatch::new(10);
        batch.record(NoticeCategory::Deletion, "file 3 deleted");
        batch.record(NoticeCategory::SensitiveUpload, "file 1 uploaded");

        let body = batch.drain().render();
        let uploads = body.find("Sensitive uploads (1)").unwrap();
        let deletions = body.find("Deletions (1)").unwrap();
        assert!(uploads < deletions);
        assert!(!body.contains("Failures"));
    }
}
