//! Deduplicating work queue of documents still to build.
//!
//! Resolvers push discovered documents from any worker thread; the build
//! driver drains one wave at a time and processes it in parallel.

use crossbeam::queue::SegQueue;
use dashmap::DashSet;

use crate::core::PathAddress;
use crate::docset::Document;

/// Lock-free queue that accepts each document at most once per build.
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: SegQueue<Document>,
    seen: DashSet<PathAddress>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `doc` unless it was queued before. Returns whether it was new.
    pub fn enqueue(&self, doc: Document) -> bool {
        if !self.seen.insert(doc.address.clone()) {
            return false;
        }
        self.pending.push(doc);
        true
    }

    /// Take everything queued so far.
    pub fn drain(&self) -> Vec<Document> {
        let mut wave = Vec::with_capacity(self.pending.len());
        while let Some(doc) = self.pending.pop() {
            wave.push(doc);
        }
        wave
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Documents ever accepted.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn was_enqueued(&self, address: &PathAddress) -> bool {
        self.seen.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn doc(path: &str) -> Document {
        Document::new(PathAddress::current(path).unwrap(), None, "/")
    }

    #[test]
    fn test_enqueue_dedup() {
        let queue = WorkQueue::new();
        assert!(queue.enqueue(doc("a.md")));
        assert!(!queue.enqueue(doc("a.md")));
        assert!(queue.enqueue(doc("b.md")));

        assert_eq!(queue.drain().len(), 2);
        assert!(queue.is_empty());
        // Still deduplicated after draining
        assert!(!queue.enqueue(doc("a.md")));
        assert_eq!(queue.seen_count(), 2);
    }

    #[test]
    fn test_concurrent_enqueue() {
        let queue = WorkQueue::new();
        (0..1000).into_par_iter().for_each(|i| {
            queue.enqueue(doc(&format!("p{}.md", i % 10)));
        });
        assert_eq!(queue.drain().len(), 10);
        assert!(queue.was_enqueued(&PathAddress::current("p3.md").unwrap()));
    }
}
