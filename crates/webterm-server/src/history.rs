//! Bounded replay history for a terminal session.

use std::collections::VecDeque;

/// Ordered buffer of previously emitted output chunks.
///
/// Replaying the buffer to a newly attached socket reconstructs the exact
/// output the shell has produced since session creation, up to the cap.
/// Once full, the oldest chunk is silently dropped per push; long-lived
/// sessions lose their earliest output.
pub struct ReplayBuffer {
    chunks: VecDeque<String>,
    limit: usize,
}

impl ReplayBuffer {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: String) {
        if self.chunks.len() == self.limit {
            self.chunks.pop_front();
        }
        self.chunks.push_back(chunk);
    }

    /// Chunks in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_preserves_emission_order() {
        let mut buf = ReplayBuffer::new(10);
        buf.push("one".to_string());
        buf.push("two".to_string());
        buf.push("three".to_string());
        let replay: Vec<&str> = buf.iter().collect();
        assert_eq!(replay, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut buf = ReplayBuffer::new(5000);
        for i in 0..5001 {
            buf.push(format!("chunk-{i}"));
        }
        assert_eq!(buf.len(), 5000);
        let first = buf.iter().next().unwrap();
        assert_eq!(first, "chunk-1", "the very first chunk must be gone");
        let last = buf.iter().last().unwrap();
        assert_eq!(last, "chunk-5000");
    }

    #[test]
    fn test_empty_buffer() {
        let buf = ReplayBuffer::new(8);
        assert!(buf.is_empty());
        assert_eq!(buf.iter().count(), 0);
    }
}
