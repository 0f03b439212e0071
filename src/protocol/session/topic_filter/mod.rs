//! MQTT-style topic wildcards and the block lists built on them.
//!
//! Topics are split into levels on `/`. In a pattern, `#` matches every
//! remaining level (including none), `+` or `*` matches exactly one level,
//! and any other level must be equal.
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::BlockListError;

/// Check whether `topic` is matched by the wildcard `pattern`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+" | "*"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Result of adding a pattern to a [`BlockList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockInsert {
    Added,
    /// Identical pattern already present; the list is unchanged.
    AlreadyPresent,
}

/// Bounded set of topic wildcards suppressing forwarding in one direction.
#[derive(Debug, Clone)]
pub struct BlockList {
    patterns: Vec<String>,
    capacity: usize,
}

impl BlockList {
    pub const fn new(capacity: usize) -> Self {
        Self {
            patterns: Vec::new(),
            capacity,
        }
    }

    /// Add a pattern. Adding an existing pattern is not an error.
    pub fn insert(&mut self, pattern: &str) -> Result<BlockInsert, BlockListError> {
        if self.patterns.iter().any(|p| p == pattern) {
            return Ok(BlockInsert::AlreadyPresent);
        }
        if self.patterns.len() >= self.capacity {
            return Err(BlockListError::Full {
                capacity: self.capacity,
            });
        }
        self.patterns.push(pattern.to_string());
        Ok(BlockInsert::Added)
    }

    /// Remove a pattern previously added with the exact same text.
    pub fn remove(&mut self, pattern: &str) -> Result<(), BlockListError> {
        let index = self
            .patterns
            .iter()
            .position(|p| p == pattern)
            .ok_or(BlockListError::NotFound)?;
        self.patterns.remove(index);
        Ok(())
    }

    /// `true` when any pattern matches `topic`.
    pub fn blocks(&self, topic: &str) -> bool {
        self.patterns.iter().any(|p| topic_matches(p, topic))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
