//! Bounded session memory.
//!
//! Retains the most recent task exchanges in a circular buffer and renders
//! a compact context window for the system prompt. The conversation loop
//! consults memory once per invocation and appends once per completed (or
//! exhausted) invocation.

use std::collections::VecDeque;

use tracing::debug;

/// One completed input/output pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub input: String,
    pub output: String,
    pub success: bool,
}

/// Circular store of recent exchanges; oldest entries are evicted past the
/// configured maximum.
#[derive(Debug)]
pub struct SessionMemory {
    exchanges: VecDeque<Exchange>,
    max_exchanges: usize,
    interaction_count: u64,
}

/// Per-message truncation applied when rendering context.
const CONTEXT_SNIPPET_CHARS: usize = 200;

impl SessionMemory {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            exchanges: VecDeque::new(),
            max_exchanges: max_exchanges.max(1),
            interaction_count: 0,
        }
    }

    /// Record a completed exchange, evicting the oldest when full.
    pub fn append_exchange(
        &mut self,
        input: impl Into<String>,
        output: impl Into<String>,
        success: bool,
    ) {
        self.exchanges.push_back(Exchange {
            input: input.into(),
            output: output.into(),
            success,
        });
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
        self.interaction_count += 1;
        debug!(
            stored = self.exchanges.len(),
            total = self.interaction_count,
            "recorded exchange"
        );
    }

    /// The most recent `limit` exchanges, oldest first (most recent last).
    pub fn recent(&self, limit: usize) -> Vec<&Exchange> {
        let skip = self.exchanges.len().saturating_sub(limit);
        self.exchanges.iter().skip(skip).collect()
    }

    /// Render recent exchanges as context for the system prompt.
    ///
    /// Returns an empty string when nothing has been recorded.
    pub fn context(&self, limit: usize) -> String {
        let recent = self.recent(limit);
        if recent.is_empty() {
            return String::new();
        }

        let mut out = format!("Interactions so far: {}\n", self.interaction_count);
        let successful = self.exchanges.iter().filter(|e| e.success).count();
        if successful > 0 {
            out.push_str(&format!("Recent successful tasks: {successful}\n"));
        }

        out.push_str("Recent conversation:\n");
        for exchange in recent {
            out.push_str(&format!("USER: {}\n", snippet(&exchange.input)));
            out.push_str(&format!("ASSISTANT: {}\n", snippet(&exchange.output)));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn interaction_count(&self) -> u64 {
        self.interaction_count
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() > CONTEXT_SNIPPET_CHARS {
        let truncated: String = text.chars().take(CONTEXT_SNIPPET_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_returns_min_of_count_and_limit() {
        let mut memory = SessionMemory::new(50);
        for i in 0..7 {
            memory.append_exchange(format!("task {i}"), format!("done {i}"), true);
        }

        let recent = memory.recent(5);
        assert_eq!(recent.len(), 5);
        // Most recent last.
        assert_eq!(recent[4].input, "task 6");
        assert_eq!(recent[0].input, "task 2");

        let recent = memory.recent(100);
        assert_eq!(recent.len(), 7);
    }

    #[test]
    fn evicts_oldest_past_maximum() {
        let mut memory = SessionMemory::new(3);
        for i in 0..5 {
            memory.append_exchange(format!("task {i}"), "ok", true);
        }
        assert_eq!(memory.len(), 3);
        let recent = memory.recent(3);
        assert_eq!(recent[0].input, "task 2");
        assert_eq!(recent[2].input, "task 4");
        // The interaction counter keeps counting past evictions.
        assert_eq!(memory.interaction_count(), 5);
    }

    #[test]
    fn context_is_empty_without_exchanges() {
        let memory = SessionMemory::new(10);
        assert_eq!(memory.context(5), "");
    }

    #[test]
    fn context_contains_recent_pairs() {
        let mut memory = SessionMemory::new(10);
        memory.append_exchange("find the docs", "found at /docs", true);
        memory.append_exchange("log in", "could not log in", false);

        let context = memory.context(5);
        assert!(context.contains("USER: find the docs"));
        assert!(context.contains("ASSISTANT: found at /docs"));
        assert!(context.contains("USER: log in"));
        assert!(context.contains("Recent successful tasks: 1"));
    }

    #[test]
    fn context_truncates_long_messages() {
        let mut memory = SessionMemory::new(10);
        memory.append_exchange("x".repeat(500), "ok", true);
        let context = memory.context(1);
        assert!(context.contains(&format!("{}...", "x".repeat(200))));
        assert!(!context.contains(&"x".repeat(201)));
    }
}
