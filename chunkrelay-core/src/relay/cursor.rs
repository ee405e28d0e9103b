use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A consumer's read position within one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerCursor {
    /// Index the consumer will ask for next
    pub position: u64,
    pub last_seen: Instant,
}

/// Consumer id → cursor for a single stream.
///
/// Positions are whatever the consumer last asked for; nothing here forces
/// them to move forward.
#[derive(Debug, Default)]
pub struct CursorTracker {
    cursors: HashMap<String, ConsumerCursor>,
}

impl CursorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` for `consumer_id` and refresh its activity time.
    pub fn touch(&mut self, consumer_id: &str, position: u64, now: Instant) {
        let cursor = ConsumerCursor {
            position,
            last_seen: now,
        };
        if let Some(existing) = self.cursors.get_mut(consumer_id) {
            *existing = cursor;
        } else {
            self.cursors.insert(consumer_id.to_string(), cursor);
        }
    }

    /// Drop cursors idle for longer than `idle_timeout`; returns their ids.
    pub fn evict_idle(&mut self, now: Instant, idle_timeout: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.cursors.retain(|consumer_id, cursor| {
            let idle = now.saturating_duration_since(cursor.last_seen);
            if idle > idle_timeout {
                evicted.push(consumer_id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Lowest position across tracked consumers. `None` when nobody is tracked.
    #[must_use]
    pub fn floor(&self) -> Option<u64> {
        self.cursors.values().map(|c| c.position).min()
    }

    #[must_use]
    pub fn get(&self, consumer_id: &str) -> Option<ConsumerCursor> {
        self.cursors.get(consumer_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_minimum_position() {
        let now = Instant::now();
        let mut tracker = CursorTracker::new();
        assert_eq!(tracker.floor(), None);

        tracker.touch("c1", 0, now);
        tracker.touch("c2", 5, now);
        assert_eq!(tracker.floor(), Some(0));

        tracker.touch("c1", 6, now);
        assert_eq!(tracker.floor(), Some(5));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_touch_accepts_backwards_position() {
        let now = Instant::now();
        let mut tracker = CursorTracker::new();
        tracker.touch("c1", 10, now);
        tracker.touch("c1", 3, now);
        assert_eq!(tracker.get("c1").unwrap().position, 3);
    }

    #[test]
    fn test_evict_idle_strictly_older_than_timeout() {
        let start = Instant::now();
        let timeout = Duration::from_secs(300);
        let mut tracker = CursorTracker::new();
        tracker.touch("stale", 1, start);
        tracker.touch("fresh", 2, start + Duration::from_secs(200));

        // Exactly at the timeout nothing is evicted
        assert!(tracker.evict_idle(start + timeout, timeout).is_empty());

        let evicted = tracker.evict_idle(start + timeout + Duration::from_secs(1), timeout);
        assert_eq!(evicted, vec!["stale".to_string()]);
        assert!(tracker.get("stale").is_none());
        assert_eq!(tracker.floor(), Some(2));
    }

    #[test]
    fn test_touch_refreshes_activity() {
        let start = Instant::now();
        let timeout = Duration::from_secs(60);
        let mut tracker = CursorTracker::new();
        tracker.touch("c1", 0, start);
        tracker.touch("c1", 1, start + Duration::from_secs(50));

        assert!(tracker
            .evict_idle(start + Duration::from_secs(100), timeout)
            .is_empty());
        assert!(!tracker.is_empty());
    }
}
