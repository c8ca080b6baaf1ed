//! Subscription filters for SUB sockets.
//!
//! Design:
//! - A multiset of byte prefixes kept in a Vec sorted lexicographically.
//! - subscribe/unsubscribe: O(log N) search, duplicates tracked by count.
//! - `matches` hot-path: forward scan with early exit once prefix > topic.

use bytes::Bytes;

/// One distinct prefix and how many times it was subscribed.
#[derive(Debug, Clone)]
struct Subscription {
    /// Topic prefix (empty = subscribe to all)
    prefix: Bytes,
    count: usize,
}

impl Subscription {
    const fn new(prefix: Bytes) -> Self {
        Self { prefix, count: 1 }
    }

    fn matches(&self, topic: &[u8]) -> bool {
        topic.starts_with(&self.prefix)
    }
}

/// Multiset of subscription prefixes.
///
/// A message is accepted if it matches at least one prefix; an empty set
/// accepts nothing.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Create a new empty subscription set
    #[must_use]
    pub const fn new() -> Self {
        Self { subs: Vec::new() }
    }

    /// Add one instance of `prefix`.
    pub fn subscribe(&mut self, prefix: Bytes) {
        match self.subs.binary_search_by(|s| s.prefix.cmp(&prefix)) {
            Ok(idx) => self.subs[idx].count += 1,
            Err(idx) => self.subs.insert(idx, Subscription::new(prefix)),
        }
    }

    /// Remove exactly one instance of `prefix`.
    ///
    /// Returns false if the prefix was not subscribed.
    pub fn unsubscribe(&mut self, prefix: &[u8]) -> bool {
        match self.subs.binary_search_by(|s| s.prefix.as_ref().cmp(prefix)) {
            Ok(idx) => {
                self.subs[idx].count -= 1;
                if self.subs[idx].count == 0 {
                    self.subs.remove(idx);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Check if a topic matches any subscription
    #[must_use]
    pub fn matches(&self, topic: &[u8]) -> bool {
        for sub in &self.subs {
            // If prefix > topic, it cannot be a prefix of topic.
            if sub.prefix.as_ref() > topic {
                break;
            }
            if sub.matches(topic) {
                return true;
            }
        }
        false
    }

    /// Check if there are no subscriptions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscriptions, counting duplicates
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.iter().map(|s| s.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_matches() {
        let sub = Subscription::new(Bytes::from_static(b"topic."));

        assert!(sub.matches(b"topic.foo"));
        assert!(sub.matches(b"topic.bar"));
        assert!(!sub.matches(b"other.foo"));
        assert!(!sub.matches(b"topi"));
    }

    #[test]
    fn test_empty_prefix_matches_all() {
        let mut set = SubscriptionSet::new();
        assert!(!set.matches(b"anything"));

        set.subscribe(Bytes::new());
        assert!(set.matches(b"anything"));
        assert!(set.matches(b""));
    }

    #[test]
    fn test_prefix_filtering() {
        let mut set = SubscriptionSet::new();
        set.subscribe(Bytes::from_static(b"A"));
        set.subscribe(Bytes::from_static(b"AB"));

        assert!(set.matches(b"A"));
        assert!(set.matches(b"ABC"));
        assert!(set.matches(b"ABD"));
        assert!(!set.matches(b"B"));
        assert!(!set.matches(b""));

        set.subscribe(Bytes::new());
        assert!(set.matches(b"B"));
        assert!(set.matches(b""));
    }

    #[test]
    fn test_duplicates_removed_one_at_a_time() {
        let mut set = SubscriptionSet::new();
        set.subscribe(Bytes::from_static(b"news"));
        set.subscribe(Bytes::from_static(b"news"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.subs.len(), 1);

        assert!(set.unsubscribe(b"news"));
        assert!(set.matches(b"news.sport"));

        assert!(set.unsubscribe(b"news"));
        assert!(!set.matches(b"news.sport"));
        assert!(!set.unsubscribe(b"news"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_early_exit_keeps_later_matches() {
        let mut set = SubscriptionSet::new();
        set.subscribe(Bytes::from_static(b"apple"));
        set.subscribe(Bytes::from_static(b"apply"));

        assert!(set.matches(b"apple pie"));
        assert!(!set.matches(b"appl"));
    }
}
