use std::{
    fmt,
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// An opaque identifier for a subscription
///
/// Ids come from a process wide counter, so concurrent subscriptions never
/// share one.  The underlying type is not exposed publically.
pub struct SubscriptionId(NonZeroUsize);

impl SubscriptionId {
    pub(super) fn next() -> Self {
        loop {
            // Skips zero if the counter ever wraps
            if let Some(id) = NonZeroUsize::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)) {
                return SubscriptionId(id);
            }
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_unique_across_threads() {
        let handles = (0..4)
            .map(|_| std::thread::spawn(|| (0..256).map(|_| SubscriptionId::next()).collect::<Vec<_>>()))
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "{id} was issued twice");
            }
        }
        assert_eq!(seen.len(), 4 * 256);
    }
}
