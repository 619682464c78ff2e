use serde::ser::{Serialize, SerializeMap, Serializer};

/// Immutable copy of every declared category and its count, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    counts: Vec<(String, u64)>,
}

impl Tally {
    pub fn get(&self, category: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

// Serialized as a JSON object keyed by category, keeping declared order.
impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (name, count) in &self.counts {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// The mutable counters. Owned by exactly one coordinator task.
#[derive(Debug)]
pub struct TallyStore {
    counts: Vec<(String, u64)>,
}

impl TallyStore {
    /// Every category starts at zero. Callers are expected to pass a
    /// deduplicated, non-empty list (see `Config::load`).
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let counts = categories.into_iter().map(|c| (c.into(), 0)).collect();
        Self { counts }
    }

    pub fn is_declared(&self, category: &str) -> bool {
        self.counts.iter().any(|(name, _)| name == category)
    }

    /// Adds one vote. An undeclared category leaves the counters untouched.
    pub fn increment(&mut self, category: &str) -> Tally {
        if let Some((_, count)) = self.counts.iter_mut().find(|(name, _)| name == category) {
            *count = count.saturating_add(1);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> Tally {
        Tally {
            counts: self.counts.clone(),
        }
    }
}
