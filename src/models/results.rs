use serde::{Deserialize, Serialize};

/// Mean response time in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseTime {
    pub average: f64,
}

/// One key of a distribution with its share of the total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub key: String,
    pub count: u64,
    /// `count / total` across all keys, in `[0, 1]`
    pub ratio: f64,
}

/// Frequency distribution over a categorical key (referrer, current page)
///
/// An empty distribution means no traffic was observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub entries: Vec<DistributionEntry>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn get(&self, key: &str) -> Option<&DistributionEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbnormalFlag {
    pub abnormal: bool,
}
