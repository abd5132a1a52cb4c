use std::time::{SystemTime, UNIX_EPOCH};

/// Issues process-unique identifiers of the form `{prefix}-{epoch}-{counter}`.
///
/// The counter is strictly increasing and is the uniqueness source; the epoch
/// only makes ids from different sessions easy to tell apart.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    epoch: u64,
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_epoch(epoch)
    }

    pub fn with_epoch(epoch: u64) -> Self {
        Self { epoch, counter: 0 }
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}-{}", prefix, self.epoch, self.counter);
        self.counter += 1;
        id
    }

    pub fn issued(&self) -> u64 {
        self.counter
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
