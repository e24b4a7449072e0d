//! Test data builders for creating test objects

use moni_helper::backend::SampleCache;
use moni_helper::config::AppConfig;
use moni_helper::types::SampleRecord;

/// Builder for an [`AppConfig`] with timings short enough for tests
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.serial.read_timeout_ms = 20;
        config.serial.probe_timeout_ms = 300;
        config.watchdog.interval_ms = 50;
        Self { config }
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    pub fn window_size(mut self, size: usize) -> Self {
        self.config.cache.window_size = size;
        self
    }

    pub fn verify_device(mut self, verify: bool) -> Self {
        self.config.serial.verify_device = verify;
        self
    }

    pub fn watchdog_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.watchdog.interval_ms = interval_ms;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire line for a record, in the instrument's comma separated format
pub fn frame_line(record: &SampleRecord) -> String {
    record
        .channels
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Cache of `count` records where sample `i` is `[i, i+1, i+2, i+3]`
pub fn ramp_cache(capacity: usize, count: usize) -> SampleCache {
    let mut cache = SampleCache::new(capacity);
    for i in 0..count {
        let base = i as f64;
        cache.push(SampleRecord::new(base, base + 1.0, base + 2.0, base + 3.0));
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .cache_capacity(20)
            .window_size(10)
            .verify_device(true)
            .build();

        assert_eq!(config.cache.capacity, 20);
        assert_eq!(config.cache.window_size, 10);
        assert!(config.serial.verify_device);
        assert_eq!(config.watchdog.interval_ms, 50);
    }
}
