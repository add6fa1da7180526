//! Scheduler configuration.

use crate::draw::CommandListGroups;
use crate::paint::Color;
use crate::time::ClockConfig;

/// Scheduler-side settings, constructed in `main`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub groups: CommandListGroups,
    /// Worker threads for recording. `None` uses one per core.
    pub worker_threads: Option<usize>,
    /// Color each frame is cleared to before any group records.
    pub clear_color: Color,
    pub clock: ClockConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            groups: CommandListGroups::default(),
            worker_threads: None,
            clear_color: Color::BLACK,
            clock: ClockConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Builds the worker runtime that records command lists.
    pub fn build_runtime(&self) -> std::io::Result<tokio::runtime::Runtime> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.thread_name("tiamat-worker").enable_time();
        if let Some(n) = self.worker_threads {
            builder.worker_threads(n.max(1));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_still_builds() {
        let config = EngineConfig {
            worker_threads: Some(0),
            ..EngineConfig::default()
        };
        let rt = config.build_runtime().unwrap();
        assert_eq!(rt.block_on(async { 7 }), 7);
    }
}
