use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped. Passed to every dispatch as `delta`.
    pub dt: f32,
    pub now: Instant,
    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Delta-time clamps.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClockConfig {
    pub dt_min: Duration,
    pub dt_max: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            dt_min: Duration::from_micros(100), // 0.0001s
            dt_max: Duration::from_millis(250), // 0.25s
        }
    }
}

/// Frame clock producing `FrameTime` snapshots, one per render loop.
///
/// Delta time is clamped so a stalled or debugged process does not hand huge
/// deltas to draw hooks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    config: ClockConfig,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(config: ClockConfig) -> Self {
        debug_assert!(config.dt_min <= config.dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            config,
        }
    }

    /// Resets the baseline, e.g. after the surface was reconfigured.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.config.dt_min, self.config.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
