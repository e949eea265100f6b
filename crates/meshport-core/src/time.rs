//! Frame time for tick-driven systems
//!
//! Systems do not read a wall clock. The driver feeds a raw delta per tick and
//! systems read the clamped result from the world's `FrameTime` resource.

/// Frame time tracking
#[derive(Debug, Clone)]
pub struct FrameTime {
    /// Maximum delta time accepted for a single tick
    pub max_delta_time: f32,
    /// Time since the first tick in seconds
    pub total_time: f64,
    /// Delta time for this tick (clamped)
    pub delta_time: f32,
    /// Tick counter
    pub frame_count: u64,
}

impl Default for FrameTime {
    fn default() -> Self {
        Self {
            max_delta_time: 0.25,
            total_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
        }
    }
}

impl FrameTime {
    /// Advance by the raw delta from the previous tick
    pub fn update(&mut self, raw_delta: f32) {
        self.delta_time = raw_delta.clamp(0.0, self.max_delta_time);
        self.total_time += self.delta_time as f64;
        self.frame_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time() {
        let mut time = FrameTime::default();
        time.update(0.016);
        time.update(0.016);

        assert!((time.delta_time - 0.016).abs() < 1e-6);
        assert!((time.total_time - 0.032).abs() < 1e-6);
        assert_eq!(time.frame_count, 2);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut time = FrameTime::default();
        time.update(10.0);
        assert_eq!(time.delta_time, 0.25);

        time.update(-1.0);
        assert_eq!(time.delta_time, 0.0);
        assert_eq!(time.total_time, 0.25);
    }
}
