/// Timing inputs for a single rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    pub seconds: f32,
    pub delta: f32,
    pub frame_index: u32,
}

/// Turns transport media time into per-frame samples with a monotonic
/// frame counter. The transport owns pause semantics, so the clock only
/// has to difference successive timestamps.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_seconds: Option<f64>,
    frame_index: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, media_seconds: f64) -> TimeSample {
        let delta = match self.last_seconds {
            Some(last) => (media_seconds - last).max(0.0) as f32,
            None => 0.0,
        };
        self.last_seconds = Some(media_seconds);
        let sample = TimeSample {
            seconds: media_seconds as f32,
            delta,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_has_zero_delta() {
        let mut clock = FrameClock::new();
        let sample = clock.sample(5.0);
        assert_eq!(sample.seconds, 5.0);
        assert_eq!(sample.delta, 0.0);
        assert_eq!(sample.frame_index, 0);
    }

    #[test]
    fn deltas_difference_successive_samples() {
        let mut clock = FrameClock::new();
        clock.sample(1.0);
        let sample = clock.sample(1.25);
        assert!((sample.delta - 0.25).abs() < 1e-6);
        assert_eq!(sample.frame_index, 1);
    }

    #[test]
    fn paused_time_yields_zero_delta_frames() {
        let mut clock = FrameClock::new();
        clock.sample(2.0);
        let held = clock.sample(2.0);
        assert_eq!(held.delta, 0.0);
        assert_eq!(held.frame_index, 1);
    }
}
