//! Playback control: transport state machine, playhead mapping, and
//! frame pacing. Everything here is driven by explicit `Instant`s so the
//! behavior is deterministic under test.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Media-time advance applied by a single-step while paused.
pub const STEP_INTERVAL: f64 = 1.0 / 60.0;

/// Slack applied when deciding whether a paced frame is due, so a wakeup
/// arriving marginally early still renders instead of spinning.
const PACING_TOLERANCE: Duration = Duration::from_micros(250);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("track duration must be positive, got {0}")]
    InvalidDuration(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Running,
    Paused,
}

/// Play/pause state machine with single-step support.
///
/// Media time accumulates only while running; pausing folds the elapsed
/// wall time into the accumulator so a resume continues seamlessly. A
/// step request while paused releases exactly one frame and advances
/// media time by [`STEP_INTERVAL`].
#[derive(Debug)]
pub struct Transport {
    state: TransportState,
    media_seconds: f64,
    resumed_at: Option<Instant>,
    step_pending: bool,
}

impl Transport {
    pub fn new(now: Instant) -> Self {
        Self {
            state: TransportState::Running,
            media_seconds: 0.0,
            resumed_at: Some(now),
            step_pending: false,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.state {
            TransportState::Running => self.pause(now),
            TransportState::Paused => self.resume(now),
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if self.state == TransportState::Paused {
            return;
        }
        self.media_seconds = self.media_seconds(now);
        self.resumed_at = None;
        self.state = TransportState::Paused;
        tracing::debug!(media_seconds = self.media_seconds, "transport paused");
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state == TransportState::Running {
            return;
        }
        self.resumed_at = Some(now);
        self.step_pending = false;
        self.state = TransportState::Running;
        tracing::debug!(media_seconds = self.media_seconds, "transport resumed");
    }

    /// Queues a single-step. Ignored while running.
    pub fn request_step(&mut self) {
        if self.state == TransportState::Paused {
            self.step_pending = true;
        }
    }

    /// Seconds of media time elapsed, frozen while paused.
    pub fn media_seconds(&self, now: Instant) -> f64 {
        match self.resumed_at {
            Some(resumed_at) => {
                self.media_seconds + now.saturating_duration_since(resumed_at).as_secs_f64()
            }
            None => self.media_seconds,
        }
    }

    /// Whether a frame is currently wanted, without consuming a queued
    /// step. Used by schedulers deciding when to wake up.
    pub fn frame_pending(&self) -> bool {
        self.state == TransportState::Running || self.step_pending
    }

    /// Whether a frame should be rendered right now. Running always
    /// renders; paused renders once per queued step.
    pub fn take_frame(&mut self, _now: Instant) -> bool {
        match self.state {
            TransportState::Running => true,
            TransportState::Paused => {
                if self.step_pending {
                    self.step_pending = false;
                    self.media_seconds += STEP_INTERVAL;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Where the playhead position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayheadSource {
    /// Media clock: elapsed seconds over track duration, wrapping.
    #[default]
    Clock,
    /// Pointer scrub: horizontal position over surface width.
    Pointer,
}

/// Maps transport time or pointer position onto timeline progress.
#[derive(Debug)]
pub struct Playhead {
    duration: f64,
    source: PlayheadSource,
    pointer_fraction: f64,
}

impl Playhead {
    pub fn new(duration: f64, source: PlayheadSource) -> Result<Self, PlaybackError> {
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(PlaybackError::InvalidDuration(duration));
        }
        Ok(Self {
            duration,
            source,
            pointer_fraction: 0.0,
        })
    }

    pub fn source(&self) -> PlayheadSource {
        self.source
    }

    pub fn set_pointer_fraction(&mut self, fraction: f64) {
        self.pointer_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Timeline progress in [0, 1]. Clock playback wraps at the end of
    /// the track so the visualization loops.
    pub fn progress(&self, media_seconds: f64) -> f32 {
        match self.source {
            PlayheadSource::Clock => {
                let wrapped = media_seconds.rem_euclid(self.duration);
                (wrapped / self.duration) as f32
            }
            PlayheadSource::Pointer => self.pointer_fraction as f32,
        }
    }
}

/// Accumulator-based FPS cap. Uncapped when no target is set.
#[derive(Debug)]
pub struct FramePacer {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.next_due) {
            (None, _) | (_, None) => true,
            (Some(_), Some(due)) => now + PACING_TOLERANCE >= due,
        }
    }

    /// Advances the deadline by one interval. Late frames re-anchor on
    /// `now` so a stall never causes a burst of catch-up renders.
    pub fn mark_rendered(&mut self, now: Instant) {
        let Some(interval) = self.interval else {
            return;
        };
        self.next_due = Some(match self.next_due {
            Some(due) if now <= due + interval => due + interval,
            _ => now + interval,
        });
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.interval {
            Some(_) => self.next_due,
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn transport_accumulates_media_time_while_running() {
        let start = Instant::now();
        let transport = Transport::new(start);
        let time = transport.media_seconds(start + seconds(2.5));
        assert!((time - 2.5).abs() < 1e-9);
    }

    #[test]
    fn pausing_freezes_media_time() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        transport.pause(start + seconds(3.0));
        let frozen = transport.media_seconds(start + seconds(10.0));
        assert!((frozen - 3.0).abs() < 1e-9);
    }

    #[test]
    fn resume_continues_from_pause_point() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        transport.pause(start + seconds(3.0));
        transport.resume(start + seconds(8.0));
        let time = transport.media_seconds(start + seconds(9.0));
        assert!((time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn running_transport_always_releases_frames() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        assert!(transport.take_frame(start + seconds(0.1)));
        assert!(transport.take_frame(start + seconds(0.2)));
    }

    #[test]
    fn paused_transport_releases_exactly_one_frame_per_step() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        transport.pause(start + seconds(1.0));
        let later = start + seconds(2.0);

        assert!(!transport.take_frame(later));
        transport.request_step();
        assert!(transport.take_frame(later));
        assert!(!transport.take_frame(later));
        assert_eq!(transport.state(), TransportState::Paused);
    }

    #[test]
    fn single_step_advances_media_time_by_one_frame() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        transport.pause(start + seconds(1.0));
        transport.request_step();
        let later = start + seconds(5.0);
        assert!(transport.take_frame(later));
        let time = transport.media_seconds(later);
        assert!((time - (1.0 + STEP_INTERVAL)).abs() < 1e-9);
    }

    #[test]
    fn step_requests_are_ignored_while_running() {
        let start = Instant::now();
        let mut transport = Transport::new(start);
        transport.request_step();
        transport.pause(start + seconds(1.0));
        assert!(!transport.take_frame(start + seconds(2.0)));
    }

    #[test]
    fn playhead_rejects_non_positive_duration() {
        assert!(Playhead::new(0.0, PlayheadSource::Clock).is_err());
        assert!(Playhead::new(-10.0, PlayheadSource::Clock).is_err());
    }

    #[test]
    fn clock_playhead_maps_and_wraps() {
        let playhead = Playhead::new(200.0, PlayheadSource::Clock).unwrap();
        assert!((playhead.progress(100.0) - 0.5).abs() < 1e-6);
        // Past the end of the track the timeline loops.
        assert!((playhead.progress(250.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn pointer_playhead_clamps_to_unit_range() {
        let mut playhead = Playhead::new(100.0, PlayheadSource::Pointer).unwrap();
        playhead.set_pointer_fraction(1.7);
        assert_eq!(playhead.progress(42.0), 1.0);
        playhead.set_pointer_fraction(-0.3);
        assert_eq!(playhead.progress(42.0), 0.0);
        playhead.set_pointer_fraction(0.755);
        assert!((playhead.progress(0.0) - 0.755).abs() < 1e-6);
    }

    #[test]
    fn uncapped_pacer_is_always_ready() {
        let pacer = FramePacer::new(None);
        assert!(pacer.ready_for_frame(Instant::now()));
        assert!(pacer.next_deadline().is_none());
    }

    #[test]
    fn capped_pacer_spaces_frames_by_the_interval() {
        let start = Instant::now();
        let mut pacer = FramePacer::new(Some(10.0));
        assert!(pacer.ready_for_frame(start));
        pacer.mark_rendered(start);

        assert!(!pacer.ready_for_frame(start + Duration::from_millis(50)));
        assert!(pacer.ready_for_frame(start + Duration::from_millis(100)));
    }

    #[test]
    fn late_frames_reanchor_instead_of_bursting() {
        let start = Instant::now();
        let mut pacer = FramePacer::new(Some(10.0));
        pacer.mark_rendered(start);
        // Stall well past several intervals.
        let late = start + Duration::from_millis(500);
        pacer.mark_rendered(late);
        let deadline = pacer.next_deadline().unwrap();
        assert!(deadline >= late + Duration::from_millis(99));
    }

    #[test]
    fn pacer_tolerance_accepts_slightly_early_wakeups() {
        let start = Instant::now();
        let mut pacer = FramePacer::new(Some(10.0));
        pacer.mark_rendered(start);
        let almost = start + Duration::from_millis(100) - Duration::from_micros(200);
        assert!(pacer.ready_for_frame(almost));
    }
}
