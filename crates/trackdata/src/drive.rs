/// Offset above the series minimum below which samples are treated as
/// silence by [`NormalizeMode::DeadZone`].
pub const DEAD_ZONE_THRESHOLD: f32 = 0.1;

/// Default half-extent bound for adaptive smoothing.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;

/// How raw aggression samples map to the [0, 1] drive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Pass samples through untouched (still clamped to [0, 1]).
    Raw,
    /// Scale by the series maximum so the peak lands on exactly 1.0.
    Peak,
    /// Scale against a floor of `min + DEAD_ZONE_THRESHOLD` so quiet
    /// passages collapse to exactly 0 instead of idling above it.
    #[default]
    DeadZone,
}

/// A drive series plus the shaping steps applied to it.
#[derive(Debug, Clone)]
pub struct DriveSeries {
    samples: Vec<f32>,
}

impl DriveSeries {
    pub fn new(raw: Vec<f32>) -> Self {
        Self { samples: raw }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Normalizes the series into [0, 1] according to `mode`.
    pub fn normalized(&self, mode: NormalizeMode) -> DriveSeries {
        let samples = match mode {
            NormalizeMode::Raw => self
                .samples
                .iter()
                .map(|value| value.clamp(0.0, 1.0))
                .collect(),
            NormalizeMode::Peak => peak_normalize(&self.samples),
            NormalizeMode::DeadZone => dead_zone_normalize(&self.samples, DEAD_ZONE_THRESHOLD),
        };
        DriveSeries { samples }
    }

    /// Applies a per-track intensity multiplier, clamping back to [0, 1].
    pub fn scaled(&self, factor: f32) -> DriveSeries {
        DriveSeries {
            samples: self
                .samples
                .iter()
                .map(|value| (value * factor).clamp(0.0, 1.0))
                .collect(),
        }
    }

    /// Adaptive smoothing: quiet samples average over a wide window,
    /// loud samples keep their attack. For each sample the window size is
    /// derived from the sample itself:
    ///
    /// ```text
    /// r = min(1, v * 2)
    /// w = max(1, round(max_window * 1.5 * (1 - r)^2 + 1))
    /// ```
    ///
    /// averaged with triangular weights `1 - |j| / (half + 1) * 0.5`.
    pub fn smoothed(&self, max_window: usize) -> DriveSeries {
        let data = &self.samples;
        let mut smoothed = Vec::with_capacity(data.len());
        for (i, &value) in data.iter().enumerate() {
            let remapped = (value * 2.0).min(1.0);
            let smooth_factor = (1.0 - remapped).powi(2);
            let window = ((max_window as f32) * 1.5 * smooth_factor + 1.0)
                .round()
                .max(1.0) as usize;
            let half = window / 2;

            let mut sum = 0.0f32;
            let mut weight_sum = 0.0f32;
            for j in -(half as isize)..=(half as isize) {
                let index = i as isize + j;
                if index < 0 || index >= data.len() as isize {
                    continue;
                }
                let weight = 1.0 - (j.unsigned_abs() as f32) / (half as f32 + 1.0) * 0.5;
                sum += data[index as usize] * weight;
                weight_sum += weight;
            }
            smoothed.push(sum / weight_sum);
        }
        DriveSeries { samples: smoothed }
    }

    /// Sample at a playhead position in [0, 1].
    pub fn sample_at(&self, progress: f32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples[sample_index(progress, self.samples.len())]
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Maps a progress fraction onto a series index: `floor(p * (L - 1))`,
/// clamped so out-of-range progress never indexes out of bounds.
pub fn sample_index(progress: f32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let scaled = (progress * (len - 1) as f32).floor();
    if scaled < 0.0 {
        return 0;
    }
    (scaled as usize).min(len - 1)
}

fn peak_normalize(raw: &[f32]) -> Vec<f32> {
    let max = raw.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|value| (value / max).clamp(0.0, 1.0)).collect()
}

fn dead_zone_normalize(raw: &[f32], threshold: f32) -> Vec<f32> {
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
    if raw.is_empty() || !max.is_finite() || !min.is_finite() {
        return vec![0.0; raw.len()];
    }
    let floor = min + threshold;
    let range = max - floor;
    if range <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter()
        .map(|value| ((value - floor) / range).clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_normalization_maps_maximum_to_one() {
        let series = DriveSeries::new(vec![0.0, 1.0, 2.5, 5.0]);
        let normalized = series.normalized(NormalizeMode::Peak);
        assert_eq!(normalized.samples(), &[0.0, 0.2, 0.5, 1.0]);
    }

    #[test]
    fn peak_normalization_of_all_zero_series_is_zero() {
        let series = DriveSeries::new(vec![0.0, 0.0, 0.0]);
        let normalized = series.normalized(NormalizeMode::Peak);
        assert_eq!(normalized.samples(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn dead_zone_collapses_floor_samples_to_zero() {
        // min = 0.2 so the floor sits at 0.3; everything at or below it
        // must come out exactly 0.
        let series = DriveSeries::new(vec![0.2, 0.25, 0.3, 0.9, 1.3]);
        let normalized = series.normalized(NormalizeMode::DeadZone);
        assert_eq!(normalized.samples()[0], 0.0);
        assert_eq!(normalized.samples()[1], 0.0);
        assert_eq!(normalized.samples()[2], 0.0);
        assert!(normalized.samples()[3] > 0.0);
        assert_eq!(normalized.samples()[4], 1.0);
    }

    #[test]
    fn dead_zone_of_flat_series_is_zero() {
        let series = DriveSeries::new(vec![0.5, 0.5, 0.5]);
        let normalized = series.normalized(NormalizeMode::DeadZone);
        assert_eq!(normalized.samples(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn sample_index_matches_floor_mapping() {
        assert_eq!(sample_index(0.755, 100), 74);
        assert_eq!(sample_index(0.0, 100), 0);
        assert_eq!(sample_index(1.0, 100), 99);
    }

    #[test]
    fn sample_index_clamps_out_of_range_progress() {
        assert_eq!(sample_index(-0.5, 10), 0);
        assert_eq!(sample_index(1.5, 10), 9);
        assert_eq!(sample_index(0.5, 0), 0);
        assert_eq!(sample_index(0.9, 1), 0);
    }

    #[test]
    fn halfway_through_a_track_hits_the_expected_sample() {
        // 200 s track, 10 samples: t = 100 s is progress 0.5, index 4.
        let series = DriveSeries::new(vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 9.0, 7.0, 5.0, 3.0]);
        let progress = 100.0f32 / 200.0;
        assert_eq!(sample_index(progress, series.len()), 4);
        assert_eq!(series.sample_at(progress), 8.0);

        let normalized = series.normalized(NormalizeMode::Peak);
        assert!((normalized.sample_at(progress) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn scaling_clamps_to_unit_range() {
        let series = DriveSeries::new(vec![0.2, 0.5, 0.9]);
        let scaled = series.scaled(2.0);
        assert_eq!(scaled.samples(), &[0.4, 1.0, 1.0]);
    }

    #[test]
    fn smoothing_preserves_constant_series() {
        let series = DriveSeries::new(vec![0.25; 16]);
        let smoothed = series.smoothed(DEFAULT_SMOOTHING_WINDOW);
        for value in smoothed.samples() {
            assert!((value - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn smoothing_leaves_loud_samples_sharp() {
        // A sample at or above 0.5 remaps to 1.0, so its window collapses
        // to a single tap and the value passes through unchanged.
        let series = DriveSeries::new(vec![0.0, 0.0, 0.9, 0.0, 0.0]);
        let smoothed = series.smoothed(DEFAULT_SMOOTHING_WINDOW);
        assert_eq!(smoothed.samples()[2], 0.9);
    }

    #[test]
    fn smoothing_spreads_quiet_samples() {
        let mut raw = vec![0.0; 32];
        raw[16] = 0.1;
        let series = DriveSeries::new(raw);
        let smoothed = series.smoothed(DEFAULT_SMOOTHING_WINDOW);
        assert!(smoothed.samples()[16] < 0.1);
        assert!(smoothed.samples()[14] > 0.0);
    }
}
