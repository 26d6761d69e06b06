use std::f32::consts::TAU;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;
const FREQUENCY_HZ: f32 = 660.0;
const START_GAIN: f32 = 0.0001;
const PEAK_GAIN: f32 = 0.2;
const RAMP_SECS: f32 = 0.05;
const LENGTH_MS: u32 = 200;

/// Short 660 Hz blip with an exponential fade-in, played when the overlay
/// first appears.
pub struct AlertTone {
    sample_rate: u32,
    index: u32,
    total_samples: u32,
}

impl AlertTone {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            index: 0,
            total_samples: SAMPLE_RATE * LENGTH_MS / 1000,
        }
    }

    fn gain_at(t: f32) -> f32 {
        if t >= RAMP_SECS {
            return PEAK_GAIN;
        }
        START_GAIN * (PEAK_GAIN / START_GAIN).powf(t / RAMP_SECS)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.total_samples) * 1000 / u64::from(self.sample_rate))
    }
}

impl Default for AlertTone {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for AlertTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total_samples {
            return None;
        }
        let t = self.index as f32 / self.sample_rate as f32;
        self.index += 1;
        Some((TAU * FREQUENCY_HZ * t).sin() * Self::gain_at(t))
    }
}

#[cfg(feature = "audio")]
impl rodio::Source for AlertTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.index) as usize)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration())
    }
}
