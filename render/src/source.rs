/*!
    Sample sources that can feed a session's audio stream.
*/

use std::f64::consts::PI;

/**
    Producer of interleaved signed 16-bit PCM.
*/
pub trait SampleSource {
    /**
        Fill `buf` with whole samples of `channels` interleaved values and
        return how many samples per channel were written. Zero means the
        source is exhausted.
    */
    fn fill(&mut self, buf: &mut [i16], channels: usize) -> usize;
}

/**
    A sine tone that starts at 110 Hz and rises by 110 Hz every second, the
    same on every channel.
*/
#[derive(Clone, Debug)]
pub struct ToneSource {
    phase: f64,
    step: f64,
    step_increment: f64,
    amplitude: f64,
    remaining: Option<u64>,
}

impl ToneSource {
    pub const BASE_FREQUENCY: f64 = 110.0;
    pub const DEFAULT_AMPLITUDE: i16 = 10_000;

    pub fn new(sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        Self {
            phase: 0.0,
            step: 2.0 * PI * Self::BASE_FREQUENCY / rate,
            // increment frequency by 110 Hz per second
            step_increment: 2.0 * PI * Self::BASE_FREQUENCY / rate / rate,
            amplitude: Self::DEFAULT_AMPLITUDE as f64,
            remaining: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude as f64;
        self
    }

    /**
        Stop after `samples` samples per channel.
    */
    pub fn with_length(mut self, samples: u64) -> Self {
        self.remaining = Some(samples);
        self
    }
}

impl SampleSource for ToneSource {
    fn fill(&mut self, buf: &mut [i16], channels: usize) -> usize {
        if channels == 0 {
            return 0;
        }

        let mut count = buf.len() / channels;
        if let Some(remaining) = self.remaining {
            count = count.min(remaining as usize);
            self.remaining = Some(remaining - count as u64);
        }

        for sample in buf.chunks_exact_mut(channels).take(count) {
            let value = (self.phase.sin() * self.amplitude) as i16;
            sample.fill(value);
            self.phase += self.step;
            self.step += self.step_increment;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_stays_within_amplitude() {
        let mut tone = ToneSource::new(44_100);
        let mut buf = vec![0i16; 2 * 4410];
        assert_eq!(tone.fill(&mut buf, 2), 4410);

        assert_eq!(buf[0], 0);
        assert!(buf.iter().all(|v| v.abs() <= ToneSource::DEFAULT_AMPLITUDE));
        assert!(buf.iter().any(|v| v.abs() > 9_000));
    }

    #[test]
    fn channels_carry_the_same_value() {
        let mut tone = ToneSource::new(48_000);
        let mut buf = vec![0i16; 3 * 100];
        tone.fill(&mut buf, 3);

        for sample in buf.chunks_exact(3) {
            assert_eq!(sample[0], sample[1]);
            assert_eq!(sample[1], sample[2]);
        }
    }

    #[test]
    fn limited_source_runs_dry() {
        let mut tone = ToneSource::new(8_000).with_length(150);
        let mut buf = vec![0i16; 100];

        assert_eq!(tone.fill(&mut buf, 1), 100);
        assert_eq!(tone.fill(&mut buf, 1), 50);
        assert_eq!(tone.fill(&mut buf, 1), 0);
    }

    #[test]
    fn frequency_rises_over_time() {
        let rate = 8_000;
        let mut tone = ToneSource::new(rate).with_amplitude(i16::MAX);
        let mut buf = vec![0i16; rate as usize * 3];
        tone.fill(&mut buf, 1);

        let crossings = |window: &[i16]| {
            window
                .windows(2)
                .filter(|w| (w[0] < 0) != (w[1] < 0))
                .count()
        };
        let first = crossings(&buf[..rate as usize]);
        let third = crossings(&buf[2 * rate as usize..]);
        assert!(third > first * 2, "{first} vs {third}");
    }
}
