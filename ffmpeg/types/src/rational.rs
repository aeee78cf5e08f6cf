/*!
    Rational numbers for timebases and frame rates.
*/

use std::{cmp::Ordering, fmt, time::Duration};

/**
    A rational number, used for timebases (`1/fps`, `1/sample_rate`) and
    frame rates.

    The denominator is expected to be positive.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns the reciprocal, e.g. the timebase `1/30` for a frame rate of `30/1`.
    */
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /**
        Compare two timestamps expressed in different timebases, without
        rounding.
    */
    pub fn compare_ts(a: i64, a_tb: Self, b: i64, b_tb: Self) -> Ordering {
        let lhs = a as i128 * a_tb.num as i128 * b_tb.den as i128;
        let rhs = b as i128 * b_tb.num as i128 * a_tb.den as i128;
        lhs.cmp(&rhs)
    }

    /**
        Returns true if `ts` in this timebase lies at or beyond `limit`.
    */
    pub fn reached(self, ts: i64, limit: Duration) -> bool {
        let position = ts as i128 * self.num as i128 * 1_000_000_000;
        let limit = limit.as_nanos() as i128 * self.den as i128;
        position >= limit
    }

    /**
        The first timestamp in this timebase that has [`reached`](Self::reached)
        `limit`.
    */
    pub fn ticks_until(self, limit: Duration) -> i64 {
        let num = limit.as_nanos() as i128 * self.den as i128;
        let den = self.num as i128 * 1_000_000_000;
        let ticks = (num + den - 1) / den;
        ticks.clamp(0, i64::MAX as i128) as i64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_across_timebases() {
        let video = Rational::new(1, 25);
        let audio = Rational::new(1, 44100);
        assert_eq!(Rational::compare_ts(1, video, 1764, audio), Ordering::Equal);
        assert_eq!(Rational::compare_ts(1, video, 1000, audio), Ordering::Greater);
        assert_eq!(Rational::compare_ts(1, video, 2000, audio), Ordering::Less);
    }

    #[test]
    fn reached_is_inclusive_at_the_limit() {
        let tb = Rational::new(1, 30);
        let cap = Duration::from_secs(2);
        assert!(!tb.reached(59, cap));
        assert!(tb.reached(60, cap));
        assert!(tb.reached(61, cap));
    }

    #[test]
    fn reached_handles_fractional_limits() {
        let tb = Rational::new(1, 10);
        let cap = Duration::from_millis(250);
        assert!(!tb.reached(2, cap));
        assert!(tb.reached(3, cap));
    }

    #[test]
    fn ticks_until_is_the_first_reached_timestamp() {
        let audio = Rational::new(1, 16_000);
        let cap = Duration::from_millis(250);
        assert_eq!(audio.ticks_until(cap), 4000);
        assert!(audio.reached(audio.ticks_until(cap), cap));
        assert!(!audio.reached(audio.ticks_until(cap) - 1, cap));

        let video = Rational::new(1, 10);
        assert_eq!(video.ticks_until(cap), 3);
        assert_eq!(video.ticks_until(Duration::ZERO), 0);
    }

    #[test]
    fn invert_and_display() {
        let fps = Rational::new(30, 1);
        assert_eq!(fps.invert(), Rational::new(1, 30));
        assert_eq!(fps.invert().to_string(), "1/30");
    }
}
