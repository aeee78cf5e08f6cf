/*!
    Encoder configuration types.
*/

use panim_types::{ChannelLayout, PixelFormat, Rational, SampleFormat};

/// Video bitrate used when none is configured, in bits per second.
pub const DEFAULT_VIDEO_BIT_RATE: u64 = 4_000_000;
/// Keyframe interval used when none is configured, in frames.
pub const DEFAULT_GOP_SIZE: u32 = 20;
/// Audio sample rate used when none is configured, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Audio bitrate used when none is configured, in bits per second.
pub const DEFAULT_AUDIO_BIT_RATE: u64 = 64_000;

/**
    Configuration for video encoding.

    The codec itself is not part of the configuration; it is whatever the
    container declares as its default.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct VideoEncoderConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate.
    pub frame_rate: Rational,
    /// Pixel format frames are handed to the encoder in.
    pub pixel_format: PixelFormat,
    /// Target bitrate in bits per second.
    pub bit_rate: u64,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    /// Place codec headers out of band (required by some containers).
    pub global_header: bool,
}

impl VideoEncoderConfig {
    /**
        Create a new video encoder configuration at `fps` frames per second.
    */
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            frame_rate: Rational::new(fps as i32, 1),
            pixel_format: PixelFormat::Yuv420p,
            bit_rate: DEFAULT_VIDEO_BIT_RATE,
            gop_size: DEFAULT_GOP_SIZE,
            global_header: false,
        }
    }

    /**
        Set the target bitrate in bits per second.
    */
    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    /**
        Set the keyframe interval in frames.
    */
    pub fn with_gop_size(mut self, frames: u32) -> Self {
        self.gop_size = frames;
        self
    }

    pub fn with_global_header(mut self, global_header: bool) -> Self {
        self.global_header = global_header;
        self
    }

    /**
        The timebase frames are stamped in: one tick per frame.
    */
    pub fn time_base(&self) -> Rational {
        self.frame_rate.invert()
    }
}

/**
    Configuration for audio encoding.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioEncoderConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Sample format frames are handed to the encoder in.
    pub sample_format: SampleFormat,
    /// Target bitrate in bits per second.
    pub bit_rate: u64,
    /// Place codec headers out of band (required by some containers).
    pub global_header: bool,
}

impl AudioEncoderConfig {
    /**
        Create a new audio encoder configuration.
    */
    pub fn new(sample_rate: u32, channels: ChannelLayout) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::F32Planar,
            bit_rate: DEFAULT_AUDIO_BIT_RATE,
            global_header: false,
        }
    }

    /**
        Set the target bitrate in bits per second.
    */
    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    pub fn with_global_header(mut self, global_header: bool) -> Self {
        self.global_header = global_header;
        self
    }

    /**
        The timebase samples are stamped in: one tick per sample.
    */
    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate as i32)
    }
}

impl Default for AudioEncoderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, ChannelLayout::Stereo)
    }
}
