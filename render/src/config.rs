/*!
    Render session configuration.
*/

use std::time::Duration;

use panim_encode::{
    DEFAULT_AUDIO_BIT_RATE, DEFAULT_GOP_SIZE, DEFAULT_SAMPLE_RATE, DEFAULT_VIDEO_BIT_RATE,
};
use panim_transform::ScalingAlgorithm;
use panim_types::{ChannelLayout, PixelFormat, SetupError};

/**
    Recording limit of the muxing sample the pipeline grew out of. Not applied
    unless passed to [`RenderConfig::with_duration_cap`].
*/
pub const REFERENCE_DURATION_CAP: Duration = Duration::from_secs(30);

/**
    Everything a session needs besides the output path.

    Only the frame geometry and rate are required; the rest defaults to the
    values the pipeline has always used.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Frame width in pixels, must be even.
    pub width: u32,
    /// Frame height in pixels, must be even.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Submissions at or past this media time are refused.
    pub duration_cap: Option<Duration>,
    /// Layout of the host's 32-bit pixels.
    pub host_format: PixelFormat,
    /// Filter used when converting host pixels to the encoder format.
    pub scaling: ScalingAlgorithm,
    /// Muxer name overriding inference from the file extension.
    pub container: Option<String>,
    pub video_bit_rate: u64,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub audio_bit_rate: u64,
}

impl RenderConfig {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            duration_cap: None,
            host_format: PixelFormat::Bgra,
            scaling: ScalingAlgorithm::Bicubic,
            container: None,
            video_bit_rate: DEFAULT_VIDEO_BIT_RATE,
            gop_size: DEFAULT_GOP_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: ChannelLayout::Stereo,
            audio_bit_rate: DEFAULT_AUDIO_BIT_RATE,
        }
    }

    /**
        Refuse frames and samples once `cap` of media time has been accepted.
    */
    pub fn with_duration_cap(mut self, cap: Duration) -> Self {
        self.duration_cap = Some(cap);
        self
    }

    pub fn with_host_format(mut self, format: PixelFormat) -> Self {
        self.host_format = format;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingAlgorithm) -> Self {
        self.scaling = scaling;
        self
    }

    /**
        Use the muxer called `name` instead of guessing from the extension.
    */
    pub fn with_container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    pub fn with_video_bit_rate(mut self, bit_rate: u64) -> Self {
        self.video_bit_rate = bit_rate;
        self
    }

    pub fn with_gop_size(mut self, frames: u32) -> Self {
        self.gop_size = frames;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: ChannelLayout) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_audio_bit_rate(mut self, bit_rate: u64) -> Self {
        self.audio_bit_rate = bit_rate;
        self
    }

    /**
        Check the configuration before anything is allocated or written.
    */
    pub fn validate(&self) -> Result<(), SetupError> {
        let odd = self.width % 2 != 0 || self.height % 2 != 0;
        if self.width == 0 || self.height == 0 || odd {
            return Err(SetupError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 || self.fps > i32::MAX as u32 {
            return Err(SetupError::InvalidFrameRate { fps: self.fps });
        }
        if self.host_format.is_planar() {
            return Err(SetupError::InvalidConfig(format!(
                "host pixel format {:?} is not a packed layout",
                self.host_format
            )));
        }
        if self.sample_rate == 0 || self.sample_rate > i32::MAX as u32 {
            return Err(SetupError::InvalidConfig(format!(
                "sample rate {} is out of range",
                self.sample_rate
            )));
        }
        if self.gop_size == 0 {
            return Err(SetupError::InvalidConfig("GOP size must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_pipeline() {
        let config = RenderConfig::new(640, 480, 30);
        assert_eq!(config.video_bit_rate, 4_000_000);
        assert_eq!(config.gop_size, 20);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.channels, ChannelLayout::Stereo);
        assert_eq!(config.audio_bit_rate, 64_000);
        assert_eq!(config.host_format, PixelFormat::Bgra);
        assert_eq!(config.scaling, ScalingAlgorithm::Bicubic);
        assert_eq!(config.duration_cap, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn odd_or_zero_dimensions_are_rejected() {
        for (width, height) in [(641, 480), (640, 481), (0, 480), (640, 0)] {
            let err = RenderConfig::new(width, height, 30).validate().unwrap_err();
            assert!(matches!(err, SetupError::InvalidDimensions { .. }));
        }
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let err = RenderConfig::new(640, 480, 0).validate().unwrap_err();
        assert!(matches!(err, SetupError::InvalidFrameRate { fps: 0 }));
    }

    #[test]
    fn planar_host_format_is_rejected() {
        let err = RenderConfig::new(640, 480, 30)
            .with_host_format(PixelFormat::Yuv420p)
            .validate()
            .unwrap_err();
        assert!(matches!(err, SetupError::InvalidConfig(_)));
    }

    #[test]
    fn builders_override_defaults() {
        let config = RenderConfig::new(320, 240, 24)
            .with_duration_cap(REFERENCE_DURATION_CAP)
            .with_container("matroska")
            .with_sample_rate(48_000)
            .with_channels(ChannelLayout::Mono)
            .with_gop_size(12)
            .with_scaling(ScalingAlgorithm::Nearest);
        assert_eq!(config.duration_cap, Some(Duration::from_secs(30)));
        assert_eq!(config.container.as_deref(), Some("matroska"));
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.channels, ChannelLayout::Mono);
        assert_eq!(config.gop_size, 12);
        assert_eq!(config.scaling, ScalingAlgorithm::Nearest);
    }
}
