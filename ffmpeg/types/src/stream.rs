/*!
    Stream information types.
*/

use std::fmt;

use crate::{ChannelLayout, PixelFormat, Rational, SampleFormat};

/**
    The kind of media carried by an output stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Audio => "audio",
        })
    }
}

/**
    Information about a provisioned video output stream.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct VideoStreamInfo {
    /// Index of the stream inside the container.
    pub index: usize,
    /// Short name of the encoder (e.g. `mpeg1video`).
    pub codec: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Encoder-native pixel format.
    pub pixel_format: PixelFormat,
    /// Frame rate.
    pub frame_rate: Rational,
    /// Timebase frames are stamped in (`1/fps`).
    pub encoder_time_base: Rational,
    /// Timebase the container assigned after writing the header.
    pub time_base: Rational,
    /// Target bitrate in bits per second.
    pub bit_rate: u64,
    /// Keyframe interval in frames.
    pub gop_size: u32,
}

/**
    Information about a provisioned audio output stream.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioStreamInfo {
    /// Index of the stream inside the container.
    pub index: usize,
    /// Short name of the encoder (e.g. `mp2`).
    pub codec: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Encoder-native sample format.
    pub sample_format: SampleFormat,
    /// Samples per channel in every encoded frame.
    pub frame_size: usize,
    /// Timebase samples are stamped in (`1/sample_rate`).
    pub encoder_time_base: Rational,
    /// Timebase the container assigned after writing the header.
    pub time_base: Rational,
    /// Target bitrate in bits per second.
    pub bit_rate: u64,
}

/**
    Description of an output file once its header has been written.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct OutputInfo {
    /// Short muxer name (e.g. `mp4`, `mpeg`).
    pub container: String,
    /// True if the muxer could not be inferred from the filename and the
    /// fallback container was used instead.
    pub fell_back: bool,
    /// False for muxers that do not write to a file of their own.
    pub file_backed: bool,
    /// Video stream information (if the container carries video).
    pub video: Option<VideoStreamInfo>,
    /// Audio stream information (if the container carries audio).
    pub audio: Option<AudioStreamInfo>,
}

impl OutputInfo {
    /**
        Returns true if this output has video.
    */
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /**
        Returns true if this output has audio.
    */
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}
