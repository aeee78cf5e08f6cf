/*!
    Pixel and sample format types.
*/

/**
    Video pixel formats understood by the pipeline.

    Host frames arrive as one of the packed 32-bit layouts; encoders receive
    planar YUV.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp
    Yuv420p,
    /// Packed BGRA, 32bpp (`BGR32` on little-endian hosts)
    Bgra,
    /// Packed RGBA, 32bpp
    Rgba,
}

impl PixelFormat {
    /**
        Returns the number of bytes per pixel for packed formats.
    */
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Yuv420p => None,
            Self::Bgra | Self::Rgba => Some(4),
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        match self {
            Self::Yuv420p => true,
            Self::Bgra | Self::Rgba => false,
        }
    }
}

/**
    Audio sample formats.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit integer, interleaved
    S16,
    /// 32-bit floating point, interleaved
    F32,
    /// 32-bit floating point, one plane per channel
    F32Planar,
}

/**
    Audio channel layout.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// Single channel
    Mono,
    /// Left and right channels
    Stereo,
}

impl ChannelLayout {
    /**
        Returns the number of channels.
    */
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}
