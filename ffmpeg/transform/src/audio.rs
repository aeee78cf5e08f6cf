/*!
    Audio sample conversion.
*/

use ffmpeg_next::{
    software::resampling::context::Context as ResamplerContext,
    util::frame::audio::Audio as AudioFrameFFmpeg,
};

use panim_types::{ChannelLayout, ConvertError, SampleFormat};

use crate::convert::{
    channel_layout_to_ffmpeg, make_writable, sample_format_to_ffmpeg,
};

/**
    Converts blocks of interleaved signed 16-bit host samples into an
    encoder-native audio frame.

    Every block holds exactly `frame_size` samples per channel, matching the
    encoder's frame size; buffering arbitrary host chunk sizes into blocks is
    the caller's job. Sample rate and channel layout are identical on both
    sides, only the sample format changes.

    The resampler context is created on the first conversion and reused for
    every later block.
*/
pub struct AudioConverter {
    sample_rate: u32,
    layout: ChannelLayout,
    native_format: SampleFormat,
    frame_size: usize,
    /// Host-format frame a block is copied into before resampling.
    staging: AudioFrameFFmpeg,
    resampler: Option<ResamplerContext>,
}

impl AudioConverter {
    /**
        Create a converter producing `frame_size`-sample frames in
        `native_format`.
    */
    pub fn new(
        sample_rate: u32,
        layout: ChannelLayout,
        native_format: SampleFormat,
        frame_size: usize,
    ) -> Self {
        let mut staging = AudioFrameFFmpeg::new(
            sample_format_to_ffmpeg(SampleFormat::S16),
            frame_size,
            channel_layout_to_ffmpeg(layout),
        );
        staging.set_rate(sample_rate);

        Self {
            sample_rate,
            layout,
            native_format,
            frame_size,
            staging,
            resampler: None,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /**
        Number of interleaved `i16` values in one block.
    */
    pub fn block_len(&self) -> usize {
        self.frame_size * self.layout.channels() as usize
    }

    /**
        Returns true once the resampling context has been created.
    */
    pub fn has_resampler(&self) -> bool {
        self.resampler.is_some()
    }

    /**
        Convert one block into `dst`, an encoder-native frame of
        `frame_size` samples.
    */
    pub fn convert(
        &mut self,
        block: &[i16],
        dst: &mut AudioFrameFFmpeg,
    ) -> Result<(), ConvertError> {
        if block.len() != self.block_len() {
            return Err(ConvertError::SampleCount {
                expected: self.block_len(),
                actual: block.len(),
            });
        }

        make_writable(dst)?;

        if self.resampler.is_none() {
            self.resampler = Some(self.create_resampler()?);
        }

        let bytes: &[u8] = bytemuck::cast_slice(block);
        self.staging.data_mut(0)[..bytes.len()].copy_from_slice(bytes);

        if let Some(resampler) = self.resampler.as_mut() {
            resampler
                .run(&self.staging, dst)
                .map_err(|e| ConvertError::Conversion(format!("resampling failed: {e}")))?;
        }

        if dst.samples() != self.frame_size {
            return Err(ConvertError::Conversion(format!(
                "resampler produced {} samples, expected {}",
                dst.samples(),
                self.frame_size
            )));
        }

        Ok(())
    }

    fn create_resampler(&self) -> Result<ResamplerContext, ConvertError> {
        let layout = channel_layout_to_ffmpeg(self.layout);
        let context = ResamplerContext::get(
            sample_format_to_ffmpeg(SampleFormat::S16),
            layout,
            self.sample_rate,
            sample_format_to_ffmpeg(self.native_format),
            layout,
            self.sample_rate,
        )
        .map_err(|e| ConvertError::Resampler(e.to_string()))?;

        tracing::debug!(
            to = ?self.native_format,
            sample_rate = self.sample_rate,
            channels = self.layout.channels(),
            "created resampling context"
        );

        Ok(context)
    }
}

impl std::fmt::Debug for AudioConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioConverter")
            .field("sample_rate", &self.sample_rate)
            .field("layout", &self.layout)
            .field("native_format", &self.native_format)
            .field("frame_size", &self.frame_size)
            .field("initialized", &self.resampler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_frame(frame_size: usize) -> AudioFrameFFmpeg {
        let mut frame = AudioFrameFFmpeg::new(
            sample_format_to_ffmpeg(SampleFormat::F32Planar),
            frame_size,
            channel_layout_to_ffmpeg(ChannelLayout::Stereo),
        );
        frame.set_rate(44100);
        frame
    }

    fn first_sample(frame: &AudioFrameFFmpeg, plane: usize) -> f32 {
        let bytes = &frame.data(plane)[..4];
        f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[test]
    fn converts_interleaved_s16_to_planar_float() {
        ffmpeg_next::init().unwrap();
        let mut converter =
            AudioConverter::new(44100, ChannelLayout::Stereo, SampleFormat::F32Planar, 64);
        let mut dst = native_frame(64);

        // left at +0.5, right at -0.25
        let block: Vec<i16> = (0..64).flat_map(|_| [16384i16, -8192]).collect();
        assert!(!converter.has_resampler());
        converter.convert(&block, &mut dst).unwrap();
        assert!(converter.has_resampler());

        assert_eq!(dst.samples(), 64);
        assert!((first_sample(&dst, 0) - 0.5).abs() < 1e-3);
        assert!((first_sample(&dst, 1) + 0.25).abs() < 1e-3);
    }

    #[test]
    fn rejects_short_blocks() {
        ffmpeg_next::init().unwrap();
        let mut converter =
            AudioConverter::new(44100, ChannelLayout::Stereo, SampleFormat::F32Planar, 32);
        let mut dst = native_frame(32);

        let err = converter.convert(&[0i16; 32], &mut dst).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::SampleCount {
                expected: 64,
                actual: 32
            }
        ));
        assert!(!converter.has_resampler());
    }

    #[test]
    fn block_len_counts_all_channels() {
        ffmpeg_next::init().unwrap();
        let converter =
            AudioConverter::new(48000, ChannelLayout::Mono, SampleFormat::F32Planar, 1024);
        assert_eq!(converter.block_len(), 1024);
        assert_eq!(converter.frame_size(), 1024);
    }
}
