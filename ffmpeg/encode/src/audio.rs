/*!
    Audio encoder implementation.
*/

use ffmpeg_next::{
    Codec,
    codec::{self, Parameters, encoder::audio::Encoder as AudioEncoderFFmpeg},
    util::frame::audio::Audio as AudioFrameFFmpeg,
};
use tracing::debug;

use panim_sink::{PacketWriter, convert::rational_to_ffmpeg};
use panim_transform::convert::{
    channel_layout_to_ffmpeg, sample_format_from_ffmpeg, sample_format_to_ffmpeg,
};
use panim_types::{EncodeError, MediaKind, Rational, SampleFormat, SetupError};

use crate::{
    config::AudioEncoderConfig,
    driver::{DrainStatus, EncodeDriver, StreamTarget},
};

/**
    Samples per frame handed to encoders that accept any frame size.
*/
pub const VARIABLE_FRAME_SIZE: usize = 10_000;

/**
    An opened audio encoder and the driver that moves its packets into the
    container.
*/
pub struct AudioEncoder {
    encoder: AudioEncoderFFmpeg,
    codec_name: String,
    config: AudioEncoderConfig,
    frame_size: usize,
    driver: EncodeDriver,
}

impl AudioEncoder {
    /**
        Open `codec` with the given configuration.
    */
    pub fn open(codec: Codec, mut config: AudioEncoderConfig) -> Result<Self, SetupError> {
        let codec_name = codec.name().to_string();
        let open_error = |e: ffmpeg_next::Error| SetupError::EncoderOpen {
            kind: MediaKind::Audio,
            codec: codec_name.clone(),
            reason: e.to_string(),
        };

        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(open_error)?;

        config.sample_format = negotiate_sample_format(codec, config.sample_format).ok_or_else(
            || SetupError::EncoderOpen {
                kind: MediaKind::Audio,
                codec: codec_name.clone(),
                reason: "encoder supports none of the pipeline's sample formats".into(),
            },
        )?;

        encoder.set_rate(config.sample_rate as i32);
        encoder.set_format(sample_format_to_ffmpeg(config.sample_format));
        encoder.set_channel_layout(channel_layout_to_ffmpeg(config.channels));
        encoder.set_time_base(rational_to_ffmpeg(config.time_base()));
        encoder.set_bit_rate(config.bit_rate as usize);

        if config.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open().map_err(open_error)?;

        let variable = codec
            .capabilities()
            .contains(codec::Capabilities::VARIABLE_FRAME_SIZE);
        let frame_size = match encoder.frame_size() {
            0 => VARIABLE_FRAME_SIZE,
            _ if variable => VARIABLE_FRAME_SIZE,
            n => n as usize,
        };

        debug!(
            codec = %codec_name,
            sample_rate = config.sample_rate,
            format = ?config.sample_format,
            channels = config.channels.channels(),
            bit_rate = config.bit_rate,
            frame_size,
            "opened audio encoder"
        );

        let driver = EncodeDriver::new(MediaKind::Audio, config.time_base());
        Ok(Self {
            encoder,
            codec_name,
            config,
            frame_size,
            driver,
        })
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn config(&self) -> &AudioEncoderConfig {
        &self.config
    }

    /**
        Samples per channel every submitted frame must carry.
    */
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /**
        Get the time base frames must be stamped in.
    */
    pub fn time_base(&self) -> Rational {
        self.config.time_base()
    }

    /**
        Codec parameters to copy into the container stream.
    */
    pub fn parameters(&self) -> Parameters {
        Parameters::from(&self.encoder)
    }

    pub fn bind(&mut self, target: StreamTarget) {
        self.driver.bind(target);
    }

    pub fn driver(&self) -> &EncodeDriver {
        &self.driver
    }

    /**
        Encode one native frame and write the resulting packets.
    */
    pub fn encode(
        &mut self,
        frame: &AudioFrameFFmpeg,
        writer: &mut dyn PacketWriter,
    ) -> Result<DrainStatus, EncodeError> {
        self.driver.submit(&mut self.encoder, frame, writer)
    }

    /**
        Flush the encoder, writing every buffered packet.
    */
    pub fn flush(&mut self, writer: &mut dyn PacketWriter) -> Result<(), EncodeError> {
        self.driver.flush(&mut self.encoder, writer)
    }
}

/**
    Pick the sample format to open `codec` with: `preferred` if the codec
    accepts it, otherwise the first format it lists that the pipeline can
    produce.
*/
fn negotiate_sample_format(codec: Codec, preferred: SampleFormat) -> Option<SampleFormat> {
    let Some(formats) = codec.audio().ok().and_then(|audio| audio.formats()) else {
        // The codec does not advertise formats; trust the preference.
        return Some(preferred);
    };

    let supported: Vec<SampleFormat> = formats.filter_map(sample_format_from_ffmpeg).collect();
    if supported.contains(&preferred) {
        Some(preferred)
    } else {
        supported.first().copied()
    }
}

impl std::fmt::Debug for AudioEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEncoder")
            .field("codec", &self.codec_name)
            .field("sample_rate", &self.config.sample_rate)
            .field("channels", &self.config.channels)
            .field("frame_size", &self.frame_size)
            .finish_non_exhaustive()
    }
}
