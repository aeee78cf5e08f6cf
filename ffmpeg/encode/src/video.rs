/*!
    Video encoder implementation.
*/

use std::os::raw::c_int;

use ffmpeg_next::{
    Codec,
    codec::{self, Parameters, encoder::video::Encoder as VideoEncoderFFmpeg},
    ffi,
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::debug;

use panim_sink::{PacketWriter, convert::rational_to_ffmpeg};
use panim_transform::convert::pixel_format_to_ffmpeg;
use panim_types::{EncodeError, MediaKind, Rational, SetupError};

use crate::{
    config::VideoEncoderConfig,
    driver::{DrainStatus, EncodeDriver, StreamTarget},
};

/**
    An opened video encoder and the driver that moves its packets into the
    container.
*/
pub struct VideoEncoder {
    encoder: VideoEncoderFFmpeg,
    codec_name: String,
    config: VideoEncoderConfig,
    driver: EncodeDriver,
}

impl VideoEncoder {
    /**
        Open `codec` with the given configuration.
    */
    pub fn open(codec: Codec, config: VideoEncoderConfig) -> Result<Self, SetupError> {
        let codec_name = codec.name().to_string();
        let open_error = |e: ffmpeg_next::Error| SetupError::EncoderOpen {
            kind: MediaKind::Video,
            codec: codec_name.clone(),
            reason: e.to_string(),
        };

        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(open_error)?;

        encoder.set_width(config.width);
        encoder.set_height(config.height);
        encoder.set_format(pixel_format_to_ffmpeg(config.pixel_format));
        encoder.set_frame_rate(Some(rational_to_ffmpeg(config.frame_rate)));
        encoder.set_time_base(rational_to_ffmpeg(config.time_base()));
        encoder.set_gop(config.gop_size);
        encoder.set_bit_rate(config.bit_rate as usize);

        match codec.id() {
            codec::Id::MPEG2VIDEO => encoder.set_max_b_frames(2),
            // Plain macroblock decision overflows some coefficients in MPEG-1.
            codec::Id::MPEG1VIDEO => unsafe {
                (*encoder.as_mut_ptr()).mb_decision = ffi::FF_MB_DECISION_RD as c_int;
            },
            _ => {}
        }

        if config.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open().map_err(open_error)?;

        debug!(
            codec = %codec_name,
            width = config.width,
            height = config.height,
            frame_rate = %config.frame_rate,
            bit_rate = config.bit_rate,
            gop = config.gop_size,
            "opened video encoder"
        );

        let driver = EncodeDriver::new(MediaKind::Video, config.time_base());
        Ok(Self {
            encoder,
            codec_name,
            config,
            driver,
        })
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn config(&self) -> &VideoEncoderConfig {
        &self.config
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
        frame: &VideoFrameFFmpeg,
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

impl std::fmt::Debug for VideoEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEncoder")
            .field("codec", &self.codec_name)
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("time_base", &self.config.time_base())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::{Packet, format::Pixel};

    use super::*;
    use crate::find_encoder;

    #[derive(Default)]
    struct RecordingWriter {
        packets: Vec<(usize, Option<i64>, Option<i64>)>,
    }

    impl PacketWriter for RecordingWriter {
        fn write_packet(&mut self, packet: &mut Packet) -> Result<(), ffmpeg_next::Error> {
            self.packets
                .push((packet.stream(), packet.pts(), packet.dts()));
            Ok(())
        }
    }

    fn gray_frame(width: u32, height: u32, pts: i64) -> VideoFrameFFmpeg {
        let mut frame = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        for plane in 0..3 {
            frame.data_mut(plane).fill(128);
        }
        frame.set_pts(Some(pts));
        frame
    }

    fn mpeg1_encoder() -> VideoEncoder {
        ffmpeg_next::init().unwrap();
        let codec = find_encoder(MediaKind::Video, codec::Id::MPEG1VIDEO).unwrap();
        VideoEncoder::open(codec, VideoEncoderConfig::new(64, 48, 25)).unwrap()
    }

    #[test]
    fn encodes_every_frame_into_the_stream_timebase() {
        let mut encoder = mpeg1_encoder();
        encoder.bind(StreamTarget {
            index: 3,
            time_base: Rational::new(1, 90000),
        });
        let mut writer = RecordingWriter::default();

        for pts in 0..10 {
            encoder.encode(&gray_frame(64, 48, pts), &mut writer).unwrap();
        }
        encoder.flush(&mut writer).unwrap();

        assert_eq!(writer.packets.len(), 10);
        assert_eq!(encoder.driver().packets_written(), 10);
        assert!(writer.packets.iter().all(|(stream, _, _)| *stream == 3));

        let dts: Vec<i64> = writer.packets.iter().filter_map(|p| p.2).collect();
        assert!(dts.windows(2).all(|w| w[0] < w[1]));

        let mut pts: Vec<i64> = writer.packets.iter().filter_map(|p| p.1).collect();
        pts.sort_unstable();
        assert_eq!(pts, (0..10).map(|i| i * 3600).collect::<Vec<_>>());
    }

    #[test]
    fn frames_after_flush_are_rejected() {
        let mut encoder = mpeg1_encoder();
        encoder.bind(StreamTarget {
            index: 0,
            time_base: Rational::new(1, 25),
        });
        let mut writer = RecordingWriter::default();

        encoder.flush(&mut writer).unwrap();
        // second flush is a no-op
        encoder.flush(&mut writer).unwrap();

        let err = encoder
            .encode(&gray_frame(64, 48, 0), &mut writer)
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Flushed {
                kind: MediaKind::Video
            }
        ));
    }

    #[test]
    fn unbound_encoder_cannot_write() {
        let mut encoder = mpeg1_encoder();
        let mut writer = RecordingWriter::default();

        let result = encoder
            .encode(&gray_frame(64, 48, 0), &mut writer)
            .and_then(|_| encoder.flush(&mut writer));
        assert!(matches!(
            result,
            Err(EncodeError::NotRegistered {
                kind: MediaKind::Video
            })
        ));
        assert!(writer.packets.is_empty());
    }

    #[test]
    fn exposes_configuration() {
        let encoder = mpeg1_encoder();
        assert_eq!(encoder.codec_name(), "mpeg1video");
        assert_eq!(encoder.time_base(), Rational::new(1, 25));
        assert_eq!(encoder.config().gop_size, 20);
    }
}
