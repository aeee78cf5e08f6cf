/*!
    Output streams of a render session.

    Each stream owns its encoder, its converter and the native frame the
    converter writes into, and keeps the presentation timestamp of the next
    unit it will submit.
*/

use std::{cmp::Ordering, time::Duration};

use ffmpeg_next::util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg};
use tracing::debug;

use panim_encode::{
    AudioEncoder, AudioEncoderConfig, StreamTarget, VideoEncoder, VideoEncoderConfig,
    find_encoder,
};
use panim_sink::Sink;
use panim_transform::{
    AudioConverter, VideoConverter,
    convert::{channel_layout_to_ffmpeg, pixel_format_to_ffmpeg, sample_format_to_ffmpeg},
};
use panim_types::{
    AudioStreamInfo, ConvertError, MediaKind, Rational, SessionError, SetupError, VideoStreamInfo,
};

use crate::{config::RenderConfig, source::SampleSource};

fn bind_error(kind: MediaKind, index: usize) -> SetupError {
    SetupError::StreamRegistration {
        kind,
        reason: format!("stream {index} missing after header was written"),
    }
}

pub(crate) struct VideoStream {
    encoder: VideoEncoder,
    converter: VideoConverter,
    frame: VideoFrameFFmpeg,
    index: usize,
    time_base: Rational,
    next_pts: i64,
    finished: bool,
}

impl VideoStream {
    /**
        Open the container's default video encoder and register its stream.
        Returns `None` if the container carries no video.
    */
    pub fn provision(sink: &mut Sink, config: &RenderConfig) -> Result<Option<Self>, SetupError> {
        let Some(id) = sink.default_codec(MediaKind::Video) else {
            return Ok(None);
        };
        let codec = find_encoder(MediaKind::Video, id)?;

        let encoder_config = VideoEncoderConfig::new(config.width, config.height, config.fps)
            .with_bit_rate(config.video_bit_rate)
            .with_gop_size(config.gop_size)
            .with_global_header(sink.requires_global_header());
        let encoder = VideoEncoder::open(codec, encoder_config)?;

        let native_format = encoder.config().pixel_format;
        let converter =
            VideoConverter::new(config.width, config.height, config.host_format, native_format)
                .map_err(|e| SetupError::InvalidConfig(e.to_string()))?
                .with_algorithm(config.scaling);
        let frame = VideoFrameFFmpeg::new(
            pixel_format_to_ffmpeg(native_format),
            config.width,
            config.height,
        );

        let index = sink.add_stream(
            MediaKind::Video,
            codec,
            encoder.time_base(),
            encoder.parameters(),
        )?;

        Ok(Some(Self {
            time_base: encoder.time_base(),
            encoder,
            converter,
            frame,
            index,
            next_pts: 0,
            finished: false,
        }))
    }

    /**
        Point the encoder at the stream's final timebase. Call after the
        header has been written.
    */
    pub fn bind(&mut self, sink: &Sink) -> Result<(), SetupError> {
        self.time_base = sink
            .stream_time_base(self.index)
            .ok_or_else(|| bind_error(MediaKind::Video, self.index))?;
        self.encoder.bind(StreamTarget {
            index: self.index,
            time_base: self.time_base,
        });
        Ok(())
    }

    /**
        Convert and encode one host frame. Returns `false` without encoding
        once the duration cap has been reached.
    */
    pub fn submit(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        cap: Option<Duration>,
        sink: &mut Sink,
    ) -> Result<bool, SessionError> {
        if self.finished || self.cap_reached(cap) {
            self.finished = true;
            return Ok(false);
        }

        self.converter.convert(pixels, width, height, &mut self.frame)?;

        self.frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.encode(&self.frame, sink)?;
        Ok(true)
    }

    fn cap_reached(&self, cap: Option<Duration>) -> bool {
        cap.is_some_and(|cap| self.encoder.time_base().reached(self.next_pts, cap))
    }

    pub fn flush(&mut self, sink: &mut Sink) -> Result<(), SessionError> {
        self.encoder.flush(sink)?;
        debug!(
            frames = self.next_pts,
            packets = self.encoder.driver().packets_written(),
            "video stream flushed"
        );
        Ok(())
    }

    /**
        Presentation time of the next frame, in the encoder timebase.
    */
    pub fn clock(&self) -> (i64, Rational) {
        (self.next_pts, self.encoder.time_base())
    }

    pub fn frames(&self) -> u64 {
        self.next_pts as u64
    }

    pub fn info(&self) -> VideoStreamInfo {
        let config = self.encoder.config();
        VideoStreamInfo {
            index: self.index,
            codec: self.encoder.codec_name().to_string(),
            width: config.width,
            height: config.height,
            pixel_format: self.converter.native_format(),
            frame_rate: config.frame_rate,
            encoder_time_base: config.time_base(),
            time_base: self.time_base,
            bit_rate: config.bit_rate,
            gop_size: config.gop_size,
        }
    }
}

pub(crate) struct AudioStream {
    encoder: AudioEncoder,
    converter: AudioConverter,
    frame: AudioFrameFFmpeg,
    index: usize,
    time_base: Rational,
    /// Accepted samples not yet filling a whole encoder frame.
    pending: Vec<i16>,
    /// Buffer a `SampleSource` fills.
    scratch: Vec<i16>,
    next_pts: i64,
    accepted: u64,
    finished: bool,
}

impl AudioStream {
    /**
        Open the container's default audio encoder and register its stream.
        Returns `None` if the container carries no audio.
    */
    pub fn provision(sink: &mut Sink, config: &RenderConfig) -> Result<Option<Self>, SetupError> {
        let Some(id) = sink.default_codec(MediaKind::Audio) else {
            return Ok(None);
        };
        let codec = find_encoder(MediaKind::Audio, id)?;

        let encoder_config = AudioEncoderConfig::new(config.sample_rate, config.channels)
            .with_bit_rate(config.audio_bit_rate)
            .with_global_header(sink.requires_global_header());
        let encoder = AudioEncoder::open(codec, encoder_config)?;

        let native = encoder.config();
        let frame_size = encoder.frame_size();
        let converter = AudioConverter::new(
            native.sample_rate,
            native.channels,
            native.sample_format,
            frame_size,
        );
        let mut frame = AudioFrameFFmpeg::new(
            sample_format_to_ffmpeg(native.sample_format),
            frame_size,
            channel_layout_to_ffmpeg(native.channels),
        );
        frame.set_rate(native.sample_rate);

        let index = sink.add_stream(
            MediaKind::Audio,
            codec,
            encoder.time_base(),
            encoder.parameters(),
        )?;

        Ok(Some(Self {
            time_base: encoder.time_base(),
            encoder,
            converter,
            frame,
            index,
            pending: Vec::new(),
            scratch: Vec::new(),
            next_pts: 0,
            accepted: 0,
            finished: false,
        }))
    }

    pub fn bind(&mut self, sink: &Sink) -> Result<(), SetupError> {
        self.time_base = sink
            .stream_time_base(self.index)
            .ok_or_else(|| bind_error(MediaKind::Audio, self.index))?;
        self.encoder.bind(StreamTarget {
            index: self.index,
            time_base: self.time_base,
        });
        Ok(())
    }

    fn channels(&self) -> usize {
        self.encoder.config().channels.channels() as usize
    }

    /**
        Accept `count` interleaved samples per channel from `samples`,
        encoding every complete encoder frame.

        With a duration cap, only the samples before the cap are accepted,
        so no encoder frame ever starts at or past it. Returns `false`
        without accepting anything once the cap has been reached.
    */
    pub fn submit(
        &mut self,
        samples: &[i16],
        count: usize,
        cap: Option<Duration>,
        sink: &mut Sink,
    ) -> Result<bool, SessionError> {
        let channels = self.channels();
        let short = || ConvertError::SampleCount {
            expected: count.saturating_mul(channels),
            actual: samples.len(),
        };
        let len = count.checked_mul(channels).ok_or_else(short)?;
        if samples.len() < len {
            return Err(short().into());
        }

        if self.finished || self.cap_reached(cap) {
            self.finished = true;
            return Ok(false);
        }

        let (clock, time_base) = self.clock();
        let count = match cap {
            Some(cap) => {
                let left = time_base.ticks_until(cap).saturating_sub(clock);
                count.min(usize::try_from(left).unwrap_or(usize::MAX))
            }
            None => count,
        };

        self.pending.extend_from_slice(&samples[..count * channels]);
        self.accepted += count as u64;
        self.encode_pending(sink)?;
        Ok(true)
    }

    fn encode_pending(&mut self, sink: &mut Sink) -> Result<(), SessionError> {
        let block_len = self.converter.block_len();

        while self.pending.len() >= block_len {
            self.converter.convert(&self.pending[..block_len], &mut self.frame)?;
            self.pending.drain(..block_len);

            self.frame.set_pts(Some(self.next_pts));
            self.next_pts += self.encoder.frame_size() as i64;

            self.encoder.encode(&self.frame, sink)?;
        }

        Ok(())
    }

    fn cap_reached(&self, cap: Option<Duration>) -> bool {
        let (ts, time_base) = self.clock();
        cap.is_some_and(|cap| time_base.reached(ts, cap))
    }

    /**
        Pull samples from `source` until the audio clock catches up with
        `until`, or for a single block when there is nothing to follow.
        Returns `false` once the source runs dry or the cap is reached.
    */
    pub fn pump<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        until: Option<(i64, Rational)>,
        cap: Option<Duration>,
        sink: &mut Sink,
    ) -> Result<bool, SessionError> {
        let channels = self.channels();
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(self.converter.block_len(), 0);

        let result = loop {
            let (ts, time_base) = self.clock();
            let caught_up = until.is_some_and(|(target, target_time_base)| {
                Rational::compare_ts(ts, time_base, target, target_time_base) != Ordering::Less
            });
            if caught_up {
                break Ok(true);
            }

            let count = source.fill(&mut scratch, channels);
            if count == 0 {
                break Ok(false);
            }

            match self.submit(&scratch, count, cap, sink) {
                Ok(true) if until.is_some() => continue,
                other => break other,
            }
        };

        self.scratch = scratch;
        result
    }

    /**
        Encode whatever is still pending, padded with silence to a whole
        frame, then flush the encoder. The padded frame starts before the
        cap because pending samples never extend past it.
    */
    pub fn flush(&mut self, sink: &mut Sink) -> Result<(), SessionError> {
        if !self.pending.is_empty() {
            self.pending.resize(self.converter.block_len(), 0);
            self.encode_pending(sink)?;
        }

        self.encoder.flush(sink)?;
        debug!(
            samples = self.accepted,
            packets = self.encoder.driver().packets_written(),
            "audio stream flushed"
        );
        Ok(())
    }

    /**
        Presentation time just past the last accepted sample, in the encoder
        timebase.
    */
    pub fn clock(&self) -> (i64, Rational) {
        let pending = (self.pending.len() / self.channels()) as i64;
        (self.next_pts + pending, self.encoder.time_base())
    }

    pub fn samples(&self) -> u64 {
        self.accepted
    }

    pub fn info(&self) -> AudioStreamInfo {
        let config = self.encoder.config();
        AudioStreamInfo {
            index: self.index,
            codec: self.encoder.codec_name().to_string(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            sample_format: config.sample_format,
            frame_size: self.encoder.frame_size(),
            encoder_time_base: config.time_base(),
            time_base: self.time_base,
            bit_rate: config.bit_rate,
        }
    }
}
