/*!
    Encoder provisioning and the encode loop for the panim render pipeline.

    This crate opens the encoders a container asks for and drives them. Each
    encoder is configured with the fixed parameters of the pipeline (bitrate,
    keyframe interval, pixel format, sample rate) and owns an
    [`EncodeDriver`] that performs the submit → drain → rescale → write cycle.

    # Video

    ```ignore
    use panim_encode::{VideoEncoder, VideoEncoderConfig, find_encoder};

    let codec = find_encoder(MediaKind::Video, sink.default_codec(MediaKind::Video)?)?;
    let config = VideoEncoderConfig::new(1280, 720, 30)
        .with_global_header(sink.requires_global_header());
    let mut encoder = VideoEncoder::open(codec, config)?;

    let index = sink.add_stream(MediaKind::Video, codec, encoder.time_base(), encoder.parameters())?;
    sink.write_header()?;
    encoder.bind(StreamTarget { index, time_base: sink.stream_time_base(index)? });

    for frame in frames {
        encoder.encode(&frame, &mut sink)?;
    }
    encoder.flush(&mut sink)?;
    ```

    # Audio

    Audio encoders report a [`frame_size`](AudioEncoder::frame_size); every
    frame submitted must carry exactly that many samples per channel. Codecs
    that accept any size get [`VARIABLE_FRAME_SIZE`] samples.

    # Timestamps

    Frames are stamped in the encoder timebase (`1/fps`, `1/sample_rate`).
    Packets are rescaled into the timebase the container assigned to the
    stream, which is only known after the header has been written; that is
    why binding happens after [`Sink::write_header`](panim_sink::Sink::write_header).
*/

use ffmpeg_next::{Codec, codec};

use panim_types::{MediaKind, SetupError};

mod audio;
mod config;
mod driver;
mod video;

pub use audio::{AudioEncoder, VARIABLE_FRAME_SIZE};
pub use config::{
    AudioEncoderConfig, DEFAULT_AUDIO_BIT_RATE, DEFAULT_GOP_SIZE, DEFAULT_SAMPLE_RATE,
    DEFAULT_VIDEO_BIT_RATE, VideoEncoderConfig,
};
pub use driver::{DrainStatus, EncodeDriver, StreamTarget};
pub use video::VideoEncoder;

/**
    Look up an encoder for `id`.
*/
pub fn find_encoder(kind: MediaKind, id: codec::Id) -> Result<Codec, SetupError> {
    ffmpeg_next::encoder::find(id).ok_or_else(|| SetupError::CodecUnavailable {
        kind,
        codec: id.name().to_string(),
    })
}
