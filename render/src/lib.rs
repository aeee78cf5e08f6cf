/*!
    Render sessions: persist procedurally generated frames and samples as a
    playable video file.

    A [`Session`] negotiates a container from the output path, opens the
    container's default video and audio encoders and writes the header.
    Host frames (32-bit pixels, bottom-up rows) and signed 16-bit PCM are
    converted into the encoders' native formats, timestamped and interleaved
    into the file until [`Session::end`] flushes the encoders and writes the
    trailer.

    ```ignore
    use panim_render::{RenderConfig, Session, ToneSource};

    let config = RenderConfig::new(640, 480, 25).with_duration_cap(Duration::from_secs(10));
    let mut session = Session::start("out.mpg", config)?;
    let mut tone = ToneSource::new(session.config().sample_rate);

    while session.submit_video_frame(&pixels, 640, 480)? {
        session.pump_audio(&mut tone)?;
        animate(&mut pixels);
    }

    let summary = session.end(false)?;
    ```

    Failures are reported as [`SessionError`]. Conversion and encode errors
    poison the session, after which only `end(true)` is accepted: it drops
    everything buffered and removes the file.
*/

mod config;
mod session;
mod source;
mod stream;

pub use config::{REFERENCE_DURATION_CAP, RenderConfig};
pub use session::{Session, SessionState, SessionSummary};
pub use source::{SampleSource, ToneSource};

pub use panim_transform::ScalingAlgorithm;
pub use panim_types::{
    AudioStreamInfo, ChannelLayout, ConvertError, EncodeError, MediaKind, OutputInfo,
    PixelFormat, SampleFormat, SessionError, SetupError, TeardownError, VideoStreamInfo,
};
