/*!
    Render session lifecycle.
*/

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use panim_sink::Sink;
use panim_types::{OutputInfo, SessionError, SetupError};

use crate::{
    config::RenderConfig,
    source::SampleSource,
    stream::{AudioStream, VideoStream},
};

/**
    Where a session is in its lifecycle.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting frames and samples.
    Recording,
    /// A conversion or encode failure left the output unusable; only
    /// `end(true)` is accepted.
    Poisoned,
    /// `end` has run and every resource has been released.
    Ended,
}

/**
    What a session wrote, returned by [`Session::end`].
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Video frames accepted.
    pub video_frames: u64,
    /// Audio samples per channel accepted, not counting end-of-stream padding.
    pub audio_samples: u64,
    /// Packets written to the container.
    pub packets: u64,
    /// True if the output was discarded instead of finalized.
    pub discarded: bool,
}

struct Resources {
    sink: Sink,
    video: Option<VideoStream>,
    audio: Option<AudioStream>,
}

/**
    One output file being rendered.

    A session is created by [`start`](Self::start), which writes the
    container header, fed with [`submit_video_frame`](Self::submit_video_frame)
    and [`submit_audio_samples`](Self::submit_audio_samples), and closed by
    [`end`](Self::end). Sessions share nothing, any number of them can be
    driven side by side.
*/
pub struct Session {
    path: PathBuf,
    config: RenderConfig,
    info: OutputInfo,
    state: SessionState,
    resources: Option<Resources>,
}

impl Session {
    /**
        Negotiate a container for `path`, open the encoders it asks for and
        write the header.

        Nothing is created on disk if the configuration is invalid. If a
        later step fails the partially written file is removed.
    */
    #[instrument(
        skip_all,
        fields(
            path = %path.as_ref().display(),
            width = config.width,
            height = config.height,
            fps = config.fps,
        )
    )]
    pub fn start<P: AsRef<Path>>(path: P, config: RenderConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let path = path.as_ref();

        let mut sink = match config.container.as_deref() {
            Some(name) => Sink::create_as(path, name)?,
            None => Sink::create(path)?,
        };

        let (video, audio) = match Self::open_streams(&mut sink, &config) {
            Ok(streams) => streams,
            Err(e) => {
                sink.discard();
                return Err(e);
            }
        };

        let container = sink.info();
        let info = OutputInfo {
            container: container.name.clone(),
            fell_back: container.fell_back,
            file_backed: container.file_backed,
            video: video.as_ref().map(VideoStream::info),
            audio: audio.as_ref().map(AudioStream::info),
        };

        info!(
            container = %info.container,
            video = info.video.as_ref().map(|v| v.codec.as_str()),
            audio = info.audio.as_ref().map(|a| a.codec.as_str()),
            "render session started"
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            info,
            state: SessionState::Recording,
            resources: Some(Resources { sink, video, audio }),
        })
    }

    fn open_streams(
        sink: &mut Sink,
        config: &RenderConfig,
    ) -> Result<(Option<VideoStream>, Option<AudioStream>), SetupError> {
        let mut video = VideoStream::provision(sink, config)?;
        let mut audio = AudioStream::provision(sink, config)?;

        sink.write_header()?;

        if let Some(video) = video.as_mut() {
            video.bind(sink)?;
        }
        if let Some(audio) = audio.as_mut() {
            audio.bind(sink)?;
        }

        Ok((video, audio))
    }

    /**
        The output path the session was started with.
    */
    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        The configuration the session was started with.
    */
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /**
        The negotiated container and streams.
    */
    pub fn info(&self) -> &OutputInfo {
        &self.info
    }

    /**
        Current lifecycle state.
    */
    pub fn state(&self) -> SessionState {
        self.state
    }

    /**
        Encode one host frame of `width`x`height` 32-bit pixels in bottom-up
        row order.

        Returns `Ok(false)` once the duration cap has been reached, or if the
        container has no video stream; the frame is not encoded and the
        caller should stop producing frames.
    */
    pub fn submit_video_frame(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<bool, SessionError> {
        let cap = self.config.duration_cap;
        let Resources { sink, video, .. } = self.recording()?;
        let Some(video) = video.as_mut() else {
            return Ok(false);
        };

        let result = video.submit(pixels, width, height, cap, sink);
        self.settle(result)
    }

    /**
        Encode `count` samples per channel of interleaved signed 16-bit PCM.

        Samples are buffered until they fill a whole encoder frame. Returns
        `Ok(false)` once the duration cap has been reached, or if the
        container has no audio stream.
    */
    pub fn submit_audio_samples(
        &mut self,
        samples: &[i16],
        count: usize,
    ) -> Result<bool, SessionError> {
        let cap = self.config.duration_cap;
        let Resources { sink, audio, .. } = self.recording()?;
        let Some(audio) = audio.as_mut() else {
            return Ok(false);
        };

        let result = audio.submit(samples, count, cap, sink);
        self.settle(result)
    }

    /**
        Pull samples from `source` until the audio stream has caught up with
        the video stream, keeping the two interleaved.

        Without a video stream a single block is pulled per call. Returns
        `Ok(false)` once the source is exhausted, the cap has been reached
        or there is no audio stream.
    */
    pub fn pump_audio<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<bool, SessionError> {
        let cap = self.config.duration_cap;
        let Resources { sink, video, audio } = self.recording()?;
        let Some(audio) = audio.as_mut() else {
            return Ok(false);
        };

        let until = video.as_ref().map(VideoStream::clock);
        let result = audio.pump(source, until, cap, sink);
        self.settle(result)
    }

    /**
        Close the session.

        Without `discard`, every encoder is flushed, the trailer is written
        and the file closed. With `discard`, buffered data is dropped and the
        file is removed. Either way all resources are released, and a second
        call fails with [`SessionError::Ended`].
    */
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn end(&mut self, discard: bool) -> Result<SessionSummary, SessionError> {
        match self.state {
            SessionState::Ended => return Err(SessionError::Ended),
            SessionState::Poisoned if !discard => return Err(SessionError::Poisoned),
            _ => {}
        }

        self.state = SessionState::Ended;
        let Some(Resources {
            mut sink,
            mut video,
            mut audio,
        }) = self.resources.take()
        else {
            return Err(SessionError::Ended);
        };

        let mut summary = SessionSummary {
            video_frames: video.as_ref().map_or(0, VideoStream::frames),
            audio_samples: audio.as_ref().map_or(0, AudioStream::samples),
            packets: sink.packets_written(),
            discarded: discard,
        };

        if discard {
            drop((video, audio));
            sink.discard();
            warn!(packets = summary.packets, "render session discarded");
            return Ok(summary);
        }

        let flushed = Self::flush(video.as_mut(), audio.as_mut(), &mut sink);
        drop((video, audio));
        if let Err(e) = flushed {
            warn!(error = %e, "flush failed, discarding output");
            sink.discard();
            return Err(e);
        }

        summary.packets = sink.finish()?;

        info!(
            video_frames = summary.video_frames,
            audio_samples = summary.audio_samples,
            packets = summary.packets,
            "render session finished"
        );
        Ok(summary)
    }

    fn flush(
        video: Option<&mut VideoStream>,
        audio: Option<&mut AudioStream>,
        sink: &mut Sink,
    ) -> Result<(), SessionError> {
        if let Some(video) = video {
            video.flush(sink)?;
        }
        if let Some(audio) = audio {
            audio.flush(sink)?;
        }
        Ok(())
    }

    fn recording(&mut self) -> Result<&mut Resources, SessionError> {
        match self.state {
            SessionState::Recording => self.resources.as_mut().ok_or(SessionError::Ended),
            SessionState::Poisoned => Err(SessionError::Poisoned),
            SessionState::Ended => Err(SessionError::Ended),
        }
    }

    fn settle<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            if e.poisons() {
                warn!(path = %self.path.display(), error = %e, "render session poisoned");
                self.state = SessionState::Poisoned;
            }
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.resources.is_some() {
            warn!(
                path = %self.path.display(),
                state = ?self.state,
                "render session dropped without end, output has no trailer"
            );
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("container", &self.info.container)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
