/*!
    Media sink implementation.
*/

use std::{
    ffi::{CStr, CString},
    io,
    os::raw::c_int,
    path::{Path, PathBuf},
    ptr,
};

use ffmpeg_next::{
    Codec, Packet,
    codec::{self, Parameters},
    ffi, format,
    format::context::Output as OutputContext,
};
use tracing::{debug, warn};

use panim_types::{MediaKind, Rational, SetupError, TeardownError};

use crate::{
    PacketWriter,
    convert::{path_to_cstring, rational_from_ffmpeg, rational_to_ffmpeg},
};

/**
    Muxer used when the container cannot be inferred from the filename.
*/
pub const FALLBACK_FORMAT: &str = "mpeg";

/**
    What the negotiated muxer is and what it needs from the pipeline.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Short muxer name (e.g. `mp4`).
    pub name: String,
    /// Human-readable muxer name.
    pub description: String,
    /// True if the fallback muxer replaced an unrecognized extension.
    pub fell_back: bool,
    /// False for muxers flagged `NO_FILE`, which never open the output path.
    pub file_backed: bool,
    /// True if encoders must place codec headers out of band.
    pub global_header: bool,
}

/**
    Media sink for writing one container file.

    Lifecycle: [`create`](Self::create) negotiates the muxer without touching
    the filesystem, [`add_stream`](Self::add_stream) registers streams,
    [`write_header`](Self::write_header) opens the file and writes the header,
    packets are written through [`PacketWriter`], and
    [`finish`](Self::finish) writes the trailer and closes the file.
    [`discard`](Self::discard) abandons the file instead.
*/
pub struct Sink {
    output: OutputContext,
    path: PathBuf,
    c_path: CString,
    info: ContainerInfo,
    video_codec: Option<codec::Id>,
    audio_codec: Option<codec::Id>,
    file_opened: bool,
    header_written: bool,
    packets_written: u64,
}

impl Sink {
    /**
        Negotiate a muxer from the extension of `path`.

        Falls back to [`FALLBACK_FORMAT`] if the extension is unknown.
    */
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SetupError> {
        Self::negotiate(path.as_ref(), None)
    }

    /**
        Use the muxer called `format_name` regardless of the extension.
    */
    pub fn create_as<P: AsRef<Path>>(path: P, format_name: &str) -> Result<Self, SetupError> {
        Self::negotiate(path.as_ref(), Some(format_name))
    }

    fn negotiate(path: &Path, forced: Option<&str>) -> Result<Self, SetupError> {
        ffmpeg_next::init().map_err(|e| SetupError::Init(e.to_string()))?;

        let container_error = |reason: String| SetupError::Container {
            path: path.to_path_buf(),
            reason,
        };

        let c_path = path_to_cstring(path).map_err(container_error)?;

        let (output, fell_back) = match forced {
            Some(name) => (alloc_output(&c_path, Some(name)).map_err(container_error)?, false),
            None => match alloc_output(&c_path, None) {
                Ok(output) => (output, false),
                Err(reason) => {
                    warn!(
                        path = %path.display(),
                        %reason,
                        fallback = FALLBACK_FORMAT,
                        "could not deduce container from file extension"
                    );
                    let output =
                        alloc_output(&c_path, Some(FALLBACK_FORMAT)).map_err(container_error)?;
                    (output, true)
                }
            },
        };

        let format = output.format();
        let flags = format.flags();
        let info = ContainerInfo {
            name: format.name().to_string(),
            description: format.description().to_string(),
            fell_back,
            file_backed: !flags.contains(format::Flags::NO_FILE),
            global_header: flags.contains(format::Flags::GLOBAL_HEADER),
        };

        let (video_codec, audio_codec) = unsafe {
            let oformat = (*output.as_ptr()).oformat;
            (
                codec::Id::from((*oformat).video_codec),
                codec::Id::from((*oformat).audio_codec),
            )
        };
        let video_codec = (video_codec != codec::Id::None).then_some(video_codec);
        let audio_codec = (audio_codec != codec::Id::None).then_some(audio_codec);

        debug!(
            path = %path.display(),
            container = %info.name,
            fell_back,
            file_backed = info.file_backed,
            video = ?video_codec,
            audio = ?audio_codec,
            "negotiated container"
        );

        Ok(Self {
            output,
            path: path.to_path_buf(),
            c_path,
            info,
            video_codec,
            audio_codec,
            file_opened: false,
            header_written: false,
            packets_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &ContainerInfo {
        &self.info
    }

    /**
        The codec the container declares as its default for `kind`, if any.
    */
    pub fn default_codec(&self, kind: MediaKind) -> Option<codec::Id> {
        match kind {
            MediaKind::Video => self.video_codec,
            MediaKind::Audio => self.audio_codec,
        }
    }

    /**
        Returns true if encoders feeding this container need `GLOBAL_HEADER`.
    */
    pub fn requires_global_header(&self) -> bool {
        self.info.global_header
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /**
        Register an output stream encoded with `codec`.

        `time_base` is only a request; the muxer may replace it when the
        header is written, see [`stream_time_base`](Self::stream_time_base).
    */
    pub fn add_stream<P: Into<Parameters>>(
        &mut self,
        kind: MediaKind,
        codec: Codec,
        time_base: Rational,
        parameters: P,
    ) -> Result<usize, SetupError> {
        if self.header_written {
            return Err(SetupError::StreamRegistration {
                kind,
                reason: "container header already written".into(),
            });
        }

        let mut stream =
            self.output
                .add_stream(codec)
                .map_err(|e| SetupError::StreamRegistration {
                    kind,
                    reason: e.to_string(),
                })?;
        stream.set_time_base(rational_to_ffmpeg(time_base));
        stream.set_parameters(parameters);
        let index = stream.index();

        debug!(%kind, index, codec = codec.name(), %time_base, "registered stream");
        Ok(index)
    }

    /**
        Open the output file for writing. Does nothing for `NO_FILE` muxers or
        if the file is already open.
    */
    pub fn open(&mut self) -> Result<(), SetupError> {
        if !self.info.file_backed || self.file_opened {
            return Ok(());
        }

        let ret = unsafe {
            ffi::avio_open(
                &mut (*self.output.as_mut_ptr()).pb,
                self.c_path.as_ptr(),
                ffi::AVIO_FLAG_WRITE as c_int,
            )
        };
        if ret < 0 {
            return Err(SetupError::FileOpen {
                path: self.path.clone(),
                reason: ffmpeg_next::Error::from(ret).to_string(),
            });
        }

        self.file_opened = true;
        Ok(())
    }

    /**
        Open the file if needed and write the container header. Allowed once.
    */
    pub fn write_header(&mut self) -> Result<(), SetupError> {
        if self.header_written {
            return Err(SetupError::Header("header already written".into()));
        }

        self.open()?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            unsafe {
                ffi::av_dump_format(self.output.as_mut_ptr(), 0, self.c_path.as_ptr(), 1);
            }
        }

        self.output
            .write_header()
            .map_err(|e| SetupError::Header(e.to_string()))?;
        self.header_written = true;
        Ok(())
    }

    /**
        The timebase of stream `index` as the muxer finally chose it.
    */
    pub fn stream_time_base(&self, index: usize) -> Option<Rational> {
        self.output
            .stream(index)
            .map(|stream| rational_from_ffmpeg(stream.time_base()))
    }

    /**
        Write the trailer and close the file. Returns the number of packets
        written.
    */
    pub fn finish(mut self) -> Result<u64, TeardownError> {
        if !self.header_written {
            return Err(TeardownError::Trailer("header was never written".into()));
        }

        self.output
            .write_trailer()
            .map_err(|e| TeardownError::Trailer(e.to_string()))?;
        self.close()?;

        debug!(
            path = %self.path.display(),
            packets = self.packets_written,
            "container finalized"
        );
        Ok(self.packets_written)
    }

    /**
        Abandon the output without writing a trailer, removing the file if
        this sink created it.
    */
    pub fn discard(mut self) {
        let created = self.file_opened;

        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to close discarded output");
        }

        if created {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed discarded output"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to remove discarded output")
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), TeardownError> {
        if !self.file_opened {
            return Ok(());
        }
        self.file_opened = false;

        let ret = unsafe { ffi::avio_closep(&mut (*self.output.as_mut_ptr()).pb) };
        if ret < 0 {
            return Err(TeardownError::Close(
                ffmpeg_next::Error::from(ret).to_string(),
            ));
        }
        Ok(())
    }
}

impl PacketWriter for Sink {
    fn write_packet(&mut self, packet: &mut Packet) -> Result<(), ffmpeg_next::Error> {
        if !self.header_written {
            return Err(ffmpeg_next::Error::InvalidData);
        }

        packet.write_interleaved(&mut self.output)?;
        self.packets_written += 1;
        Ok(())
    }
}

/**
    Allocate an output context for `path`, either guessing the muxer from the
    filename or using the one named `format_name`.
*/
fn alloc_output(path: &CStr, format_name: Option<&str>) -> Result<OutputContext, String> {
    let format_name = format_name
        .map(CString::new)
        .transpose()
        .map_err(|e| e.to_string())?;

    let mut ctx = ptr::null_mut();
    let ret = unsafe {
        ffi::avformat_alloc_output_context2(
            &mut ctx,
            ptr::null_mut(),
            format_name.as_deref().map_or(ptr::null(), CStr::as_ptr),
            path.as_ptr(),
        )
    };

    if ret < 0 || ctx.is_null() {
        return Err(if ret < 0 {
            ffmpeg_next::Error::from(ret).to_string()
        } else {
            "no muxer matches".to_string()
        });
    }

    Ok(unsafe { OutputContext::wrap(ctx) })
}

impl Drop for Sink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to close output");
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("path", &self.path)
            .field("container", &self.info.name)
            .field("header_written", &self.header_written)
            .field("packets_written", &self.packets_written)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_container_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mpg");
        let sink = Sink::create(&path).unwrap();

        assert_eq!(sink.info().name, "mpeg");
        assert!(!sink.info().fell_back);
        assert!(sink.info().file_backed);
        assert_eq!(
            sink.default_codec(MediaKind::Video),
            Some(codec::Id::MPEG1VIDEO)
        );
        assert_eq!(sink.default_codec(MediaKind::Audio), Some(codec::Id::MP2));
        // negotiation alone never touches the filesystem
        assert!(!path.exists());
    }

    #[test]
    fn unknown_extension_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::create(dir.path().join("out.notacontainer")).unwrap();

        assert_eq!(sink.info().name, FALLBACK_FORMAT);
        assert!(sink.info().fell_back);
    }

    #[test]
    fn mp4_requires_global_headers() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::create(dir.path().join("out.mp4")).unwrap();

        assert_eq!(sink.info().name, "mp4");
        assert!(sink.requires_global_header());
    }

    #[test]
    fn no_file_muxer_never_creates_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.raw");
        let mut sink = Sink::create_as(&path, "null").unwrap();

        assert!(!sink.info().file_backed);
        sink.open().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn unknown_forced_container_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Sink::create_as(dir.path().join("out.mpg"), "no-such-muxer").unwrap_err();
        assert!(matches!(err, SetupError::Container { .. }));
    }

    #[test]
    fn packets_before_header_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Sink::create(dir.path().join("out.mpg")).unwrap();
        let mut packet = Packet::empty();

        assert!(sink.write_packet(&mut packet).is_err());
        assert_eq!(sink.packets_written(), 0);
    }

    #[test]
    fn discard_removes_the_opened_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mpg");
        let mut sink = Sink::create(&path).unwrap();

        sink.open().unwrap();
        assert!(path.exists());

        sink.discard();
        assert!(!path.exists());
    }

    #[test]
    fn finish_without_header_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::create(dir.path().join("out.mpg")).unwrap();

        assert!(matches!(sink.finish(), Err(TeardownError::Trailer(_))));
    }
}
