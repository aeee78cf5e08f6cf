/*!
    The encode/drain/write loop shared by every output stream.
*/

use ffmpeg_next::{
    Packet,
    codec::encoder::Encoder as EncoderFFmpeg,
    util::{error::EAGAIN, frame::Frame},
};
use tracing::trace;

use panim_sink::{PacketWriter, convert::rational_to_ffmpeg};
use panim_types::{EncodeError, MediaKind, Rational};

/**
    The container stream an encoder's packets are written to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamTarget {
    /// Stream index inside the container.
    pub index: usize,
    /// Timebase of the stream after the header was written.
    pub time_base: Rational,
}

/**
    Why a drain stopped.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainStatus {
    /// The encoder wants another frame before it can produce more packets.
    NeedsInput,
    /// The encoder has been flushed and emitted its last packet.
    EndOfStream,
}

/**
    Drives one encoder: submit a frame, drain every packet it makes
    available, rescale each packet into the stream timebase and hand it to
    the container.

    The driver owns a single reusable packet. Once [`flush`](Self::flush)
    has run, further frames are rejected.
*/
pub struct EncodeDriver {
    kind: MediaKind,
    encoder_time_base: Rational,
    target: Option<StreamTarget>,
    packet: Packet,
    packets_written: u64,
    flushed: bool,
}

impl EncodeDriver {
    pub fn new(kind: MediaKind, encoder_time_base: Rational) -> Self {
        Self {
            kind,
            encoder_time_base,
            target: None,
            packet: Packet::empty(),
            packets_written: 0,
            flushed: false,
        }
    }

    /**
        Route packets to `target`. Must happen after the container header is
        written, since the muxer may change the stream timebase.
    */
    pub fn bind(&mut self, target: StreamTarget) {
        self.target = Some(target);
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /**
        Send `frame` to the encoder and write every packet it produces.
    */
    pub fn submit(
        &mut self,
        encoder: &mut EncoderFFmpeg,
        frame: &Frame,
        writer: &mut dyn PacketWriter,
    ) -> Result<DrainStatus, EncodeError> {
        if self.flushed {
            return Err(EncodeError::Flushed { kind: self.kind });
        }

        encoder
            .send_frame(frame)
            .map_err(|e| EncodeError::Submit {
                kind: self.kind,
                pts: frame.pts(),
                reason: e.to_string(),
            })?;

        self.drain(encoder, writer)
    }

    /**
        Signal end of stream and write every remaining packet. Calling this
        again is a no-op.
    */
    pub fn flush(
        &mut self,
        encoder: &mut EncoderFFmpeg,
        writer: &mut dyn PacketWriter,
    ) -> Result<(), EncodeError> {
        if self.flushed {
            return Ok(());
        }

        encoder.send_eof().map_err(|e| EncodeError::Submit {
            kind: self.kind,
            pts: None,
            reason: e.to_string(),
        })?;
        self.flushed = true;

        match self.drain(encoder, writer)? {
            DrainStatus::EndOfStream => Ok(()),
            DrainStatus::NeedsInput => Err(EncodeError::Drain {
                kind: self.kind,
                reason: "encoder asked for input after end of stream".into(),
            }),
        }
    }

    fn drain(
        &mut self,
        encoder: &mut EncoderFFmpeg,
        writer: &mut dyn PacketWriter,
    ) -> Result<DrainStatus, EncodeError> {
        loop {
            match encoder.receive_packet(&mut self.packet) {
                Ok(()) => self.write(writer)?,
                Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => {
                    return Ok(DrainStatus::NeedsInput);
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(DrainStatus::EndOfStream),
                Err(e) => {
                    return Err(EncodeError::Drain {
                        kind: self.kind,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn write(&mut self, writer: &mut dyn PacketWriter) -> Result<(), EncodeError> {
        let target = self
            .target
            .ok_or(EncodeError::NotRegistered { kind: self.kind })?;

        self.packet.rescale_ts(
            rational_to_ffmpeg(self.encoder_time_base),
            rational_to_ffmpeg(target.time_base),
        );
        self.packet.set_stream(target.index);

        trace!(
            kind = %self.kind,
            stream = target.index,
            pts = ?self.packet.pts(),
            dts = ?self.packet.dts(),
            duration = self.packet.duration(),
            key = self.packet.is_key(),
            "writing packet"
        );

        let pts = self.packet.pts();
        writer
            .write_packet(&mut self.packet)
            .map_err(|e| EncodeError::Write {
                kind: self.kind,
                pts,
                reason: e.to_string(),
            })?;
        self.packets_written += 1;
        Ok(())
    }
}

impl std::fmt::Debug for EncodeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeDriver")
            .field("kind", &self.kind)
            .field("encoder_time_base", &self.encoder_time_base)
            .field("target", &self.target)
            .field("packets_written", &self.packets_written)
            .field("flushed", &self.flushed)
            .finish()
    }
}
