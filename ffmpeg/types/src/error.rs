use std::path::PathBuf;

use thiserror::Error;

use crate::MediaKind;

/**
    Errors raised while negotiating the container, provisioning streams,
    or opening the output file. No frame has been accepted yet.
*/
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    // ── Parameters ────────────────────────────────────────────────────
    #[error("invalid dimensions {width}x{height}: both must be non-zero and even")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("invalid frame rate {fps}: must be non-zero")]
    InvalidFrameRate { fps: u32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Library ───────────────────────────────────────────────────────
    #[error("failed to initialize FFmpeg: {0}")]
    Init(String),

    // ── Container ─────────────────────────────────────────────────────
    #[error("no usable container for {}: {reason}", path.display())]
    Container { path: PathBuf, reason: String },
    #[error("failed to open {}: {reason}", path.display())]
    FileOpen { path: PathBuf, reason: String },
    #[error("failed to write container header: {0}")]
    Header(String),

    // ── Streams ───────────────────────────────────────────────────────
    #[error("no {kind} encoder available for codec {codec}")]
    CodecUnavailable { kind: MediaKind, codec: String },
    #[error("failed to open {kind} encoder {codec}: {reason}")]
    EncoderOpen {
        kind: MediaKind,
        codec: String,
        reason: String,
    },
    #[error("failed to register {kind} stream: {reason}")]
    StreamRegistration { kind: MediaKind, reason: String },
}

/**
    Errors raised while converting host frames or samples into the encoder's
    native layout.
*/
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("frame is {width}x{height} ({len} bytes), session expects {expected_width}x{expected_height}")]
    FrameSize {
        width: u32,
        height: u32,
        len: usize,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("sample buffer holds {actual} values, {expected} required")]
    SampleCount { expected: usize, actual: usize },
    #[error("failed to create scaler: {0}")]
    Scaler(String),
    #[error("failed to create resampler: {0}")]
    Resampler(String),
    #[error("conversion failed: {0}")]
    Conversion(String),
    #[error("frame buffer could not be made writable: {0}")]
    NotWritable(String),
}

impl ConvertError {
    /**
        Returns true if the error was caused by malformed caller input that
        was rejected before any pipeline state changed.
    */
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::FrameSize { .. } | Self::SampleCount { .. })
    }
}

/**
    Errors raised while driving an encoder or writing its packets.
*/
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("{kind} encoder rejected frame (pts {pts:?}): {reason}")]
    Submit {
        kind: MediaKind,
        pts: Option<i64>,
        reason: String,
    },
    #[error("{kind} encoder failed while draining: {reason}")]
    Drain { kind: MediaKind, reason: String },
    #[error("failed to write {kind} packet (pts {pts:?}): {reason}")]
    Write {
        kind: MediaKind,
        pts: Option<i64>,
        reason: String,
    },
    #[error("{kind} encoder is not bound to a container stream")]
    NotRegistered { kind: MediaKind },
    #[error("{kind} encoder has already been flushed")]
    Flushed { kind: MediaKind },
}

/**
    Errors raised while finalizing the container.
*/
#[derive(Debug, Clone, Error)]
pub enum TeardownError {
    #[error("failed to write container trailer: {0}")]
    Trailer(String),
    #[error("failed to close output file: {0}")]
    Close(String),
}

/**
    Errors surfaced by a render session.
*/
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Teardown(#[from] TeardownError),

    // ── Lifecycle ─────────────────────────────────────────────────────
    #[error("session has already ended")]
    Ended,
    #[error("session is poisoned by an earlier failure; only a discarding end is accepted")]
    Poisoned,
}

impl SessionError {
    /**
        Returns true if this error leaves the session unable to produce a
        valid file.
    */
    pub fn poisons(&self) -> bool {
        match self {
            Self::Convert(e) => !e.is_input_error(),
            Self::Encode(_) => true,
            Self::Setup(_) | Self::Teardown(_) | Self::Ended | Self::Poisoned => false,
        }
    }
}
