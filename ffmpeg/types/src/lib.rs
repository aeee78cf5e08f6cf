/*!
    Shared types for the panim render pipeline.

    This crate defines the vocabulary that crosses crate boundaries: pixel and
    sample formats, timebases, stream descriptions and the error taxonomy of a
    render session. It has no dependency on FFmpeg, so hosts can name these
    types without pulling in FFmpeg bindings.
*/

mod error;
mod format;
mod rational;
mod stream;

pub use error::{ConvertError, EncodeError, SessionError, SetupError, TeardownError};
pub use format::{ChannelLayout, PixelFormat, SampleFormat};
pub use rational::Rational;
pub use stream::{AudioStreamInfo, MediaKind, OutputInfo, VideoStreamInfo};
