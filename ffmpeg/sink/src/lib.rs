/*!
    Container negotiation and muxing for the panim render pipeline.

    A [`Sink`] owns the FFmpeg output context of one file. It infers the
    container from the filename (falling back to MPEG program stream when the
    extension is not recognized), registers output streams, opens the file,
    writes the header, interleaves packets and finally writes the trailer.

    Encoders never see the sink directly; they write through the
    [`PacketWriter`] trait.
*/

pub mod convert;

mod sink;
mod writer;

pub use sink::{ContainerInfo, FALLBACK_FORMAT, Sink};
pub use writer::PacketWriter;
