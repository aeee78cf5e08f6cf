/*!
    Host frame and sample conversion for the panim render pipeline.

    Animation hosts hand over 32-bit raster buffers stored bottom-up and
    interleaved 16-bit PCM. Encoders want planar YUV and (usually) planar
    float audio. This crate bridges the two:

    - [`VideoConverter`] flips rows into top-down order and, when the encoder
      format differs from the host format, runs a scaling context that is
      created on the first frame and reused afterwards.
    - [`AudioConverter`] feeds fixed-size blocks through a resampling context
      that is likewise created once, on first use.

    Both write into a caller-owned, encoder-native frame so that no buffer is
    allocated per submission.
*/

pub mod convert;

mod audio;
mod video;

pub use audio::AudioConverter;
pub use video::{ScalingAlgorithm, VideoConverter, copy_flipped};
