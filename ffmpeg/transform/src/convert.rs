/*!
    Conversion utilities between ffmpeg-next types and panim-types.
*/

use ffmpeg_next::{
    ChannelLayout as FFmpegChannelLayout, ffi,
    format::{Pixel, Sample, sample::Type as SampleType},
    util::frame::Frame,
};

use panim_types::{ChannelLayout, ConvertError, PixelFormat, SampleFormat};

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Yuv420p => Pixel::YUV420P,
        PixelFormat::Bgra => Pixel::BGRA,
        PixelFormat::Rgba => Pixel::RGBA,
    }
}

/**
    Convert our SampleFormat to FFmpeg's Sample format.
*/
pub fn sample_format_to_ffmpeg(format: SampleFormat) -> Sample {
    match format {
        SampleFormat::S16 => Sample::I16(SampleType::Packed),
        SampleFormat::F32 => Sample::F32(SampleType::Packed),
        SampleFormat::F32Planar => Sample::F32(SampleType::Planar),
    }
}

/**
    Convert FFmpeg's Sample format to our SampleFormat.
*/
pub fn sample_format_from_ffmpeg(format: Sample) -> Option<SampleFormat> {
    match format {
        Sample::I16(SampleType::Packed) => Some(SampleFormat::S16),
        Sample::F32(SampleType::Packed) => Some(SampleFormat::F32),
        Sample::F32(SampleType::Planar) => Some(SampleFormat::F32Planar),
        _ => None,
    }
}

/**
    Convert our ChannelLayout to FFmpeg's channel layout.
*/
pub fn channel_layout_to_ffmpeg(layout: ChannelLayout) -> FFmpegChannelLayout {
    match layout {
        ChannelLayout::Mono => FFmpegChannelLayout::MONO,
        ChannelLayout::Stereo => FFmpegChannelLayout::STEREO,
    }
}

/**
    Make sure `frame` owns its buffers exclusively before it is overwritten.

    An encoder may keep a reference to the buffers of the last frame it was
    sent; writing into them in place would corrupt that frame.
*/
pub fn make_writable(frame: &mut Frame) -> Result<(), ConvertError> {
    let ret = unsafe { ffi::av_frame_make_writable(frame.as_mut_ptr()) };
    if ret < 0 {
        return Err(ConvertError::NotWritable(
            ffmpeg_next::Error::from(ret).to_string(),
        ));
    }
    Ok(())
}
