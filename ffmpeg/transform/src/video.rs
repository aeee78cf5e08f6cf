/*!
    Video frame conversion.
*/

use ffmpeg_next::{
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};

use panim_types::{ConvertError, PixelFormat};

use crate::convert::{make_writable, pixel_format_to_ffmpeg};

/**
    Scaling algorithm used for pixel format conversion.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    /// Bilinear interpolation - fast, acceptable quality.
    Bilinear,
    /// Bicubic interpolation - moderate speed, good quality.
    #[default]
    Bicubic,
}

impl ScalingAlgorithm {
    fn to_ffmpeg_flags(self) -> ScalerFlags {
        match self {
            Self::Nearest => ScalerFlags::POINT,
            Self::Bilinear => ScalerFlags::BILINEAR,
            Self::Bicubic => ScalerFlags::BICUBIC,
        }
    }
}

/**
    Converts bottom-up host raster frames into an encoder-native frame.

    Output pixel `(x, y)` is host pixel `(x, height - 1 - y)`. When the
    native format matches the host format the flipped rows are copied
    straight into the destination; otherwise they go through a host-format
    staging frame and a scaling context. The scaling context is created on
    the first conversion and reused for every later frame.
*/
pub struct VideoConverter {
    width: u32,
    height: u32,
    host_format: PixelFormat,
    native_format: PixelFormat,
    algorithm: ScalingAlgorithm,
    /// Host-format frame the flipped rows land in before scaling.
    staging: Option<VideoFrameFFmpeg>,
    scaler: Option<ScalerContext>,
}

impl VideoConverter {
    /**
        Create a converter for frames of `width`x`height` pixels.

        `host_format` must be a packed layout.
    */
    pub fn new(
        width: u32,
        height: u32,
        host_format: PixelFormat,
        native_format: PixelFormat,
    ) -> Result<Self, ConvertError> {
        if host_format.bytes_per_pixel().is_none() {
            return Err(ConvertError::Conversion(format!(
                "host format {host_format:?} is not a packed layout"
            )));
        }

        let staging = (host_format != native_format)
            .then(|| VideoFrameFFmpeg::new(pixel_format_to_ffmpeg(host_format), width, height));

        Ok(Self {
            width,
            height,
            host_format,
            native_format,
            algorithm: ScalingAlgorithm::default(),
            staging,
            scaler: None,
        })
    }

    /**
        Set the scaling algorithm. Has no effect once the scaler exists.
    */
    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn native_format(&self) -> PixelFormat {
        self.native_format
    }

    /**
        Returns true once the scaling context has been created.
    */
    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    /**
        Number of bytes a host frame must hold.
    */
    pub fn frame_len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.host_format.bytes_per_pixel().unwrap_or(4)
    }

    /**
        Convert one host frame into `dst`, which must be an encoder-native
        frame of the converter's dimensions.
    */
    pub fn convert(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        dst: &mut VideoFrameFFmpeg,
    ) -> Result<(), ConvertError> {
        if width != self.width || height != self.height || pixels.len() != self.frame_len() {
            return Err(ConvertError::FrameSize {
                width,
                height,
                len: pixels.len(),
                expected_width: self.width,
                expected_height: self.height,
            });
        }

        make_writable(dst)?;

        let row_bytes = self.row_bytes();
        let rows = self.height as usize;

        if self.staging.is_none() {
            let stride = dst.stride(0);
            copy_flipped(pixels, row_bytes, rows, dst.data_mut(0), stride);
            return Ok(());
        }

        if self.scaler.is_none() {
            self.scaler = Some(self.create_scaler()?);
        }

        if let (Some(staging), Some(scaler)) = (self.staging.as_mut(), self.scaler.as_mut()) {
            // Never sent to an encoder, so the staging buffers stay writable.
            let stride = staging.stride(0);
            copy_flipped(pixels, row_bytes, rows, staging.data_mut(0), stride);
            scaler
                .run(staging, dst)
                .map_err(|e| ConvertError::Conversion(format!("scaling failed: {e}")))?;
        }

        Ok(())
    }

    fn create_scaler(&self) -> Result<ScalerContext, ConvertError> {
        let context = ScalerContext::get(
            pixel_format_to_ffmpeg(self.host_format),
            self.width,
            self.height,
            pixel_format_to_ffmpeg(self.native_format),
            self.width,
            self.height,
            self.algorithm.to_ffmpeg_flags(),
        )
        .map_err(|e| ConvertError::Scaler(e.to_string()))?;

        tracing::debug!(
            from = ?self.host_format,
            to = ?self.native_format,
            width = self.width,
            height = self.height,
            "created scaling context"
        );

        Ok(context)
    }
}

/**
    Copy `rows` rows of `row_bytes` bytes from a bottom-up buffer into a
    top-down plane with the given stride.
*/
pub fn copy_flipped(src: &[u8], row_bytes: usize, rows: usize, dst: &mut [u8], dst_stride: usize) {
    for (y, dst_row) in dst.chunks_mut(dst_stride).take(rows).enumerate() {
        let src_start = (rows - 1 - y) * row_bytes;
        dst_row[..row_bytes].copy_from_slice(&src[src_start..src_start + row_bytes]);
    }
}

impl std::fmt::Debug for VideoConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoConverter")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("host_format", &self.host_format)
            .field("native_format", &self.native_format)
            .field("initialized", &self.scaler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::format::Pixel;

    use super::*;

    fn marked_frame(width: usize, height: usize, x: usize, y: usize) -> Vec<u8> {
        let mut pixels = vec![0u8; width * height * 4];
        let offset = (y * width + x) * 4;
        pixels[offset..offset + 4].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        pixels
    }

    #[test]
    fn copy_flipped_reverses_rows() {
        // 1 pixel wide, 3 rows, 4 bytes per row
        let src: Vec<u8> = (0..12).collect();
        let mut dst = vec![0u8; 3 * 8];
        copy_flipped(&src, 4, 3, &mut dst, 8);

        assert_eq!(&dst[0..4], &[8, 9, 10, 11]);
        assert_eq!(&dst[8..12], &[4, 5, 6, 7]);
        assert_eq!(&dst[16..20], &[0, 1, 2, 3]);
        // padding untouched
        assert_eq!(&dst[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn copy_flipped_single_row_is_identity() {
        let src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 8];
        copy_flipped(&src, 8, 1, &mut dst, 8);
        assert_eq!(src, dst);
    }

    #[test]
    fn same_format_copies_without_scaler() {
        ffmpeg_next::init().unwrap();
        let (width, height) = (4u32, 4u32);
        let mut converter =
            VideoConverter::new(width, height, PixelFormat::Bgra, PixelFormat::Bgra).unwrap();
        let mut dst = VideoFrameFFmpeg::new(Pixel::BGRA, width, height);

        let pixels = marked_frame(4, 4, 1, 0);
        converter.convert(&pixels, width, height, &mut dst).unwrap();

        assert!(!converter.has_scaler());
        let stride = dst.stride(0);
        // host row 0 is the bottom row of the output
        let offset = 3 * stride + 4;
        assert_eq!(&dst.data(0)[offset..offset + 4], &[0xff; 4]);
        assert_eq!(&dst.data(0)[4..8], &[0; 4]);
    }

    #[test]
    fn scaler_is_created_once_and_flips() {
        ffmpeg_next::init().unwrap();
        let (width, height) = (16u32, 16u32);
        let mut converter =
            VideoConverter::new(width, height, PixelFormat::Bgra, PixelFormat::Yuv420p).unwrap();
        let mut dst = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        assert!(!converter.has_scaler());

        let pixels = marked_frame(16, 16, 5, 2);
        converter.convert(&pixels, width, height, &mut dst).unwrap();
        assert!(converter.has_scaler());

        let stride = dst.stride(0);
        let luma = dst.data(0);
        let (mut best, mut best_at) = (0u8, (0, 0));
        for y in 0..16 {
            for x in 0..16 {
                if luma[y * stride + x] > best {
                    best = luma[y * stride + x];
                    best_at = (x, y);
                }
            }
        }
        assert_eq!(best_at, (5, 13));

        // second frame reuses the same context
        converter.convert(&pixels, width, height, &mut dst).unwrap();
        assert!(converter.has_scaler());
    }

    #[test]
    fn nearest_scaling_keeps_the_flip() {
        ffmpeg_next::init().unwrap();
        let mut converter = VideoConverter::new(16, 16, PixelFormat::Rgba, PixelFormat::Yuv420p)
            .unwrap()
            .with_algorithm(ScalingAlgorithm::Nearest);
        assert_eq!(converter.native_format(), PixelFormat::Yuv420p);
        let mut dst = VideoFrameFFmpeg::new(Pixel::YUV420P, 16, 16);

        let mut pixels = vec![0u8; 16 * 16 * 4];
        for y in 0..4 {
            for x in 0..4 {
                let offset = (y * 16 + x) * 4;
                pixels[offset..offset + 4].copy_from_slice(&[0xff; 4]);
            }
        }
        converter.convert(&pixels, 16, 16, &mut dst).unwrap();

        let stride = dst.stride(0);
        let luma = dst.data(0);
        // bottom-left in the host is bottom-left in the output
        assert!(luma[14 * stride + 1] > 200);
        assert!(luma[stride + 1] < 40);
    }

    #[test]
    fn rejects_mismatched_frames() {
        ffmpeg_next::init().unwrap();
        let mut converter =
            VideoConverter::new(8, 8, PixelFormat::Bgra, PixelFormat::Yuv420p).unwrap();
        let mut dst = VideoFrameFFmpeg::new(Pixel::YUV420P, 8, 8);

        let err = converter
            .convert(&[0u8; 8 * 8 * 4], 8, 6, &mut dst)
            .unwrap_err();
        assert!(matches!(err, ConvertError::FrameSize { height: 6, .. }));

        let err = converter.convert(&[0u8; 10], 8, 8, &mut dst).unwrap_err();
        assert!(err.is_input_error());
        assert!(!converter.has_scaler());
    }

    #[test]
    fn planar_host_format_is_rejected() {
        let err = VideoConverter::new(8, 8, PixelFormat::Yuv420p, PixelFormat::Yuv420p).unwrap_err();
        assert!(matches!(err, ConvertError::Conversion(_)));
    }
}
