/*!
    Conversion utilities between ffmpeg-next types and panim-types, plus the
    platform-specific handling of output paths.
*/

use std::{ffi::CString, path::Path};

use panim_types::Rational;

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert our Rational to ffmpeg_next::Rational.
*/
pub fn rational_to_ffmpeg(r: Rational) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::new(r.num, r.den)
}

/**
    Convert a filesystem path into the C string FFmpeg expects.
*/
#[cfg(unix)]
pub fn path_to_cstring(path: &Path) -> Result<CString, String> {
    use std::os::unix::ffi::OsStrExt;

    CString::new(path.as_os_str().as_bytes()).map_err(|e| e.to_string())
}

/**
    Convert a filesystem path into the C string FFmpeg expects.

    FFmpeg treats filenames as UTF-8 on these platforms.
*/
#[cfg(not(unix))]
pub fn path_to_cstring(path: &Path) -> Result<CString, String> {
    let path = path
        .to_str()
        .ok_or_else(|| "path is not valid UTF-8".to_string())?;
    CString::new(path).map_err(|e| e.to_string())
}
