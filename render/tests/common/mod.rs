#![allow(dead_code)]

use std::path::Path;

use ffmpeg_next::{codec, format, media, util::frame::video::Video as VideoFrame};
use tracing_subscriber::EnvFilter;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/**
    A BGRA frame filled with one color.
*/
pub fn solid_frame(width: u32, height: u32, bgra: [u8; 4]) -> Vec<u8> {
    bgra.repeat((width * height) as usize)
}

/**
    Paint a rectangle of host (bottom-up) coordinates into a BGRA frame.
*/
pub fn paint(frame: &mut [u8], width: u32, x: std::ops::Range<u32>, y: std::ops::Range<u32>, bgra: [u8; 4]) {
    for row in y {
        for col in x.clone() {
            let offset = ((row * width + col) * 4) as usize;
            frame[offset..offset + 4].copy_from_slice(&bgra);
        }
    }
}

pub struct DecodedVideo {
    pub width: u32,
    pub height: u32,
    /// Presentation timestamps in the stream timebase.
    pub pts: Vec<i64>,
    pub time_base: ffmpeg_next::Rational,
    /// Luma planes, `width` bytes per row, top row first.
    pub luma: Vec<Vec<u8>>,
}

impl DecodedVideo {
    /**
        Timestamps relative to the first frame, in frames of `fps`.
    */
    pub fn frame_indices(&self, fps: i32) -> Vec<i64> {
        let first = self.pts.first().copied().unwrap_or(0);
        self.pts
            .iter()
            .map(|pts| {
                let ticks = (pts - first) as i128 * self.time_base.numerator() as i128 * fps as i128;
                let den = self.time_base.denominator() as i128;
                ((ticks + den / 2) / den) as i64
            })
            .collect()
    }

    /**
        Mean luma of a rectangle in top-down output coordinates.
    */
    pub fn mean_luma(&self, frame: usize, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> f64 {
        let plane = &self.luma[frame];
        let mut sum = 0u64;
        let mut n = 0u64;
        for row in y {
            for col in x.clone() {
                sum += plane[(row * self.width + col) as usize] as u64;
                n += 1;
            }
        }
        sum as f64 / n as f64
    }
}

pub fn decode_video(path: &Path) -> DecodedVideo {
    ffmpeg_next::init().unwrap();
    let mut input = format::input(&path).unwrap();
    let stream = input.streams().best(media::Type::Video).expect("no video stream");
    let index = stream.index();
    let time_base = stream.time_base();

    let context = codec::context::Context::from_parameters(stream.parameters()).unwrap();
    let mut decoder = context.decoder().video().unwrap();

    let mut decoded = DecodedVideo {
        width: decoder.width(),
        height: decoder.height(),
        pts: Vec::new(),
        time_base,
        luma: Vec::new(),
    };

    let receive = |decoder: &mut ffmpeg_next::decoder::Video, decoded: &mut DecodedVideo| {
        let mut frame = VideoFrame::empty();
        while decoder.receive_frame(&mut frame).is_ok() {
            decoded.pts.push(frame.timestamp().or(frame.pts()).unwrap_or(-1));

            let width = frame.width() as usize;
            let stride = frame.stride(0);
            let data = frame.data(0);
            let luma = (0..frame.height() as usize)
                .flat_map(|row| data[row * stride..row * stride + width].iter().copied())
                .collect();
            decoded.luma.push(luma);
        }
    };

    for (stream, packet) in input.packets() {
        if stream.index() == index {
            decoder.send_packet(&packet).unwrap();
            receive(&mut decoder, &mut decoded);
        }
    }
    decoder.send_eof().unwrap();
    receive(&mut decoder, &mut decoded);

    decoded
}

/**
    Number of packets the demuxer finds for each media type.
*/
pub fn count_packets(path: &Path) -> (usize, usize) {
    ffmpeg_next::init().unwrap();
    let mut input = format::input(&path).unwrap();

    let (mut video, mut audio) = (0, 0);
    for (stream, _) in input.packets() {
        match stream.parameters().medium() {
            media::Type::Video => video += 1,
            media::Type::Audio => audio += 1,
            _ => {}
        }
    }
    (video, audio)
}

/**
    Media types of the streams declared in the file.
*/
pub fn stream_kinds(path: &Path) -> Vec<media::Type> {
    ffmpeg_next::init().unwrap();
    let input = format::input(&path).unwrap();
    input.streams().map(|s| s.parameters().medium()).collect()
}
