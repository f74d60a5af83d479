use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::media_metadata::MediaMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceOpenError};

/// Decodes video file frames via ffmpeg-next (libavformat + libavcodec).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
pub struct FfmpegVideoSource {
    path: PathBuf,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
}

// Safety: FfmpegVideoSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoSource {}

impl FfmpegVideoSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            input_ctx: None,
            video_stream_index: 0,
        }
    }
}

impl FrameSource for FfmpegVideoSource {
    fn open(&mut self) -> Result<MediaMetadata, SourceOpenError> {
        if !self.path.exists() {
            return Err(SourceOpenError::NotFound(self.path.clone()));
        }

        let unreadable = |reason: String| SourceOpenError::Unreadable {
            path: self.path.clone(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| unreadable(e.to_string()))?;

        let ictx =
            ffmpeg_next::format::input(&self.path).map_err(|e| unreadable(e.to_string()))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| unreadable("no video stream found".to_string()))?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| unreadable(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| unreadable(e.to_string()))?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        // Some containers don't carry a frame count; report it as unknown
        // rather than zero so progress can degrade to a counter.
        let frame_count = match stream.frames() {
            n if n > 0 => Some(n as usize),
            _ => None,
        };

        let metadata = MediaMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            frame_count,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(self.path.clone()),
        };

        self.video_stream_index = video_stream_index;
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("source not opened".into())));
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .expect("open() verified the video stream");
        let codec_ctx = match ffmpeg_next::codec::context::Context::from_parameters(
            stream.parameters(),
        ) {
            Ok(ctx) => ctx,
            Err(e) => return Box::new(std::iter::once(Err(Box::new(e) as Box<dyn std::error::Error>))),
        };
        let decoder = match codec_ctx.decoder().video() {
            Ok(d) => d,
            Err(e) => return Box::new(std::iter::once(Err(Box::new(e) as Box<dyn std::error::Error>))),
        };

        let width = decoder.width();
        let height = decoder.height();

        let scaler = match ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        ) {
            Ok(s) => s,
            Err(e) => return Box::new(std::iter::once(Err(Box::new(e) as Box<dyn std::error::Error>))),
        };

        Box::new(DecodeIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Lazy decoder: one frame at a time, flushing the codec at end of
/// stream, so the whole video is never buffered in memory.
struct DecodeIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl DecodeIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
                return Some(Err(Box::new(e)));
            }

            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
            self.frame_index += 1;
            Some(Ok(frame))
        } else {
            None
        }
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_not_found() {
        let mut source = FfmpegVideoSource::new(Path::new("/nonexistent/clip.mp4"));
        match source.open() {
            Err(SourceOpenError::NotFound(path)) => {
                assert_eq!(path, Path::new("/nonexistent/clip.mp4"))
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_open_non_media_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a video").unwrap();

        let mut source = FfmpegVideoSource::new(&path);
        match source.open() {
            Err(SourceOpenError::Unreadable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Unreadable, got {other:?}"),
        }
    }

    #[test]
    fn test_frames_before_open_errors() {
        let mut source = FfmpegVideoSource::new(Path::new("/tmp/whatever.mp4"));
        let mut frames = source.frames();
        assert!(frames.next().unwrap().is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = FfmpegVideoSource::new(Path::new("/tmp/whatever.mp4"));
        source.close();
        source.close();
    }
}
