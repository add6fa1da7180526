use std::io::{BufWriter, Write};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{CaptureError, CapturedFrame};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ScreenshotFormat {
    #[default]
    Png,
    /// Alpha is dropped; pixels are premultiplied, so this composites over black.
    Jpeg,
}

/// Encodes `frame` into `writer`. `quality` (1..=100) only applies to JPEG.
pub fn encode(
    frame: &CapturedFrame,
    format: ScreenshotFormat,
    quality: u8,
    writer: &mut dyn Write,
) -> Result<(), CaptureError> {
    let mut out = BufWriter::new(writer);
    match format {
        ScreenshotFormat::Png => {
            PngEncoder::new(&mut out).write_image(
                &frame.pixels,
                frame.width,
                frame.height,
                ExtendedColorType::Rgba8,
            )?;
        }
        ScreenshotFormat::Jpeg => {
            let rgb: Vec<u8> = frame
                .pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode(
                &rgb,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> CapturedFrame {
        CapturedFrame::new(
            2,
            2,
            vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
        )
    }

    #[test]
    fn png_round_trips_dimensions() {
        let mut buf = Vec::new();
        encode(&checker(), ScreenshotFormat::Png, 0, &mut buf).unwrap();
        assert_eq!(&buf[..8], b"\x89PNG\r\n\x1a\n");

        let img = image::load_from_memory(&buf).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let mut buf = Vec::new();
        encode(&checker(), ScreenshotFormat::Jpeg, 250, &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0xFF, 0xD8]);
    }
}
