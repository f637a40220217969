//! Letterbox resizing onto a white square canvas with JPEG output.
//!
//! The vision model receives every garment on the same white square so that
//! aspect ratio and background never leak into the extracted attributes.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::config::ExtractionConfig;
use crate::error::PipelineError;

/// Resizes images onto a centered white square canvas.
pub struct Letterboxer {
    size: u32,
    jpeg_quality: u8,
}

impl Letterboxer {
    /// Create a letterboxer from the extraction settings.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            size: config.image_size,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Fit the image into the square and center it on a white canvas.
    ///
    /// Images already within the square are pasted as-is — downscale only,
    /// never upscale. Downscaling uses Lanczos3.
    pub fn letterbox(&self, image: &DynamicImage) -> RgbImage {
        let (w, h) = image.dimensions();
        let fitted = if w <= self.size && h <= self.size {
            image.to_rgb8()
        } else {
            image.resize(self.size, self.size, FilterType::Lanczos3).to_rgb8()
        };

        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([255, 255, 255]));
        let x = (self.size - fitted.width()) / 2;
        let y = (self.size - fitted.height()) / 2;
        imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
        canvas
    }

    /// Letterbox and write the result as a JPEG at the configured quality.
    pub fn write_jpeg(&self, image: &DynamicImage, dest: &Path) -> Result<(), PipelineError> {
        let canvas = self.letterbox(image);

        let file = File::create(dest).map_err(|e| PipelineError::Encode {
            path: dest.to_path_buf(),
            message: format!("Cannot create file: {}", e),
        })?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
        canvas.write_with_encoder(encoder).map_err(|e| PipelineError::Encode {
            path: dest.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Side length of the output square.
    pub fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letterboxer(size: u32) -> Letterboxer {
        Letterboxer {
            size,
            jpeg_quality: 85,
        }
    }

    #[test]
    fn test_letterbox_output_is_square() {
        let img = DynamicImage::new_rgb8(1000, 500);
        let canvas = letterboxer(256).letterbox(&img);
        assert_eq!(canvas.dimensions(), (256, 256));
    }

    #[test]
    fn test_letterbox_pads_with_white() {
        // A black 100x50 image centered on 100x100 leaves white bands top and bottom
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([0, 0, 0])));
        let canvas = letterboxer(100).letterbox(&img);

        assert_eq!(canvas.get_pixel(50, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(50, 99), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(50, 50), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_letterbox_does_not_upscale() {
        // A 10x10 image on a 256 canvas stays 10x10, centered
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let canvas = letterboxer(256).letterbox(&img);

        // Center pixel is from the image, a pixel just outside the paste area is white
        assert_eq!(canvas.get_pixel(128, 128), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(110, 128), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_write_jpeg_produces_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("resized.jpg");
        let img = DynamicImage::new_rgb8(640, 480);

        letterboxer(256).write_jpeg(&img, &dest).unwrap();

        let reloaded = image::open(&dest).unwrap();
        assert_eq!(reloaded.dimensions(), (256, 256));
    }

    #[test]
    fn test_write_jpeg_bad_destination() {
        let img = DynamicImage::new_rgb8(10, 10);
        let err = letterboxer(64)
            .write_jpeg(&img, Path::new("/nonexistent/dir/out.jpg"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Encode { .. }));
    }
}
