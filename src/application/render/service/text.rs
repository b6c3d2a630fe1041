use fontdue::{Font, FontSettings};
use image::{Pixel, Rgba, RgbaImage};

use crate::application::render::types::RenderError;

/// CPU glyph rasterizer over a single TTF face.
pub(crate) struct TextPainter {
    font: Font,
}

impl TextPainter {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(RenderError::font)?;
        Ok(Self { font })
    }

    /// Ascent and descent for one line at the given pixel size. Descent is
    /// negative or zero.
    pub fn line_metrics(&self, px: f32) -> (f32, f32) {
        match self.font.horizontal_line_metrics(px) {
            Some(metrics) => (metrics.ascent, metrics.descent),
            None => (px, 0.0),
        }
    }

    pub fn line_height(&self, px: f32) -> u32 {
        let (ascent, descent) = self.line_metrics(px);
        (ascent - descent).ceil() as u32
    }

    /// Advance width of `text`, in whole pixels.
    pub fn measure(&self, text: &str, px: f32) -> u32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, px).advance_width)
            .sum::<f32>()
            .ceil() as u32
    }

    /// Draw `text` with its baseline at `baseline`; returns the advance in
    /// pixels. Glyphs falling outside the canvas are clipped.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        x: i32,
        baseline: i32,
        text: &str,
        px: f32,
        color: Rgba<u8>,
    ) -> i32 {
        let mut pen = x as f32;
        for ch in text.chars() {
            let (metrics, coverage) = self.font.rasterize(ch, px);
            let origin_x = pen.round() as i32 + metrics.xmin;
            let origin_y = baseline - metrics.height as i32 - metrics.ymin;
            blit(
                canvas,
                origin_x,
                origin_y,
                metrics.width,
                metrics.height,
                &coverage,
                color,
            );
            pen += metrics.advance_width;
        }
        pen.round() as i32 - x
    }
}

fn blit(
    canvas: &mut RgbaImage,
    origin_x: i32,
    origin_y: i32,
    width: usize,
    height: usize,
    coverage: &[u8],
    color: Rgba<u8>,
) {
    for row in 0..height {
        for col in 0..width {
            let alpha = coverage[row * width + col];
            if alpha == 0 {
                continue;
            }
            let x = origin_x + col as i32;
            let y = origin_y + row as i32;
            if x < 0 || y < 0 {
                continue;
            }
            let (x, y) = (x as u32, y as u32);
            if x >= canvas.width() || y >= canvas.height() {
                continue;
            }
            let scaled = (u16::from(alpha) * u16::from(color.0[3]) / 255) as u8;
            canvas
                .get_pixel_mut(x, y)
                .blend(&Rgba([color.0[0], color.0[1], color.0[2], scaled]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_clips_to_canvas_bounds() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let coverage = vec![255u8; 9];
        // Partially off the top-left corner.
        blit(&mut canvas, -1, -1, 3, 3, &coverage, Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(canvas.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn zero_coverage_leaves_pixels_untouched() {
        let mut canvas = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        let coverage = vec![0u8; 4];
        blit(&mut canvas, 0, 0, 2, 2, &coverage, Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }
}
