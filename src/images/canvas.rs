//! Alpha-blended drawing onto an opaque RGB image. Every shape blends each
//! pixel it covers exactly once, and anything outside the image is clipped.

use super::font;
use super::palette::{self, Color};
use image::{Rgb, RgbImage};
use std::collections::HashSet;

/// A drawing surface.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// A `width` x `height` canvas filled with `color`.
    pub fn new(width: u32, height: u32, color: Color) -> Canvas {
        Canvas {
            image: RgbImage::from_pixel(width, height, Rgb(color)),
        }
    }

    pub fn width(&self) -> i64 {
        self.image.width() as i64
    }

    pub fn height(&self) -> i64 {
        self.image.height() as i64
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Fills every row with a colour interpolated between `top` and
    /// `bottom`.
    pub fn vertical_gradient(&mut self, top: Color, bottom: Color) {
        let last = (self.image.height().max(2) - 1) as f64;
        for (y, row) in self.image.enumerate_rows_mut() {
            let color = Rgb(palette::mix(top, bottom, y as f64 / last));
            for (_, _, pixel) in row {
                *pixel = color;
            }
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, alpha: u8) {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let alpha = alpha as u32;
        for (dst, src) in pixel.0.iter_mut().zip(color.iter()) {
            *dst = ((*src as u32 * alpha + *dst as u32 * (255 - alpha)) / 255) as u8;
        }
    }

    /// Fills the rectangle with corners `(x1, y1)` and `(x2, y2)`, both
    /// inclusive.
    pub fn rectangle(
        &mut self,
        (x1, y1): (i64, i64),
        (x2, y2): (i64, i64),
        color: Color,
        alpha: u8,
    ) {
        let (x1, x2) = (x1.max(0), x2.min(self.width() - 1));
        let (y1, y2) = (y1.max(0), y2.min(self.height() - 1));
        for y in y1..=y2 {
            for x in x1..=x2 {
                self.blend(x, y, color, alpha);
            }
        }
    }

    /// Fills the ellipse inscribed in the given inclusive bounding box.
    pub fn ellipse(&mut self, (x1, y1): (i64, i64), (x2, y2): (i64, i64), color: Color, alpha: u8) {
        let rx = (x2 - x1 + 1) as f64 / 2.0;
        let ry = (y2 - y1 + 1) as f64 / 2.0;
        let cx = x1 as f64 + rx;
        let cy = y1 as f64 + ry;
        for y in y1.max(0)..=y2.min(self.height() - 1) {
            for x in x1.max(0)..=x2.min(self.width() - 1) {
                let dx = (x as f64 + 0.5 - cx) / rx;
                let dy = (y as f64 + 0.5 - cy) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    self.blend(x, y, color, alpha);
                }
            }
        }
    }

    /// Draws a straight line `width` pixels thick.
    pub fn line(&mut self, from: (i64, i64), to: (i64, i64), width: u32, color: Color, alpha: u8) {
        let offset = (width.max(1) as i64 - 1) / 2;
        let extent = width.max(1) as i64;
        let mut covered = HashSet::new();
        for (x, y) in bresenham(from, to) {
            for dy in 0..extent {
                for dx in 0..extent {
                    covered.insert((x - offset + dx, y - offset + dy));
                }
            }
        }
        for (x, y) in covered {
            self.blend(x, y, color, alpha);
        }
    }

    /// Draws `text` with its top-left corner at `(x, y)`.
    pub fn text(&mut self, text: &str, (x, y): (i64, i64), scale: u32, color: Color, alpha: u8) {
        let size = scale as i64;
        for (bx, by) in font::blocks(text, x, y, scale) {
            self.rectangle((bx, by), (bx + size - 1, by + size - 1), color, alpha);
        }
    }
}

fn bresenham((mut x, mut y): (i64, i64), (x2, y2): (i64, i64)) -> Vec<(i64, i64)> {
    let dx = (x2 - x).abs();
    let dy = -(y2 - y).abs();
    let sx = if x < x2 { 1 } else { -1 };
    let sy = if y < y2 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        points.push((x, y));
        if x == x2 && y == y2 {
            return points;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blend_and_clip() {
        let mut canvas = Canvas::new(4, 4, [0, 0, 0]);
        canvas.rectangle((-10, -10), (1, 1), [255, 255, 255], 255);
        canvas.rectangle((2, 2), (20, 20), [255, 0, 0], 51);
        let image = canvas.into_image();
        assert_eq!(Rgb([255, 255, 255]), *image.get_pixel(0, 0));
        assert_eq!(Rgb([255, 255, 255]), *image.get_pixel(1, 1));
        assert_eq!(Rgb([0, 0, 0]), *image.get_pixel(2, 0));
        assert_eq!(Rgb([51, 0, 0]), *image.get_pixel(3, 3));
    }

    #[test]
    fn test_gradient() {
        let mut canvas = Canvas::new(2, 3, [0, 0, 0]);
        canvas.vertical_gradient([0, 0, 0], [200, 100, 50]);
        let image = canvas.into_image();
        assert_eq!(Rgb([0, 0, 0]), *image.get_pixel(1, 0));
        assert_eq!(Rgb([100, 50, 25]), *image.get_pixel(0, 1));
        assert_eq!(Rgb([200, 100, 50]), *image.get_pixel(1, 2));
    }

    #[test]
    fn test_thick_line_blends_once() {
        let mut canvas = Canvas::new(10, 10, [0, 0, 0]);
        canvas.line((0, 0), (9, 9), 4, [255, 255, 255], 51);
        let image = canvas.into_image();
        assert_eq!(Rgb([51, 51, 51]), *image.get_pixel(5, 5));
        assert_eq!(Rgb([0, 0, 0]), *image.get_pixel(9, 0));
    }

    #[test]
    fn test_ellipse_stays_in_box() {
        let mut canvas = Canvas::new(10, 10, [0, 0, 0]);
        canvas.ellipse((0, 0), (9, 9), [255, 255, 255], 255);
        let image = canvas.into_image();
        assert_eq!(Rgb([255, 255, 255]), *image.get_pixel(5, 5));
        assert_eq!(Rgb([0, 0, 0]), *image.get_pixel(0, 0));
        assert_eq!(Rgb([0, 0, 0]), *image.get_pixel(9, 9));
    }

    #[test]
    fn test_bresenham_endpoints() {
        let points = bresenham((3, 1), (0, 2));
        assert_eq!(Some(&(3, 1)), points.first());
        assert_eq!(Some(&(0, 2)), points.last());
        assert_eq!(4, points.len());
    }
}
