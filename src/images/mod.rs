//! Generates a 1200x600 header image for each article: either a flat
//! category colour with the title ([`Mode::Simple`]) or a category gradient
//! covered in translucent shapes with the title on a dark plaque
//! ([`Mode::Artistic`]). Shapes are random but seeded from the article id,
//! so regenerating an image reproduces it exactly.

mod canvas;
mod font;
mod palette;

use crate::article::Article;
use crate::config::Config;
use crate::store;
use canvas::Canvas;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbImage};
use palette::Color;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 600;

const JPEG_QUALITY: u8 = 90;

const SHAPES: usize = 250;
const NETWORK_LINES: usize = 50;
const LINUX_SQUARES: usize = 200;

const PLAQUE: (i64, i64) = (900, 350);
const PLAQUE_ALPHA: u8 = 90;

const WRAP_WIDTH: usize = 30;
const LINE_GAP: i64 = 10;
const SHADOW_OFFSET: i64 = 3;
const SHADOW_ALPHA: u8 = 80;

const TITLE_SCALE: u32 = 5;
const SUBTITLE_SCALE: u32 = 3;

const WHITE: Color = [255, 255, 255];
const BLACK: Color = [0, 0, 0];
const LIGHT_GRAY: Color = [211, 211, 211];

/// How a header image is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Flat category colour, title, and the site tagline.
    Simple,

    /// Gradient, random shapes, plaque, title, and category.
    Artistic,
}

/// Draws the header image for `article`.
pub fn render(article: &Article, mode: Mode, tagline: &str) -> RgbImage {
    match mode {
        Mode::Simple => render_simple(article, tagline),
        Mode::Artistic => render_artistic(article),
    }
}

fn render_simple(article: &Article, tagline: &str) -> RgbImage {
    let mut canvas = Canvas::new(WIDTH, HEIGHT, palette::flat(&article.category));
    let (center_x, center_y) = (canvas.width() / 2, canvas.height() / 2);

    let title_scale = TITLE_SCALE + 1;
    let (_, title_height) = font::measure("", title_scale);
    let top = draw_lines(
        &mut canvas,
        &article.title,
        (center_x, center_y - 20),
        title_scale,
        None,
    );
    let title_lines = wrapped_count(&article.title) as i64;
    let tagline_y = top + (title_height as i64 + LINE_GAP) * title_lines;
    draw_centered(
        &mut canvas,
        tagline,
        (center_x, tagline_y),
        SUBTITLE_SCALE,
        LIGHT_GRAY,
        255,
    );
    canvas.into_image()
}

fn render_artistic(article: &Article) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed(&article.id));
    let (top, bottom) = palette::gradient(&article.category);
    let colors = palette::shape_colors(top, bottom);

    let mut canvas = Canvas::new(WIDTH, HEIGHT, WHITE);
    canvas.vertical_gradient(top, bottom);
    scatter_shapes(&mut canvas, &mut rng, &colors);
    theme_overlay(&mut canvas, &mut rng, &colors, &article.category);

    let (center_x, center_y) = (canvas.width() / 2, canvas.height() / 2);
    let (plaque_width, plaque_height) = PLAQUE;
    let corner = (center_x - plaque_width / 2, center_y - plaque_height / 2);
    canvas.rectangle(
        corner,
        (corner.0 + plaque_width, corner.1 + plaque_height),
        BLACK,
        PLAQUE_ALPHA,
    );

    draw_lines(
        &mut canvas,
        &article.title,
        (center_x, center_y - 20),
        TITLE_SCALE,
        Some((SHADOW_OFFSET, SHADOW_ALPHA)),
    );
    draw_centered(
        &mut canvas,
        &article.category,
        (center_x, center_y + 80),
        SUBTITLE_SCALE,
        [230, 230, 230],
        200,
    );
    canvas.into_image()
}

fn scatter_shapes(canvas: &mut Canvas, rng: &mut StdRng, colors: &[Color]) {
    let (width, height) = (canvas.width(), canvas.height());
    for _ in 0..SHAPES {
        let color = *colors.choose(rng).unwrap_or(&BLACK);
        let alpha = rng.gen_range(20..=60);
        let x1 = rng.gen_range(-50..=width + 50);
        let y1 = rng.gen_range(-50..=height + 50);
        let corner = (x1 + rng.gen_range(10..=200), y1 + rng.gen_range(10..=200));

        match rng.gen_range(0..3) {
            0 => {
                let from = (rng.gen_range(-50..=width + 50), rng.gen_range(-50..=height + 50));
                let to = (
                    from.0 + rng.gen_range(-200..=200),
                    from.1 + rng.gen_range(-200..=200),
                );
                let thickness = rng.gen_range(1..=4);
                canvas.line(from, to, thickness, color, alpha);
            }
            1 => canvas.ellipse((x1, y1), corner, color, alpha),
            _ => canvas.rectangle((x1, y1), corner, color, alpha),
        }
    }
}

fn theme_overlay(canvas: &mut Canvas, rng: &mut StdRng, colors: &[Color], category: &str) {
    let (width, height) = (canvas.width(), canvas.height());
    match category {
        "Networks" => {
            for _ in 0..NETWORK_LINES {
                let color = *colors.choose(rng).unwrap_or(&BLACK);
                let from = (rng.gen_range(0..=width), rng.gen_range(0..=height));
                let to = (rng.gen_range(0..=width), rng.gen_range(0..=height));
                canvas.line(from, to, 1, color, 40);
            }
        }
        "Linux" => {
            for _ in 0..LINUX_SQUARES {
                let color = *colors.choose(rng).unwrap_or(&BLACK);
                let (x, y) = (rng.gen_range(0..=width), rng.gen_range(0..=height));
                canvas.rectangle((x, y), (x + 10, y + 10), color, 30);
            }
        }
        _ => {}
    }
}

fn wrapped_count(text: &str) -> usize {
    font::wrap(text, WRAP_WIDTH).len()
}

/// Draws `text` wrapped and centred on `center`, each line optionally over a
/// drop shadow. Returns the y of the first line.
fn draw_lines(
    canvas: &mut Canvas,
    text: &str,
    (center_x, center_y): (i64, i64),
    scale: u32,
    shadow: Option<(i64, u8)>,
) -> i64 {
    let lines = font::wrap(text, WRAP_WIDTH);
    let (_, line_height) = font::measure("", scale);
    let line_height = line_height as i64;
    let total = match lines.len() {
        0 => 0,
        n => n as i64 * line_height + (n as i64 - 1) * LINE_GAP,
    };

    let top = center_y - total / 2;
    let mut y = top;
    for line in &lines {
        let (line_width, _) = font::measure(line, scale);
        let x = center_x - line_width as i64 / 2;
        if let Some((offset, alpha)) = shadow {
            canvas.text(line, (x + offset, y + offset), scale, BLACK, alpha);
        }
        canvas.text(line, (x, y), scale, WHITE, 255);
        y += line_height + LINE_GAP;
    }
    top
}

fn draw_centered(
    canvas: &mut Canvas,
    text: &str,
    (center_x, y): (i64, i64),
    scale: u32,
    color: Color,
    alpha: u8,
) {
    let (width, _) = font::measure(text, scale);
    canvas.text(text, (center_x - width as i64 / 2, y), scale, color, alpha);
}

/// A stable 64-bit FNV-1a hash of the article id.
fn seed(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Writes `image` to `path`: PNG when the extension says so, otherwise JPEG.
pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })?;
    let mut writer = BufWriter::new(file);

    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    let encoded = match is_png {
        true => image.write_with_encoder(PngEncoder::new(&mut writer)),
        false => image.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)),
    };
    encoded.map_err(|err| Error::Encode {
        path: path.to_owned(),
        err,
    })?;
    writer.flush().map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

/// Regenerates the image of every article in the store and returns the
/// paths written. Image names that aren't a bare file name are skipped.
pub fn generate_all(config: &Config, mode: Mode) -> Result<Vec<PathBuf>> {
    let articles = store::Store::new(&config.store_path).load()?;
    let directory = config.images_directory();
    fs::create_dir_all(&directory).map_err(|err| Error::Write {
        path: directory.clone(),
        err,
    })?;

    let mut written = Vec::with_capacity(articles.len());
    for article in &articles {
        let image_file = article.image_file();
        let file_name = match Path::new(image_file.as_ref()).file_name() {
            Some(name) if name == image_file.as_ref() => name,
            _ => {
                log::warn!(
                    "skipping article `{}`: image name {:?} isn't a file name",
                    article.id,
                    image_file
                );
                continue;
            }
        };
        let path = directory.join(file_name);
        save(&render(article, mode, &config.tagline), &path)?;
        log::info!("created {} for article `{}`", path.display(), article.id);
        written.push(path);
    }
    Ok(written)
}

/// The result of a fallible image operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem generating images.
#[derive(Debug)]
pub enum Error {
    /// Returned when the store can't be read.
    Store(store::Error),

    /// Returned when the images directory or an image file can't be
    /// written.
    Write { path: PathBuf, err: io::Error },

    /// Returned when an image can't be encoded.
    Encode { path: PathBuf, err: ImageError },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Store(err) => err.fmt(f),
            Error::Write { path, err } => write!(f, "Writing `{}`: {}", path.display(), err),
            Error::Encode { path, err } => write!(f, "Encoding `{}`: {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Write { err, .. } => Some(err),
            Error::Encode { err, .. } => Some(err),
        }
    }
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Error {
        Error::Store(err)
    }
}
