//! Category colours for generated header images.

/// An RGB triple.
pub type Color = [u8; 3];

/// Two-colour vertical gradients for artistic images, top then bottom.
const GRADIENTS: &[(&str, (Color, Color))] = &[
    ("Networks", ([20, 80, 120], [40, 120, 180])),
    ("Automotive", ([100, 80, 60], [140, 110, 90])),
    ("Aviation", ([60, 70, 80], [110, 120, 130])),
    ("Linux", ([200, 80, 40], [230, 120, 60])),
    ("Python", ([50, 100, 150], [80, 130, 190])),
    ("Embedded", ([70, 70, 70], [110, 110, 110])),
];

const DEFAULT_GRADIENT: (Color, Color) = ([80, 80, 80], [120, 120, 120]);

/// Flat backgrounds for simple images.
const FLAT: &[(&str, Color)] = &[
    ("Networks", [34, 139, 34]),
    ("Automotive", [139, 69, 19]),
    ("Aviation", [70, 130, 180]),
    ("Linux", [233, 84, 32]),
    ("Python", [55, 118, 171]),
    ("Embedded", [128, 128, 128]),
];

/// Steel blue.
const DEFAULT_FLAT: Color = [70, 130, 180];

/// The gradient for `category`, gray when the category isn't known.
pub fn gradient(category: &str) -> (Color, Color) {
    GRADIENTS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, colors)| *colors)
        .unwrap_or(DEFAULT_GRADIENT)
}

/// The flat background for `category`.
pub fn flat(category: &str) -> Color {
    FLAT.iter()
        .find(|(name, _)| *name == category)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_FLAT)
}

/// Linear interpolation between `start` and `end`; `ratio` runs from 0 to
/// 1. Channels are truncated, not rounded.
pub fn mix(start: Color, end: Color, ratio: f64) -> Color {
    let channel = |i: usize| (start[i] as f64 * (1.0 - ratio) + end[i] as f64 * ratio) as u8;
    [channel(0), channel(1), channel(2)]
}

/// The five shape colours drawn over a gradient: both ends and three evenly
/// spaced stops between them.
pub fn shape_colors(start: Color, end: Color) -> [Color; 5] {
    [0.0, 0.25, 0.5, 0.75, 1.0].map(|ratio| mix(start, end, ratio))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup_falls_back() {
        assert_eq!(([200, 80, 40], [230, 120, 60]), gradient("Linux"));
        assert_eq!(DEFAULT_GRADIENT, gradient("Cooking"));
        assert_eq!([55, 118, 171], flat("Python"));
        assert_eq!(DEFAULT_FLAT, flat("Cooking"));
    }

    #[test]
    fn test_shape_colors() {
        let colors = shape_colors([0, 0, 0], [100, 200, 255]);
        assert_eq!([0, 0, 0], colors[0]);
        assert_eq!([50, 100, 127], colors[2]);
        assert_eq!([100, 200, 255], colors[4]);
    }
}
