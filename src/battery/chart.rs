//! Shared plotters helpers for the battery charts

use plotters::style::RGBColor;

/// Chart bitmap size; keeps artifacts small enough for vision requests.
pub const CHART_SIZE: (u32, u32) = (512, 512);

/// Palette cycled across columns and clusters.
pub const SERIES_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// Color for the nth series.
#[must_use]
pub fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

/// Map a correlation coefficient in [-1, 1] onto a blue-white-red ramp.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn heat_color(coefficient: f64) -> RGBColor {
    let c = if coefficient.is_nan() {
        0.0
    } else {
        coefficient.clamp(-1.0, 1.0)
    };
    if c >= 0.0 {
        // White → red
        let t = c;
        RGBColor(255, (255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8)
    } else {
        // White → blue
        let t = -c;
        RGBColor((255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_color_endpoints() {
        assert_eq!(heat_color(1.0), RGBColor(255, 0, 0));
        assert_eq!(heat_color(-1.0), RGBColor(0, 0, 255));
        assert_eq!(heat_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(heat_color(f64::NAN), RGBColor(255, 255, 255));
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(series_color(0), series_color(SERIES_COLORS.len()));
    }
}
