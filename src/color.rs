use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit colours
// ---------------------------------------------------------------------------

/// One distinct colour per unit of the loaded series.
#[derive(Debug, Clone)]
pub struct ColorMap {
    colors: Vec<Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(num_units: usize) -> Self {
        ColorMap {
            colors: generate_palette(num_units),
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, unit: usize) -> Color32 {
        self.colors
            .get(unit)
            .copied()
            .unwrap_or(self.default_color)
    }
}
