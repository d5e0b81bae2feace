//! Conversions between the three coordinate spaces an element lives in.
//!
//! Normalized coordinates are fractions of the page (top-left origin) and are
//! the only persisted geometry. Pixel coordinates belong to a rendering surface
//! of known size. Export space is the PDF page space, origin bottom-left.
//!
//! Nothing here clamps or rejects input: off-page elements are legal and are
//! clipped at export time, and non-finite values propagate unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Flips this top-left rectangle into export space for a page of `page_height`.
    pub fn to_export(self, page_height: f64) -> ExportRect {
        to_export_rect(self.x, self.y, self.width, self.height, page_height)
    }
}

/// Bottom-left anchored rectangle in export space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormRect {
    pub x: f64,
    pub y_top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormRect {
    pub fn to_pixels(self, surface: SurfaceSize) -> PixelRect {
        let (x, y) = to_pixel(self.x, self.y_top, surface.width, surface.height);
        PixelRect { x, y, width: self.width * surface.width, height: self.height * surface.height }
    }
}

pub fn to_pixel(norm_x: f64, norm_y: f64, surface_width: f64, surface_height: f64) -> (f64, f64) {
    (norm_x * surface_width, norm_y * surface_height)
}

/// Inverse of [`to_pixel`]. A zero-sized surface yields non-finite output.
pub fn to_normalized(px: f64, py: f64, surface_width: f64, surface_height: f64) -> (f64, f64) {
    (px / surface_width, py / surface_height)
}

pub fn to_export_space(px: f64, py_top: f64, page_height: f64) -> (f64, f64) {
    (px, page_height - py_top)
}

/// Flips a top-left rectangle so its bottom edge lands at the right export-space y.
pub fn to_export_rect(x: f64, y_top: f64, width: f64, height: f64, page_height: f64) -> ExportRect {
    let (ex, ey) = to_export_space(x, y_top, page_height);
    ExportRect { x: ex, y: ey - height, width, height }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pixel_mapping_scales_without_clamping() {
        assert_eq!(to_pixel(0.5, 0.25, 800.0, 1000.0), (400.0, 250.0));
        assert_eq!(to_pixel(-0.25, 1.5, 100.0, 100.0), (-25.0, 150.0));
    }

    #[test]
    fn export_rect_subtracts_height() {
        let rect = to_export_rect(10.0, 20.0, 100.0, 50.0, 842.0);
        assert_eq!(rect, ExportRect { x: 10.0, y: 772.0, width: 100.0, height: 50.0 });
    }

    #[test]
    fn non_finite_input_propagates() {
        let (x, y) = to_pixel(f64::NAN, f64::INFINITY, 595.0, 842.0);
        assert!(x.is_nan());
        assert!(y.is_infinite());

        let (_, ey) = to_export_space(0.0, f64::NAN, 842.0);
        assert!(ey.is_nan());
    }

    #[test]
    fn norm_rect_to_export_matches_component_calls() {
        let surface = SurfaceSize::new(595.0, 842.0);
        let norm = NormRect { x: 0.1, y_top: 0.2, width: 0.3, height: 0.1 };

        let pixels = norm.to_pixels(surface);
        let export = pixels.to_export(surface.height);

        let expected = to_export_rect(pixels.x, pixels.y, pixels.width, pixels.height, 842.0);
        assert_eq!(export, expected);
    }

    proptest! {
        #[test]
        fn pixel_round_trip_recovers_normalized(
            nx in -2.0f64..3.0,
            ny in -2.0f64..3.0,
            w in 1.0f64..4000.0,
            h in 1.0f64..4000.0,
        ) {
            let (px, py) = to_pixel(nx, ny, w, h);
            let (rx, ry) = to_normalized(px, py, w, h);
            prop_assert!((rx - nx).abs() < 1e-9);
            prop_assert!((ry - ny).abs() < 1e-9);
        }

        #[test]
        fn export_flip_is_an_involution(
            px in -1000.0f64..1000.0,
            py in -1000.0f64..1000.0,
            page_h in 1.0f64..2000.0,
        ) {
            let (ex, ey) = to_export_space(px, py, page_h);
            let (bx, by) = to_export_space(ex, ey, page_h);
            prop_assert_eq!(bx, px);
            prop_assert!((by - py).abs() < 1e-9);
        }
    }
}
