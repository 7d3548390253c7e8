//! Unit converter (C4).
//!
//! Constants and pure conversions between EMU, points, pixels, and the
//! percent/angle encodings OOXML uses for adjustment values and color
//! transforms. Grounded on the style-unit module's constant table, extended
//! with the degree and percent conversions this renderer additionally
//! needs.

pub const EMU_PER_INCH: i64 = 914_400;
pub const EMU_PER_POINT: i64 = 12_700;
pub const EMU_PER_CM: i64 = 360_000;
pub const ANGLE_UNIT_PER_DEGREE: f64 = 60_000.0;
pub const DEFAULT_DPI: f64 = 96.0;

/// EMU → pixels at the given DPI.
#[inline]
pub fn emu_to_px(emu: i64, dpi: f64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64 * dpi
}

/// Pixels → EMU at the given DPI.
#[inline]
pub fn px_to_emu(px: f64, dpi: f64) -> i64 {
    (px / dpi * EMU_PER_INCH as f64).round() as i64
}

#[inline]
pub fn emu_to_pt(emu: i64) -> f64 {
    emu as f64 / EMU_PER_POINT as f64
}

#[inline]
pub fn pt_to_emu(pt: f64) -> i64 {
    (pt * EMU_PER_POINT as f64).round() as i64
}

/// Hundredths-of-a-point (run font size unit) → points.
#[inline]
pub fn centipoints_to_pt(centipoints: i64) -> f64 {
    centipoints as f64 / 100.0
}

/// 60000ths-of-a-degree (rotation, hue offsets) → degrees.
#[inline]
pub fn angle_units_to_degrees(units: i64) -> f64 {
    units as f64 / ANGLE_UNIT_PER_DEGREE
}

#[inline]
pub fn degrees_to_angle_units(degrees: f64) -> i64 {
    (degrees * ANGLE_UNIT_PER_DEGREE).round() as i64
}

#[inline]
pub fn angle_units_to_radians(units: i64) -> f64 {
    angle_units_to_degrees(units).to_radians()
}

/// 100000ths-of-a-percent → decimal fraction. `percent_to_decimal(100000) ==
/// 1.0` exactly.
#[inline]
pub fn percent_to_decimal(hundred_thousandths: i64) -> f64 {
    hundred_thousandths as f64 / 100_000.0
}

#[inline]
pub fn decimal_to_percent(decimal: f64) -> i64 {
    (decimal * 100_000.0).round() as i64
}

/// Scale factors mapping slide EMU dimensions onto a target pixel canvas,
/// preserving aspect ratio when `target_h` is absent.
pub fn calc_scale(slide_w_emu: i64, slide_h_emu: i64, target_w: u32, target_h: Option<u32>) -> (f64, f64, u32, u32) {
    let slide_w_px = emu_to_px(slide_w_emu, DEFAULT_DPI);
    let slide_h_px = emu_to_px(slide_h_emu, DEFAULT_DPI);
    let scale_x = target_w as f64 / slide_w_px;
    let (scale_y, out_h) = match target_h {
        Some(h) => (h as f64 / slide_h_px, h),
        None => {
            let h = (slide_h_px * scale_x).round() as u32;
            (scale_x, h)
        }
    };
    (scale_x, scale_y, target_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_round_trip_exact_at_whole_values() {
        assert_eq!(percent_to_decimal(100_000), 1.0);
        assert_eq!(decimal_to_percent(1.0), 100_000);
    }

    #[test]
    fn emu_px_round_trip() {
        let emu = 914_400;
        let px = emu_to_px(emu, 96.0);
        assert_eq!(px, 96.0);
        assert_eq!(px_to_emu(px, 96.0), emu);
    }

    #[test]
    fn calc_scale_preserves_aspect_ratio_when_height_absent() {
        let (sx, sy, w, h) = calc_scale(9_144_000, 6_858_000, 1920, None);
        assert_eq!(w, 1920);
        assert_eq!(h, 1440);
        assert!((sx - sy).abs() < 1e-9);
    }
}
