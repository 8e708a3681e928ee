use fixed::types::I32F32;

/// A length in PDF points (1/72 inch), stored as fixed point so recorded
/// coordinates compare deterministically.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        let milli = milli as i128;
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_add(rhs.to_milli_i64()))
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_sub(rhs.to_milli_i64()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width: Pt::from_f32(width_pt),
            height: Pt::from_f32(height_pt),
        }
    }

    pub fn from_inches(width_in: f32, height_in: f32) -> Self {
        Self::new(width_in * 72.0, height_in * 72.0)
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self::new(width_mm * 72.0 / 25.4, height_mm * 72.0 / 25.4)
    }

    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub(crate) fn is_drawable(self) -> bool {
        let w = self.width.to_f32();
        let h = self.height.to_f32();
        w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Named page sizes, portrait dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageFormat {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
    A7,
    A8,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    Letter,
    Legal,
    Tabloid,
    Ledger,
    Executive,
    Custom(Size),
}

impl PageFormat {
    pub fn from_millimeters(width_mm: f32, height_mm: f32) -> Self {
        PageFormat::Custom(Size::from_mm(width_mm, height_mm))
    }

    pub fn from_inches(width_in: f32, height_in: f32) -> Self {
        PageFormat::Custom(Size::from_inches(width_in, height_in))
    }

    pub fn size(self) -> Size {
        let (w, h) = match self {
            PageFormat::A0 => (2384.0, 3370.0),
            PageFormat::A1 => (1684.0, 2384.0),
            PageFormat::A2 => (1191.0, 1684.0),
            PageFormat::A3 => (842.0, 1191.0),
            PageFormat::A4 => (595.0, 842.0),
            PageFormat::A5 => (420.0, 595.0),
            PageFormat::A6 => (298.0, 420.0),
            PageFormat::A7 => (210.0, 298.0),
            PageFormat::A8 => (148.0, 210.0),
            PageFormat::B0 => (2835.0, 4008.0),
            PageFormat::B1 => (2004.0, 2835.0),
            PageFormat::B2 => (1417.0, 2004.0),
            PageFormat::B3 => (1001.0, 1417.0),
            PageFormat::B4 => (709.0, 1001.0),
            PageFormat::B5 => (499.0, 709.0),
            PageFormat::Letter => (612.0, 792.0),
            PageFormat::Legal => (612.0, 1008.0),
            PageFormat::Tabloid => (792.0, 1224.0),
            PageFormat::Ledger => (1224.0, 792.0),
            PageFormat::Executive => (522.0, 756.0),
            PageFormat::Custom(size) => return size,
        };
        Size::new(w, h)
    }

    pub fn effective_size(self, orientation: Orientation) -> Size {
        match orientation {
            Orientation::Portrait => self.size(),
            Orientation::Landscape => self.size().swapped(),
        }
    }
}

/// Straight (non-premultiplied) RGBA with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (self.a * opacity).clamp(0.0, 1.0),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millimeter_and_inch_helpers_convert_to_points() {
        let a4 = Size::from_mm(210.0, 297.0);
        assert!((a4.width.to_f32() - 595.276).abs() < 0.01);
        assert!((a4.height.to_f32() - 841.89).abs() < 0.01);

        let letter = Size::from_inches(8.5, 11.0);
        assert_eq!(letter, PageFormat::Letter.size());
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let size = PageFormat::A4.effective_size(Orientation::Landscape);
        assert_eq!(size.width, Pt::from_f32(842.0));
        assert_eq!(size.height, Pt::from_f32(595.0));
    }

    #[test]
    fn pt_round_trips_milli_precision() {
        let v = Pt::from_f32(12.345);
        assert_eq!(v.to_milli_i64(), 12345);
        assert_eq!((v + Pt::from_f32(1.0)).to_milli_i64(), 13345);
        assert_eq!(v - v, Pt::ZERO);
    }

    #[test]
    fn opacity_scales_alpha_only() {
        let c = Rgba::new(0.2, 0.4, 0.6, 0.5).with_opacity(0.5);
        assert_eq!(c, Rgba::new(0.2, 0.4, 0.6, 0.25));
    }
}
