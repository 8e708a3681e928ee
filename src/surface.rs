use crate::error::Result;
use crate::path::PathSeg;
use crate::raster::DecodedImage;
use crate::style::Matrix;
use crate::types::{Rgba, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YAxis {
    #[default]
    TopDown,
    /// Origin at the bottom-left. Images are placed by their bottom edge measured
    /// from the bottom of the page.
    BottomUp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub families: Vec<String>,
    pub size: f32,
    pub bold: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            families: Vec::new(),
            size: 12.0,
            bold: false,
        }
    }
}

/// Page-sized drawing target. All coordinates are in the current user space, which the
/// renderer establishes through `concat_matrix`.
pub trait Surface {
    fn y_axis(&self) -> YAxis {
        YAxis::TopDown
    }

    fn save(&mut self);
    fn restore(&mut self);
    fn concat_matrix(&mut self, m: Matrix);
    fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn fill_path(&mut self, path: &[PathSeg], color: Rgba);
    fn stroke_path(&mut self, path: &[PathSeg], color: Rgba, width: f32);
    fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, width: f32, height: f32);
    fn draw_text(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, color: Rgba);
}

pub trait PageSink {
    type Surface: Surface;
    type Output;

    fn begin_page(&mut self, index: usize, size: Size) -> Result<Self::Surface>;
    fn end_page(&mut self, surface: Self::Surface) -> Result<()>;
    fn finish(self) -> Result<Self::Output>
    where
        Self: Sized;
}

pub fn rect_path(x: f32, y: f32, width: f32, height: f32) -> Vec<PathSeg> {
    vec![
        PathSeg::MoveTo(x, y),
        PathSeg::LineTo(x + width, y),
        PathSeg::LineTo(x + width, y + height),
        PathSeg::LineTo(x, y + height),
        PathSeg::Close,
    ]
}

pub fn ellipse_path(x: f32, y: f32, width: f32, height: f32) -> Vec<PathSeg> {
    const KAPPA: f32 = 0.552_284_8;
    let rx = width / 2.0;
    let ry = height / 2.0;
    let cx = x + rx;
    let cy = y + ry;
    let ox = rx * KAPPA;
    let oy = ry * KAPPA;
    vec![
        PathSeg::MoveTo(cx + rx, cy),
        PathSeg::CurveTo(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry),
        PathSeg::CurveTo(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy),
        PathSeg::CurveTo(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry),
        PathSeg::CurveTo(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy),
        PathSeg::Close,
    ]
}
