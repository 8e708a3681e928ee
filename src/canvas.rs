use crate::error::Result;
use crate::path::PathSeg;
use crate::raster::DecodedImage;
use crate::style::Matrix;
use crate::surface::{FontSpec, PageSink, Surface, YAxis};
use crate::types::{Pt, Rgba, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Save,
    Restore,
    ConcatMatrix(Matrix),
    ClipRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    FillPath {
        segments: Vec<PathSeg>,
        color: Rgba,
    },
    StrokePath {
        segments: Vec<PathSeg>,
        color: Rgba,
        width: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        pixel_width: u32,
        pixel_height: u32,
    },
    DrawText {
        text: String,
        x: Pt,
        y: Pt,
        font: FontSpec,
        color: Rgba,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub size: Size,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone)]
pub struct Canvas {
    index: usize,
    size: Size,
    y_axis: YAxis,
    commands: Vec<Command>,
    depth: usize,
}

impl Canvas {
    pub fn new(size: Size) -> Self {
        Self {
            index: 0,
            size,
            y_axis: YAxis::TopDown,
            commands: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_y_axis(mut self, y_axis: YAxis) -> Self {
        self.y_axis = y_axis;
        self
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn into_page(self) -> Page {
        Page {
            index: self.index,
            size: self.size,
            commands: self.commands,
        }
    }
}

impl Surface for Canvas {
    fn y_axis(&self) -> YAxis {
        self.y_axis
    }

    fn save(&mut self) {
        self.depth += 1;
        self.commands.push(Command::Save);
    }

    fn restore(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
            self.commands.push(Command::Restore);
        }
    }

    fn concat_matrix(&mut self, m: Matrix) {
        self.commands.push(Command::ConcatMatrix(m));
    }

    fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(Command::ClipRect {
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
        });
    }

    fn fill_path(&mut self, path: &[PathSeg], color: Rgba) {
        self.commands.push(Command::FillPath {
            segments: path.to_vec(),
            color,
        });
    }

    fn stroke_path(&mut self, path: &[PathSeg], color: Rgba, width: f32) {
        self.commands.push(Command::StrokePath {
            segments: path.to_vec(),
            color,
            width: Pt::from_f32(width.max(0.0)),
        });
    }

    fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(Command::DrawImage {
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
            pixel_width: image.width,
            pixel_height: image.height,
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, color: Rgba) {
        self.commands.push(Command::DrawText {
            text: text.to_string(),
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
            font: font.clone(),
            color,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanvasSink {
    y_axis: YAxis,
    document: Document,
}

impl CanvasSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_y_axis(y_axis: YAxis) -> Self {
        Self {
            y_axis,
            document: Document::default(),
        }
    }
}

impl PageSink for CanvasSink {
    type Surface = Canvas;
    type Output = Document;

    fn begin_page(&mut self, index: usize, size: Size) -> Result<Canvas> {
        let mut canvas = Canvas::new(size).with_y_axis(self.y_axis);
        canvas.index = index;
        Ok(canvas)
    }

    fn end_page(&mut self, surface: Canvas) -> Result<()> {
        self.document.pages.push(surface.into_page());
        Ok(())
    }

    fn finish(self) -> Result<Document> {
        Ok(self.document)
    }
}
