use std::collections::BTreeMap;
use std::fmt::Write as _;

use lopdf::{Document as LoDocument, Object as LoObject, ObjectId as LoObjectId, Stream as LoStream, dictionary};

use crate::error::{PageSceneError, Result};
use crate::path::PathSeg;
use crate::raster::DecodedImage;
use crate::style::Matrix;
use crate::surface::{FontSpec, PageSink, Surface};
use crate::types::{Pt, Rgba, Size};

const PDF_VERSION: &str = "1.5";
const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

fn lopdf_err(err: lopdf::Error) -> PageSceneError {
    PageSceneError::writer(format!("pdf error: {err}"))
}

#[derive(Debug)]
pub struct PdfSurface {
    size: Size,
    content: String,
    images: Vec<DecodedImage>,
    /// Alpha pairs (fill, stroke) in milli units, keyed to their ExtGState names.
    alpha_states: BTreeMap<(i64, i64), String>,
    depth: usize,
}

impl PdfSurface {
    pub fn new(size: Size) -> Self {
        let mut content = String::new();
        let _ = writeln!(content, "1 0 0 -1 0 {} cm", fmt_pt(size.height));
        Self {
            size,
            content,
            images: Vec::new(),
            alpha_states: BTreeMap::new(),
            depth: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    fn alpha_state(&mut self, fill: f32, stroke: f32) -> Option<String> {
        let key = (
            Pt::from_f32(fill.clamp(0.0, 1.0)).to_milli_i64(),
            Pt::from_f32(stroke.clamp(0.0, 1.0)).to_milli_i64(),
        );
        if key == (1000, 1000) {
            return None;
        }
        let next = self.alpha_states.len() + 1;
        Some(
            self.alpha_states
                .entry(key)
                .or_insert_with(|| format!("GS{next}"))
                .clone(),
        )
    }

    fn begin_paint(&mut self, fill: Option<Rgba>, stroke: Option<Rgba>) {
        let state = self.alpha_state(
            fill.map(|c| c.a).unwrap_or(1.0),
            stroke.map(|c| c.a).unwrap_or(1.0),
        );
        self.content.push_str("q\n");
        if let Some(name) = state {
            let _ = writeln!(self.content, "/{name} gs");
        }
        if let Some(c) = fill {
            let _ = writeln!(self.content, "{} rg", fmt_rgb(c));
        }
        if let Some(c) = stroke {
            let _ = writeln!(self.content, "{} RG", fmt_rgb(c));
        }
    }

    fn push_path(&mut self, path: &[PathSeg]) {
        for seg in path {
            let _ = match *seg {
                PathSeg::MoveTo(x, y) => writeln!(self.content, "{} {} m", fmt(x), fmt(y)),
                PathSeg::LineTo(x, y) => writeln!(self.content, "{} {} l", fmt(x), fmt(y)),
                PathSeg::CurveTo(x1, y1, x2, y2, x, y) => writeln!(
                    self.content,
                    "{} {} {} {} {} {} c",
                    fmt(x1),
                    fmt(y1),
                    fmt(x2),
                    fmt(y2),
                    fmt(x),
                    fmt(y)
                ),
                PathSeg::Close => writeln!(self.content, "h"),
            };
        }
    }

    fn write_page(
        self,
        doc: &mut LoDocument,
        pages_id: LoObjectId,
        fonts: &FontIds,
    ) -> Result<LoObjectId> {
        let mut xobjects = lopdf::Dictionary::new();
        for (idx, image) in self.images.iter().enumerate() {
            let id = add_image_object(doc, image);
            xobjects.set(format!("Im{}", idx + 1), id);
        }

        let mut gstates = lopdf::Dictionary::new();
        for ((fill, stroke), name) in &self.alpha_states {
            let id = doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "ca" => *fill as f32 / 1000.0,
                "CA" => *stroke as f32 / 1000.0,
            });
            gstates.set(name.as_str(), id);
        }

        if self.depth > 0 {
            log::warn!("closing {} unbalanced graphics state(s) at page end", self.depth);
        }
        let mut content = self.content;
        for _ in 0..self.depth {
            content.push_str("Q\n");
        }

        let content_id = doc.add_object(LoStream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    REGULAR_FONT => fonts.regular,
                    BOLD_FONT => fonts.bold,
                },
                "XObject" => xobjects,
                "ExtGState" => gstates,
            },
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.size.width.to_f32().into(),
                self.size.height.to_f32().into(),
            ],
        });
        Ok(page_id)
    }
}

impl Surface for PdfSurface {
    fn save(&mut self) {
        self.depth += 1;
        self.content.push_str("q\n");
    }

    fn restore(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
            self.content.push_str("Q\n");
        }
    }

    fn concat_matrix(&mut self, m: Matrix) {
        let _ = writeln!(
            self.content,
            "{} {} {} {} {} {} cm",
            fmt_coef(m.a),
            fmt_coef(m.b),
            fmt_coef(m.c),
            fmt_coef(m.d),
            fmt(m.e),
            fmt(m.f)
        );
    }

    fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(
            self.content,
            "{} {} {} {} re W n",
            fmt(x),
            fmt(y),
            fmt(width),
            fmt(height)
        );
    }

    fn fill_path(&mut self, path: &[PathSeg], color: Rgba) {
        if path.is_empty() || color.a <= 0.0 {
            return;
        }
        self.begin_paint(Some(color), None);
        self.push_path(path);
        self.content.push_str("f\nQ\n");
    }

    fn stroke_path(&mut self, path: &[PathSeg], color: Rgba, width: f32) {
        if path.is_empty() || color.a <= 0.0 || width <= 0.0 {
            return;
        }
        self.begin_paint(None, Some(color));
        let _ = writeln!(self.content, "{} w", fmt(width));
        self.push_path(path);
        self.content.push_str("S\nQ\n");
    }

    fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.images.push(image.clone());
        let name = format!("Im{}", self.images.len());
        // Image space has its top row at y=1; map it to the top edge of the box.
        let _ = writeln!(
            self.content,
            "q {} 0 0 {} {} {} cm /{} Do Q",
            fmt(width),
            fmt(-height),
            fmt(x),
            fmt(y + height),
            name
        );
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, color: Rgba) {
        if text.is_empty() || color.a <= 0.0 {
            return;
        }
        let encoded = encode_winansi(text);
        if encoded.replaced > 0 {
            log::debug!(
                "{} character(s) outside WinAnsi replaced in text run",
                encoded.replaced
            );
        }
        let font_name = if font.bold { BOLD_FONT } else { REGULAR_FONT };
        self.begin_paint(Some(color), None);
        let _ = writeln!(
            self.content,
            "BT /{} {} Tf 1 0 0 -1 {} {} Tm ({}) Tj ET\nQ",
            font_name,
            fmt(font.size),
            fmt(x),
            fmt(y),
            encoded.text
        );
    }
}

struct FontIds {
    regular: LoObjectId,
    bold: LoObjectId,
}

impl FontIds {
    fn add_to(doc: &mut LoDocument) -> Self {
        let mut font = |base: &str| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            })
        };
        let regular = font("Helvetica");
        let bold = font("Helvetica-Bold");
        Self { regular, bold }
    }
}

fn add_image_object(doc: &mut LoDocument, image: &DecodedImage) -> LoObjectId {
    let (rgb, alpha) = image.split_alpha();
    let smask = image.has_alpha().then(|| {
        doc.add_object(LoStream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ))
    });
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(id) = smask {
        dict.set("SMask", id);
    }
    doc.add_object(LoStream::new(dict, rgb))
}

fn finish_document(
    mut doc: LoDocument,
    pages_id: LoObjectId,
    kids: Vec<LoObjectId>,
) -> Result<Vec<u8>> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(LoObject::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

pub struct DirectPdfSink {
    doc: LoDocument,
    pages_id: LoObjectId,
    fonts: FontIds,
    kids: Vec<LoObjectId>,
}

impl DirectPdfSink {
    pub fn new() -> Self {
        let mut doc = LoDocument::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        let fonts = FontIds::add_to(&mut doc);
        Self {
            doc,
            pages_id,
            fonts,
            kids: Vec::new(),
        }
    }
}

impl Default for DirectPdfSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSink for DirectPdfSink {
    type Surface = PdfSurface;
    type Output = Vec<u8>;

    fn begin_page(&mut self, _index: usize, size: Size) -> Result<PdfSurface> {
        Ok(PdfSurface::new(size))
    }

    fn end_page(&mut self, surface: PdfSurface) -> Result<()> {
        let page_id = surface.write_page(&mut self.doc, self.pages_id, &self.fonts)?;
        self.kids.push(page_id);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        finish_document(self.doc, self.pages_id, self.kids)
    }
}

#[derive(Debug, Default)]
pub struct MergePdfSink {
    parts: Vec<Vec<u8>>,
}

impl MergePdfSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }
}

impl PageSink for MergePdfSink {
    type Surface = PdfSurface;
    type Output = Vec<u8>;

    fn begin_page(&mut self, _index: usize, size: Size) -> Result<PdfSurface> {
        Ok(PdfSurface::new(size))
    }

    fn end_page(&mut self, surface: PdfSurface) -> Result<()> {
        let mut doc = LoDocument::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        let fonts = FontIds::add_to(&mut doc);
        let page_id = surface.write_page(&mut doc, pages_id, &fonts)?;
        self.parts.push(finish_document(doc, pages_id, vec![page_id])?);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        merge_pdfs(&self.parts)
    }
}

pub fn merge_pdfs(parts: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut merged = LoDocument::with_version(PDF_VERSION);
    let pages_id = merged.new_object_id();
    let mut kids = Vec::new();

    for bytes in parts {
        let mut src = LoDocument::load_mem(bytes).map_err(lopdf_err)?;
        if src.is_encrypted() {
            return Err(PageSceneError::writer("page part is encrypted"));
        }
        src.renumber_objects_with(merged.max_id + 1);
        let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
        merged.max_id = merged.max_id.max(src.max_id);
        merged.objects.extend(src.objects);
        for page_id in page_ids {
            let page = merged
                .get_object_mut(page_id)
                .and_then(LoObject::as_dict_mut)
                .map_err(lopdf_err)?;
            page.set("Parent", pages_id);
            kids.push(page_id);
        }
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(LoObject::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();
    let mut out = Vec::new();
    merged.save_to(&mut out)?;
    Ok(out)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.unsigned_abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let frac = format!("{frac_part:03}");
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn fmt(value: f32) -> String {
    fmt_pt(Pt::from_f32(value))
}

fn fmt_coef(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{value:.5}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn fmt_rgb(c: Rgba) -> String {
    format!(
        "{} {} {}",
        fmt_coef(c.r.clamp(0.0, 1.0)),
        fmt_coef(c.g.clamp(0.0, 1.0)),
        fmt_coef(c.b.clamp(0.0, 1.0))
    )
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' | '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => {
                replaced += 1;
                b'?'
            }
        };
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => {
                let _ = write!(out, "\\{b:03o}");
            }
            b => out.push(b as char),
        }
    }
    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::rect_path;

    fn page_contents(bytes: &[u8]) -> Vec<String> {
        let mut doc = LoDocument::load_mem(bytes).expect("load pdf");
        doc.decompress();
        doc.get_pages()
            .values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).expect("content")).into_owned())
            .collect()
    }

    fn write_pages<S: PageSink<Surface = PdfSurface, Output = Vec<u8>>>(mut sink: S) -> Vec<u8> {
        for index in 0..3 {
            let mut page = sink.begin_page(index, Size::new(200.0, 100.0)).unwrap();
            page.draw_text(
                &format!("page {index}"),
                10.0,
                20.0,
                &FontSpec::default(),
                Rgba::BLACK,
            );
            sink.end_page(page).unwrap();
        }
        sink.finish().unwrap()
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(-1500), "-1.5");
        assert_eq!(format_milli(12_340), "12.34");
        assert_eq!(fmt_coef(0.5), "0.5");
        assert_eq!(fmt_coef(-0.0), "0");
        assert_eq!(fmt_coef(2.0), "2");
    }

    #[test]
    fn page_starts_flipped_to_top_down() {
        let surface = PdfSurface::new(Size::new(200.0, 100.0));
        assert!(surface.content().starts_with("1 0 0 -1 0 100 cm"));
    }

    #[test]
    fn translucent_fill_uses_shared_extgstate() {
        let mut surface = PdfSurface::new(Size::new(10.0, 10.0));
        let half = Rgba::new(1.0, 0.0, 0.0, 0.5);
        surface.fill_path(&rect_path(0.0, 0.0, 1.0, 1.0), half);
        surface.fill_path(&rect_path(2.0, 0.0, 1.0, 1.0), half);
        surface.fill_path(&rect_path(4.0, 0.0, 1.0, 1.0), Rgba::BLACK);
        assert_eq!(surface.alpha_states.len(), 1);
        assert_eq!(surface.content().matches("/GS1 gs").count(), 2);
        assert!(surface.content().contains("1 0 0 rg\n0 0 m\n1 0 l"));
    }

    #[test]
    fn invisible_paint_is_not_written() {
        let mut surface = PdfSurface::new(Size::new(10.0, 10.0));
        let before = surface.content().len();
        surface.fill_path(&rect_path(0.0, 0.0, 1.0, 1.0), Rgba::TRANSPARENT);
        surface.stroke_path(&rect_path(0.0, 0.0, 1.0, 1.0), Rgba::BLACK, 0.0);
        surface.draw_text("", 0.0, 0.0, &FontSpec::default(), Rgba::BLACK);
        assert_eq!(surface.content().len(), before);
    }

    #[test]
    fn text_is_escaped_and_uses_bold_face() {
        let mut surface = PdfSurface::new(Size::new(10.0, 10.0));
        let font = FontSpec {
            bold: true,
            size: 9.0,
            ..FontSpec::default()
        };
        surface.draw_text("a(b)\u{4e2d}", 1.0, 2.0, &font, Rgba::BLACK);
        assert!(surface
            .content()
            .contains("BT /F2 9 Tf 1 0 0 -1 1 2 Tm (a\\(b\\)?) Tj ET"));
    }

    #[test]
    fn direct_sink_writes_pages_in_order() {
        let bytes = write_pages(DirectPdfSink::new());
        let contents = page_contents(&bytes);
        assert_eq!(contents.len(), 3);
        for (index, content) in contents.iter().enumerate() {
            assert!(content.contains(&format!("(page {index}) Tj")));
        }
    }

    #[test]
    fn merge_sink_matches_direct_page_plan() {
        let mut sink = MergePdfSink::new();
        let page = sink.begin_page(0, Size::new(10.0, 10.0)).unwrap();
        sink.end_page(page).unwrap();
        assert_eq!(sink.parts().len(), 1);

        let bytes = write_pages(MergePdfSink::new());
        let contents = page_contents(&bytes);
        assert_eq!(contents.len(), 3);
        for (index, content) in contents.iter().enumerate() {
            assert!(content.contains(&format!("(page {index}) Tj")));
        }
    }

    #[test]
    fn images_embed_with_soft_mask_when_translucent() {
        let mut surface = PdfSurface::new(Size::new(10.0, 10.0));
        let image = DecodedImage {
            width: 1,
            height: 1,
            rgba: vec![255, 0, 0, 128],
        };
        surface.draw_image(&image, 1.0, 2.0, 3.0, 4.0);
        assert!(surface.content().contains("q 3 0 0 -4 1 6 cm /Im1 Do Q"));

        let mut sink = DirectPdfSink::new();
        sink.end_page(surface).unwrap();
        let bytes = sink.finish().unwrap();
        let doc = LoDocument::load_mem(&bytes).expect("load");
        let has_smask = doc.objects.values().any(|obj| {
            obj.as_stream()
                .map(|s| s.dict.get(b"SMask").is_ok())
                .unwrap_or(false)
        });
        assert!(has_smask);
    }
}
