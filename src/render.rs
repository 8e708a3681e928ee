use std::collections::HashMap;

use crate::path::{PathSeg, parse_path_data};
use crate::raster::decode_image_href;
use crate::scene::{NodeKind, SceneNode};
use crate::style::{
    Matrix, PaintState, ViewBox, parse_first_number, parse_length, parse_number_list,
    parse_transform,
};
use crate::surface::{FontSpec, Surface, YAxis, ellipse_path, rect_path};
use crate::types::Rgba;

pub const MAX_USE_DEPTH: usize = 32;
pub const MAX_USE_EXPANSIONS: usize = 4096;

const LINE_HEIGHT_FACTOR: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub page_width: f32,
    pub page_height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    /// Missing or external targets, cycles, and replays past the depth or expansion cap.
    pub unresolved_uses: usize,
    pub skipped: usize,
}

pub fn render_scene(
    root: &SceneNode,
    surface: &mut dyn Surface,
    opts: RenderOptions,
) -> RenderStats {
    let mut walker = Walker::new(surface, opts);
    let base = match root.attr("viewBox").and_then(ViewBox::parse) {
        Some(vb) => {
            walker.reference = (vb.width, vb.height);
            vb.to_page(opts.page_width, opts.page_height)
        }
        None => Matrix::identity(),
    };
    let drawn = walker.scoped(base, None, |w| w.visit(root));
    walker.stats.drawn = drawn;
    walker.stats
}

struct Frame {
    ctm: Matrix,
    paint: PaintState,
}

struct Fragment {
    text: String,
    x: f32,
    y: f32,
    positions: Option<Vec<f32>>,
    font: FontSpec,
    color: Rgba,
}

struct Walker<'a, 's> {
    surface: &'s mut dyn Surface,
    /// User-space width and height. Percentages resolve against it and bottom-up
    /// surfaces flip images against its height.
    reference: (f32, f32),
    stack: Vec<Frame>,
    defs: HashMap<&'a str, &'a SceneNode>,
    replaying: Vec<&'a str>,
    expansions: usize,
    stats: RenderStats,
}

impl<'a, 's> Walker<'a, 's> {
    fn new(surface: &'s mut dyn Surface, opts: RenderOptions) -> Self {
        Self {
            surface,
            reference: (opts.page_width, opts.page_height),
            stack: vec![Frame {
                ctm: Matrix::identity(),
                paint: PaintState::default(),
            }],
            defs: HashMap::new(),
            replaying: Vec::new(),
            expansions: 0,
            stats: RenderStats::default(),
        }
    }

    fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn top(&self) -> &Frame {
        // The base frame is pushed in `new` and never popped.
        &self.stack[self.stack.len() - 1]
    }

    fn scoped<R>(
        &mut self,
        local: Matrix,
        node: Option<&SceneNode>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let top = self.top();
        let frame = Frame {
            ctm: top.ctm.mul(local),
            paint: match node {
                Some(node) => top.paint.derive(node),
                None => top.paint.clone(),
            },
        };
        self.surface.save();
        if !local.is_identity() {
            self.surface.concat_matrix(local);
        }
        self.stack.push(frame);

        let out = f(self);

        self.stack.pop();
        self.surface.restore();
        out
    }

    fn visit(&mut self, node: &'a SceneNode) -> usize {
        if node.kind == NodeKind::Definition {
            self.collect_defs(node);
            return 0;
        }
        let local = node
            .attr("transform")
            .map(parse_transform)
            .unwrap_or_default();

        self.scoped(local, Some(node), |w| {
            let drawn = match node.kind {
                NodeKind::Rect => w.draw_rect(node),
                NodeKind::Path => w.draw_path(node),
                NodeKind::Circle => w.draw_circle(node),
                NodeKind::Line => w.draw_line(node),
                NodeKind::Image => w.draw_image(node),
                NodeKind::Use => w.draw_use(node),
                // Spans belong to their text element and are not descended into.
                NodeKind::Text => return usize::from(w.draw_text(node)),
                NodeKind::Other => {
                    w.stats.skipped += 1;
                    false
                }
                NodeKind::Group | NodeKind::TextSpan | NodeKind::Definition => false,
            };
            let mut count = usize::from(drawn);
            for child in &node.children {
                count += w.visit(child);
            }
            count
        })
    }

    fn collect_defs(&mut self, node: &'a SceneNode) {
        for child in &node.children {
            if let Some(id) = child.id() {
                self.defs.insert(id, child);
            }
            self.collect_defs(child);
        }
    }

    fn len_x(&self, node: &SceneNode, name: &str) -> f32 {
        node.attr(name)
            .and_then(|v| parse_length(v, Some(self.reference.0)))
            .unwrap_or(0.0)
    }

    fn len_y(&self, node: &SceneNode, name: &str) -> f32 {
        node.attr(name)
            .and_then(|v| parse_length(v, Some(self.reference.1)))
            .unwrap_or(0.0)
    }

    fn fill_and_stroke(&mut self, path: &[PathSeg]) {
        let paint = &self.top().paint;
        let fill = paint.effective_fill();
        let stroke = paint.effective_stroke();
        let width = paint.stroke_width;
        if let Some(color) = fill {
            self.surface.fill_path(path, color);
        }
        if let Some(color) = stroke {
            self.surface.stroke_path(path, color, width);
        }
    }

    fn draw_rect(&mut self, node: &SceneNode) -> bool {
        let width = self.len_x(node, "width");
        let height = self.len_y(node, "height");
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let x = self.len_x(node, "x");
        let y = self.len_y(node, "y");
        self.fill_and_stroke(&rect_path(x, y, width, height));
        true
    }

    fn draw_path(&mut self, node: &SceneNode) -> bool {
        let Some(d) = node.attr("d") else {
            return false;
        };
        let parsed = parse_path_data(d);
        if parsed.skipped > 0 {
            log::warn!(
                "path dropped {} unsupported or incomplete command(s)",
                parsed.skipped
            );
        }
        if parsed.segments.is_empty() {
            return false;
        }
        self.fill_and_stroke(&parsed.segments);
        true
    }

    fn draw_circle(&mut self, node: &SceneNode) -> bool {
        let (rw, rh) = self.reference;
        let diagonal = ((rw * rw + rh * rh) / 2.0).sqrt();
        let r = node
            .attr("r")
            .and_then(|v| parse_length(v, Some(diagonal)))
            .unwrap_or(0.0);
        if r <= 0.0 {
            return false;
        }
        let cx = self.len_x(node, "cx");
        let cy = self.len_y(node, "cy");
        self.fill_and_stroke(&ellipse_path(cx - r, cy - r, r * 2.0, r * 2.0));
        true
    }

    fn draw_line(&mut self, node: &SceneNode) -> bool {
        let x1 = self.len_x(node, "x1");
        let y1 = self.len_y(node, "y1");
        let x2 = self.len_x(node, "x2");
        let y2 = self.len_y(node, "y2");
        let paint = &self.top().paint;
        let width = paint.stroke_width;
        let Some(color) = paint.effective_stroke_or(Rgba::BLACK) else {
            return false;
        };
        let path = [PathSeg::MoveTo(x1, y1), PathSeg::LineTo(x2, y2)];
        self.surface.stroke_path(&path, color, width);
        true
    }

    fn draw_image(&mut self, node: &SceneNode) -> bool {
        let width = self.len_x(node, "width");
        let height = self.len_y(node, "height");
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let Some(href) = node.attr("href").or_else(|| node.attr("xlink:href")) else {
            return false;
        };
        let Some(image) = decode_image_href(href) else {
            log::warn!("skipping image with an unsupported or undecodable source");
            return false;
        };

        let x = self.len_x(node, "x");
        let y = self.len_y(node, "y");
        let fit = node
            .attr("preserveAspectRatio")
            .map(|v| v.trim().to_ascii_lowercase())
            .is_none_or(|v| v.contains("meet"));
        let (target_w, target_h, dx, dy) = if fit {
            let img_w = (image.width as f32).max(1.0);
            let img_h = (image.height as f32).max(1.0);
            let scale = (width / img_w).min(height / img_h);
            let tw = img_w * scale;
            let th = img_h * scale;
            (tw, th, (width - tw) / 2.0, (height - th) / 2.0)
        } else {
            (width, height, 0.0, 0.0)
        };

        let top = y + dy;
        let y = match self.surface.y_axis() {
            YAxis::TopDown => top,
            YAxis::BottomUp => self.reference.1 - top - target_h,
        };
        self.surface
            .draw_image(&image, x + dx, y, target_w, target_h);
        true
    }

    fn draw_use(&mut self, node: &SceneNode) -> bool {
        let target = node
            .href_target()
            .and_then(|id| self.defs.get_key_value(id).map(|(k, v)| (*k, *v)));
        let Some((id, target)) = target else {
            log::warn!(
                "unresolved use reference {:?}",
                node.attr("href").or_else(|| node.attr("xlink:href"))
            );
            self.stats.unresolved_uses += 1;
            return false;
        };
        if self.replaying.contains(&id) {
            log::warn!("use of {id:?} is already being replayed; dropping reference");
            self.stats.unresolved_uses += 1;
            return false;
        }
        if self.replaying.len() >= MAX_USE_DEPTH || self.expansions >= MAX_USE_EXPANSIONS {
            log::warn!("use of {id:?} exceeds the nesting or expansion limit; dropping reference");
            self.stats.unresolved_uses += 1;
            return false;
        }

        let offset = Matrix::translate(self.len_x(node, "x"), self.len_y(node, "y"));
        // Definitions found while replaying stay local to this placement.
        let saved = self.defs.clone();
        self.expansions += 1;
        self.replaying.push(id);
        let drawn = self.scoped(offset, None, |w| w.visit(target));
        self.replaying.pop();
        self.defs = saved;
        drawn > 0
    }

    fn draw_text(&mut self, node: &SceneNode) -> bool {
        let fragments = self.layout_text(node);
        if fragments.is_empty() {
            return false;
        }
        for frag in &fragments {
            match &frag.positions {
                Some(xs) => {
                    for (ch, x) in frag.text.chars().zip(xs) {
                        let mut buf = [0u8; 4];
                        self.surface.draw_text(
                            ch.encode_utf8(&mut buf),
                            *x,
                            frag.y,
                            &frag.font,
                            frag.color,
                        );
                    }
                }
                None => {
                    self.surface
                        .draw_text(&frag.text, frag.x, frag.y, &frag.font, frag.color);
                }
            }
        }
        true
    }

    fn layout_text(&self, node: &SceneNode) -> Vec<Fragment> {
        let paint = &self.top().paint;
        let base_x = node.attr("x").and_then(parse_first_number).unwrap_or(0.0);
        let base_y = node.attr("y").and_then(parse_first_number).unwrap_or(0.0);
        let line_height = node
            .attr("line-height")
            .and_then(|v| parse_length(v, None))
            .unwrap_or(paint.font_size * LINE_HEIGHT_FACTOR);
        let preserve = node.preserves_space();
        let mut out = Vec::new();

        let spans: Vec<&SceneNode> = node
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::TextSpan)
            .collect();

        if spans.is_empty() {
            let Some(color) = paint.effective_fill_or(Rgba::BLACK) else {
                return out;
            };
            let font = font_spec(paint);
            let xs = node.attr("x").map(parse_number_list).unwrap_or_default();
            push_lines(
                &mut out,
                &node.text,
                preserve,
                (base_x, base_y),
                line_height,
                &xs,
                &font,
                color,
            );
            return out;
        }

        let mut x = base_x;
        let mut y = base_y;
        for (index, span) in spans.into_iter().enumerate() {
            // Blank spans still occupy an index.
            if span.text.trim().is_empty() {
                continue;
            }
            let explicit_y = span.attr("y").is_some() || span.attr("dy").is_some();
            let explicit_x = span.attr("x").is_some() || span.attr("dx").is_some();
            if !explicit_y && index > 0 {
                y += line_height;
            }
            if let Some(v) = span.attr("x").and_then(parse_first_number) {
                x = v;
            }
            if let Some(v) = span.attr("y").and_then(parse_first_number) {
                y = v;
            }
            if let Some(v) = span.attr("dx").and_then(parse_first_number) {
                x += v;
            }
            if let Some(v) = span.attr("dy").and_then(parse_first_number) {
                y += v;
            }
            if !explicit_x && index > 0 {
                x = base_x;
            }

            let span_paint = paint.derive(span);
            let Some(color) = span_paint.effective_fill_or(Rgba::BLACK) else {
                continue;
            };
            let xs = span.attr("x").map(parse_number_list).unwrap_or_default();
            y = push_lines(
                &mut out,
                &span.text,
                preserve || span.preserves_space(),
                (x, y),
                line_height,
                &xs,
                &font_spec(&span_paint),
                color,
            );
        }
        out
    }
}

fn font_spec(paint: &PaintState) -> FontSpec {
    FontSpec {
        families: paint.font_families.clone(),
        size: paint.font_size,
        bold: paint.font_bold,
    }
}

#[allow(clippy::too_many_arguments)]
fn push_lines(
    out: &mut Vec<Fragment>,
    raw: &str,
    preserve: bool,
    (x, mut y): (f32, f32),
    line_height: f32,
    xs: &[f32],
    font: &FontSpec,
    color: Rgba,
) -> f32 {
    let lines: Vec<&str> = raw.split('\n').collect();
    let single = lines.len() == 1;
    for (i, line) in lines.iter().enumerate() {
        let text = normalize_text(line, preserve);
        if !text.is_empty() {
            let positions = (single && xs.len() >= text.chars().count()).then(|| xs.to_vec());
            out.push(Fragment {
                text,
                x,
                y,
                positions,
                font: font.clone(),
                color,
            });
        }
        if i + 1 < lines.len() {
            y += line_height;
        }
    }
    y
}

fn normalize_text(raw: &str, preserve: bool) -> String {
    if preserve {
        return raw.to_string();
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, Command};
    use crate::raster::tests::png_data_uri;
    use crate::scene::parse_scene;
    use crate::types::Size;

    const OPTS: RenderOptions = RenderOptions {
        page_width: 200.0,
        page_height: 100.0,
    };

    fn render(markup: &str) -> (RenderStats, Vec<Command>) {
        render_on(Canvas::new(Size::new(200.0, 100.0)), markup)
    }

    fn render_on(mut canvas: Canvas, markup: &str) -> (RenderStats, Vec<Command>) {
        let root = parse_scene(markup).expect("scene");
        let stats = render_scene(&root, &mut canvas, OPTS);
        (stats, canvas.into_commands())
    }

    fn texts(commands: &[Command]) -> Vec<(String, f32, f32)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawText { text, x, y, .. } => {
                    Some((text.clone(), x.to_f32(), y.to_f32()))
                }
                _ => None,
            })
            .collect()
    }

    fn count(commands: &[Command], pred: impl Fn(&Command) -> bool) -> usize {
        commands.iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn draws_basic_shapes_fill_then_stroke() {
        let (stats, cmds) = render(
            r##"<svg><rect x="1" y="2" width="3" height="4" fill="#f00" stroke="blue"/>
            <circle cx="5" cy="5" r="2" fill="red"/><line x1="0" y1="0" x2="5" y2="5"/>
            <path d="M0 0 L1 1" stroke="black"/></svg>"##,
        );
        assert_eq!(stats.drawn, 4);
        let fill_pos = cmds
            .iter()
            .position(|c| matches!(c, Command::FillPath { .. }))
            .expect("fill");
        let stroke_pos = cmds
            .iter()
            .position(|c| matches!(c, Command::StrokePath { .. }))
            .expect("stroke");
        assert!(fill_pos < stroke_pos);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 2);
        assert_eq!(count(&cmds, |c| matches!(c, Command::StrokePath { .. })), 3);
    }

    #[test]
    fn degenerate_shapes_draw_nothing() {
        let (stats, cmds) = render(
            r#"<svg><rect width="0" height="5" fill="red"/><circle r="-1" fill="red"/><path/></svg>"#,
        );
        assert_eq!(stats.drawn, 0);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 0);
    }

    #[test]
    fn unpainted_shapes_still_count_but_emit_no_paint() {
        let (stats, cmds) = render(r#"<rect width="5" height="5"/>"#);
        assert_eq!(stats.drawn, 1);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 0);
    }

    #[test]
    fn unresolved_use_leaves_count_unchanged() {
        let (stats, _) = render(r##"<svg><rect width="1" height="1"/><use href="#missing"/></svg>"##);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.unresolved_uses, 1);
    }

    #[test]
    fn use_replays_definition_with_offset() {
        let (stats, cmds) = render(
            r##"<svg><defs><g id="dot"><rect id="sq" width="2" height="2" fill="red"/></g></defs>
            <use href="#dot" x="10" y="20"/><use xlink:href="#sq"/></svg>"##,
        );
        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.unresolved_uses, 0);
        assert!(cmds.contains(&Command::ConcatMatrix(Matrix::translate(10.0, 20.0))));
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 2);
    }

    #[test]
    fn definitions_are_not_drawn_and_must_precede_uses() {
        let (stats, cmds) = render(
            r##"<svg><use href="#a"/><defs><rect id="a" width="2" height="2" fill="red"/></defs></svg>"##,
        );
        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.unresolved_uses, 1);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 0);
    }

    #[test]
    fn self_referencing_use_terminates() {
        let (stats, _) = render(
            r##"<svg><defs><g id="loop"><rect width="1" height="1" fill="red"/><use href="#loop"/></g></defs><use href="#loop"/></svg>"##,
        );
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.unresolved_uses, 1);
    }

    #[test]
    fn doubly_self_referencing_use_terminates() {
        let (stats, cmds) = render(
            r##"<svg><defs><g id="l"><rect width="1" height="1" fill="red"/><use href="#l"/><use href="#l"/></g></defs><use href="#l"/></svg>"##,
        );
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.unresolved_uses, 2);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 1);
    }

    #[test]
    fn doubling_use_chain_stops_at_expansion_cap() {
        let mut defs = String::from(r#"<g id="d0"><rect width="1" height="1" fill="red"/></g>"#);
        for level in 1..=24 {
            let prev = level - 1;
            defs.push_str(&format!(
                r##"<g id="d{level}"><use href="#d{prev}"/><use href="#d{prev}"/></g>"##
            ));
        }
        let (stats, cmds) = render(&format!(r##"<svg><defs>{defs}</defs><use href="#d24"/></svg>"##));
        assert_eq!(stats.drawn, 1);
        assert!(stats.unresolved_uses > 0);
        let fills = count(&cmds, |c| matches!(c, Command::FillPath { .. }));
        assert!(fills > 0 && fills <= MAX_USE_EXPANSIONS);
    }

    #[test]
    fn use_of_use_composes_offsets_in_order() {
        let (stats, cmds) = render(
            r##"<svg><defs><rect id="a" width="2" height="2" fill="red"/><g id="b"><use href="#a" x="3"/></g></defs><use href="#b" x="5"/></svg>"##,
        );
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.unresolved_uses, 0);
        assert_eq!(count(&cmds, |c| matches!(c, Command::FillPath { .. })), 1);
        let matrices: Vec<Matrix> = cmds
            .iter()
            .filter_map(|c| match c {
                Command::ConcatMatrix(m) => Some(*m),
                _ => None,
            })
            .collect();
        assert_eq!(
            matrices,
            vec![Matrix::translate(5.0, 0.0), Matrix::translate(3.0, 0.0)]
        );
    }

    #[test]
    fn line_with_stroke_none_is_not_drawn() {
        let (stats, cmds) = render(
            r#"<svg><line x1="0" y1="0" x2="5" y2="5" stroke="none"/><line x2="5" y2="5"/></svg>"#,
        );
        assert_eq!(stats.drawn, 1);
        assert_eq!(count(&cmds, |c| matches!(c, Command::StrokePath { .. })), 1);
    }

    #[test]
    fn save_restore_stay_balanced() {
        let (_, cmds) = render(
            r##"<svg transform="scale(2)"><g transform="translate(1,1)"><rect width="1" height="1"/>
            <text>hi</text></g><defs><rect id="r" width="1" height="1"/></defs><use href="#r"/></svg>"##,
        );
        let saves = count(&cmds, |c| matches!(c, Command::Save));
        let restores = count(&cmds, |c| matches!(c, Command::Restore));
        assert!(saves > 0);
        assert_eq!(saves, restores);
    }

    #[test]
    fn walker_depth_returns_to_base_after_subtree() {
        let root = parse_scene(
            r#"<svg><g><g><rect width="1" height="1"/></g></g><text><tspan>a</tspan></text></svg>"#,
        )
        .expect("scene");
        let mut canvas = Canvas::new(Size::new(10.0, 10.0));
        let mut walker = Walker::new(&mut canvas, OPTS);
        assert_eq!(walker.depth(), 0);
        let drawn = walker.visit(&root);
        assert_eq!(drawn, 2);
        assert_eq!(walker.depth(), 0);
    }

    #[test]
    fn sibling_transforms_do_not_leak() {
        let root = parse_scene(
            r#"<svg><g transform="translate(5,0)"/><g transform="scale(3)"/></svg>"#,
        )
        .expect("scene");
        let mut canvas = Canvas::new(Size::new(10.0, 10.0));
        let mut walker = Walker::new(&mut canvas, OPTS);
        walker.visit(&root);
        assert!(walker.top().ctm.is_identity());
        let cmds = canvas.into_commands();
        assert!(cmds.contains(&Command::ConcatMatrix(Matrix::scale(3.0, 3.0))));
    }

    #[test]
    fn viewbox_scales_to_page() {
        let (_, cmds) = render(r#"<svg viewBox="0 0 100 50"><rect width="1" height="1"/></svg>"#);
        assert_eq!(cmds[1], Command::ConcatMatrix(Matrix::scale(2.0, 2.0)));
    }

    #[test]
    fn tspans_without_y_advance_one_line_height() {
        let (_, cmds) = render(
            r#"<text x="5" y="10" font-size="10"><tspan y="10">a</tspan><tspan>b</tspan><tspan>  </tspan><tspan>c</tspan></text>"#,
        );
        assert_eq!(
            texts(&cmds),
            vec![
                ("a".to_string(), 5.0, 10.0),
                ("b".to_string(), 5.0, 22.0),
                ("c".to_string(), 5.0, 34.0),
            ]
        );
    }

    #[test]
    fn tspan_dx_dy_and_explicit_x() {
        let (_, cmds) = render(
            r#"<text x="5" y="10"><tspan>a</tspan><tspan x="30" dy="4">b</tspan><tspan dx="2" y="50">c</tspan></text>"#,
        );
        assert_eq!(
            texts(&cmds),
            vec![
                ("a".to_string(), 5.0, 10.0),
                ("b".to_string(), 30.0, 14.0),
                ("c".to_string(), 32.0, 50.0),
            ]
        );
    }

    #[test]
    fn newlines_advance_and_whitespace_collapses() {
        let (_, cmds) = render(
            "<text y=\"10\" line-height=\"20\"><tspan>  one   two\nthree</tspan></text>",
        );
        assert_eq!(
            texts(&cmds),
            vec![
                ("one two".to_string(), 0.0, 10.0),
                ("three".to_string(), 0.0, 30.0)
            ]
        );
    }

    #[test]
    fn per_character_positions_only_when_list_is_long_enough() {
        let (_, cmds) = render(r#"<text x="1 5 9" y="3">abc</text>"#);
        assert_eq!(
            texts(&cmds),
            vec![
                ("a".to_string(), 1.0, 3.0),
                ("b".to_string(), 5.0, 3.0),
                ("c".to_string(), 9.0, 3.0),
            ]
        );

        let (_, cmds) = render(r#"<text x="1 5" y="3">abc</text>"#);
        assert_eq!(texts(&cmds), vec![("abc".to_string(), 1.0, 3.0)]);
    }

    #[test]
    fn text_defaults_to_black_and_honors_fill_none() {
        let (stats, cmds) = render(r#"<svg><text>hi</text><text fill="none">gone</text></svg>"#);
        assert_eq!(stats.drawn, 1);
        let colors: Vec<Rgba> = cmds
            .iter()
            .filter_map(|c| match c {
                Command::DrawText { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![Rgba::BLACK]);
    }

    #[test]
    fn images_fit_and_center_by_default() {
        let uri = png_data_uri(2, 1, 255);
        let (stats, cmds) = render(&format!(
            r#"<svg><image x="10" y="10" width="40" height="40" href="{uri}"/></svg>"#
        ));
        assert_eq!(stats.drawn, 1);
        let Some(Command::DrawImage {
            x,
            y,
            width,
            height,
            ..
        }) = cmds.iter().find(|c| matches!(c, Command::DrawImage { .. }))
        else {
            panic!("expected image");
        };
        assert_eq!(
            (x.to_f32(), y.to_f32(), width.to_f32(), height.to_f32()),
            (10.0, 20.0, 40.0, 20.0)
        );
    }

    #[test]
    fn bottom_up_surfaces_flip_image_placement() {
        let uri = png_data_uri(1, 1, 255);
        let canvas = Canvas::new(Size::new(200.0, 100.0)).with_y_axis(YAxis::BottomUp);
        let (_, cmds) = render_on(
            canvas,
            &format!(
                r#"<image x="0" y="10" width="30" height="20" preserveAspectRatio="none" href="{uri}"/>"#
            ),
        );
        let Some(Command::DrawImage { y, height, .. }) =
            cmds.iter().find(|c| matches!(c, Command::DrawImage { .. }))
        else {
            panic!("expected image");
        };
        assert_eq!((y.to_f32(), height.to_f32()), (70.0, 20.0));

        let canvas = Canvas::new(Size::new(200.0, 100.0)).with_y_axis(YAxis::BottomUp);
        let (_, cmds) = render_on(
            canvas,
            &format!(
                r#"<svg viewBox="0 0 100 50"><image x="0" y="10" width="30" height="20" preserveAspectRatio="none" href="{uri}"/></svg>"#
            ),
        );
        let Some(Command::DrawImage { y, height, .. }) =
            cmds.iter().find(|c| matches!(c, Command::DrawImage { .. }))
        else {
            panic!("expected image");
        };
        assert_eq!((y.to_f32(), height.to_f32()), (20.0, 20.0));
    }

    #[test]
    fn unknown_elements_are_walked_and_counted_as_skipped() {
        let (stats, _) = render(r#"<svg><foo><rect width="1" height="1"/></foo></svg>"#);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn percentage_lengths_resolve_against_viewbox() {
        let (_, cmds) = render(
            r#"<svg viewBox="0 0 100 50"><rect width="50%" height="100%" fill="red"/></svg>"#,
        );
        let Some(Command::FillPath { segments, .. }) =
            cmds.iter().find(|c| matches!(c, Command::FillPath { .. }))
        else {
            panic!("expected fill");
        };
        assert_eq!(segments[2], PathSeg::LineTo(50.0, 50.0));
    }
}
