use crate::scene::SceneNode;
use crate::types::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::identity()
        }
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    pub fn rotate(deg: f32) -> Self {
        let rad = deg.to_radians();
        let s = libm::sinf(rad);
        let c = libm::cosf(rad);
        Self {
            a: c,
            b: s,
            c: -s,
            d: c,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self * other`: `other` is applied first, in the space `self` establishes.
    pub fn mul(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(self) -> bool {
        self == Self::identity()
    }
}

pub fn parse_transform(input: &str) -> Matrix {
    let mut out = Matrix::identity();
    let mut s = input.trim();

    while !s.is_empty() {
        let Some(open) = s.find('(') else { break };
        let name = s[..open].trim().trim_start_matches(',').trim();
        let Some(close) = s[open + 1..].find(')') else {
            break;
        };
        let args = parse_number_list(&s[open + 1..open + 1 + close]);

        let m = match name {
            "translate" => {
                let tx = args.first().copied().unwrap_or(0.0);
                let ty = args.get(1).copied().unwrap_or(0.0);
                Matrix::translate(tx, ty)
            }
            "scale" => {
                let sx = args.first().copied().unwrap_or(1.0);
                let sy = args.get(1).copied().unwrap_or(sx);
                Matrix::scale(sx, sy)
            }
            "rotate" => match args.as_slice() {
                [deg, cx, cy, ..] => Matrix::translate(*cx, *cy)
                    .mul(Matrix::rotate(*deg))
                    .mul(Matrix::translate(-cx, -cy)),
                [deg, ..] => Matrix::rotate(*deg),
                [] => Matrix::identity(),
            },
            "matrix" => match args.as_slice() {
                [a, b, c, d, e, f, ..] => Matrix {
                    a: *a,
                    b: *b,
                    c: *c,
                    d: *d,
                    e: *e,
                    f: *f,
                },
                _ => Matrix::identity(),
            },
            other => {
                log::debug!("transform function '{other}' is not supported");
                Matrix::identity()
            }
        };

        out = out.mul(m);
        s = s[open + 1 + close + 1..].trim_start();
    }

    out
}

pub(crate) fn parse_number_list(input: &str) -> Vec<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f32>().ok())
        .collect()
}

pub fn parse_color(input: &str) -> Rgba {
    try_parse_color(input).unwrap_or(Rgba::BLACK)
}

fn try_parse_color(input: &str) -> Option<Rgba> {
    let v = input.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = v.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts = split_channels(body);
        if parts.len() < 4 {
            return None;
        }
        let a = parts[3].parse::<f32>().ok().unwrap_or(1.0);
        return Some(Rgba::new(
            channel(parts[0]),
            channel(parts[1]),
            channel(parts[2]),
            a.clamp(0.0, 1.0),
        ));
    }
    if let Some(body) = lower
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts = split_channels(body);
        if parts.len() < 3 {
            return None;
        }
        return Some(Rgba::new(
            channel(parts[0]),
            channel(parts[1]),
            channel(parts[2]),
            1.0,
        ));
    }
    match lower.as_str() {
        "white" => Some(Rgba::WHITE),
        "black" => Some(Rgba::BLACK),
        "red" => Some(Rgba::new(1.0, 0.0, 0.0, 1.0)),
        "green" => Some(Rgba::new(0.0, 0.5, 0.0, 1.0)),
        "blue" => Some(Rgba::new(0.0, 0.0, 1.0, 1.0)),
        "transparent" => Some(Rgba::TRANSPARENT),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let (r, g, b) = match hex.len() {
        6 => (byte(0)?, byte(2)?, byte(4)?),
        3 => (nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17),
        _ => return None,
    };
    Some(Rgba::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        1.0,
    ))
}

fn split_channels(body: &str) -> Vec<&str> {
    body.split(',').map(str::trim).collect()
}

fn channel(raw: &str) -> f32 {
    raw.parse::<f32>()
        .map(|v| (v / 255.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

pub fn parse_length(input: &str, reference: Option<f32>) -> Option<f32> {
    let v = input.trim();
    if v.is_empty() {
        return None;
    }
    if let Some(pct) = v.strip_suffix('%') {
        let pct = pct.trim().parse::<f32>().ok()?;
        return reference.map(|r| pct / 100.0 * r);
    }
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    v.parse::<f32>().ok().filter(|n| n.is_finite())
}

pub(crate) fn parse_first_number(input: &str) -> Option<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())
        .and_then(|s| parse_length(s, None))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    pub fn parse(input: &str) -> Option<Self> {
        let parts = parse_number_list(input);
        let [min_x, min_y, width, height] = parts.as_slice() else {
            return None;
        };
        if *width <= 0.0 || *height <= 0.0 {
            return None;
        }
        Some(Self {
            min_x: *min_x,
            min_y: *min_y,
            width: *width,
            height: *height,
        })
    }

    pub fn to_page(self, width: f32, height: f32) -> Matrix {
        let sx = width / self.width;
        let sy = height / self.height;
        Matrix::scale(sx, sy).mul(Matrix::translate(-self.min_x, -self.min_y))
    }
}

pub type Paint = Option<Rgba>;

#[derive(Debug, Clone, PartialEq)]
pub struct PaintState {
    pub fill: Paint,
    pub stroke: Paint,
    /// Whether some ancestor or the node itself named a fill.
    pub fill_set: bool,
    pub stroke_set: bool,
    pub stroke_width: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
    pub stroke_opacity: f32,
    pub font_size: f32,
    pub font_families: Vec<String>,
    pub font_bold: bool,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            fill_set: false,
            stroke_set: false,
            stroke_width: 1.0,
            opacity: 1.0,
            fill_opacity: 1.0,
            stroke_opacity: 1.0,
            font_size: 12.0,
            font_families: Vec::new(),
            font_bold: false,
        }
    }
}

impl PaintState {
    /// Returns the state for `node`, layering its presentation attributes over `self`.
    /// `opacity` multiplies with the inherited value; channel opacities replace it.
    pub fn derive(&self, node: &SceneNode) -> Self {
        let mut out = self.clone();
        if let Some(v) = node.attr("fill") {
            out.fill = parse_paint(v);
            out.fill_set = true;
        }
        if let Some(v) = node.attr("stroke") {
            out.stroke = parse_paint(v);
            out.stroke_set = true;
        }
        if let Some(v) = node.attr("stroke-width").and_then(|v| parse_length(v, None)) {
            out.stroke_width = v.max(0.0);
        }
        if let Some(v) = node.attr("opacity").and_then(|v| parse_length(v, None)) {
            out.opacity = self.opacity * v.clamp(0.0, 1.0);
        }
        if let Some(v) = node.attr("fill-opacity").and_then(|v| parse_length(v, None)) {
            out.fill_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = node
            .attr("stroke-opacity")
            .and_then(|v| parse_length(v, None))
        {
            out.stroke_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = node
            .attr("font-size")
            .and_then(|v| parse_length(v, None))
            .filter(|v| *v > 0.0)
        {
            out.font_size = v;
        }
        if let Some(v) = node.attr("font-family") {
            out.font_families = parse_font_families(v);
        }
        if let Some(v) = node.attr("font-weight") {
            out.font_bold = is_bold_weight(v);
        }
        out
    }

    pub fn effective_fill(&self) -> Option<Rgba> {
        self.fill
            .map(|c| c.with_opacity(self.opacity * self.fill_opacity))
    }

    pub fn effective_fill_or(&self, default: Rgba) -> Option<Rgba> {
        if self.fill_set {
            self.effective_fill()
        } else {
            Some(default.with_opacity(self.opacity * self.fill_opacity))
        }
    }

    pub fn effective_stroke(&self) -> Option<Rgba> {
        if self.stroke_width <= 0.0 {
            return None;
        }
        self.stroke
            .map(|c| c.with_opacity(self.opacity * self.stroke_opacity))
    }

    pub fn effective_stroke_or(&self, default: Rgba) -> Option<Rgba> {
        if self.stroke_set {
            self.effective_stroke()
        } else if self.stroke_width <= 0.0 {
            None
        } else {
            Some(default.with_opacity(self.opacity * self.stroke_opacity))
        }
    }
}

fn parse_paint(input: &str) -> Paint {
    let v = input.trim();
    if v.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(parse_color(v))
    }
}

fn parse_font_families(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_bold_weight(input: &str) -> bool {
    let v = input.trim().to_ascii_lowercase();
    v == "bold" || v == "bolder" || v.parse::<u16>().map(|w| w >= 600).unwrap_or(false)
}
