#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Rect,
    Path,
    Circle,
    Line,
    Text,
    TextSpan,
    Image,
    Definition,
    Use,
    Other,
}

impl NodeKind {
    fn from_tag(name: &str) -> Self {
        let local = name.rsplit(':').next().unwrap_or(name);
        match local.to_ascii_lowercase().as_str() {
            "svg" | "g" => NodeKind::Group,
            "rect" => NodeKind::Rect,
            "path" => NodeKind::Path,
            "circle" => NodeKind::Circle,
            "line" => NodeKind::Line,
            "text" => NodeKind::Text,
            "tspan" => NodeKind::TextSpan,
            "image" => NodeKind::Image,
            "defs" => NodeKind::Definition,
            "use" => NodeKind::Use,
            _ => NodeKind::Other,
        }
    }

    fn keeps_whitespace(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::TextSpan)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    /// Attributes in document order. A repeated name keeps the last value.
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: NodeKind::from_tag(&name),
            name,
            attrs: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    pub fn href_target(&self) -> Option<&str> {
        self.attr("href")
            .or_else(|| self.attr("xlink:href"))
            .and_then(|v| v.trim().strip_prefix('#'))
            .filter(|id| !id.is_empty())
    }

    pub fn preserves_space(&self) -> bool {
        self.attr("xml:space") == Some("preserve")
    }

    fn push_text(&mut self, raw: &str) {
        if self.kind.keeps_whitespace() {
            self.text.push_str(raw);
        } else {
            self.text.push_str(raw.trim());
        }
    }
}

pub fn parse_scene(markup: &str) -> Option<SceneNode> {
    let mut reader = Reader {
        src: markup,
        bytes: markup.as_bytes(),
        i: 0,
    };
    let mut tree = TreeBuilder::default();

    while reader.i < reader.bytes.len() {
        if reader.bytes[reader.i] != b'<' {
            let end = reader.find_from(reader.i, "<").unwrap_or(reader.bytes.len());
            tree.text(&decode_entities(&markup[reader.i..end]));
            reader.i = end;
            continue;
        }

        let rest = &markup[reader.i..];
        if rest.starts_with("<!--") {
            if !reader.skip_past("-->") {
                break;
            }
        } else if rest.starts_with("<![CDATA[") {
            let body_start = reader.i + "<![CDATA[".len();
            let Some(end) = reader.find_from(body_start, "]]>") else {
                break;
            };
            tree.raw_text(&markup[body_start..end]);
            reader.i = end + 3;
        } else if rest.starts_with("<?") {
            if !reader.skip_past("?>") {
                break;
            }
        } else if rest.starts_with("<!") {
            if !reader.skip_declaration() {
                break;
            }
        } else if rest.starts_with("</") {
            let Some(end) = reader.find_from(reader.i, ">") else {
                break;
            };
            let name = markup[reader.i + 2..end].trim();
            tree.close(name);
            reader.i = end + 1;
        } else {
            let Some(tag) = reader.start_tag() else {
                break;
            };
            tree.open(tag);
        }
    }

    tree.finish()
}

struct StartTag {
    node: SceneNode,
    self_closing: bool,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<SceneNode>,
    root: Option<SceneNode>,
    /// Nesting depth inside an element that arrived after the root was closed.
    ignored: usize,
}

impl TreeBuilder {
    fn open(&mut self, tag: StartTag) {
        if self.ignored > 0 || (self.stack.is_empty() && self.root.is_some()) {
            if !tag.self_closing {
                self.ignored += 1;
            }
            return;
        }
        if tag.self_closing {
            self.attach(tag.node);
        } else {
            self.stack.push(tag.node);
        }
    }

    fn close(&mut self, name: &str) {
        if self.ignored > 0 {
            self.ignored -= 1;
            return;
        }
        let Some(pos) = self.stack.iter().rposition(|n| n.name == name) else {
            log::debug!("ignoring unmatched end tag </{name}>");
            return;
        };
        while self.stack.len() > pos {
            if let Some(node) = self.stack.pop() {
                self.attach(node);
            }
        }
    }

    fn attach(&mut self, node: SceneNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }

    fn text(&mut self, decoded: &str) {
        if self.ignored > 0 {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.push_text(decoded);
        }
    }

    fn raw_text(&mut self, raw: &str) {
        if self.ignored > 0 {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.text.push_str(raw);
        }
    }

    fn finish(mut self) -> Option<SceneNode> {
        while let Some(node) = self.stack.pop() {
            self.attach(node);
        }
        self.root
    }
}

struct Reader<'a> {
    src: &'a str,
    bytes: &'a [u8],
    i: usize,
}

impl Reader<'_> {
    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.src.get(from..)?.find(needle).map(|p| from + p)
    }

    fn skip_past(&mut self, needle: &str) -> bool {
        match self.find_from(self.i, needle) {
            Some(end) => {
                self.i = end + needle.len();
                true
            }
            None => false,
        }
    }

    fn skip_declaration(&mut self) -> bool {
        let mut depth = 0usize;
        let mut j = self.i + 2;
        while j < self.bytes.len() {
            match self.bytes[j] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.i = j + 1;
                    return true;
                }
                _ => {}
            }
            j += 1;
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_whitespace() {
            self.i += 1;
        }
    }

    fn take_while(&mut self, stop: impl Fn(u8) -> bool) -> &str {
        let start = self.i;
        while self.i < self.bytes.len() && !stop(self.bytes[self.i]) {
            self.i += 1;
        }
        &self.src[start..self.i]
    }

    fn start_tag(&mut self) -> Option<StartTag> {
        self.i += 1;
        let name = self
            .take_while(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
            .to_string();
        let mut node = SceneNode::new(name);

        loop {
            self.skip_whitespace();
            match *self.bytes.get(self.i)? {
                b'>' => {
                    self.i += 1;
                    return Some(StartTag {
                        node,
                        self_closing: false,
                    });
                }
                b'/' => {
                    self.i += 1;
                    if self.bytes.get(self.i) == Some(&b'>') {
                        self.i += 1;
                        return Some(StartTag {
                            node,
                            self_closing: true,
                        });
                    }
                }
                _ => {
                    let key = self
                        .take_while(|b| {
                            b.is_ascii_whitespace() || b == b'=' || b == b'/' || b == b'>'
                        })
                        .to_string();
                    self.skip_whitespace();
                    let value = if self.bytes.get(self.i) == Some(&b'=') {
                        self.i += 1;
                        self.skip_whitespace();
                        self.attribute_value()?
                    } else {
                        String::new()
                    };
                    if !key.is_empty() {
                        node.set_attr(key, value);
                    }
                }
            }
        }
    }

    fn attribute_value(&mut self) -> Option<String> {
        let quote = *self.bytes.get(self.i)?;
        if quote == b'"' || quote == b'\'' {
            self.i += 1;
            let raw = self.take_while(|b| b == quote).to_string();
            if self.i >= self.bytes.len() {
                return None;
            }
            self.i += 1;
            Some(decode_entities(&raw))
        } else {
            let raw = self.take_while(|b| b.is_ascii_whitespace() || b == b'>');
            Some(decode_entities(raw))
        }
    }
}

pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|semi| *semi <= 12)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
