#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeg {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPath {
    pub segments: Vec<PathSeg>,
    pub current: (f32, f32),
    /// Commands that produced no geometry (unsupported letters or missing arguments).
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f32),
}

pub fn parse_path_data(d: &str) -> ParsedPath {
    let tokens = tokenize(d);
    let mut out = ParsedPath::default();
    let mut cur = (0.0f32, 0.0f32);
    let mut start = (0.0f32, 0.0f32);
    let mut i = 0usize;

    while i < tokens.len() {
        let Token::Command(letter) = tokens[i] else {
            // Orphan coordinates after an unsupported or exhausted command.
            i += 1;
            continue;
        };
        i += 1;

        let Some(arity) = command_arity(letter) else {
            log::debug!("path command '{letter}' is not supported; skipping");
            out.skipped += 1;
            continue;
        };

        if arity == 0 {
            out.segments.push(PathSeg::Close);
            cur = start;
            continue;
        }

        let mut cmd = letter;
        let mut executed = false;
        while let Some(args) = numbers_at(&tokens, i, arity) {
            i += arity;
            executed = true;
            let rel = cmd.is_ascii_lowercase();
            let (ox, oy) = if rel { cur } else { (0.0, 0.0) };
            match cmd.to_ascii_uppercase() {
                'M' => {
                    cur = (ox + args[0], oy + args[1]);
                    start = cur;
                    out.segments.push(PathSeg::MoveTo(cur.0, cur.1));
                    // Subsequent pairs after a moveto are implicit linetos.
                    cmd = if rel { 'l' } else { 'L' };
                }
                'L' => {
                    cur = (ox + args[0], oy + args[1]);
                    out.segments.push(PathSeg::LineTo(cur.0, cur.1));
                }
                'H' => {
                    cur.0 = ox + args[0];
                    out.segments.push(PathSeg::LineTo(cur.0, cur.1));
                }
                'V' => {
                    cur.1 = oy + args[0];
                    out.segments.push(PathSeg::LineTo(cur.0, cur.1));
                }
                'C' => {
                    let x1 = ox + args[0];
                    let y1 = oy + args[1];
                    let x2 = ox + args[2];
                    let y2 = oy + args[3];
                    cur = (ox + args[4], oy + args[5]);
                    out.segments
                        .push(PathSeg::CurveTo(x1, y1, x2, y2, cur.0, cur.1));
                }
                'Q' => {
                    let qx = ox + args[0];
                    let qy = oy + args[1];
                    let end = (ox + args[2], oy + args[3]);
                    let (c1x, c1y, c2x, c2y) = quad_to_cubic(cur.0, cur.1, qx, qy, end.0, end.1);
                    cur = end;
                    out.segments
                        .push(PathSeg::CurveTo(c1x, c1y, c2x, c2y, cur.0, cur.1));
                }
                _ => unreachable!("arity table only admits supported commands"),
            }
        }
        if !executed {
            out.skipped += 1;
        }
    }

    out.current = cur;
    out
}

fn command_arity(letter: char) -> Option<usize> {
    match letter.to_ascii_uppercase() {
        'M' | 'L' => Some(2),
        'H' | 'V' => Some(1),
        'C' => Some(6),
        'Q' => Some(4),
        'Z' => Some(0),
        _ => None,
    }
}

fn numbers_at(tokens: &[Token], start: usize, count: usize) -> Option<[f32; 6]> {
    let mut out = [0.0f32; 6];
    for (slot, k) in out.iter_mut().zip(0..count) {
        match tokens.get(start + k)? {
            Token::Number(v) => *slot = *v,
            Token::Command(_) => return None,
        }
    }
    Some(out)
}

fn quad_to_cubic(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
    let c1x = x0 + (2.0 / 3.0) * (x1 - x0);
    let c1y = y0 + (2.0 / 3.0) * (y1 - y0);
    let c2x = x2 + (2.0 / 3.0) * (x1 - x2);
    let c2y = y2 + (2.0 / 3.0) * (y1 - y2);
    (c1x, c1y, c2x, c2y)
}

fn tokenize(d: &str) -> Vec<Token> {
    let mut scanner = Scanner {
        bytes: d.as_bytes(),
        i: 0,
    };
    let mut out = Vec::new();
    while let Some(token) = scanner.next_token() {
        out.push(token);
    }
    out
}

struct Scanner<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl Scanner<'_> {
    fn skip_separators(&mut self) {
        while self.i < self.bytes.len() {
            match self.bytes[self.i] {
                b' ' | b'\n' | b'\r' | b'\t' | b',' => self.i += 1,
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_separators();
            let b = *self.bytes.get(self.i)?;
            if b.is_ascii_alphabetic() {
                self.i += 1;
                return Some(Token::Command(b as char));
            }
            if let Some(v) = self.next_number() {
                return Some(Token::Number(v));
            }
            // Stray byte that starts neither a command nor a number.
            self.i += 1;
        }
    }

    fn next_number(&mut self) -> Option<f32> {
        let start = self.i;
        let len = self.bytes.len();
        let mut digits = false;

        if self.i < len && matches!(self.bytes[self.i], b'+' | b'-') {
            self.i += 1;
        }
        while self.i < len && self.bytes[self.i].is_ascii_digit() {
            self.i += 1;
            digits = true;
        }
        if self.i < len && self.bytes[self.i] == b'.' {
            self.i += 1;
            while self.i < len && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
                digits = true;
            }
        }
        if !digits {
            self.i = start;
            return None;
        }
        // Exponent only when digits actually follow, so "2e" never swallows a letter.
        if self.i < len && matches!(self.bytes[self.i], b'e' | b'E') {
            let mut j = self.i + 1;
            if j < len && matches!(self.bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j < len && self.bytes[j].is_ascii_digit() {
                while j < len && self.bytes[j].is_ascii_digit() {
                    j += 1;
                }
                self.i = j;
            }
        }

        let s = std::str::from_utf8(&self.bytes[start..self.i]).ok()?;
        s.parse::<f32>().ok()
    }
}
