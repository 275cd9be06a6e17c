//! Content-stream walker.
//!
//! Runs a simplified text and graphics state machine over a page's
//! operations and records every shown word (with its effective font size and
//! an estimated box) and every XObject drawn with `Do` (with the box the
//! current transformation maps the unit square to). Coordinates are PDF user
//! space: origin bottom-left, y up.

use lopdf::content::Operation;
use lopdf::Object;

/// Approximate glyph width as a fraction of the font size.
/// We have no glyph metrics here, so word boxes are estimates.
const APPROX_CHAR_WIDTH_RATIO: f64 = 0.5;

/// Kerning gap (in glyph widths) that counts as a word break inside `TJ`.
const TJ_SPACE_RATIO: f64 = 0.3;

/// The identity matrix [a, b, c, d, e, f].
const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A word as drawn on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    /// Left edge.
    pub x: f64,
    /// Baseline.
    pub y: f64,
    pub width: f64,
    /// Font size after text and graphics scaling.
    pub font_size: f64,
}

/// An XObject drawn on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Resource name of the XObject.
    pub name: Vec<u8>,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Everything drawn on one page, in content-stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageScan {
    pub words: Vec<Word>,
    pub placements: Vec<Placement>,
}

/// Concatenate two matrices: `m` applied first, then `n`.
fn multiply(m: &[f64; 6], n: &[f64; 6]) -> [f64; 6] {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

/// Read a numeric operand, accepting integers and reals.
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

fn matrix(operands: &[Object]) -> Option<[f64; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let vals: Vec<f64> = operands.iter().take(6).filter_map(number).collect();
    if vals.len() != 6 {
        return None;
    }
    Some([vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f64,
    text_matrix: [f64; 6],
    line_matrix: [f64; 6],
    horiz_scale: f64,
    char_spacing: f64,
    word_spacing: f64,
    leading: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn glyph_width(&self) -> f64 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance(&mut self, dx: f64) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, dx, 0.0], &self.text_matrix);
    }

    fn advance_after_show(&mut self, text: &str) {
        let mut dx = 0.0;
        for ch in text.chars() {
            dx += self.glyph_width() + self.char_spacing;
            if ch == ' ' {
                dx += self.word_spacing;
            }
        }
        self.advance(dx);
    }
}

/// Walks operations and collects words and placements.
struct Scanner<'a> {
    decode: &'a dyn Fn(&[u8], &[u8]) -> String,
    ctm: [f64; 6],
    ctm_stack: Vec<[f64; 6]>,
    text: TextState,
    scan: PageScan,
}

impl<'a> Scanner<'a> {
    fn new(decode: &'a dyn Fn(&[u8], &[u8]) -> String) -> Self {
        Self {
            decode,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text: TextState::default(),
            scan: PageScan::default(),
        }
    }

    fn decode_operand(&self, obj: &Object) -> String {
        match obj {
            Object::String(bytes, _) => (self.decode)(&self.text.font_key, bytes),
            _ => String::new(),
        }
    }

    /// Device-space origin and scale of the current text position.
    fn rendering_origin(&self) -> (f64, f64, f64) {
        let m = multiply(&self.text.text_matrix, &self.ctm);
        let scale = (m[2].powi(2) + m[3].powi(2)).sqrt();
        (m[4], m[5], scale)
    }

    /// Record the words of `text` starting at the current text position.
    fn emit(&mut self, text: &str) {
        let (x, y, scale) = self.rendering_origin();
        let font_size = (self.text.font_size * scale).abs();
        let glyph = self.text.glyph_width() * scale;

        let mut offset = 0usize;
        for piece in text.split(char::is_whitespace) {
            let len = piece.chars().count();
            if len > 0 {
                self.scan.words.push(Word {
                    text: piece.to_string(),
                    x: x + offset as f64 * glyph,
                    y,
                    width: len as f64 * glyph,
                    font_size,
                });
            }
            offset += len + 1;
        }

        self.text.advance_after_show(text);
    }

    fn show_string(&mut self, operand: &Object) {
        let text = self.decode_operand(operand);
        if !text.trim().is_empty() {
            self.emit(&text);
        } else {
            self.text.advance_after_show(&text);
        }
    }

    /// `TJ`: strings interleaved with kerning in thousandths of a text unit.
    /// Large negative kerning becomes a space.
    fn show_array(&mut self, items: &[Object]) {
        let start = self.text.text_matrix;
        let mut buf = String::new();

        for item in items {
            match item {
                Object::String(..) => {
                    buf.push_str(&self.decode_operand(item));
                }
                other => {
                    if let Some(adj) = number(other) {
                        let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                        if dx > self.text.glyph_width() * TJ_SPACE_RATIO && !buf.is_empty() {
                            buf.push(' ');
                        }
                    }
                }
            }
        }

        self.text.text_matrix = start;
        if !buf.trim().is_empty() {
            self.emit(&buf);
        }
    }

    fn run(mut self, ops: &[Operation]) -> PageScan {
        for op in ops {
            let operands = &op.operands;
            match op.operator.as_str() {
                // -- Graphics state -------------------------------------
                "q" => self.ctm_stack.push(self.ctm),
                "Q" => {
                    if let Some(ctm) = self.ctm_stack.pop() {
                        self.ctm = ctm;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix(operands) {
                        self.ctm = multiply(&m, &self.ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.place(name.clone());
                    }
                }

                // -- Text objects and state ------------------------------
                "BT" => {
                    self.text.text_matrix = IDENTITY;
                    self.text.line_matrix = IDENTITY;
                }
                "Tf" => {
                    if let (Some(Object::Name(key)), Some(size)) =
                        (operands.first(), operands.get(1).and_then(number))
                    {
                        self.text.font_key = key.clone();
                        self.text.font_size = size;
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix(operands) {
                        self.text.text_matrix = m;
                        self.text.line_matrix = m;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.text.leading = -ty;
                    }
                    self.text.translate_line(tx, ty);
                }
                "T*" => {
                    let leading = self.text.leading;
                    self.text.translate_line(0.0, -leading);
                }
                "TL" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.text.leading = v;
                    }
                }
                "Tc" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.text.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.text.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.text.horiz_scale = v / 100.0;
                    }
                }

                // -- Text showing -----------------------------------------
                "Tj" => {
                    if let Some(first) = operands.first() {
                        self.show_string(first);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_array(items);
                    }
                }
                "'" => {
                    let leading = self.text.leading;
                    self.text.translate_line(0.0, -leading);
                    if let Some(first) = operands.first() {
                        self.show_string(first);
                    }
                }
                "\"" => {
                    if operands.len() >= 3 {
                        if let Some(aw) = number(&operands[0]) {
                            self.text.word_spacing = aw;
                        }
                        if let Some(ac) = number(&operands[1]) {
                            self.text.char_spacing = ac;
                        }
                        let leading = self.text.leading;
                        self.text.translate_line(0.0, -leading);
                        self.show_string(&operands[2]);
                    }
                }

                _ => {}
            }
        }

        self.scan
    }

    /// Map the unit square through the CTM.
    fn place(&mut self, name: Vec<u8>) {
        let m = self.ctm;
        let xs = [m[4], m[0] + m[4], m[2] + m[4], m[0] + m[2] + m[4]];
        let ys = [m[5], m[1] + m[5], m[3] + m[5], m[1] + m[3] + m[5]];

        self.scan.placements.push(Placement {
            name,
            x0: xs.iter().copied().fold(f64::INFINITY, f64::min),
            y0: ys.iter().copied().fold(f64::INFINITY, f64::min),
            x1: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            y1: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        });
    }
}

/// Scan a page's operations.
///
/// `decode` turns the raw bytes of a shown string into text, given the
/// resource key of the current font.
pub fn scan_operations(ops: &[Operation], decode: &dyn Fn(&[u8], &[u8]) -> String) -> PageScan {
    Scanner::new(decode).run(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    fn int(i: i64) -> Object {
        Object::Integer(i)
    }

    fn latin(_font: &[u8], bytes: &[u8]) -> String {
        bytes.iter().map(|&b| b as char).collect()
    }

    #[test]
    fn test_words_carry_font_size_and_position() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(24)]),
            op("Td", vec![int(72), int(700)]),
            op("Tj", vec![string("Big Title")]),
            op("Tf", vec![name("F2"), int(10)]),
            op("Td", vec![int(0), int(-30)]),
            op("Tj", vec![string("body")]),
            op("ET", vec![]),
        ];

        let scan = scan_operations(&ops, &latin);
        let words: Vec<_> = scan
            .words
            .iter()
            .map(|w| (w.text.as_str(), w.font_size, w.x, w.y))
            .collect();

        assert_eq!(
            words,
            vec![
                ("Big", 24.0, 72.0, 700.0),
                ("Title", 24.0, 72.0 + 4.0 * 12.0, 700.0),
                ("body", 10.0, 72.0, 670.0),
            ]
        );
    }

    #[test]
    fn test_text_matrix_scales_font_size() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(1)]),
            op("Tm", vec![int(18), int(0), int(0), int(18), int(50), int(600)]),
            op("Tj", vec![string("Scaled")]),
            op("ET", vec![]),
        ];

        let scan = scan_operations(&ops, &latin);
        assert_eq!(scan.words.len(), 1);
        assert_eq!(scan.words[0].font_size, 18.0);
        assert_eq!(scan.words[0].x, 50.0);
        assert_eq!(scan.words[0].y, 600.0);
    }

    #[test]
    fn test_tj_array_kerning_becomes_space() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(12)]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    string("Hel"),
                    int(-20),
                    string("lo"),
                    int(-500),
                    string("world"),
                ])],
            ),
            op("ET", vec![]),
        ];

        let scan = scan_operations(&ops, &latin);
        let words: Vec<_> = scan.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["Hello", "world"]);
    }

    #[test]
    fn test_next_line_operators_use_leading() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(10)]),
            op("TL", vec![int(14)]),
            op("Td", vec![int(10), int(100)]),
            op("Tj", vec![string("one")]),
            op("'", vec![string("two")]),
            op("T*", vec![]),
            op("Tj", vec![string("three")]),
            op("ET", vec![]),
        ];

        let scan = scan_operations(&ops, &latin);
        let ys: Vec<_> = scan.words.iter().map(|w| w.y).collect();
        assert_eq!(ys, vec![100.0, 86.0, 72.0]);
    }

    #[test]
    fn test_image_placement_from_ctm() {
        let ops = vec![
            op("q", vec![]),
            op("cm", vec![int(200), int(0), int(0), int(100), int(50), int(400)]),
            op("Do", vec![name("Im1")]),
            op("Q", vec![]),
            op("Do", vec![name("Im2")]),
        ];

        let scan = scan_operations(&ops, &latin);
        assert_eq!(
            scan.placements[0],
            Placement {
                name: b"Im1".to_vec(),
                x0: 50.0,
                y0: 400.0,
                x1: 250.0,
                y1: 500.0,
            }
        );
        // Restored to identity after Q.
        assert_eq!(scan.placements[1].x1 - scan.placements[1].x0, 1.0);
    }

    #[test]
    fn test_ctm_scales_text() {
        let ops = vec![
            op("cm", vec![int(2), int(0), int(0), int(2), int(0), int(0)]),
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(10)]),
            op("Td", vec![int(10), int(20)]),
            op("Tj", vec![string("x")]),
            op("ET", vec![]),
        ];

        let scan = scan_operations(&ops, &latin);
        assert_eq!(scan.words[0].font_size, 20.0);
        assert_eq!((scan.words[0].x, scan.words[0].y), (20.0, 40.0));
    }

    #[test]
    fn test_whitespace_only_strings_emit_nothing() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), int(10)]),
            op("Tj", vec![string("   ")]),
            op("ET", vec![]),
        ];
        assert!(scan_operations(&ops, &latin).words.is_empty());
    }
}
