//! Markup beautifier.
//!
//! Re-indents a document one level per open block element. Inline
//! elements and text flow together on one line, block elements holding
//! only short inline content stay on a single line, `script` and `style`
//! bodies are re-indented as a unit and `pre`/`textarea` content is kept
//! verbatim.

use crate::config::PrettifyOptions;
use crate::markup::{tokenize, Token};

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "data",
    "dfn", "em", "i", "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select",
    "small", "span", "strike", "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

const VERBATIM_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Longest single-line rendering of a block element with inline content.
const MAX_COMPACT_WIDTH: usize = 80;

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

fn is_verbatim(name: &str) -> bool {
    VERBATIM_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

struct Printer {
    out: String,
    line: String,
    depth: usize,
    unit: String,
}

impl Printer {
    fn new(options: &PrettifyOptions) -> Self {
        Self {
            out: String::new(),
            line: String::new(),
            depth: 0,
            unit: options.indent_char.to_string().repeat(options.indent_size),
        }
    }

    fn indent(&self) -> String {
        self.unit.repeat(self.depth)
    }

    fn emit(&mut self, text: &str) {
        let indent = self.indent();
        self.out.push_str(&indent);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.line);
        let trimmed = pending.trim();
        if !trimmed.is_empty() {
            self.emit(trimmed);
        }
    }

    fn push_inline(&mut self, text: &str) {
        self.line.push_str(text);
    }

    fn push_text(&mut self, text: &str) {
        let collapsed = collapse_whitespace(text);
        if collapsed == " " && self.line.is_empty() {
            return;
        }
        self.line.push_str(&collapsed);
    }

    /// Emit a raw text body with its common indentation replaced.
    fn emit_block_body(&mut self, text: &str) {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let common = lines.iter().map(|l| leading_whitespace(l)).min().unwrap_or(0);

        for line in lines {
            let body = line.char_indices().nth(common).map_or("", |(at, _)| &line[at..]);
            self.emit(body.trim_end());
        }
    }
}

/// Beautify a document.
pub fn prettify(html: &str, options: &PrettifyOptions) -> String {
    let tokens = tokenize(html);
    let mut printer = Printer::new(options);
    let mut verbatim = false;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Doctype { raw, .. } | Token::Comment { raw, .. } => {
                printer.flush();
                printer.emit(raw.trim());
            }
            Token::Start(tag) if is_inline(tag.name) => printer.push_inline(tag.raw),
            Token::Start(tag) if is_verbatim(tag.name) && !tag.self_closing => {
                printer.flush();
                let indent = printer.indent();
                printer.out.push_str(&indent);
                printer.out.push_str(tag.raw);
                verbatim = true;
            }
            Token::Start(tag) => {
                printer.flush();
                if let Some((line, end)) = compact(&tokens, i) {
                    printer.emit(&line);
                    i = end + 1;
                    continue;
                }
                printer.emit(tag.raw);
                if !tag.self_closing && !tag.is_void() {
                    printer.depth += 1;
                }
            }
            Token::End { name, raw, .. } if verbatim && is_verbatim(name) => {
                printer.out.push_str(raw);
                printer.out.push('\n');
                verbatim = false;
            }
            Token::End { name, raw, .. } if is_inline(name) => printer.push_inline(raw),
            Token::End { raw, .. } => {
                printer.flush();
                printer.depth = printer.depth.saturating_sub(1);
                printer.emit(raw);
            }
            Token::RawText { text, .. } if verbatim => printer.out.push_str(text),
            Token::RawText { text, .. } => {
                printer.flush();
                printer.emit_block_body(text);
            }
            Token::Text { text, .. } => printer.push_text(text),
        }
        i += 1;
    }

    printer.flush();
    printer.out
}

/// Single-line rendering of the block element starting at `start` when its
/// content is short and inline-only, with the index of its end tag.
fn compact(tokens: &[Token<'_>], start: usize) -> Option<(String, usize)> {
    let Token::Start(open) = &tokens[start] else {
        return None;
    };
    if open.self_closing || open.is_void() {
        return None;
    }

    let mut inner = String::new();
    for (offset, token) in tokens[start + 1..].iter().enumerate() {
        match token {
            Token::Text { text, .. } => inner.push_str(&collapse_whitespace(text)),
            Token::Start(tag) if is_inline(tag.name) => inner.push_str(tag.raw),
            Token::End { name, raw, .. } if is_inline(name) => inner.push_str(raw),
            Token::End { name, raw, .. } if name.eq_ignore_ascii_case(open.name) => {
                let line = format!("{}{}{}", open.raw, inner.trim(), raw);
                return (line.len() <= MAX_COMPACT_WIDTH).then_some((line, start + 1 + offset));
            }
            _ => return None,
        }
    }

    None
}

/// Count of leading whitespace chars.
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
