//! Lightweight HTML tokenizer shared by the linter and the beautifier.
//!
//! This is not a conforming HTML parser. It splits markup into tags,
//! comments, doctypes and text, keeps byte offsets for diagnostics, and
//! treats the content of `script`, `style`, `pre` and `textarea` as raw
//! text.

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is not parsed as markup.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

/// An attribute as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    /// Quote character around the value, if any
    pub quote: Option<char>,
    pub offset: usize,
}

/// A start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Name as written (case preserved)
    pub name: &'a str,
    pub attrs: Vec<Attr<'a>>,
    pub self_closing: bool,
    /// Full source text of the tag
    pub raw: &'a str,
    pub offset: usize,
}

impl Tag<'_> {
    pub fn lower_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.lower_name().as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&Attr<'_>> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Doctype { raw: &'a str, offset: usize },
    Comment { raw: &'a str, offset: usize },
    Start(Tag<'a>),
    End { name: &'a str, raw: &'a str, offset: usize },
    Text { text: &'a str, offset: usize },
    /// Unparsed content of a raw text element
    RawText { text: &'a str, offset: usize },
}

impl Token<'_> {
    pub fn offset(&self) -> usize {
        match self {
            Token::Doctype { offset, .. }
            | Token::Comment { offset, .. }
            | Token::End { offset, .. }
            | Token::Text { offset, .. }
            | Token::RawText { offset, .. } => *offset,
            Token::Start(tag) => tag.offset,
        }
    }
}

/// Split `src` into tokens.
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let Some((token, end)) = markup_at(src, pos) else {
            pos += 1;
            continue;
        };

        if text_start < pos {
            tokens.push(Token::Text {
                text: &src[text_start..pos],
                offset: text_start,
            });
        }

        let raw_element = match &token {
            Token::Start(tag) if !tag.self_closing => {
                let name = tag.lower_name();
                RAW_TEXT_ELEMENTS.contains(&name.as_str()).then_some(name)
            }
            _ => None,
        };

        tokens.push(token);
        pos = end;

        if let Some(name) = raw_element {
            let close = find_close_tag(src, pos, &name).unwrap_or(src.len());
            if close > pos {
                tokens.push(Token::RawText {
                    text: &src[pos..close],
                    offset: pos,
                });
            }
            pos = close;
        }

        text_start = pos;
    }

    if text_start < src.len() {
        tokens.push(Token::Text {
            text: &src[text_start..],
            offset: text_start,
        });
    }

    tokens
}

/// 1-based line and column of a byte offset.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..offset.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let col = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, col)
}

fn markup_at(src: &str, pos: usize) -> Option<(Token<'_>, usize)> {
    let rest = &src[pos..];

    if rest.starts_with("<!--") {
        let end = rest[4..].find("-->").map_or(src.len(), |i| pos + 4 + i + 3);
        return Some((
            Token::Comment {
                raw: &src[pos..end],
                offset: pos,
            },
            end,
        ));
    }

    if rest.starts_with("<!") {
        let end = rest.find('>').map_or(src.len(), |i| pos + i + 1);
        let raw = &src[pos..end];
        let is_doctype = raw
            .get(2..9)
            .is_some_and(|s| s.eq_ignore_ascii_case("doctype"));
        let token = if is_doctype {
            Token::Doctype { raw, offset: pos }
        } else {
            Token::Comment { raw, offset: pos }
        };
        return Some((token, end));
    }

    if let Some(after) = rest.strip_prefix("</") {
        let name_len = tag_name_len(after);
        if name_len == 0 {
            return None;
        }
        let end = rest.find('>').map_or(src.len(), |i| pos + i + 1);
        return Some((
            Token::End {
                name: &after[..name_len],
                raw: &src[pos..end],
                offset: pos,
            },
            end,
        ));
    }

    let name_len = tag_name_len(&rest[1..]);
    if name_len == 0 || !rest.as_bytes()[1].is_ascii_alphabetic() {
        return None;
    }

    let name = &rest[1..1 + name_len];
    let (attrs, self_closing, end) = parse_attrs(src, pos + 1 + name_len);

    Some((
        Token::Start(Tag {
            name,
            attrs,
            self_closing,
            raw: &src[pos..end],
            offset: pos,
        }),
        end,
    ))
}

fn tag_name_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_'))
        .count()
}

/// Parse attributes starting at `pos`, returning them, the self-closing flag
/// and the offset just past the closing `>`.
fn parse_attrs(src: &str, mut pos: usize) -> (Vec<Attr<'_>>, bool, usize) {
    let bytes = src.as_bytes();
    let mut attrs = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return (attrs, false, src.len());
        }

        match bytes[pos] {
            b'>' => return (attrs, false, pos + 1),
            b'/' if bytes.get(pos + 1) == Some(&b'>') => return (attrs, true, pos + 2),
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        if pos == name_start {
            // Stray '=' with no attribute name
            pos += 1;
            continue;
        }
        let name = &src[name_start..pos];

        let mut lookahead = pos;
        while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }

        if bytes.get(lookahead) != Some(&b'=') {
            attrs.push(Attr {
                name,
                value: None,
                quote: None,
                offset: name_start,
            });
            continue;
        }

        pos = lookahead + 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let (value, quote) = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let start = pos + 1;
                let end = src[start..].find(q as char).map_or(src.len(), |i| start + i);
                pos = (end + 1).min(src.len());
                (&src[start..end], Some(q as char))
            }
            _ => {
                let start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                (&src[start..pos], None)
            }
        };

        attrs.push(Attr {
            name,
            value: Some(value),
            quote,
            offset: name_start,
        });
    }
}

/// Offset of the `</name` that closes a raw text element.
fn find_close_tag(src: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    let haystack = src[from..].to_ascii_lowercase();
    haystack.find(&needle).map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_tags_text_and_comments() {
        let tokens = tokenize("<!DOCTYPE html><!-- hi --><p class=\"x\">Hello</p>");

        assert!(matches!(tokens[0], Token::Doctype { .. }));
        assert!(matches!(tokens[1], Token::Comment { raw: "<!-- hi -->", .. }));
        match &tokens[2] {
            Token::Start(tag) => {
                assert_eq!(tag.name, "p");
                assert_eq!(tag.attr("class").and_then(|a| a.value), Some("x"));
                assert_eq!(tag.attr("class").and_then(|a| a.quote), Some('"'));
            }
            other => panic!("expected start tag, got {other:?}"),
        }
        assert!(matches!(tokens[3], Token::Text { text: "Hello", .. }));
        assert!(matches!(tokens[4], Token::End { name: "p", .. }));
    }

    #[test]
    fn parses_attribute_forms() {
        let tokens = tokenize("<input type=text disabled value='a b' data-x = \"1\"/>");

        let Token::Start(tag) = &tokens[0] else {
            panic!("expected start tag");
        };

        assert!(tag.self_closing);
        let attrs: Vec<_> = tag
            .attrs
            .iter()
            .map(|a| (a.name, a.value, a.quote))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("type", Some("text"), None),
                ("disabled", None, None),
                ("value", Some("a b"), Some('\'')),
                ("data-x", Some("1"), Some('"')),
            ]
        );
    }

    #[test]
    fn script_content_is_raw() {
        let tokens = tokenize("<script>if (a < b) { x(); }</script>");

        assert_eq!(tokens.len(), 3);
        assert!(matches!(
            tokens[1],
            Token::RawText { text: "if (a < b) { x(); }", .. }
        ));
        assert!(matches!(tokens[2], Token::End { name: "script", .. }));
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let tokens = tokenize("<p>1 < 2</p>");

        assert!(matches!(tokens[1], Token::Text { text: "1 < 2", .. }));
    }

    #[test]
    fn reports_line_and_column() {
        let src = "<html>\n  <body>\n";
        let offset = src.find("<body>").unwrap();

        assert_eq!(line_col(src, offset), (2, 3));
        assert_eq!(line_col(src, 0), (1, 1));
    }
}
