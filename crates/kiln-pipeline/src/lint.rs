//! Markup linter.
//!
//! Implements the default HTMLHint rule set: `doctype-first`,
//! `tagname-lowercase`, `attr-lowercase`, `attr-value-double-quotes`,
//! `attr-no-duplication`, `tag-pair`, `id-unique`, `src-not-empty`,
//! `spec-char-escape` and `title-require`.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::markup::{line_col, tokenize, Tag, Token};

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintViolation {
    pub path: PathBuf,
    pub line: usize,
    pub col: usize,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for LintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} [{}] {}",
            self.path.display(),
            self.line,
            self.col,
            self.rule,
            self.message
        )
    }
}

/// Collects violations for one document.
struct Report<'s> {
    path: &'s Path,
    src: &'s str,
    violations: Vec<LintViolation>,
}

impl Report<'_> {
    fn add(&mut self, offset: usize, rule: &'static str, message: String) {
        let (line, col) = line_col(self.src, offset);
        self.violations.push(LintViolation {
            path: self.path.to_path_buf(),
            line,
            col,
            rule,
            message,
        });
    }
}

/// Lint one document. `path` is only used for reporting.
pub fn lint(path: &Path, src: &str) -> Vec<LintViolation> {
    let tokens = tokenize(src);
    let mut report = Report {
        path,
        src,
        violations: Vec::new(),
    };

    doctype_first(&tokens, &mut report);

    let mut ids: HashSet<&str> = HashSet::new();
    for token in &tokens {
        match token {
            Token::Start(tag) => {
                tagname_lowercase(tag.name, tag.offset, &mut report);
                attributes(tag, &mut ids, &mut report);
            }
            Token::End { name, offset, .. } => tagname_lowercase(name, *offset, &mut report),
            Token::Text { text, offset } => spec_char_escape(text, *offset, &mut report),
            _ => {}
        }
    }

    tag_pair(&tokens, &mut report);
    title_require(&tokens, &mut report);

    report.violations.sort_by_key(|v| (v.line, v.col));
    report.violations
}

fn doctype_first(tokens: &[Token<'_>], report: &mut Report<'_>) {
    let first = tokens.iter().find(|t| match t {
        Token::Text { text, .. } => !text.trim().is_empty(),
        _ => true,
    });

    match first {
        Some(Token::Doctype { .. }) | None => {}
        Some(token) => report.add(
            token.offset(),
            "doctype-first",
            "Doctype must be declared first.".to_string(),
        ),
    }
}

fn tagname_lowercase(name: &str, offset: usize, report: &mut Report<'_>) {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        report.add(
            offset,
            "tagname-lowercase",
            format!("The html element name of [ {name} ] must be in lowercase."),
        );
    }
}

fn attributes<'a>(tag: &Tag<'a>, ids: &mut HashSet<&'a str>, report: &mut Report<'_>) {
    let tag_name = tag.lower_name();
    let mut seen: HashSet<String> = HashSet::new();

    for attr in &tag.attrs {
        if attr.name.bytes().any(|b| b.is_ascii_uppercase()) {
            report.add(
                attr.offset,
                "attr-lowercase",
                format!("The attribute name of [ {} ] must be in lowercase.", attr.name),
            );
        }

        let value = attr.value.unwrap_or("");
        let badly_quoted = match attr.value {
            Some(v) if !v.is_empty() => attr.quote != Some('"'),
            Some(_) => attr.quote == Some('\''),
            None => false,
        };
        if badly_quoted {
            report.add(
                attr.offset,
                "attr-value-double-quotes",
                format!(
                    "The value of attribute [ {} ] must be in double quotes.",
                    attr.name
                ),
            );
        }

        if !seen.insert(attr.name.to_ascii_lowercase()) {
            report.add(
                attr.offset,
                "attr-no-duplication",
                format!(
                    "Duplicate of attribute name [ {} ] was found.",
                    attr.name
                ),
            );
        }

        if attr.name.eq_ignore_ascii_case("id") {
            if let Some(id) = attr.value.filter(|v| !v.is_empty()) {
                if !ids.insert(id) {
                    report.add(
                        attr.offset,
                        "id-unique",
                        format!("The id value [ {id} ] must be unique."),
                    );
                }
            }
        }

        let name = attr.name.to_ascii_lowercase();
        let is_source = matches!(
            (tag_name.as_str(), name.as_str()),
            ("img" | "script" | "embed" | "bgsound" | "iframe", "src")
                | ("link", "href")
                | ("object", "data")
        );
        if is_source && value.is_empty() {
            report.add(
                attr.offset,
                "src-not-empty",
                format!(
                    "The attribute [ {} ] of the tag [ {} ] must have a value.",
                    attr.name, tag.name
                ),
            );
        }
    }
}

fn spec_char_escape(text: &str, offset: usize, report: &mut Report<'_>) {
    for (i, c) in text.char_indices() {
        if c == '<' || c == '>' {
            report.add(
                offset + i,
                "spec-char-escape",
                format!("Special characters must be escaped : [ {c} ]."),
            );
        }
    }
}

fn tag_pair(tokens: &[Token<'_>], report: &mut Report<'_>) {
    let mut stack: Vec<(String, usize)> = Vec::new();

    for token in tokens {
        match token {
            Token::Start(tag) if !tag.self_closing && !tag.is_void() => {
                stack.push((tag.lower_name(), tag.offset));
            }
            Token::End { name, offset, .. } => {
                let name = name.to_ascii_lowercase();
                match stack.iter().rposition(|(open, _)| *open == name) {
                    Some(pos) => {
                        for (unclosed, open_offset) in stack.drain(pos + 1..).rev() {
                            let (line, _) = line_col(report.src, open_offset);
                            report.add(
                                *offset,
                                "tag-pair",
                                format!(
                                    "Tag must be paired, missing: [ </{unclosed}> ], start tag match failed [ <{unclosed}> ] on line {line}."
                                ),
                            );
                        }
                        stack.pop();
                    }
                    None => report.add(
                        *offset,
                        "tag-pair",
                        format!("Tag must be paired, no start tag: [ </{name}> ]"),
                    ),
                }
            }
            _ => {}
        }
    }

    for (unclosed, open_offset) in stack {
        let (line, _) = line_col(report.src, open_offset);
        report.add(
            open_offset,
            "tag-pair",
            format!(
                "Tag must be paired, missing: [ </{unclosed}> ], open tag match failed [ <{unclosed}> ] on line {line}."
            ),
        );
    }
}

fn title_require(tokens: &[Token<'_>], report: &mut Report<'_>) {
    let mut in_head = false;
    let mut has_title = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Start(tag) if tag.lower_name() == "head" => in_head = true,
            Token::Start(tag) if in_head && tag.lower_name() == "title" => {
                has_title = true;
                let empty = match tokens.get(i + 1) {
                    Some(Token::RawText { text, .. }) | Some(Token::Text { text, .. }) => {
                        text.trim().is_empty()
                    }
                    _ => true,
                };
                if empty {
                    report.add(
                        tag.offset,
                        "title-require",
                        "<title></title> must not be empty.".to_string(),
                    );
                }
            }
            Token::End { name, offset, .. } if name.eq_ignore_ascii_case("head") => {
                if !has_title {
                    report.add(
                        *offset,
                        "title-require",
                        "<title> must be present in <head> tag.".to_string(),
                    );
                }
                in_head = false;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Home</title>
  <link rel="stylesheet" href="styles/main.css">
</head>
<body>
  <div id="app" class="wrap"><img src="logo.png" alt=""></div>
  <script src="scripts/app.js"></script>
</body>
</html>
"#;

    fn rules(src: &str) -> Vec<&'static str> {
        lint(Path::new("index.html"), src)
            .into_iter()
            .map(|v| v.rule)
            .collect()
    }

    #[test]
    fn clean_document_passes() {
        assert!(rules(CLEAN).is_empty(), "{:?}", lint(Path::new("x"), CLEAN));
    }

    #[test]
    fn requires_doctype_first() {
        assert_eq!(rules("<html><head><title>x</title></head></html>"), vec!["doctype-first"]);
    }

    #[test]
    fn flags_case_and_quoting() {
        let src = "<!DOCTYPE html><DIV Class='x'></DIV>";
        let found = rules(src);

        assert_eq!(
            found,
            vec![
                "tagname-lowercase",
                "attr-lowercase",
                "attr-value-double-quotes",
                "tagname-lowercase"
            ]
        );
    }

    #[test]
    fn flags_unpaired_tags() {
        let violations = lint(Path::new("a.html"), "<!DOCTYPE html>\n<div><span></div>\n</p>");

        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("</span>"));
        assert!(violations[1].message.contains("no start tag"));
        assert_eq!(violations[1].line, 3);
    }

    #[test]
    fn flags_duplicates_and_empty_sources() {
        let src = r#"<!DOCTYPE html><p id="a" id="b"></p><i id="a"></i><img src=""><script src=""></script>"#;
        let found = rules(src);

        assert!(found.contains(&"attr-no-duplication"));
        assert!(found.contains(&"id-unique"));
        assert_eq!(found.iter().filter(|r| **r == "src-not-empty").count(), 2);
    }

    #[test]
    fn flags_unescaped_text() {
        assert_eq!(rules("<!DOCTYPE html><p>a > b</p>"), vec!["spec-char-escape"]);
    }

    #[test]
    fn requires_title_in_head() {
        assert_eq!(
            rules("<!DOCTYPE html><html><head></head></html>"),
            vec!["title-require"]
        );
        assert_eq!(
            rules("<!DOCTYPE html><html><head><title> </title></head></html>"),
            vec!["title-require"]
        );
    }

    #[test]
    fn violation_display_includes_location() {
        let v = &lint(Path::new("src/index.html"), "\n<p>")[0];
        assert_eq!(
            v.to_string(),
            "src/index.html:2:1 [doctype-first] Doctype must be declared first."
        );
    }
}
