//! `@@include` preprocessor for page templates.
//!
//! ```html
//! @@include('partials/header.html', {"title": "Home"})
//! <h1>@@title</h1>
//! ```
//!
//! Paths resolve relative to the including file. Variables come from the
//! JSON context of the include that pulled the file in, merged over the
//! parent's context. Unknown variables are left untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::PipelineError;

const DIRECTIVE: &str = "@@include(";

static ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(.*?))?\s*$"#)
        .expect("Invalid include arguments regex")
});

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)").expect("Invalid variable regex")
});

/// Render a page, expanding includes and variables recursively.
pub fn render(path: &Path) -> Result<String, PipelineError> {
    render_with(path, &Value::Object(Map::new()))
}

/// Render a page with an initial variable context.
pub fn render_with(path: &Path, context: &Value) -> Result<String, PipelineError> {
    let mut stack = Vec::new();
    expand(path, context, &mut stack)
}

fn expand(
    path: &Path,
    context: &Value,
    stack: &mut Vec<PathBuf>,
) -> Result<String, PipelineError> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if let Some(pos) = stack.iter().position(|p| *p == key) {
        let chain: Vec<String> = stack[pos..]
            .iter()
            .chain(std::iter::once(&key))
            .map(|p| p.display().to_string())
            .collect();
        return Err(include_error(
            path,
            format!("include cycle: {}", chain.join(" -> ")),
        ));
    }

    let source = fs::read_to_string(path).map_err(|e| PipelineError::read(path, e))?;
    let source = substitute(&source, context);
    let base = path.parent().unwrap_or(Path::new("."));

    stack.push(key);

    let mut out = String::with_capacity(source.len());
    let mut rest = source.as_str();

    while let Some(start) = rest.find(DIRECTIVE) {
        out.push_str(&rest[..start]);

        let args_start = start + DIRECTIVE.len();
        let args_len = closing_paren(&rest[args_start..])
            .ok_or_else(|| include_error(path, "unterminated @@include(".to_string()))?;
        let (target, local) = parse_args(&rest[args_start..args_start + args_len])
            .map_err(|message| include_error(path, message))?;

        let target_path = base.join(&target);
        if !target_path.is_file() {
            return Err(include_error(path, format!("'{target}' not found")));
        }

        let merged = merge(context, local);
        tracing::debug!("Including {} into {}", target_path.display(), path.display());
        out.push_str(&expand(&target_path, &merged, stack)?);

        rest = &rest[args_start + args_len + 1..];
    }
    out.push_str(rest);

    stack.pop();
    Ok(out)
}

/// Length up to the `)` closing an include, skipping quoted text and
/// nested brackets.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    None
}

fn parse_args(args: &str) -> Result<(String, Option<Map<String, Value>>), String> {
    let caps = ARGS_RE
        .captures(args)
        .ok_or_else(|| format!("malformed arguments ({})", args.trim()))?;

    let target = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let local = match caps.get(3).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(json) => match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => return Err("include context must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid include context: {e}")),
        },
        None => None,
    };

    Ok((target, local))
}

fn merge(parent: &Value, local: Option<Map<String, Value>>) -> Value {
    let mut merged = match parent {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Some(local) = local {
        merged.extend(local);
    }
    Value::Object(merged)
}

fn substitute(source: &str, context: &Value) -> String {
    VAR_RE
        .replace_all(source, |caps: &Captures<'_>| {
            let name = &caps[1];
            if name == "include" {
                return caps[0].to_string();
            }
            match lookup(context, name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => caps[0].to_string(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

fn lookup<'v>(context: &'v Value, name: &str) -> Option<&'v Value> {
    name.split('.').try_fold(context, |value, key| value.get(key))
}

fn include_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Include {
        path: path.to_path_buf(),
        message,
    }
}
