//! Path template compilation.
//!
//! Templates use brace tokens for path parameters:
//!
//! | Template | Compiled pattern |
//! |----------|------------------|
//! | `orders` | `orders` |
//! | `orders/{id}` | `orders/(?P<id>[-\w]+)` |
//! | `orders/{id?}` | `orders(?:/(?P<id>[-\w]+))?` |
//!
//! An optional token absorbs the slash in front of it, so `orders/{id?}`
//! matches both `orders` and `orders/42`. The literal parts of a template
//! are passed through as pattern text.
//!
//! # Example
//!
//! ```
//! use trellis_router::{PathCompiler, TemplateMode};
//!
//! let compiler = PathCompiler::new(TemplateMode::PerToken);
//! let pattern = compiler.compile("users/{id}/posts/{slug?}").unwrap();
//! assert_eq!(pattern, r"users/(?P<id>[-\w]+)/posts(?:/(?P<slug>[-\w]+))?");
//! ```

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

use crate::error::{RouteError, RouteResult};

/// Pattern matched by every path parameter.
pub const SEGMENT_PATTERN: &str = r"[-\w]+";

/// How optional tokens are detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// Each token is compiled according to its own `?` marker.
    #[default]
    PerToken,
    /// If any token is optional, every token is treated as optional, and a
    /// token is only rewritten where a `/` precedes it.
    Legacy,
}

/// One `{name}` or `{name?}` token in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathToken {
    /// Parameter name.
    pub name: String,
    /// Whether the token carries the `?` marker.
    pub optional: bool,
    start: usize,
    end: usize,
}

impl PathToken {
    /// Byte range of the token, braces included.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Compiles path templates into regex pattern text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCompiler {
    mode: TemplateMode,
}

impl PathCompiler {
    /// Creates a compiler using `mode`.
    #[must_use]
    pub const fn new(mode: TemplateMode) -> Self {
        Self { mode }
    }

    /// Returns the compiler's mode.
    #[must_use]
    pub const fn mode(&self) -> TemplateMode {
        self.mode
    }

    /// Compiles `template`.
    ///
    /// Templates without braces come back unchanged once they pass the
    /// regex check.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::MalformedTemplate` for unbalanced or nested
    /// braces, invalid or duplicate parameter names, and results that do not
    /// compile as a regex.
    pub fn compile(&self, template: &str) -> RouteResult<String> {
        let compiled = if template.contains(['{', '}']) {
            let tokens = scan_tokens(template)?;
            match self.mode {
                TemplateMode::PerToken => compile_per_token(template, &tokens),
                TemplateMode::Legacy => compile_legacy(template, &tokens),
            }
        } else {
            template.to_string()
        };

        Regex::new(&format!("^{compiled}$"))
            .map_err(|e| RouteError::malformed(template, e.to_string()))?;

        Ok(compiled)
    }
}

/// Scans `template` for brace tokens, left to right.
///
/// # Errors
///
/// Returns `RouteError::MalformedTemplate` on unbalanced or nested braces,
/// empty or non-word names, and names used twice.
pub fn scan_tokens(template: &str) -> RouteResult<Vec<PathToken>> {
    let mut tokens = Vec::new();
    let mut seen = HashSet::new();
    let mut open: Option<usize> = None;

    for (i, ch) in template.char_indices() {
        match ch {
            '{' if open.is_some() => {
                return Err(RouteError::malformed(template, format!("nested `{{` at byte {i}")));
            }
            '{' => open = Some(i),
            '}' => {
                let Some(start) = open.take() else {
                    return Err(RouteError::malformed(template, format!("unmatched `}}` at byte {i}")));
                };
                let inner = &template[start + 1..i];
                let (name, optional) = match inner.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (inner, false),
                };
                validate_name(template, name)?;
                if !seen.insert(name) {
                    return Err(RouteError::malformed(
                        template,
                        format!("parameter `{name}` appears more than once"),
                    ));
                }
                tokens.push(PathToken {
                    name: name.to_string(),
                    optional,
                    start,
                    end: i + 1,
                });
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        return Err(RouteError::malformed(template, format!("unterminated `{{` at byte {start}")));
    }

    Ok(tokens)
}

fn validate_name(template: &str, name: &str) -> RouteResult<()> {
    if name.is_empty() {
        return Err(RouteError::malformed(template, "empty parameter name"));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(RouteError::malformed(
            template,
            format!("parameter `{name}` must contain only letters, digits and `_`"),
        ));
    }
    if name.as_bytes()[0].is_ascii_digit() {
        return Err(RouteError::malformed(
            template,
            format!("parameter `{name}` must not start with a digit"),
        ));
    }
    Ok(())
}

fn required_group(name: &str) -> String {
    format!("(?P<{name}>{SEGMENT_PATTERN})")
}

fn optional_group(name: &str) -> String {
    format!("(?:/(?P<{name}>{SEGMENT_PATTERN}))?")
}

fn compile_per_token(template: &str, tokens: &[PathToken]) -> String {
    let mut out = String::with_capacity(template.len() + tokens.len() * 16);
    let mut cursor = 0;

    for token in tokens {
        let literal = &template[cursor..token.start];
        if token.optional {
            match literal.strip_suffix('/') {
                Some(head) => {
                    out.push_str(head);
                    out.push_str(&optional_group(&token.name));
                }
                None => {
                    out.push_str(literal);
                    out.push_str(&required_group(&token.name));
                    out.push('?');
                }
            }
        } else {
            out.push_str(literal);
            out.push_str(&required_group(&token.name));
        }
        cursor = token.end;
    }

    out.push_str(&template[cursor..]);
    out
}

fn compile_legacy(template: &str, tokens: &[PathToken]) -> String {
    if !tokens.iter().any(|t| t.optional) {
        return compile_per_token(template, tokens);
    }

    let mut out = String::with_capacity(template.len() + tokens.len() * 20);
    let mut cursor = 0;

    for token in tokens {
        let literal = &template[cursor..token.start];
        match literal.strip_suffix('/') {
            Some(head) => {
                out.push_str(head);
                out.push_str(&optional_group(&token.name));
            }
            None => {
                out.push_str(literal);
                out.push_str(&template[token.span()]);
            }
        }
        cursor = token.end;
    }

    out.push_str(&template[cursor..]);
    out
}
