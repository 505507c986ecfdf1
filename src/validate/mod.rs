//! Static markup validation
//!
//! Validation is advisory: a failing report is stored with the page but never
//! stops it from being cloned.

use crate::crawler::{is_css, is_html};
use scraper::Html;

/// Outcome of validating one page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }

    fn from_diagnostics(diagnostics: Vec<String>) -> Self {
        Self {
            valid: diagnostics.is_empty(),
            diagnostics,
        }
    }
}

/// Pass/fail oracle over fetched content
pub trait Validator: Send + Sync {
    fn validate(&self, content: &[u8], content_type: &str) -> ValidationReport;
}

/// Checks HTML parse errors and CSS structural balance
///
/// Content types other than HTML and CSS always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupValidator;

impl Validator for MarkupValidator {
    fn validate(&self, content: &[u8], content_type: &str) -> ValidationReport {
        if is_html(content_type) {
            validate_html(&String::from_utf8_lossy(content))
        } else if is_css(content_type) {
            validate_css(&String::from_utf8_lossy(content))
        } else {
            ValidationReport::pass()
        }
    }
}

fn validate_html(html: &str) -> ValidationReport {
    let document = Html::parse_document(html);
    ValidationReport::from_diagnostics(document.errors.iter().map(|e| e.to_string()).collect())
}

/// Tracks blocks, parentheses, strings and comments in a stylesheet
fn validate_css(css: &str) -> ValidationReport {
    let mut diagnostics = Vec::new();
    let mut depth: i64 = 0;
    let mut parens: i64 = 0;
    let mut line = 1;
    let mut chars = css.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '\n' {
                        line += 1;
                    }
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    diagnostics.push(format!("line {}: unterminated comment", start));
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '\n' => {
                            line += 1;
                            break;
                        }
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    diagnostics.push(format!("line {}: unterminated string", line));
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    diagnostics.push(format!("line {}: unexpected '}}'", line));
                    depth = 0;
                }
            }
            '(' => parens += 1,
            ')' => {
                parens -= 1;
                if parens < 0 {
                    diagnostics.push(format!("line {}: unexpected ')'", line));
                    parens = 0;
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        diagnostics.push(format!("{} unclosed block(s) at end of stylesheet", depth));
    }
    if parens > 0 {
        diagnostics.push(format!("{} unclosed parenthesis at end of stylesheet", parens));
    }

    ValidationReport::from_diagnostics(diagnostics)
}
