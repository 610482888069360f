//! Font database and text measurement for chart and page layout.
//!
//! Rendering uses whatever sans-serif faces the host exposes through the
//! shared font database. Layout cannot ask the renderer for glyph advances
//! before drawing, so widths and line heights come from heuristic metrics
//! tuned for common sans faces (Inter, DejaVu Sans, Helvetica). They err on
//! the wide side, which keeps clipped text inside its box.
//!
//! The database is loaded once and shared read-only. It holds font data
//! only; every surface still builds its own parse options.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use usvg::fontdb::Database;

/// Family name used in generated markup.
pub const FAMILY: &str = "sans-serif";

static DATABASE: Lazy<Arc<Database>> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "font database loaded");
    Arc::new(db)
});

pub fn database() -> Arc<Database> {
    Arc::clone(&DATABASE)
}

/// Lightweight weight indicator so callers avoid stringly-typed lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    SemiBold,
    Bold,
}

impl FontWeight {
    /// CSS/SVG `font-weight` value.
    pub fn css(&self) -> u16 {
        match self {
            FontWeight::Regular => 400,
            FontWeight::SemiBold => 600,
            FontWeight::Bold => 700,
        }
    }

    fn advance_factor(&self) -> f64 {
        match self {
            FontWeight::Regular => 1.0,
            FontWeight::SemiBold => 1.04,
            FontWeight::Bold => 1.08,
        }
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FontWeight::Regular => "Regular",
            FontWeight::SemiBold => "SemiBold",
            FontWeight::Bold => "Bold",
        })
    }
}

/// Vertical metrics used for layout rhythm.
#[derive(Clone, Copy, Debug)]
pub struct TextMetrics {
    /// Chosen vertical line height.
    pub line_h: f64,
    /// Estimated ascender distance above baseline.
    pub asc: f64,
    /// Estimated descender distance below baseline (positive number).
    pub desc: f64,
}

pub fn metrics(size_px: f64) -> TextMetrics {
    let line_h = (size_px * 1.28).round();
    let asc = (size_px * 0.92).round();
    let desc = (line_h - asc).max(size_px * 0.08).round();
    TextMetrics { line_h, asc, desc }
}

/// Estimated advance width of `text` in pixels.
pub fn text_width(text: &str, size_px: f64, weight: FontWeight) -> f64 {
    let em: f64 = text.chars().map(char_advance_em).sum();
    em * size_px * weight.advance_factor()
}

fn char_advance_em(ch: char) -> f64 {
    match ch {
        ' ' => 0.28,
        'i' | 'l' | 'j' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.36,
        'm' | 'w' | 'M' | 'W' | '%' | '@' => 0.86,
        '0'..='9' => 0.58,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii() => 0.56,
        _ => 0.9,
    }
}

/// Greedy word wrap to `max_width`. Words longer than a line are hard-split.
pub fn wrap(text: &str, size_px: f64, weight: FontWeight, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size_px, weight) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut rest = word;
            while text_width(rest, size_px, weight) > max_width {
                let head = truncate(rest, size_px, weight, max_width);
                if head.is_empty() {
                    break;
                }
                rest = &rest[head.len()..];
                lines.push(head.to_string());
            }
            current = rest.to_string();
        }
        lines.push(current);
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Longest prefix of `text` that fits in `max_width`.
pub fn truncate<'a>(text: &'a str, size_px: f64, weight: FontWeight, max_width: f64) -> &'a str {
    let mut width = 0.0;
    for (idx, ch) in text.char_indices() {
        width += char_advance_em(ch) * size_px * weight.advance_factor();
        if width > max_width {
            return &text[..idx];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_increase_with_size() {
        let small = metrics(12.0);
        let large = metrics(48.0);
        assert!(large.line_h > small.line_h);
        assert!(large.asc > small.asc);
    }

    #[test]
    fn baseline_consistency_ratio() {
        let m = metrics(32.0);
        let baseline_ratio = m.asc / 32.0;
        assert!(baseline_ratio > 0.80 && baseline_ratio < 1.05);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let regular = text_width("Attention", 20.0, FontWeight::Regular);
        let bold = text_width("Attention", 20.0, FontWeight::Bold);
        assert!(bold > regular);
    }

    #[test]
    fn wrap_respects_width() {
        let text = "Maintain a regular sleep schedule and repeat the assessment in two weeks.";
        let lines = wrap(text, 20.0, FontWeight::Regular, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 20.0, FontWeight::Regular) <= 200.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn long_words_are_split() {
        let lines = wrap(&"x".repeat(100), 20.0, FontWeight::Regular, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat().len(), 100);
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        let cut = truncate("Größe über alles", 20.0, FontWeight::Regular, 60.0);
        assert!("Größe über alles".starts_with(cut));
    }
}
