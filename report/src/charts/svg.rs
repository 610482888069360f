//! Minimal SVG markup builder used by charts and page templates.

use crate::core::format::format_tick;
use crate::render::fonts::{FontWeight, FAMILY};

pub const INK: &str = "#1f2430";
pub const MUTED: &str = "#6b7280";
pub const GRID: &str = "#e3e6ec";
pub const FRAME: &str = "#9aa3b2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Escape text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

pub struct SvgCanvas {
    width: f64,
    height: f64,
    defs: String,
    body: String,
}

impl SvgCanvas {
    /// New canvas with a solid white background.
    pub fn new(width: f64, height: f64) -> Self {
        let mut canvas = Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
        };
        canvas.rect(0.0, 0.0, width, height, "#ffffff");
        canvas
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        self.body.push_str(&format!(
            "<rect x='{x:.2}' y='{y:.2}' width='{:.2}' height='{:.2}' fill='{fill}'/>",
            w.max(0.0),
            h.max(0.0)
        ));
    }

    pub fn rect_outline(&mut self, x: f64, y: f64, w: f64, h: f64, stroke: &str, stroke_w: f64) {
        self.body.push_str(&format!(
            "<rect x='{x:.2}' y='{y:.2}' width='{:.2}' height='{:.2}' fill='none' stroke='{stroke}' stroke-width='{stroke_w}'/>",
            w.max(0.0),
            h.max(0.0)
        ));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, stroke_w: f64) {
        self.body.push_str(&format!(
            "<line x1='{x1:.2}' y1='{y1:.2}' x2='{x2:.2}' y2='{y2:.2}' stroke='{stroke}' stroke-width='{stroke_w}'/>"
        ));
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, stroke_w: f64) {
        if points.is_empty() {
            return;
        }
        self.body.push_str(&format!(
            "<polyline points='{}' fill='none' stroke='{stroke}' stroke-width='{stroke_w}' stroke-linejoin='round'/>",
            point_list(points)
        ));
    }

    pub fn polygon(&mut self, points: &[(f64, f64)], fill: &str, fill_opacity: f64, stroke: &str) {
        if points.is_empty() {
            return;
        }
        self.body.push_str(&format!(
            "<polygon points='{}' fill='{fill}' fill-opacity='{fill_opacity}' stroke='{stroke}' stroke-width='2'/>",
            point_list(points)
        ));
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
        self.body.push_str(&format!(
            "<circle cx='{cx:.2}' cy='{cy:.2}' r='{r}' fill='{fill}'/>"
        ));
    }

    pub fn text(
        &mut self,
        x: f64,
        y: f64,
        content: &str,
        size: f64,
        anchor: Anchor,
        weight: FontWeight,
        fill: &str,
    ) {
        self.body.push_str(&format!(
            "<text x='{x:.2}' y='{y:.2}' font-family='{FAMILY}' font-size='{size}' font-weight='{}' text-anchor='{}' fill='{fill}'>{}</text>",
            weight.css(),
            anchor.as_str(),
            escape(content)
        ));
    }

    /// Text rotated -90° around its anchor point, for vertical axis titles.
    pub fn vertical_text(&mut self, x: f64, y: f64, content: &str, size: f64, fill: &str) {
        self.body.push_str(&format!(
            "<text x='{x:.2}' y='{y:.2}' transform='rotate(-90 {x:.2} {y:.2})' font-family='{FAMILY}' font-size='{size}' text-anchor='middle' fill='{fill}'>{}</text>",
            escape(content)
        ));
    }

    pub fn image(&mut self, x: f64, y: f64, w: f64, h: f64, href: &str) {
        self.body.push_str(&format!(
            "<image x='{x:.2}' y='{y:.2}' width='{w:.2}' height='{h:.2}' preserveAspectRatio='xMidYMid meet' xlink:href='{href}'/>"
        ));
    }

    /// Register a rectangular clip path; children of `open_clip_group` are clipped to it.
    pub fn clip_rect(&mut self, id: &str, x: f64, y: f64, w: f64, h: f64) {
        self.defs.push_str(&format!(
            "<clipPath id='{id}'><rect x='{x:.2}' y='{y:.2}' width='{:.2}' height='{:.2}'/></clipPath>",
            w.max(0.0),
            h.max(0.0)
        ));
    }

    pub fn open_clip_group(&mut self, id: &str) {
        self.body.push_str(&format!("<g clip-path='url(#{id})'>"));
    }

    pub fn close_group(&mut self) {
        self.body.push_str("</g>");
    }

    pub fn finish(self) -> String {
        let defs = if self.defs.is_empty() {
            String::new()
        } else {
            format!("<defs>{}</defs>", self.defs)
        };
        format!(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink' width='{w}' height='{h}' viewBox='0 0 {w} {h}'>{defs}{body}</svg>",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn point_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rectangle that data is plotted into, in canvas coordinates.
#[derive(Clone, Copy, Debug)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    /// Standard inner area with room for axis ticks and titles.
    pub fn inset(canvas_w: f64, canvas_h: f64, right_extra: f64) -> Self {
        Self {
            left: 86.0,
            top: 58.0,
            width: canvas_w - 86.0 - 28.0 - right_extra,
            height: canvas_h - 58.0 - 62.0,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn x(&self, value: f64, range: (f64, f64)) -> f64 {
        self.left + unit(value, range) * self.width
    }

    pub fn y(&self, value: f64, range: (f64, f64)) -> f64 {
        self.bottom() - unit(value, range) * self.height
    }
}

fn unit(value: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        0.5
    } else {
        (value - min) / span
    }
}

/// Title, frame, gridlines, tick labels and axis titles.
pub fn draw_axes(
    canvas: &mut SvgCanvas,
    area: PlotArea,
    title: &str,
    x_axis: Option<((f64, f64), &str)>,
    y_axis: ((f64, f64), &str),
) {
    canvas.text(
        area.left,
        34.0,
        title,
        22.0,
        Anchor::Start,
        FontWeight::SemiBold,
        INK,
    );

    let (y_range, y_title) = y_axis;
    for step in 0..=4 {
        let value = y_range.0 + (y_range.1 - y_range.0) * step as f64 / 4.0;
        let y = area.y(value, y_range);
        canvas.line(area.left, y, area.right(), y, GRID, 1.0);
        canvas.text(
            area.left - 10.0,
            y + 5.0,
            &format_tick(value),
            14.0,
            Anchor::End,
            FontWeight::Regular,
            MUTED,
        );
    }
    canvas.vertical_text(22.0, area.top + area.height / 2.0, y_title, 15.0, MUTED);

    if let Some((x_range, x_title)) = x_axis {
        for step in 0..=5 {
            let value = x_range.0 + (x_range.1 - x_range.0) * step as f64 / 5.0;
            let x = area.x(value, x_range);
            canvas.line(x, area.bottom(), x, area.bottom() + 6.0, FRAME, 1.0);
            canvas.text(
                x,
                area.bottom() + 24.0,
                &format_tick(value),
                14.0,
                Anchor::Middle,
                FontWeight::Regular,
                MUTED,
            );
        }
        canvas.text(
            area.left + area.width / 2.0,
            area.bottom() + 50.0,
            x_title,
            15.0,
            Anchor::Middle,
            FontWeight::Regular,
            MUTED,
        );
    }

    canvas.rect_outline(area.left, area.top, area.width, area.height, FRAME, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_markup_characters() {
        assert_eq!(escape("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
        assert_eq!(escape("line\u{0}break"), "linebreak");
    }

    #[test]
    fn plot_area_maps_range_edges() {
        let area = PlotArea {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(area.x(0.0, (0.0, 10.0)), 10.0);
        assert_eq!(area.x(10.0, (0.0, 10.0)), 110.0);
        assert_eq!(area.y(0.0, (0.0, 1.0)), 70.0);
        assert_eq!(area.y(1.0, (0.0, 1.0)), 20.0);
    }

    #[test]
    fn finish_wraps_defs_and_body() {
        let mut canvas = SvgCanvas::new(10.0, 10.0);
        canvas.clip_rect("c0", 0.0, 0.0, 5.0, 5.0);
        let svg = canvas.finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<defs><clipPath id='c0'>"));
        assert!(svg.ends_with("</svg>"));
    }
}
