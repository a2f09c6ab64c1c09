//! Styled drawing primitives and their SVG serialization.

use std::fmt::Write;

use crate::geometry::PlanarPoint;

/// What a fill is painted with.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Color(String),
    /// Reference to a `<pattern>` definition by id.
    Pattern(String),
}

impl Paint {
    /// Attribute value, already escaped.
    fn svg_value(&self) -> String {
        match self {
            Paint::Color(c) => escape_xml(c),
            Paint::Pattern(id) => format!("url(#{})", escape_xml(id)),
        }
    }
}

/// Escapes text for use in XML attributes and content.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub paint: Paint,
    pub opacity: f64,
}

impl Fill {
    pub fn color(color: impl Into<String>, opacity: f64) -> Self {
        Self {
            paint: Paint::Color(color.into()),
            opacity,
        }
    }

    pub fn pattern(id: impl Into<String>, opacity: f64) -> Self {
        Self {
            paint: Paint::Pattern(id.into()),
            opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    /// Dash and gap lengths; `None` is solid.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            opacity: 1.0,
            dash: None,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_dash(mut self, dash: f64, gap: f64) -> Self {
        self.dash = Some((dash, gap));
        self
    }
}

/// Geometry of a primitive in container pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// SVG path data.
    Path(String),
    Circle { center: PlanarPoint, radius: f64 },
}

/// One drawable element.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPrimitive {
    pub shape: Shape,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

impl PathPrimitive {
    pub fn path(data: String) -> Self {
        Self {
            shape: Shape::Path(data),
            fill: None,
            stroke: None,
        }
    }

    pub fn circle(center: PlanarPoint, radius: f64) -> Self {
        Self {
            shape: Shape::Circle { center, radius },
            fill: None,
            stroke: None,
        }
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    /// Path data for `Path` shapes.
    pub fn data(&self) -> Option<&str> {
        match &self.shape {
            Shape::Path(d) => Some(d),
            Shape::Circle { .. } => None,
        }
    }

    /// Serializes as a single `<path>` or `<circle>` element.
    pub fn to_svg(&self) -> String {
        let mut out = match &self.shape {
            Shape::Path(d) => format!("<path d=\"{}\"", d),
            Shape::Circle { center, radius } => format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\"",
                center.x, center.y, radius
            ),
        };

        // Write on String is infallible.
        match &self.fill {
            Some(fill) => {
                let _ = write!(out, " fill=\"{}\"", fill.paint.svg_value());
                if fill.opacity < 1.0 {
                    let _ = write!(out, " fill-opacity=\"{}\"", fill.opacity);
                }
                if matches!(self.shape, Shape::Path(_)) {
                    out.push_str(" fill-rule=\"evenodd\"");
                }
            }
            None => out.push_str(" fill=\"none\""),
        }

        if let Some(stroke) = &self.stroke {
            let _ = write!(out, " stroke=\"{}\" stroke-width=\"{}\"", escape_xml(&stroke.color), stroke.width);
            if stroke.opacity < 1.0 {
                let _ = write!(out, " stroke-opacity=\"{}\"", stroke.opacity);
            }
            if let Some((dash, gap)) = stroke.dash {
                let _ = write!(out, " stroke-dasharray=\"{} {}\"", dash, gap);
            }
            out.push_str(" stroke-linejoin=\"round\" stroke-linecap=\"round\"");
        }

        out.push_str("/>");
        out
    }
}

/// Builds SVG path data from projected polylines.
///
/// Each polyline becomes one `M ... L ...` subpath, terminated with `Z` when
/// `closed` is set. Polylines with fewer than two points are skipped.
pub fn path_data<'a>(lines: impl IntoIterator<Item = &'a [PlanarPoint]>, closed: bool) -> String {
    let mut out = String::new();
    for line in lines {
        if line.len() < 2 {
            continue;
        }
        for (i, p) in line.iter().enumerate() {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{} {:.2} {:.2}", if i == 0 { 'M' } else { 'L' }, p.x, p.y);
        }
        if closed {
            out.push_str(" Z");
        }
    }
    out
}
