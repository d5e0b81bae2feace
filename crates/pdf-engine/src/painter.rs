//! Content-stream generation for one page.
//!
//! Geometry arrives normalized, is scaled to points and flipped into PDF
//! space (origin bottom-left) before any operator is emitted.

use crate::color::Rgb;
use crate::fonts::{encode_win_ansi, FontMetrics, BODY_FONT};
use doc_model::{
    to_export_space, AnnotationItem, AnnotationKind, ExportRect, NormRect, PageElement, PageSize,
    ShapeItem, ShapeKind, SurfaceSize, TextItem,
};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

/// Bézier handle length for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_8;
/// Arrowhead half-angle (30 degrees).
const ARROW_ANGLE: f64 = std::f64::consts::PI / 6.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum PaintError {
    #[error("geometry is not finite")]
    NonFinite,
    #[error("freehand stroke needs at least two points, found {0}")]
    TooFewPoints(usize),
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn op(operator: &str, operands: &[f64]) -> Operation {
    Operation::new(operator, operands.iter().copied().map(real).collect())
}

fn finite(values: &[f64]) -> Result<(), PaintError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(PaintError::NonFinite)
    }
}

/// Accumulates the operators of one page.
pub(crate) struct PageCanvas {
    page: PageSize,
    ops: Vec<Operation>,
    opacity_states: Vec<(String, f64)>,
}

impl PageCanvas {
    pub fn new(page: PageSize) -> Self {
        Self { page, ops: Vec::new(), opacity_states: Vec::new() }
    }

    fn surface(&self) -> SurfaceSize {
        self.page.surface()
    }

    /// PDF-space rectangle of a normalized box.
    fn export_rect(&self, rect: NormRect) -> ExportRect {
        rect.to_pixels(self.surface()).to_export(self.page.height)
    }

    /// PDF-space point of a normalized point.
    fn export_point(&self, x_norm: f64, y_norm: f64) -> (f64, f64) {
        to_export_space(x_norm * self.page.width, y_norm * self.page.height, self.page.height)
    }

    /// Saves state and clips to the page bounds.
    pub fn push_clip(&mut self) {
        let PageSize { width, height } = self.page;
        self.ops.push(op("q", &[]));
        self.ops.push(op("m", &[0.0, 0.0]));
        self.ops.push(op("l", &[width, 0.0]));
        self.ops.push(op("l", &[width, height]));
        self.ops.push(op("l", &[0.0, height]));
        self.ops.push(op("h", &[]));
        self.ops.push(op("W", &[]));
        self.ops.push(op("n", &[]));
    }

    pub fn pop_clip(&mut self) {
        self.ops.push(op("Q", &[]));
    }

    /// Name of an `ExtGState` with the given fill and stroke alpha.
    fn opacity_state(&mut self, opacity: f64) -> String {
        let opacity = opacity.clamp(0.0, 1.0);
        if let Some((name, _)) = self.opacity_states.iter().find(|(_, a)| *a == opacity) {
            return name.clone();
        }
        let name = format!("GS{}", self.opacity_states.len());
        self.opacity_states.push((name.clone(), opacity));
        name
    }

    pub fn opacity_states(&self) -> &[(String, f64)] {
        &self.opacity_states
    }

    fn set_fill(&mut self, color: Rgb) {
        self.ops.push(op("rg", &color.components()));
    }

    fn set_stroke(&mut self, color: Rgb, width: f64) {
        self.ops.push(op("RG", &color.components()));
        self.ops.push(op("w", &[width]));
    }

    /// Draws `item` so the top of its first line's glyphs sits at the
    /// element's top edge. Returns true when characters were substituted.
    pub fn text(&mut self, item: &TextItem, metrics: &FontMetrics) -> Result<bool, PaintError> {
        let size = item.font_size;
        let (x, top) = self.export_point(item.x_norm, item.y_norm_top);
        finite(&[x, top, size])?;

        let color = Rgb::parse_or(&item.color, Rgb::BLACK);
        let leading = size * metrics.line_height;
        let mut lossy = false;

        self.ops.push(op("BT", &[]));
        self.ops.push(Operation::new("Tf", vec![Object::Name(BODY_FONT.into()), real(size)]));
        self.set_fill(color);
        for (line_index, line) in item.text.split('\n').enumerate() {
            let baseline = top - metrics.ascent_at(size) - leading * line_index as f64;
            let (bytes, substituted) = encode_win_ansi(line.trim_end_matches('\r'));
            lossy |= substituted;

            // Absolute placement per line via the text matrix.
            self.ops.push(op("Tm", &[1.0, 0.0, 0.0, 1.0, x, baseline]));
            self.ops.push(Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]));
        }
        self.ops.push(op("ET", &[]));
        Ok(lossy)
    }

    /// Paints the image XObject `name` into `rect`.
    pub fn image(&mut self, name: &str, rect: NormRect) -> Result<(), PaintError> {
        let target = self.export_rect(rect);
        finite(&[target.x, target.y, target.width, target.height])?;

        self.ops.push(op("q", &[]));
        self.ops.push(op("cm", &[target.width, 0.0, 0.0, target.height, target.x, target.y]));
        self.ops.push(Operation::new("Do", vec![Object::Name(name.into())]));
        self.ops.push(op("Q", &[]));
        Ok(())
    }

    /// Appends the path of `shape` without painting it.
    fn shape_path(&self, shape: &ShapeItem) -> Result<Vec<Operation>, PaintError> {
        let rect = shape.norm_rect().unwrap_or_default();
        let ExportRect { x, y, width: w, height: h } = self.export_rect(rect);
        finite(&[x, y, w, h])?;
        let top = y + h;

        let polygon = |points: &[(f64, f64)]| {
            let mut path = Vec::with_capacity(points.len() + 1);
            for (i, (px, py)) in points.iter().enumerate() {
                path.push(op(if i == 0 { "m" } else { "l" }, &[*px, *py]));
            }
            path.push(op("h", &[]));
            path
        };

        let path = match shape.kind {
            ShapeKind::Rectangle => vec![op("re", &[x, y, w, h])],
            ShapeKind::Circle => {
                let (cx, cy) = (x + w / 2.0, y + h / 2.0);
                let (rx, ry) = (w / 2.0, h / 2.0);
                let (kx, ky) = (rx * KAPPA, ry * KAPPA);
                vec![
                    op("m", &[cx + rx, cy]),
                    op("c", &[cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry]),
                    op("c", &[cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy]),
                    op("c", &[cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry]),
                    op("c", &[cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy]),
                    op("h", &[]),
                ]
            }
            ShapeKind::Line => vec![op("m", &[x, top]), op("l", &[x + w, y])],
            ShapeKind::Arrow => {
                let (x1, y1, x2, y2) = (x, top, x + w, y);
                let angle = (y2 - y1).atan2(x2 - x1);
                let head = 10.0 * shape.stroke_width;
                vec![
                    op("m", &[x1, y1]),
                    op("l", &[x2, y2]),
                    op("m", &[x2, y2]),
                    op(
                        "l",
                        &[
                            x2 - head * (angle - ARROW_ANGLE).cos(),
                            y2 - head * (angle - ARROW_ANGLE).sin(),
                        ],
                    ),
                    op("m", &[x2, y2]),
                    op(
                        "l",
                        &[
                            x2 - head * (angle + ARROW_ANGLE).cos(),
                            y2 - head * (angle + ARROW_ANGLE).sin(),
                        ],
                    ),
                ]
            }
            ShapeKind::Triangle => polygon(&[(x + w / 2.0, top), (x, y), (x + w, y)]),
            ShapeKind::Diamond => polygon(&[
                (x + w / 2.0, top),
                (x + w, y + h / 2.0),
                (x + w / 2.0, y),
                (x, y + h / 2.0),
            ]),
            ShapeKind::Freehand => {
                if shape.points.len() < 2 {
                    return Err(PaintError::TooFewPoints(shape.points.len()));
                }
                let points: Vec<(f64, f64)> = shape
                    .points
                    .iter()
                    .map(|point| self.export_point(point.x_norm, point.y_norm))
                    .collect();
                finite(&points.iter().flat_map(|(px, py)| [*px, *py]).collect::<Vec<_>>())?;
                points
                    .iter()
                    .enumerate()
                    .map(|(i, (px, py))| op(if i == 0 { "m" } else { "l" }, &[*px, *py]))
                    .collect()
            }
        };
        Ok(path)
    }

    /// Fills (when the shape has a fill) and then strokes the outline.
    pub fn shape(&mut self, shape: &ShapeItem) -> Result<(), PaintError> {
        let path = self.shape_path(shape)?;
        finite(&[shape.stroke_width])?;

        self.ops.push(op("q", &[]));
        let fill = shape.fill_color.as_deref().filter(|_| shape.kind.is_fillable());
        if let Some(fill) = fill {
            self.set_fill(Rgb::parse_or(fill, Rgb::WHITE));
            self.ops.extend(path.iter().cloned());
            self.ops.push(op("f", &[]));
        }
        if shape.stroke_width > 0.0 {
            self.set_stroke(Rgb::parse_or(&shape.stroke_color, Rgb::BLACK), shape.stroke_width);
            self.ops.push(op("J", &[1.0]));
            self.ops.extend(path);
            self.ops.push(op("S", &[]));
        }
        self.ops.push(op("Q", &[]));
        Ok(())
    }

    /// Highlights fill their spans; underline and strikethrough stroke a
    /// line across each span.
    pub fn annotation(
        &mut self,
        annotation: &AnnotationItem,
        spans: &[NormRect],
    ) -> Result<(), PaintError> {
        let rects: Vec<ExportRect> = spans.iter().map(|span| self.export_rect(*span)).collect();
        finite(&rects.iter().flat_map(|r| [r.x, r.y, r.width, r.height]).collect::<Vec<_>>())?;
        finite(&[annotation.opacity])?;

        let color = Rgb::parse_or(&annotation.color, Rgb::BLACK);
        self.ops.push(op("q", &[]));
        if annotation.opacity < 1.0 {
            let state = self.opacity_state(annotation.opacity);
            self.ops.push(Operation::new("gs", vec![Object::Name(state.into_bytes())]));
        }

        match annotation.kind {
            AnnotationKind::Highlight => {
                self.set_fill(color);
                for rect in &rects {
                    self.ops.push(op("re", &[rect.x, rect.y, rect.width, rect.height]));
                }
                self.ops.push(op("f", &[]));
            }
            AnnotationKind::Underline | AnnotationKind::Strikethrough => {
                for rect in &rects {
                    let thickness = (rect.height * 0.08).max(1.0);
                    let line_y = match annotation.kind {
                        AnnotationKind::Underline => rect.y + thickness / 2.0,
                        _ => rect.y + rect.height / 2.0,
                    };
                    self.set_stroke(color, thickness);
                    self.ops.push(op("m", &[rect.x, line_y]));
                    self.ops.push(op("l", &[rect.x + rect.width, line_y]));
                    self.ops.push(op("S", &[]));
                }
            }
        }
        self.ops.push(op("Q", &[]));
        Ok(())
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn encode(self) -> Result<Vec<u8>, lopdf::Error> {
        Content { operations: self.ops }.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::HELVETICA;
    use doc_model::{AnnotationSpan, NormPoint};

    fn page() -> PageSize {
        PageSize { width: 200.0, height: 100.0 }
    }

    fn operators(canvas: &PageCanvas) -> Vec<&str> {
        canvas.operations().iter().map(|op| op.operator.as_str()).collect()
    }

    fn operands(operation: &Operation) -> Vec<f64> {
        operation.operands.iter().filter_map(|o| o.as_float().ok()).map(f64::from).collect()
    }

    fn rect(x: f64, y_top: f64, width: f64, height: f64) -> NormRect {
        NormRect { x, y_top, width, height }
    }

    #[test]
    fn clip_wraps_page_bounds() {
        let mut canvas = PageCanvas::new(page());
        canvas.push_clip();
        canvas.pop_clip();
        assert_eq!(operators(&canvas), ["q", "m", "l", "l", "l", "h", "W", "n", "Q"]);
        assert_eq!(operands(&canvas.operations()[3]), [200.0, 100.0]);
    }

    #[test]
    fn text_baseline_sits_one_ascent_below_top() {
        let mut canvas = PageCanvas::new(page());
        let item = TextItem::new("Hi", 0, 0.25, 0.5).with_font_size(10.0);
        let lossy = canvas.text(&item, &HELVETICA).expect("paint text");
        assert!(!lossy);

        let tm = canvas.operations().iter().find(|op| op.operator == "Tm").expect("Tm");
        let values = operands(tm);
        assert_eq!(values[4], 50.0);
        assert!((values[5] - (50.0 - 7.18)).abs() < 1e-4);
    }

    #[test]
    fn multi_line_text_steps_down_by_leading() {
        let mut canvas = PageCanvas::new(page());
        let item = TextItem::new("a\nb", 0, 0.0, 0.0).with_font_size(10.0);
        canvas.text(&item, &HELVETICA).expect("paint text");

        let baselines: Vec<f64> = canvas
            .operations()
            .iter()
            .filter(|op| op.operator == "Tm")
            .map(|op| operands(op)[5])
            .collect();
        assert_eq!(baselines.len(), 2);
        assert!((baselines[0] - baselines[1] - 12.0).abs() < 1e-4);
    }

    #[test]
    fn filled_shape_fills_before_stroking() {
        let mut canvas = PageCanvas::new(page());
        let shape = ShapeItem::new(ShapeKind::Rectangle, 0, rect(0.1, 0.1, 0.5, 0.5))
            .with_fill("#00ff00");
        canvas.shape(&shape).expect("paint shape");

        let ops = operators(&canvas);
        let fill = ops.iter().position(|op| *op == "f").expect("fill");
        let stroke = ops.iter().position(|op| *op == "S").expect("stroke");
        assert!(fill < stroke);

        let re = canvas.operations().iter().find(|op| op.operator == "re").expect("re");
        assert_eq!(operands(re), [20.0, 40.0, 100.0, 50.0]);
    }

    #[test]
    fn open_shapes_ignore_fill() {
        let mut canvas = PageCanvas::new(page());
        let line = ShapeItem::new(ShapeKind::Line, 0, rect(0.0, 0.0, 1.0, 1.0)).with_fill("#000");
        canvas.shape(&line).expect("paint line");
        assert!(!operators(&canvas).contains(&"f"));
    }

    #[test]
    fn circle_is_four_bezier_arcs() {
        let mut canvas = PageCanvas::new(page());
        canvas
            .shape(&ShapeItem::new(ShapeKind::Circle, 0, rect(0.0, 0.0, 0.5, 1.0)))
            .expect("paint circle");
        assert_eq!(operators(&canvas).iter().filter(|op| **op == "c").count(), 4);
    }

    #[test]
    fn every_shape_kind_paints() {
        for kind in [
            ShapeKind::Rectangle,
            ShapeKind::Circle,
            ShapeKind::Line,
            ShapeKind::Arrow,
            ShapeKind::Triangle,
            ShapeKind::Diamond,
        ] {
            let mut canvas = PageCanvas::new(page());
            canvas.shape(&ShapeItem::new(kind, 0, rect(0.1, 0.1, 0.3, 0.3))).expect("paint");
            assert!(operators(&canvas).contains(&"S"), "{kind:?} should stroke");
        }
    }

    #[test]
    fn freehand_needs_two_points() {
        let mut canvas = PageCanvas::new(page());
        let mut shape = ShapeItem::new(ShapeKind::Freehand, 0, rect(0.0, 0.0, 1.0, 1.0));
        shape.points = vec![NormPoint { x_norm: 0.1, y_norm: 0.1 }];
        assert_eq!(canvas.shape(&shape), Err(PaintError::TooFewPoints(1)));

        shape.points.push(NormPoint { x_norm: 0.5, y_norm: 0.5 });
        canvas.shape(&shape).expect("two points paint");
        let first = canvas.operations().iter().find(|op| op.operator == "m").expect("m");
        assert_eq!(operands(first), [20.0, 90.0]);
    }

    #[test]
    fn non_finite_geometry_is_rejected() {
        let mut canvas = PageCanvas::new(page());
        let shape = ShapeItem::new(ShapeKind::Rectangle, 0, rect(f64::NAN, 0.0, 0.1, 0.1));
        assert_eq!(canvas.shape(&shape), Err(PaintError::NonFinite));
        assert!(canvas.operations().is_empty());
    }

    #[test]
    fn translucent_highlight_uses_shared_graphics_state() {
        let mut canvas = PageCanvas::new(page());
        let note = AnnotationItem::new(
            AnnotationKind::Highlight,
            0,
            vec![AnnotationSpan::absolute(rect(0.0, 0.0, 0.5, 0.1))],
        );
        let spans = note.resolved_spans(&[]);
        canvas.annotation(&note, &spans).expect("paint");
        canvas.annotation(&note, &spans).expect("paint");

        assert_eq!(canvas.opacity_states(), [("GS0".to_owned(), 0.4)]);
        assert_eq!(operators(&canvas).iter().filter(|op| **op == "gs").count(), 2);
    }
}
