// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vector rasterizer for decoded page content streams.
//
// Paints paths (fills and strokes) in device colour onto an RGBA bitmap using
// `imageproc` drawing primitives. Text, images, shadings and annotation
// appearances are not painted, and clipping paths are ignored.

use image::{ImageBuffer, Rgba};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use lopdf::Object;
use lopdf::content::Operation;
use shaver_core::bitmap::Bitmap;
use tracing::{trace, warn};

/// RGBA view over a bitmap's pixels, drawn on in place.
type Canvas<'a> = ImageBuffer<Rgba<u8>, &'a mut [u8]>;

/// Segments used to flatten each Bézier curve.
const CURVE_STEPS: usize = 16;

/// Deepest `q` nesting honoured before further saves are ignored.
const MAX_STATE_DEPTH: usize = 64;

/// Fallback page box (US Letter) for pages with no MediaBox anywhere in their
/// page tree.
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

// -- Geometry -----------------------------------------------------------------

/// The page box and display rotation that map page space onto a bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[x0, y0, x1, y1]` in points, normalised so `x0 <= x1` and `y0 <= y1`.
    pub media_box: [f64; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270.
    pub rotate: u16,
}

impl PageGeometry {
    pub fn new(media_box: [f64; 4], rotate: i64) -> Self {
        let [ax, ay, bx, by] = media_box;
        let rotate = match rotate.rem_euclid(360) {
            r @ (90 | 180 | 270) => r as u16,
            _ => 0,
        };
        Self {
            media_box: [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)],
            rotate,
        }
    }

    fn box_size(&self) -> (f64, f64) {
        let [x0, y0, x1, y1] = self.media_box;
        (x1 - x0, y1 - y0)
    }

    /// Displayed size in points, with width and height swapped for quarter
    /// turns.
    pub fn natural_size(&self) -> (f64, f64) {
        let (w, h) = self.box_size();
        if self.rotate % 180 == 90 { (h, w) } else { (w, h) }
    }

    /// Map page space onto a `width` x `height` pixel grid with the origin at
    /// the top-left.
    fn device_matrix(&self, width: u32, height: u32) -> Matrix {
        let [x0, _, _, y1] = self.media_box;
        let (w, h) = self.box_size();
        let upright = Matrix([1.0, 0.0, 0.0, -1.0, -x0, y1]);
        let rotation = match self.rotate {
            90 => Matrix([0.0, 1.0, -1.0, 0.0, h, 0.0]),
            180 => Matrix([-1.0, 0.0, 0.0, -1.0, w, h]),
            270 => Matrix([0.0, -1.0, 1.0, 0.0, 0.0, w]),
            _ => Matrix::IDENTITY,
        };
        let (nw, nh) = self.natural_size();
        let scale = Matrix([
            f64::from(width) / nw,
            0.0,
            0.0,
            f64::from(height) / nh,
            0.0,
            0.0,
        ]);
        upright.then(rotation).then(scale)
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// `self` followed by `next`.
    fn then(&self, next: Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = next.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    /// Mean linear scale, used to size stroke widths.
    fn scale(&self) -> f64 {
        let [a, b, c, d, _, _] = self.0;
        (a * d - b * c).abs().sqrt()
    }
}

// -- Graphics state -----------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
    line_width: f64,
}

impl GraphicsState {
    fn new(device: Matrix) -> Self {
        Self {
            ctm: device,
            fill: BLACK,
            stroke: BLACK,
            line_width: 1.0,
        }
    }
}

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Device colour from gray, RGB or CMYK components. Other arities (pattern
/// names, ICC spaces with unusual component counts) are rejected.
fn color(components: &[f64]) -> Option<Rgba<u8>> {
    match *components {
        [g] => Some(Rgba([channel(g), channel(g), channel(g), 0xFF])),
        [r, g, b] => Some(Rgba([channel(r), channel(g), channel(b), 0xFF])),
        [c, m, y, k] => Some(Rgba([
            channel((1.0 - c) * (1.0 - k)),
            channel((1.0 - m) * (1.0 - k)),
            channel((1.0 - y) * (1.0 - k)),
            0xFF,
        ])),
        _ => None,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// All operands as numbers, or `None` if any operand is not numeric.
fn numbers(operands: &[Object]) -> Option<Vec<f64>> {
    operands.iter().map(number).collect()
}

// -- Paths --------------------------------------------------------------------

#[derive(Debug, Default)]
struct Subpath {
    points: Vec<(f64, f64)>,
    closed: bool,
}

/// The current path, already transformed into device space.
#[derive(Debug, Default)]
struct Path {
    subpaths: Vec<Subpath>,
}

impl Path {
    fn current_point(&self) -> Option<(f64, f64)> {
        self.subpaths.last().and_then(|s| s.points.last().copied())
    }

    fn move_to(&mut self, point: (f64, f64)) {
        self.subpaths.push(Subpath {
            points: vec![point],
            closed: false,
        });
    }

    fn line_to(&mut self, point: (f64, f64)) {
        match self.subpaths.last_mut() {
            Some(subpath) if !subpath.closed => subpath.points.push(point),
            _ => self.move_to(point),
        }
    }

    fn curve_to(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        let Some(start) = self.current_point() else {
            self.move_to(end);
            return;
        };
        for step in 1..=CURVE_STEPS {
            let t = step as f64 / CURVE_STEPS as f64;
            let u = 1.0 - t;
            let x = u * u * u * start.0 + 3.0 * u * u * t * c1.0 + 3.0 * u * t * t * c2.0
                + t * t * t * end.0;
            let y = u * u * u * start.1 + 3.0 * u * u * t * c1.1 + 3.0 * u * t * t * c2.1
                + t * t * t * end.1;
            self.line_to((x, y));
        }
    }

    fn close(&mut self) {
        if let Some(subpath) = self.subpaths.last_mut() {
            subpath.closed = true;
        }
    }

    fn clear(&mut self) {
        self.subpaths.clear();
    }
}

/// Pixels of slack kept around the canvas when clipping.
const CLIP_MARGIN: f64 = 2.0;

/// Device-space rectangle that geometry is clipped to before it is rounded to
/// pixels. `imageproc` rasterizes with unchecked `i32` arithmetic, so nothing
/// far outside the canvas may reach it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClipRect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl Edge {
    fn inside(self, (x, y): (f64, f64)) -> bool {
        match self {
            Edge::Left(v) => x >= v,
            Edge::Right(v) => x <= v,
            Edge::Top(v) => y >= v,
            Edge::Bottom(v) => y <= v,
        }
    }

    /// Where segment `a`-`b` crosses this edge. Only called when the
    /// endpoints lie on opposite sides.
    fn crossing(self, (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> (f64, f64) {
        match self {
            Edge::Left(v) | Edge::Right(v) => {
                let t = (v - ax) / (bx - ax);
                (v, ay + t * (by - ay))
            }
            Edge::Top(v) | Edge::Bottom(v) => {
                let t = (v - ay) / (by - ay);
                (ax + t * (bx - ax), v)
            }
        }
    }

    /// One Sutherland-Hodgman pass of a closed polygon against this edge.
    fn clip(self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(points.len() + 2);
        let Some(&last) = points.last() else {
            return out;
        };
        let mut previous = last;
        for &current in points {
            match (self.inside(previous), self.inside(current)) {
                (true, true) => out.push(current),
                (true, false) => out.push(self.crossing(previous, current)),
                (false, true) => {
                    out.push(self.crossing(previous, current));
                    out.push(current);
                }
                (false, false) => {}
            }
            previous = current;
        }
        out
    }
}

impl ClipRect {
    fn around(width: u32, height: u32) -> Self {
        Self {
            x0: -CLIP_MARGIN,
            y0: -CLIP_MARGIN,
            x1: f64::from(width) + CLIP_MARGIN,
            y1: f64::from(height) + CLIP_MARGIN,
        }
    }

    fn inflate(&self, by: f64) -> Self {
        Self {
            x0: self.x0 - by,
            y0: self.y0 - by,
            x1: self.x1 + by,
            y1: self.y1 + by,
        }
    }

    /// Pins a point inside the rectangle, absorbing rounding drift from the
    /// crossing arithmetic.
    fn pin(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x.clamp(self.x0, self.x1), y.clamp(self.y0, self.y1))
    }

    /// The part of a closed polygon inside the rectangle.
    fn polygon(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        [
            Edge::Left(self.x0),
            Edge::Right(self.x1),
            Edge::Top(self.y0),
            Edge::Bottom(self.y1),
        ]
        .into_iter()
        .fold(points.to_vec(), |clipped, edge| edge.clip(&clipped))
        .into_iter()
        .map(|point| self.pin(point))
        .collect()
    }

    /// The part of segment `a`-`b` inside the rectangle (Liang-Barsky).
    fn segment(&self, a: (f64, f64), b: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for (p, q) in [
            (-dx, a.0 - self.x0),
            (dx, self.x1 - a.0),
            (-dy, a.1 - self.y0),
            (dy, self.y1 - a.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else if p < 0.0 {
                t0 = t0.max(q / p);
            } else {
                t1 = t1.min(q / p);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((
            self.pin((a.0 + t0 * dx, a.1 + t0 * dy)),
            self.pin((a.0 + t1 * dx, a.1 + t1 * dy)),
        ))
    }
}

fn finite(points: &[(f64, f64)]) -> bool {
    points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
}

/// Rounds to the pixel grid. Callers clip first, so the casts cannot
/// saturate.
fn pixel_point((x, y): (f64, f64)) -> Point<i32> {
    Point::new(x.round() as i32, y.round() as i32)
}

/// Distinct polygon vertices with the closing duplicate removed.
fn polygon(points: &[(f64, f64)]) -> Vec<Point<i32>> {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for point in points.iter().copied().map(pixel_point) {
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    polygon
}

fn line(
    canvas: &mut Canvas<'_>,
    clip: ClipRect,
    start: (f64, f64),
    end: (f64, f64),
    color: Rgba<u8>,
) {
    if let Some((start, end)) = clip.segment(start, end) {
        draw_line_segment_mut(
            canvas,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
    }
}

/// Fill one closed polygon given in device space.
fn fill_polygon(
    canvas: &mut Canvas<'_>,
    clip: ClipRect,
    points: &[(f64, f64)],
    color: Rgba<u8>,
) {
    let clipped = clip.polygon(points);
    let polygon = polygon(&clipped);
    match polygon.len() {
        0 => {}
        1 | 2 => {
            let start = polygon[0];
            let end = polygon[polygon.len() - 1];
            draw_line_segment_mut(
                canvas,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                color,
            );
        }
        _ => draw_polygon_mut(canvas, &polygon, color),
    }
}

/// Fill every subpath independently. Holes formed by nested subpaths are
/// filled too.
fn fill(canvas: &mut Canvas<'_>, path: &Path, color: Rgba<u8>) {
    let clip = ClipRect::around(canvas.width(), canvas.height());
    for subpath in &path.subpaths {
        if !finite(&subpath.points) {
            warn!("Subpath has non-finite device coordinates, skipping fill");
            continue;
        }
        fill_polygon(canvas, clip, &subpath.points, color);
    }
}

fn stroke_segment(
    canvas: &mut Canvas<'_>,
    clip: ClipRect,
    start: (f64, f64),
    end: (f64, f64),
    width: f64,
    color: Rgba<u8>,
) {
    if width <= 1.5 {
        line(canvas, clip, start, end, color);
        return;
    }
    // Trim the centre line first so the quad stays near the canvas.
    let Some((start, end)) = clip.inflate(width).segment(start, end) else {
        return;
    };
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        line(canvas, clip, start, end, color);
        return;
    }
    let (nx, ny) = (-dy / length * width / 2.0, dx / length * width / 2.0);
    let quad = [
        (start.0 + nx, start.1 + ny),
        (end.0 + nx, end.1 + ny),
        (end.0 - nx, end.1 - ny),
        (start.0 - nx, start.1 - ny),
    ];
    fill_polygon(canvas, clip, &quad, color);
}

fn stroke(canvas: &mut Canvas<'_>, path: &Path, width: f64, color: Rgba<u8>) {
    if !width.is_finite() {
        warn!(width, "Non-finite stroke width, skipping stroke");
        return;
    }
    let clip = ClipRect::around(canvas.width(), canvas.height());
    for subpath in &path.subpaths {
        if !finite(&subpath.points) {
            warn!("Subpath has non-finite device coordinates, skipping stroke");
            continue;
        }
        for segment in subpath.points.windows(2) {
            stroke_segment(canvas, clip, segment[0], segment[1], width, color);
        }
        if subpath.closed
            && let (Some(first), Some(last)) = (subpath.points.first(), subpath.points.last())
        {
            stroke_segment(canvas, clip, *last, *first, width, color);
        }
    }
}

// -- Interpreter --------------------------------------------------------------

struct Interpreter<'a> {
    canvas: Canvas<'a>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    path: Path,
}

impl Interpreter<'_> {
    fn point(&self, x: f64, y: f64) -> (f64, f64) {
        self.state.ctm.apply(x, y)
    }

    fn stroke_width(&self) -> f64 {
        (self.state.line_width * self.state.ctm.scale()).max(1.0)
    }

    fn paint(&mut self, fill_path: bool, stroke_path: bool) {
        if fill_path {
            fill(&mut self.canvas, &self.path, self.state.fill);
        }
        if stroke_path {
            let width = self.stroke_width();
            stroke(&mut self.canvas, &self.path, width, self.state.stroke);
        }
        self.path.clear();
    }

    fn execute(&mut self, operation: &Operation) {
        let operands = &operation.operands;
        let values = numbers(operands);
        let args = values.as_deref().unwrap_or(&[]);

        match (operation.operator.as_str(), args) {
            ("q", _) => {
                if self.saved.len() < MAX_STATE_DEPTH {
                    self.saved.push(self.state);
                }
            }
            ("Q", _) => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            ("cm", &[a, b, c, d, e, f]) => {
                self.state.ctm = Matrix([a, b, c, d, e, f]).then(self.state.ctm);
            }
            ("w", &[width]) => self.state.line_width = width.max(0.0),

            ("g" | "rg" | "k" | "sc" | "scn", components) => {
                if let Some(fill) = color(components) {
                    self.state.fill = fill;
                }
            }
            ("G" | "RG" | "K" | "SC" | "SCN", components) => {
                if let Some(stroke) = color(components) {
                    self.state.stroke = stroke;
                }
            }
            ("cs", _) => self.state.fill = BLACK,
            ("CS", _) => self.state.stroke = BLACK,

            ("m", &[x, y]) => {
                let point = self.point(x, y);
                self.path.move_to(point);
            }
            ("l", &[x, y]) => {
                let point = self.point(x, y);
                self.path.line_to(point);
            }
            ("c", &[x1, y1, x2, y2, x3, y3]) => {
                let (c1, c2, end) = (self.point(x1, y1), self.point(x2, y2), self.point(x3, y3));
                self.path.curve_to(c1, c2, end);
            }
            ("v", &[x2, y2, x3, y3]) => {
                let c1 = self.path.current_point().unwrap_or_else(|| self.point(x2, y2));
                let (c2, end) = (self.point(x2, y2), self.point(x3, y3));
                self.path.curve_to(c1, c2, end);
            }
            ("y", &[x1, y1, x3, y3]) => {
                let (c1, end) = (self.point(x1, y1), self.point(x3, y3));
                self.path.curve_to(c1, end, end);
            }
            ("re", &[x, y, w, h]) => {
                let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                let [first, rest @ ..] = corners.map(|(px, py)| self.point(px, py));
                self.path.move_to(first);
                for corner in rest {
                    self.path.line_to(corner);
                }
                self.path.close();
            }
            ("h", _) => self.path.close(),

            ("f" | "F" | "f*", _) => self.paint(true, false),
            ("B" | "B*", _) => self.paint(true, true),
            ("b" | "b*", _) => {
                self.path.close();
                self.paint(true, true);
            }
            ("S", _) => self.paint(false, true),
            ("s", _) => {
                self.path.close();
                self.paint(false, true);
            }
            ("n", _) => self.path.clear(),

            (operator, _) => trace!(operator, "Operator not painted"),
        }
    }
}

/// Paint `operations` onto `bitmap`, scaling the page to fill it.
///
/// The bitmap must be packed RGBA; anything else is left untouched.
pub fn rasterize(geometry: &PageGeometry, operations: &[Operation], bitmap: &mut Bitmap) {
    let (width, height) = (bitmap.width(), bitmap.height());
    if !bitmap.is_packed() {
        warn!(stride = bitmap.stride(), "Bitmap is not packed RGBA, skipping paint");
        return;
    }
    let Some(canvas) = Canvas::from_raw(width, height, bitmap.data_mut()) else {
        warn!(width, height, "Bitmap buffer does not match its size, skipping paint");
        return;
    };

    let mut interpreter = Interpreter {
        canvas,
        state: GraphicsState::new(geometry.device_matrix(width, height)),
        saved: Vec::new(),
        path: Path::default(),
    };
    for operation in operations {
        interpreter.execute(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
    const BLUE: [u8; 4] = [0, 0, 0xFF, 0xFF];

    fn op(operator: &str, operands: &[i64]) -> Operation {
        Operation::new(operator, operands.iter().map(|v| Object::Integer(*v)).collect())
    }

    fn real(operator: &str, operands: &[f32]) -> Operation {
        Operation::new(operator, operands.iter().map(|v| Object::Real(*v)).collect())
    }

    fn paint(geometry: PageGeometry, width: u32, height: u32, operations: &[Operation]) -> Bitmap {
        let mut bitmap = Bitmap::new(width, height).unwrap();
        bitmap.fill(WHITE);
        rasterize(&geometry, operations, &mut bitmap);
        bitmap
    }

    fn landscape() -> PageGeometry {
        PageGeometry::new([0.0, 0.0, 200.0, 100.0], 0)
    }

    fn blue_square() -> Vec<Operation> {
        vec![op("rg", &[0, 0, 1]), op("re", &[0, 0, 100, 50]), op("f", &[])]
    }

    #[test]
    fn rotation_is_normalised() {
        assert_eq!(PageGeometry::new([0.0; 4], -90).rotate, 270);
        assert_eq!(PageGeometry::new([0.0; 4], 450).rotate, 90);
        assert_eq!(PageGeometry::new([0.0; 4], 45).rotate, 0);
    }

    #[test]
    fn quarter_turns_swap_natural_size() {
        let page = PageGeometry::new([0.0, 0.0, 200.0, 100.0], 90);
        assert_eq!(page.natural_size(), (100.0, 200.0));
        let page = PageGeometry::new([0.0, 0.0, 200.0, 100.0], 180);
        assert_eq!(page.natural_size(), (200.0, 100.0));
    }

    #[test]
    fn inverted_media_box_is_normalised() {
        let page = PageGeometry::new([200.0, 100.0, 0.0, 0.0], 0);
        assert_eq!(page.media_box, [0.0, 0.0, 200.0, 100.0]);
    }

    #[test]
    fn fill_lands_bottom_left_at_natural_size() {
        let bitmap = paint(landscape(), 200, 100, &blue_square());
        assert_eq!(bitmap.pixel(10, 90), Some(BLUE));
        assert_eq!(bitmap.pixel(10, 10), Some(WHITE));
        assert_eq!(bitmap.pixel(150, 90), Some(WHITE));
    }

    #[test]
    fn content_scales_with_the_bitmap() {
        let bitmap = paint(landscape(), 100, 50, &blue_square());
        assert_eq!(bitmap.pixel(10, 45), Some(BLUE));
        assert_eq!(bitmap.pixel(60, 45), Some(WHITE));
        assert_eq!(bitmap.pixel(10, 10), Some(WHITE));
    }

    #[test]
    fn media_box_origin_is_honoured() {
        let page = PageGeometry::new([100.0, 100.0, 300.0, 200.0], 0);
        let ops = vec![op("rg", &[0, 0, 1]), op("re", &[100, 100, 100, 50]), op("f", &[])];
        let bitmap = paint(page, 200, 100, &ops);
        assert_eq!(bitmap.pixel(10, 90), Some(BLUE));
        assert_eq!(bitmap.pixel(150, 90), Some(WHITE));
    }

    #[test]
    fn rotated_page_turns_content_clockwise() {
        let page = PageGeometry::new([0.0, 0.0, 200.0, 100.0], 90);
        let bitmap = paint(page, 100, 200, &blue_square());
        assert_eq!(bitmap.pixel(20, 50), Some(BLUE));
        assert_eq!(bitmap.pixel(80, 50), Some(WHITE));
        assert_eq!(bitmap.pixel(20, 150), Some(WHITE));
    }

    #[test]
    fn cm_scales_user_space() {
        let ops = vec![
            op("cm", &[2, 0, 0, 2, 0, 0]),
            op("re", &[0, 0, 10, 10]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(15, 85), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(25, 85), Some(WHITE));
    }

    #[test]
    fn restore_reverts_colour_and_transform() {
        let ops = vec![
            op("q", &[]),
            op("rg", &[1, 0, 0]),
            op("cm", &[1, 0, 0, 1, 100, 0]),
            op("Q", &[]),
            op("re", &[0, 0, 20, 20]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(10, 90), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(110, 90), Some(WHITE));
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let ops = vec![op("Q", &[]), op("Q", &[]), op("re", &[0, 0, 20, 20]), op("f", &[])];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(10, 90), Some([0, 0, 0, 0xFF]));
    }

    #[test]
    fn cmyk_and_gray_colours() {
        assert_eq!(color(&[0.0, 1.0, 1.0, 0.0]), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(color(&[0.0]), Some(BLACK));
        assert_eq!(color(&[0.5, 0.5]), None);
    }

    #[test]
    fn stroke_draws_a_horizontal_rule() {
        let ops = vec![
            op("RG", &[0, 0, 1]),
            op("m", &[10, 50]),
            op("l", &[190, 50]),
            op("S", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(100, 50), Some(BLUE));
        assert_eq!(bitmap.pixel(100, 40), Some(WHITE));
    }

    #[test]
    fn wide_strokes_cover_their_width() {
        let ops = vec![
            op("w", &[10]),
            op("m", &[10, 50]),
            op("l", &[190, 50]),
            op("S", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(100, 47), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(100, 53), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(100, 60), Some(WHITE));
    }

    #[test]
    fn end_path_discards_without_painting() {
        let ops = vec![op("re", &[0, 0, 100, 50]), op("n", &[]), op("f", &[])];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(10, 90), Some(WHITE));
    }

    #[test]
    fn curves_are_filled() {
        // A lens shape bulging right of x = 100.
        let ops = vec![
            op("m", &[100, 10]),
            op("c", &[160, 30, 160, 70, 100, 90]),
            op("h", &[]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(130, 50), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(170, 50), Some(WHITE));
    }

    #[test]
    fn malformed_operands_are_skipped() {
        let ops = vec![
            Operation::new("re", vec![Object::Name(b"x".to_vec())]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(10, 90), Some(WHITE));
    }

    #[test]
    fn paints_in_place_over_existing_pixels() {
        let mut bitmap = Bitmap::new(200, 100).unwrap();
        bitmap.fill([0x11, 0x22, 0x33, 0xFF]);
        rasterize(&landscape(), &blue_square(), &mut bitmap);
        assert_eq!(bitmap.pixel(10, 90), Some(BLUE));
        assert_eq!(bitmap.pixel(150, 10), Some([0x11, 0x22, 0x33, 0xFF]));
    }

    #[test]
    fn padded_bitmaps_are_left_alone() {
        let mut bitmap = Bitmap::from_raw_parts(2, 2, 12, vec![0xAA; 24]);
        rasterize(&landscape(), &blue_square(), &mut bitmap);
        assert!(bitmap.data().iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn far_off_rectangle_is_clipped_to_the_page() {
        let ops = vec![real("re", &[-3e9, -1.0, 6e9, 50.0]), op("f", &[])];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(0, 75), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(199, 75), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(100, 25), Some(WHITE));
    }

    #[test]
    fn far_off_triangle_keeps_its_visible_part() {
        let ops = vec![
            real("m", &[-3e9, 10.0]),
            real("l", &[3e9, 90.0]),
            real("l", &[10.0, -3e9]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        // Below the long edge through (0, 50) is inside, above it is not.
        assert_eq!(bitmap.pixel(50, 80), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(50, 20), Some(WHITE));
    }

    #[test]
    fn far_off_strokes_are_clipped() {
        let ops = vec![
            op("RG", &[0, 0, 1]),
            real("m", &[-3e9, 50.0]),
            real("l", &[3e9, 50.0]),
            op("S", &[]),
            op("w", &[10]),
            real("m", &[150.0, -3e9]),
            real("l", &[150.0, 3e9]),
            op("S", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(20, 50), Some(BLUE));
        assert_eq!(bitmap.pixel(150, 10), Some(BLUE));
        assert_eq!(bitmap.pixel(100, 10), Some(WHITE));
    }

    #[test]
    fn huge_transform_floods_the_page() {
        let ops = vec![
            real("cm", &[1e30, 0.0, 0.0, 1e30, 0.0, 0.0]),
            op("re", &[0, 0, 1, 1]),
            op("f", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert_eq!(bitmap.pixel(199, 0), Some([0, 0, 0, 0xFF]));
        assert_eq!(bitmap.pixel(0, 99), Some([0, 0, 0, 0xFF]));
    }

    #[test]
    fn overflowing_transform_is_skipped() {
        let ops = vec![
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            real("cm", &[f32::MAX, 0.0, 0.0, f32::MAX, 0.0, 0.0]),
            op("re", &[1, 1, 1, 1]),
            op("f", &[]),
            op("S", &[]),
        ];
        let bitmap = paint(landscape(), 200, 100, &ops);
        assert!(bitmap.data().chunks(4).all(|px| px == WHITE));
    }

    #[test]
    fn clip_rect_trims_segments() {
        let clip = ClipRect::around(10, 10);
        assert_eq!(
            clip.segment((-14.0, 5.0), (18.0, 5.0)),
            Some(((-2.0, 5.0), (12.0, 5.0)))
        );
        assert_eq!(clip.segment((-100.0, -50.0), (100.0, -50.0)), None);
        assert_eq!(clip.polygon(&[(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)]), vec![]);
    }
}
