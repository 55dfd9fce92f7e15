use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2};

use crate::community::NodeKind;

/// Symbol area in layout units squared, shared by every kind.
const SYMBOL_AREA: f32 = 200.0;

pub(super) const SELECTED_COLOR: Color32 = Color32::from_rgb(255, 107, 53);
pub(super) const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(255, 179, 71);
pub(super) const EDGE_COLOR: Color32 = Color32::from_rgb(153, 153, 153);
pub(super) const SEARCH_COLOR: Color32 = Color32::from_rgb(80, 210, 255);

pub(super) const NODE_DIM_OPACITY: f32 = 0.2;
pub(super) const LABEL_DIM_OPACITY: f32 = 0.3;
pub(super) const EDGE_DIM_OPACITY: f32 = 0.1;
pub(super) const EDGE_BASE_OPACITY: f32 = 0.6;
pub(super) const HIGHLIGHT_EDGE_WIDTH: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodeShape {
    Circle,
    Square,
    Triangle,
}

pub(super) fn node_shape(kind: NodeKind) -> NodeShape {
    match kind {
        NodeKind::Member => NodeShape::Circle,
        NodeKind::Event => NodeShape::Square,
        NodeKind::Space => NodeShape::Triangle,
    }
}

pub(super) fn node_color(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Member => Color32::from_rgb(31, 119, 180),
        NodeKind::Event => Color32::from_rgb(255, 127, 14),
        NodeKind::Space => Color32::from_rgb(44, 160, 44),
    }
}

/// Radius of the circle enclosing a symbol of the shared area.
pub(super) fn node_radius(kind: NodeKind) -> f32 {
    match node_shape(kind) {
        NodeShape::Circle => (SYMBOL_AREA / std::f32::consts::PI).sqrt(),
        NodeShape::Square => (SYMBOL_AREA * 0.5).sqrt(),
        NodeShape::Triangle => (SYMBOL_AREA * 4.0 / 3.0_f32.sqrt()).sqrt() / 3.0_f32.sqrt(),
    }
}

pub(super) fn edge_width(value: f32) -> f32 {
    value.max(1.0).sqrt()
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let opacity = opacity.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (color.a() as f32 * opacity) as u8,
    )
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn draw_node_shape(
    painter: &Painter,
    shape: NodeShape,
    center: Pos2,
    radius: f32,
    fill: Color32,
    stroke: Stroke,
) {
    match shape {
        NodeShape::Circle => {
            painter.circle(center, radius, fill, stroke);
        }
        NodeShape::Square => {
            let half = radius * std::f32::consts::FRAC_1_SQRT_2;
            painter.rect(
                Rect::from_center_size(center, Vec2::splat(half * 2.0)),
                0.0,
                fill,
                stroke,
                eframe::egui::StrokeKind::Middle,
            );
        }
        NodeShape::Triangle => {
            let points = (0..3)
                .map(|corner| {
                    let angle = -std::f32::consts::FRAC_PI_2
                        + corner as f32 * std::f32::consts::TAU / 3.0;
                    center + vec2(angle.cos(), angle.sin()) * radius
                })
                .collect::<Vec<_>>();
            painter.add(Shape::convex_polygon(points, fill, stroke));
        }
    }
}

/// Line from the source boundary to the target boundary with a filled head at the target.
pub(super) fn draw_arrow(
    painter: &Painter,
    start: Pos2,
    end: Pos2,
    target_radius: f32,
    width: f32,
    color: Color32,
) {
    let delta = end - start;
    let length = delta.length();
    if length <= target_radius + 1.0 {
        painter.line_segment([start, end], Stroke::new(width, color));
        return;
    }

    let direction = delta / length;
    let tip = end - direction * target_radius;
    let head_length = 4.0 + width * 2.0;
    let base = tip - direction * head_length;
    let normal = vec2(-direction.y, direction.x) * (head_length * 0.5);

    painter.line_segment([start, base], Stroke::new(width, color));
    painter.add(Shape::convex_polygon(
        vec![tip, base + normal, base - normal],
        color,
        Stroke::NONE,
    ));
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));
}

/// Dashed vertical line.
pub(super) fn dashed_vertical(painter: &Painter, x: f32, top: f32, bottom: f32, stroke: Stroke) {
    const DASH: f32 = 2.0;
    let mut y = top;
    while y < bottom {
        let end = (y + DASH).min(bottom);
        painter.line_segment([pos2(x, y), pos2(x, end)], stroke);
        y += DASH * 2.0;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}
