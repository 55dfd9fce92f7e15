use eframe::egui::{Vec2, vec2};

pub(in crate::app) const MIN_ZOOM: f32 = 0.1;
pub(in crate::app) const MAX_ZOOM: f32 = 10.0;

/// Pan/zoom applied to layout coordinates: `screen = k * p + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ZoomTransform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn apply(self, point: Vec2) -> Vec2 {
        vec2(self.apply_x(point.x), self.apply_y(point.y))
    }

    pub fn apply_x(self, x: f32) -> f32 {
        x * self.k + self.x
    }

    pub fn apply_y(self, y: f32) -> f32 {
        y * self.k + self.y
    }

    pub fn invert(self, point: Vec2) -> Vec2 {
        vec2((point.x - self.x) / self.k, (point.y - self.y) / self.k)
    }

    pub fn translate(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            k: self.k,
        }
    }

    /// Zooms by `factor` keeping the layout point under `anchor` (screen space) fixed.
    pub fn scale_about(self, anchor: Vec2, factor: f32) -> Self {
        let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let fixed = self.invert(anchor);
        Self {
            x: anchor.x - fixed.x * k,
            y: anchor.y - fixed.y * k,
            k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_undoes_apply() {
        let transform = ZoomTransform {
            x: 12.0,
            y: -4.0,
            k: 2.5,
        };
        let point = vec2(33.0, 71.0);
        let round_trip = transform.invert(transform.apply(point));
        assert!((round_trip - point).length() < 1e-4);
    }

    #[test]
    fn scale_about_keeps_anchor_fixed() {
        let transform = ZoomTransform::IDENTITY.translate(vec2(20.0, 10.0));
        let anchor = vec2(200.0, 150.0);
        let before = transform.invert(anchor);
        let zoomed = transform.scale_about(anchor, 1.7);
        let after = zoomed.invert(anchor);
        assert!((before - after).length() < 1e-3);
        assert!((zoomed.k - 1.7).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped_to_extent() {
        let zoomed_in = ZoomTransform::IDENTITY.scale_about(Vec2::ZERO, 1000.0);
        let zoomed_out = ZoomTransform::IDENTITY.scale_about(Vec2::ZERO, 0.0001);
        assert_eq!(zoomed_in.k, MAX_ZOOM);
        assert_eq!(zoomed_out.k, MIN_ZOOM);
    }
}
