use crate::community::{Node, format_timestamp};
use crate::config::Margins;

use super::transform::ZoomTransform;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

const TICK_STEPS: [i64; 15] = [
    MINUTE,
    5 * MINUTE,
    15 * MINUTE,
    30 * MINUTE,
    HOUR,
    3 * HOUR,
    6 * HOUR,
    12 * HOUR,
    DAY,
    2 * DAY,
    7 * DAY,
    14 * DAY,
    30 * DAY,
    91 * DAY,
    365 * DAY,
];

pub(in crate::app) const TICK_LABEL_FORMAT: &str = "%m/%d %H:%M";

/// Continuous mapping from event timestamps (Unix seconds) to horizontal layout units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct TimeScale {
    domain: (i64, i64),
    range: (f32, f32),
}

impl TimeScale {
    pub fn new(domain: (i64, i64), range: (f32, f32)) -> Self {
        let domain = if domain.0 <= domain.1 {
            domain
        } else {
            (domain.1, domain.0)
        };
        Self { domain, range }
    }

    /// `None` when no event carries a parseable time; the layout then runs without a
    /// time axis.
    pub fn from_nodes(nodes: &[Node], width: f32, margins: Margins) -> Option<Self> {
        let mut extent: Option<(i64, i64)> = None;
        for timestamp in nodes.iter().filter_map(Node::timestamp) {
            extent = Some(match extent {
                Some((min, max)) => (min.min(timestamp), max.max(timestamp)),
                None => (timestamp, timestamp),
            });
        }

        let domain = extent?;
        let start = margins.left;
        let end = (width - margins.right).max(start + 1.0);
        Some(Self::new(domain, (start, end)))
    }

    pub fn domain(&self) -> (i64, i64) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn is_degenerate(&self) -> bool {
        self.domain.0 == self.domain.1
    }

    pub fn map(&self, timestamp: i64) -> f32 {
        let (r0, r1) = self.range;
        if self.is_degenerate() {
            return (r0 + r1) * 0.5;
        }

        let span = (self.domain.1 - self.domain.0) as f64;
        let t = (timestamp - self.domain.0) as f64 / span;
        (r0 as f64 + t * (r1 - r0) as f64) as f32
    }

    pub fn invert(&self, x: f32) -> i64 {
        let (r0, r1) = self.range;
        if self.is_degenerate() || (r1 - r0).abs() <= f32::EPSILON {
            return self.domain.0;
        }

        let t = (x - r0) as f64 / (r1 - r0) as f64;
        let span = (self.domain.1 - self.domain.0) as f64;
        self.domain.0 + (t * span).round() as i64
    }

    /// The same scale viewed through a pan/zoom transform, so axis ticks follow the
    /// zoomed node positions.
    pub fn rescaled(&self, transform: ZoomTransform) -> Self {
        Self {
            domain: self.domain,
            range: (transform.apply_x(self.range.0), transform.apply_x(self.range.1)),
        }
    }

    pub fn ticks(&self, count: usize) -> Vec<i64> {
        let (start, end) = self.domain;
        if self.is_degenerate() || count == 0 {
            return vec![start];
        }

        let span = end - start;
        let step = TICK_STEPS
            .iter()
            .copied()
            .find(|step| span / step <= count as i64)
            .unwrap_or_else(|| {
                let years = (span / (365 * DAY) / count as i64).max(1);
                years * 365 * DAY
            });

        let first = start.div_euclid(step) * step;
        let first = if first < start { first + step } else { first };
        (0..)
            .map(|index| first + index * step)
            .take_while(|tick| *tick <= end)
            .collect()
    }

    pub fn tick_label(timestamp: i64) -> String {
        format_timestamp(timestamp, TICK_LABEL_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use chrono::NaiveDateTime;

    use crate::community::NodeKind;

    fn ts(raw: &str) -> i64 {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
            .timestamp()
    }

    fn event(id: &str, time: &str) -> Node {
        Node::new(id, NodeKind::Event, id).with_time(time)
    }

    #[test]
    fn maps_domain_extremes_to_margins() {
        let nodes = vec![
            event("a", "2025-09-17 19:30"),
            event("b", "2025-10-14 19:30"),
            Node::new("m", NodeKind::Member, "m"),
        ];
        let scale = TimeScale::from_nodes(&nodes, 800.0, Margins::default()).unwrap();
        assert_eq!(scale.map(ts("2025-09-17 19:30")), 40.0);
        assert_eq!(scale.map(ts("2025-10-14 19:30")), 760.0);
    }

    #[test]
    fn no_timed_events_means_no_axis() {
        let nodes = vec![
            Node::new("m", NodeKind::Member, "m"),
            Node::new("e", NodeKind::Event, "e"),
            event("bad", "someday"),
        ];
        assert!(TimeScale::from_nodes(&nodes, 800.0, Margins::default()).is_none());
    }

    #[test]
    fn single_timestamp_collapses_to_midpoint() {
        let nodes = vec![event("a", "2025-09-17 19:30"), event("b", "2025-09-17 19:30")];
        let scale = TimeScale::from_nodes(&nodes, 800.0, Margins::default()).unwrap();
        let x = scale.map(ts("2025-09-17 19:30"));
        assert!(x.is_finite());
        assert_eq!(x, 400.0);
        assert_eq!(x, scale.map(ts("2025-12-01 00:00")));
        assert_eq!(scale.ticks(8), vec![ts("2025-09-17 19:30")]);
    }

    #[test]
    fn invert_recovers_timestamps() {
        let scale = TimeScale::new((1_000, 101_000), (40.0, 760.0));
        assert_eq!(scale.invert(scale.map(51_000)), 51_000);
    }

    #[test]
    fn ticks_stay_inside_domain_and_are_sorted() {
        let scale = TimeScale::new(
            (ts("2025-09-17 19:30"), ts("2025-10-14 19:30")),
            (40.0, 760.0),
        );
        let ticks = scale.ticks(8);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= 9);
        assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(ticks.iter().all(|tick| (scale.domain().0..=scale.domain().1).contains(tick)));
        assert_eq!(TimeScale::tick_label(ticks[0]).len(), "09/21 00:00".len());
    }

    proptest! {
        #[test]
        fn mapping_is_monotonic(
            start in 0i64..2_000_000_000,
            span in 1i64..100_000_000,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
            width in 200.0f32..4000.0,
        ) {
            let scale = TimeScale::new((start, start + span), (40.0, width - 40.0));
            let t1 = start + (a * span as f64) as i64;
            let t2 = start + (b * span as f64) as i64;
            prop_assume!(t1 < t2);
            prop_assert!(scale.map(t1) <= scale.map(t2));
            if (t2 - t1) as f64 / span as f64 > 1e-4 {
                prop_assert!(scale.map(t1) < scale.map(t2));
            }
        }

        #[test]
        fn rescale_composes_with_zoom(
            x in -500.0f32..500.0,
            k in 0.1f32..10.0,
            start in 0i64..2_000_000_000,
            span in 0i64..100_000_000,
        ) {
            let scale = TimeScale::new((start, start + span), (40.0, 760.0));
            let transform = ZoomTransform { x, y: 0.0, k };
            let expected = transform.apply_x(scale.map(start));
            let actual = scale.rescaled(transform).map(start);
            prop_assert!((expected - actual).abs() <= 1e-3 * expected.abs().max(1.0));
        }
    }
}
