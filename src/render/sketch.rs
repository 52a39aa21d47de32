//! Hand-drawn stroke perturbation.
//!
//! Sketch-style themes redraw connectors and outlines several times with
//! small positional jitter and replace straight segments with wavy
//! polylines. All randomness flows from one seeded generator, so a given
//! (tree, theme) pair always produces the same image.

use std::fmt::Write as _;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::theme::{Color, FillPattern, SketchParams};

/// Target spacing between polyline samples, layout units.
const SEGMENT_LENGTH: f32 = 14.0;

pub(super) struct Wobble {
    rng: StdRng,
    jitter: f32,
    waviness: f32,
}

impl Wobble {
    pub(super) fn new(params: &SketchParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            jitter: params.jitter,
            waviness: params.waviness,
        }
    }

    fn offset(&mut self, amplitude: f32) -> f32 {
        if amplitude <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-amplitude..=amplitude)
    }

    /// Path data for a jittered polyline through `points`, displacing every
    /// interior point by the waviness amplitude and the ends by the jitter
    /// amplitude.
    fn wobbly_path(&mut self, points: &[(f32, f32)]) -> String {
        let mut d = String::new();
        let last = points.len().saturating_sub(1);
        for (i, &(x, y)) in points.iter().enumerate() {
            let amplitude = if i == 0 || i == last { self.jitter } else { self.waviness };
            let jx = x + self.offset(amplitude);
            let jy = y + self.offset(amplitude);
            if i == 0 {
                let _ = write!(d, "M {jx:.2} {jy:.2}");
            } else {
                let _ = write!(d, " L {jx:.2} {jy:.2}");
            }
        }
        d
    }

    /// Wobbly rendition of a cubic Bézier from `p0` to `p3`.
    pub(super) fn cubic(
        &mut self,
        p0: (f32, f32),
        p1: (f32, f32),
        p2: (f32, f32),
        p3: (f32, f32),
    ) -> String {
        let chord = (p3.0 - p0.0).hypot(p3.1 - p0.1);
        let steps = ((chord / SEGMENT_LENGTH).ceil() as usize).max(2);
        let mut points = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            points.push(cubic_point(p0, p1, p2, p3, t));
        }
        self.wobbly_path(&points)
    }

    /// Wobbly outline of a rounded rectangle centered box.
    pub(super) fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, r: f32) -> String {
        let r = r.min(w / 2.0).min(h / 2.0);
        let mut points = Vec::new();

        // Clockwise from the top-left corner's end, straight edges sampled,
        // quarter arcs traced in three steps each.
        edge(&mut points, (x + r, y), (x + w - r, y));
        arc(&mut points, (x + w - r, y + r), r, -90.0, 0.0);
        edge(&mut points, (x + w, y + r), (x + w, y + h - r));
        arc(&mut points, (x + w - r, y + h - r), r, 0.0, 90.0);
        edge(&mut points, (x + w - r, y + h), (x + r, y + h));
        arc(&mut points, (x + r, y + h - r), r, 90.0, 180.0);
        edge(&mut points, (x, y + h - r), (x, y + r));
        arc(&mut points, (x + r, y + r), r, 180.0, 270.0);

        let mut d = self.wobbly_path(&points);
        d.push_str(" Z");
        d
    }
}

fn cubic_point(
    p0: (f32, f32),
    p1: (f32, f32),
    p2: (f32, f32),
    p3: (f32, f32),
    t: f32,
) -> (f32, f32) {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}

fn edge(points: &mut Vec<(f32, f32)>, from: (f32, f32), to: (f32, f32)) {
    let length = (to.0 - from.0).hypot(to.1 - from.1);
    let steps = ((length / SEGMENT_LENGTH).ceil() as usize).max(1);
    for i in 0..steps {
        let t = i as f32 / steps as f32;
        points.push((
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
        ));
    }
}

fn arc(points: &mut Vec<(f32, f32)>, center: (f32, f32), r: f32, start_deg: f32, end_deg: f32) {
    for i in 0..=3 {
        let t = i as f32 / 3.0;
        let angle = (start_deg + (end_deg - start_deg) * t).to_radians();
        points.push((center.0 + r * angle.cos(), center.1 + r * angle.sin()));
    }
}

/// `<pattern>` definition for sketch fills, drawn in the stroke color at
/// low opacity over the node's solid fill.
pub(super) fn pattern_def(pattern: FillPattern, color: Color) -> String {
    match pattern {
        FillPattern::Dots => format!(
            "<pattern id=\"sketch-fill\" width=\"7\" height=\"7\" patternUnits=\"userSpaceOnUse\">\
             <circle cx=\"2\" cy=\"2\" r=\"0.9\" fill=\"{color}\" fill-opacity=\"0.35\"/>\
             </pattern>"
        ),
        FillPattern::Crosshatch => format!(
            "<pattern id=\"sketch-fill\" width=\"8\" height=\"8\" patternUnits=\"userSpaceOnUse\">\
             <path d=\"M 0 8 L 8 0\" stroke=\"{color}\" stroke-width=\"0.6\" stroke-opacity=\"0.3\"/>\
             <path d=\"M -2 2 L 2 -2\" stroke=\"{color}\" stroke-width=\"0.6\" stroke-opacity=\"0.3\"/>\
             <path d=\"M 6 10 L 10 6\" stroke=\"{color}\" stroke-width=\"0.6\" stroke-opacity=\"0.3\"/>\
             </pattern>"
        ),
    }
}
