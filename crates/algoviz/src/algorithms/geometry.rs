//! Planar geometry: convex hulls and the Hilbert space-filling curve.

use super::{check_len, check_magnitude, Algorithm, Trace};
use crate::error::{Error, Result};
use crate::store::LineRange;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const MAX_POINTS: usize = 64;
const MAX_HILBERT_ORDER: u32 = 5;

/// An integer point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Positive when `o -> a -> b` turns counter-clockwise.
fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn distance2(a: Point, b: Point) -> i64 {
    (a.x - b.x).pow(2) + (a.y - b.y).pow(2)
}

fn describe(points: &[Point]) -> String {
    let inner = points
        .iter()
        .map(Point::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

fn demo_points() -> Vec<Point> {
    [(0, 3), (1, 1), (2, 2), (4, 4), (0, 0), (1, 2), (3, 1), (3, 3)]
        .into_iter()
        .map(|(x, y)| Point::new(x, y))
        .collect()
}

fn validate_points(points: &[Point]) -> Result<()> {
    check_len("points", points.len(), 3, MAX_POINTS)?;
    for point in points {
        check_magnitude("x", point.x)?;
        check_magnitude("y", point.y)?;
    }
    Ok(())
}

/// Sorted, de-duplicated copy of `points`.
fn distinct(points: &[Point]) -> Vec<Point> {
    let mut points = points.to_vec();
    points.sort();
    points.dedup();
    points
}

/// Records the outcome of a hull computation. Returns `false` when there are
/// too few distinct points to continue.
fn enough_points(points: &[Point], t: &mut Trace) -> bool {
    if points.len() < 3 {
        t.note(format!(
            "Need at least 3 distinct points, got {}",
            points.len()
        ));
        return false;
    }
    true
}

macro_rules! point_input {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub points: Vec<Point>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    points: demo_points(),
                }
            }
        }
    };
}

point_input! {
    /// Graham scan: sort by polar angle, then keep left turns.
    GrahamScan
}

point_input! {
    /// Jarvis march (gift wrapping).
    JarvisMarch
}

point_input! {
    /// Andrew's monotone chain.
    ConvexHull
}

const GRAHAM_SCAN: &str = "\
p0 = lowest point, leftmost on ties
sort the rest by polar angle around p0, nearer first
for p in sorted points:
    while len(hull) >= 2 and cross(hull[-2], hull[-1], p) <= 0:
        hull.pop()
    hull.push(p)
return hull";

impl Algorithm for GrahamScan {
    fn source(&self) -> &'static str {
        GRAHAM_SCAN
    }

    fn validate(&self) -> Result<()> {
        validate_points(&self.points)
    }

    fn trace(&self) -> Trace {
        let mut points = distinct(&self.points);
        let mut t = Trace::new();
        if !enough_points(&points, &mut t) {
            return t;
        }

        let pivot_index = points
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| (p.y, p.x))
            .map(|(i, _)| i)
            .unwrap_or_default();
        let p0 = points.swap_remove(pivot_index);
        t.at(1, format!("Pivot {}", p0));

        points.sort_by(|&a, &b| match cross(p0, a, b) {
            c if c > 0 => Ordering::Less,
            c if c < 0 => Ordering::Greater,
            _ => distance2(p0, a).cmp(&distance2(p0, b)),
        });
        t.at(2, format!("By angle: {}", describe(&points)));

        let mut hull = vec![p0];
        for p in points {
            while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
                let popped = hull.pop().unwrap_or(p0);
                t.span(
                    LineRange::new(4, 5),
                    format!("{} does not turn left: pop {}", p, popped),
                );
            }
            hull.push(p);
            t.at(6, format!("Push {}", p));
        }

        t.at(7, format!("Hull: {}", describe(&hull)));
        t
    }
}

const JARVIS_MARCH: &str = "\
start = leftmost point, lowest on ties
p = start
repeat:
    add p to hull; q = any point other than p
    for r in points:
        if cross(p, q, r) < 0 or (collinear and r farther than q): q = r
    p = q
until p == start";

impl Algorithm for JarvisMarch {
    fn source(&self) -> &'static str {
        JARVIS_MARCH
    }

    fn validate(&self) -> Result<()> {
        validate_points(&self.points)
    }

    fn trace(&self) -> Trace {
        let points = distinct(&self.points);
        let mut t = Trace::new();
        if !enough_points(&points, &mut t) {
            return t;
        }

        // `distinct` sorts by (x, y), so the first point is the start.
        let start = points[0];
        t.span(LineRange::new(1, 2), format!("Start at {}", start));

        let mut hull = Vec::new();
        let mut p = start;
        loop {
            hull.push(p);
            let mut q = if points[0] == p { points[1] } else { points[0] };
            t.at(4, format!("Add {} to hull", p));
            for &r in &points {
                if r == p || r == q {
                    continue;
                }
                let turn = cross(p, q, r);
                if turn < 0 || (turn == 0 && distance2(p, r) > distance2(p, q)) {
                    t.at(6, format!("{} is more clockwise than {}", r, q));
                    q = r;
                }
            }
            p = q;
            t.at(7, format!("Next hull point {}", p));
            if p == start || hull.len() > points.len() {
                break;
            }
        }

        t.at(8, format!("Hull: {}", describe(&hull)));
        t
    }
}

const MONOTONE_CHAIN: &str = "\
sort points by (x, y)
for p in points:
    while len(lower) >= 2 and cross(lower[-2], lower[-1], p) <= 0: lower.pop()
    lower.push(p)
for p in reversed(points):
    while len(upper) >= 2 and cross(upper[-2], upper[-1], p) <= 0: upper.pop()
    upper.push(p)
hull = lower without its last point + upper without its last point";

fn half_hull<'a>(
    points: impl Iterator<Item = &'a Point>,
    lines: (i64, i64),
    label: &str,
    t: &mut Trace,
) -> Vec<Point> {
    let mut chain: Vec<Point> = Vec::new();
    for &p in points {
        while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) <= 0 {
            if let Some(popped) = chain.pop() {
                t.at(lines.0, format!("{} hull: pop {} before {}", label, popped, p));
            }
        }
        chain.push(p);
        t.at(lines.1, format!("{} hull: push {}", label, p));
    }
    chain
}

impl Algorithm for ConvexHull {
    fn source(&self) -> &'static str {
        MONOTONE_CHAIN
    }

    fn validate(&self) -> Result<()> {
        validate_points(&self.points)
    }

    fn trace(&self) -> Trace {
        let points = distinct(&self.points);
        let mut t = Trace::new();
        if !enough_points(&points, &mut t) {
            return t;
        }
        t.at(1, format!("Sorted: {}", describe(&points)));

        let mut lower = half_hull(points.iter(), (3, 4), "Lower", &mut t);
        let mut upper = half_hull(points.iter().rev(), (6, 7), "Upper", &mut t);
        lower.pop();
        upper.pop();
        lower.extend(upper);

        t.at(8, format!("Hull: {}", describe(&lower)));
        t
    }
}

/// Traces the Hilbert curve of the given order over a `2^order` grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HilbertCurve {
    pub order: u32,
}

impl Default for HilbertCurve {
    fn default() -> Self {
        Self { order: 2 }
    }
}

const HILBERT: &str = "\
side = 2^order
for d in 0..side * side:
    (x, y) = d2xy(side, d)
    draw line to (x, y)";

/// Maps distance `d` along the curve to grid coordinates.
pub(crate) fn hilbert_point(side: u32, d: u32) -> (u32, u32) {
    let (mut x, mut y) = (0, 0);
    let mut t = d;
    let mut s = 1;
    while s < side {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

impl Algorithm for HilbertCurve {
    fn source(&self) -> &'static str {
        HILBERT
    }

    fn validate(&self) -> Result<()> {
        if self.order == 0 || self.order > MAX_HILBERT_ORDER {
            return Err(Error::InvalidInput(format!(
                "order must be between 1 and {}, got {}",
                MAX_HILBERT_ORDER, self.order
            )));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let side = 1u32 << self.order;
        let mut t = Trace::new();
        t.at(1, format!("Order {}: {}x{} grid", self.order, side, side));
        for d in 0..side * side {
            let (x, y) = hilbert_point(side, d);
            t.span(LineRange::new(3, 4), format!("d = {}: ({}, {})", d, x, y));
        }
        t.note(format!("Visited {} cells", side * side));
        t
    }
}
