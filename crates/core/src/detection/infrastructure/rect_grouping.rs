//! Merging of raw sliding-window hits into face detections.
//!
//! Follows the classic OpenCV grouping rule: similar rectangles are
//! clustered, weak clusters are dropped, the rest are averaged, and small
//! clusters nested inside stronger ones are discarded.
use crate::shared::bounding_box::Rect;

use super::math;

/// Relative tolerance for two hits to count as the same face.
pub const GROUP_EPS: f64 = 0.2;

/// Whether two rectangles differ on every edge by at most `eps` times their
/// mean smaller side.
pub fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta =
        eps * (f64::from(a.width.min(b.width)) + f64::from(a.height.min(b.height))) * 0.5;
    let close = |p: i32, q: i32| f64::from((p - q).abs()) <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.width, b.x + b.width)
        && close(a.y + a.height, b.y + b.height)
}

/// Cluster `rects` and keep clusters with more than `min_neighbors` members.
///
/// With `min_neighbors == 0` the input is returned unchanged.
pub fn group_rectangles(rects: &[Rect], min_neighbors: usize, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let clusters = math::partition(rects.len(), |i, j| similar(&rects[i], &rects[j], eps));
    let averaged: Vec<(Rect, usize)> = clusters
        .iter()
        .map(|members| (average(rects, members), members.len()))
        .collect();

    let mut kept = Vec::new();
    for (i, &(r1, n1)) in averaged.iter().enumerate() {
        if n1 <= min_neighbors {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, &(r2, n2))| {
            j != i && n2 > min_neighbors && is_nested(&r1, &r2, eps) && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            kept.push(r1);
        }
    }
    kept
}

fn average(rects: &[Rect], members: &[usize]) -> Rect {
    let n = members.len() as f64;
    let (mut x, mut y, mut w, mut h) = (0i64, 0i64, 0i64, 0i64);
    for &m in members {
        let r = &rects[m];
        x += i64::from(r.x);
        y += i64::from(r.y);
        w += i64::from(r.width);
        h += i64::from(r.height);
    }
    let mean = |v: i64| (v as f64 / n).round() as i32;
    Rect::new(mean(x), mean(y), mean(w), mean(h))
}

/// `inner` lies inside `outer` grown by `eps` of its size.
fn is_nested(inner: &Rect, outer: &Rect, eps: f64) -> bool {
    let dx = (f64::from(outer.width) * eps).round() as i32;
    let dy = (f64::from(outer.height) * eps).round() as i32;
    inner.x >= outer.x - dx
        && inner.y >= outer.y - dy
        && inner.x + inner.width <= outer.x + outer.width + dx
        && inner.y + inner.height <= outer.y + outer.height + dy
}
