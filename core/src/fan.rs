//! Fan triangulation.
//!
//! A convex polygon `p0, p1, ..., pn-1` is split into `n - 2` triangles that
//! all share `p0`:
//!
//! ```text
//!        p2 ---- p3
//!       / \     /
//!      /   \   /
//!     p1    \ /
//!      \     p0 ...
//! ```
//!
//! Triangle `i - 2` is `(p0, p[i-1], p[i])` for `i` in `2..n`. Winding follows
//! the input order.

/// Index triples of the fan over `n` points.
///
/// Empty when `n < 3`.
pub fn fan_triangles(n: usize) -> impl ExactSizeIterator<Item = [usize; 3]> {
    (2..n.max(2)).map(|i| [0, i - 1, i])
}

/// Expand a fan polygon into a flat triangle list of converted vertices.
///
/// Returns an empty list when fewer than three points are given.
pub fn triangulate_fan<P, V>(points: &[P]) -> Vec<V>
where
    V: for<'a> From<&'a P>,
{
    let mut out = Vec::with_capacity(points.len().saturating_sub(2) * 3);
    for [a, b, c] in fan_triangles(points.len()) {
        out.push(V::from(&points[a]));
        out.push(V::from(&points[b]));
        out.push(V::from(&points[c]));
    }
    out
}
