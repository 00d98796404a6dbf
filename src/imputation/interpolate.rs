//! Linear interpolation over one ordered partition

/// An observed point usable as an interpolation anchor
#[derive(Debug, Clone, Copy)]
struct Anchor {
    row: usize,
    x: f64,
    y: f64,
}

/// Fill gaps in one ordered series by linear interpolation along `xs`.
///
/// Rows must be ordered by `x` (rows whose `x` is `None` may appear anywhere;
/// they neither anchor nor receive values). Gaps before the first or after
/// the last anchor take that anchor's value. Partitions with fewer than
/// `min_points` anchors are left untouched.
///
/// Returns the number of cells filled.
pub fn interpolate_series(xs: &[Option<f64>], values: &mut [Option<f64>], min_points: usize) -> usize {
    debug_assert_eq!(xs.len(), values.len());

    let anchors: Vec<Anchor> = xs
        .iter()
        .zip(values.iter())
        .enumerate()
        .filter_map(|(row, (x, y))| Some(Anchor { row, x: (*x)?, y: (*y)? }))
        .collect();

    if anchors.is_empty() || anchors.len() < min_points {
        return 0;
    }

    let mut filled = 0;
    let mut next = 0;
    for row in 0..values.len() {
        while next < anchors.len() && anchors[next].row <= row {
            next += 1;
        }
        if values[row].is_some() {
            continue;
        }
        let Some(x) = xs[row] else { continue };

        let before = next.checked_sub(1).map(|i| anchors[i]);
        let after = anchors.get(next).copied();
        let value = match (before, after) {
            (Some(a), Some(b)) if b.x > a.x => a.y + (b.y - a.y) * (x - a.x) / (b.x - a.x),
            (Some(a), _) => a.y,
            (None, Some(b)) => b.y,
            (None, None) => continue,
        };

        values[row] = Some(value);
        filled += 1;
    }
    filled
}
