//! Where a set of geometries sits: mean centroid and overall extent.

use geo::{BoundingRect, Centroid, Coord, Geometry, Rect};

/// Mean of the centroids of all geometries that have one.
///
/// A single geometry yields its own centroid. Returns `None` when no geometry has a centroid,
/// which is the case for an empty input or one made only of empty geometries.
pub fn mean_center<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<Coord> {
    let (sum, count) = geometries
        .into_iter()
        .filter_map(|geometry| geometry.centroid())
        .fold((Coord { x: 0., y: 0. }, 0usize), |(sum, count), centroid| {
            (sum + centroid.0, count + 1)
        });
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// The smallest rectangle containing every geometry.
pub fn union_bounds<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<Rect> {
    geometries
        .into_iter()
        .filter_map(|geometry| geometry.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            )
        })
}
