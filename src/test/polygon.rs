use geo::{polygon, MultiPolygon, Polygon};

/// `POLYGON((0 0, 0 1, 1 1, 1 0, 0 0))`
pub(crate) fn unit_square() -> Polygon {
    polygon![
        (x: 0., y: 0.),
        (x: 0., y: 1.),
        (x: 1., y: 1.),
        (x: 1., y: 0.),
        (x: 0., y: 0.),
    ]
}

/// A small square near Zürich with a hole, in lon/lat.
pub(crate) fn square_with_hole() -> Polygon {
    polygon!(
        exterior: [
            (x: 8.50, y: 47.30),
            (x: 8.60, y: 47.30),
            (x: 8.60, y: 47.40),
            (x: 8.50, y: 47.40),
            (x: 8.50, y: 47.30),
        ],
        interiors: [
            [
                (x: 8.54, y: 47.34),
                (x: 8.56, y: 47.34),
                (x: 8.56, y: 47.36),
                (x: 8.54, y: 47.36),
                (x: 8.54, y: 47.34),
            ],
        ],
    )
}

pub(crate) fn two_squares() -> MultiPolygon {
    let shifted = polygon![
        (x: 2., y: 0.),
        (x: 2., y: 1.),
        (x: 3., y: 1.),
        (x: 3., y: 0.),
        (x: 2., y: 0.),
    ];
    MultiPolygon::new(vec![unit_square(), shifted])
}
