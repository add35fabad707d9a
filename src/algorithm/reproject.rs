//! Move geometries between coordinate reference systems.
//!
//! Geographic WGS84, Web Mercator, World Mercator and the UTM zones on WGS84 and ETRS89 are
//! handled by [`geodesy`] operators. With the `proj` feature any other pair is handed to PROJ.

use geo::{Coord, Geometry, MapCoords};
use geodesy::prelude::*;

use crate::crs::{Crs, EPSG_WEB_MERCATOR, EPSG_WGS84, EPSG_WORLD_MERCATOR};
use crate::error::{CartoError, Result};
use crate::table::GeometryTable;

/// Latitude at which Web Mercator becomes a square, in degrees.
pub const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A reference system expressed as a geodesy operator applied to geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
enum Definition {
    Geographic,
    Projected { operator: String, mercator: bool },
}

impl Definition {
    fn of(crs: &Crs) -> Option<Self> {
        let code = crs.epsg_code()?;
        let definition = match code {
            EPSG_WGS84 => Definition::Geographic,
            EPSG_WEB_MERCATOR => Definition::Projected {
                operator: "webmerc".to_string(),
                mercator: true,
            },
            EPSG_WORLD_MERCATOR => Definition::Projected {
                operator: "merc ellps=WGS84".to_string(),
                mercator: true,
            },
            32601..=32660 => Definition::utm(code - 32600, false, "WGS84"),
            32701..=32760 => Definition::utm(code - 32700, true, "WGS84"),
            25828..=25838 => Definition::utm(code - 25800, false, "GRS80"),
            _ => return None,
        };
        Some(definition)
    }

    fn utm(zone: u32, south: bool, ellps: &str) -> Self {
        let lon_0 = f64::from(zone) * 6.0 - 183.0;
        let y_0 = if south { 10_000_000 } else { 0 };
        Definition::Projected {
            operator: format!("tmerc lon_0={lon_0} k_0=0.9996 x_0=500000 y_0={y_0} ellps={ellps}"),
            mercator: false,
        }
    }

    fn operator(&self) -> Option<&str> {
        match self {
            Definition::Geographic => None,
            Definition::Projected { operator, .. } => Some(operator),
        }
    }

    fn is_mercator(&self) -> bool {
        matches!(self, Definition::Projected { mercator: true, .. })
    }
}

/// Source inverse then target forward, with geographic radians in between.
struct GeodesyPipeline {
    context: Minimal,
    inverse: Option<OpHandle>,
    forward: Option<OpHandle>,
    clamp_latitude: bool,
}

impl GeodesyPipeline {
    fn new(source: &Definition, target: &Definition) -> Result<Self> {
        let mut context = Minimal::new();
        let inverse = source.operator().map(|op| context.op(op)).transpose()?;
        let forward = target.operator().map(|op| context.op(op)).transpose()?;
        Ok(Self {
            context,
            inverse,
            forward,
            clamp_latitude: target.is_mercator(),
        })
    }

    fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut operands = match self.inverse {
            Some(op) => {
                let mut operands = [Coor2D([x, y])];
                self.context.apply(op, Direction::Inv, &mut operands)?;
                operands
            }
            None => [Coor2D([x.to_radians(), y.to_radians()])],
        };

        if self.clamp_latitude {
            let max = MERCATOR_MAX_LATITUDE.to_radians();
            operands[0].0[1] = operands[0].0[1].clamp(-max, max);
        }

        match self.forward {
            Some(op) => {
                self.context.apply(op, Direction::Fwd, &mut operands)?;
                let Coor2D([x, y]) = operands[0];
                Ok((x, y))
            }
            None => {
                let Coor2D([lon, lat]) = operands[0];
                Ok((lon.to_degrees(), lat.to_degrees()))
            }
        }
    }
}

enum Backend {
    Identity,
    Geodesy(GeodesyPipeline),
    #[cfg(feature = "proj")]
    Proj(proj::Proj),
}

/// A resolved conversion from one [`Crs`] to another.
///
/// Construction fails for pairs that cannot be converted, so a [`Transformer`] in hand always
/// knows how to move coordinates; individual coordinates can still fail when they land outside
/// the valid domain of the target.
pub struct Transformer {
    source: Crs,
    target: Crs,
    backend: Backend,
}

impl Transformer {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        let backend = if source == target {
            Backend::Identity
        } else if let (Some(from), Some(to)) = (Definition::of(source), Definition::of(target)) {
            Backend::Geodesy(GeodesyPipeline::new(&from, &to)?)
        } else {
            Self::fallback(source, target)?
        };
        tracing::debug!(%source, %target, "Resolved reprojection");

        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            backend,
        })
    }

    #[cfg(feature = "proj")]
    fn fallback(source: &Crs, target: &Crs) -> Result<Backend> {
        let proj = proj::Proj::new_known_crs(&source.to_string(), &target.to_string(), None)?;
        Ok(Backend::Proj(proj))
    }

    #[cfg(not(feature = "proj"))]
    fn fallback(source: &Crs, target: &Crs) -> Result<Backend> {
        Err(CartoError::Projection(format!(
            "no transformation from {} to {} (enable the `proj` feature for arbitrary systems)",
            source, target
        )))
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.backend, Backend::Identity)
    }

    pub fn transform_coord(&self, coord: Coord) -> Result<Coord> {
        if !(coord.x.is_finite() && coord.y.is_finite()) {
            return Err(CartoError::Projection(format!(
                "non-finite coordinate ({}, {})",
                coord.x, coord.y
            )));
        }

        let (x, y) = match &self.backend {
            Backend::Identity => return Ok(coord),
            Backend::Geodesy(pipeline) => pipeline.convert(coord.x, coord.y)?,
            #[cfg(feature = "proj")]
            Backend::Proj(proj) => proj.convert((coord.x, coord.y))?,
        };

        if x.is_finite() && y.is_finite() {
            Ok(Coord { x, y })
        } else {
            Err(CartoError::Projection(format!(
                "({}, {}) has no position in {}",
                coord.x, coord.y, self.target
            )))
        }
    }
}

/// Reproject geometries with a [`Transformer`].
pub trait Reproject {
    fn reproject(&self, transformer: &Transformer) -> Result<Self>
    where
        Self: Sized;
}

impl Reproject for Geometry {
    fn reproject(&self, transformer: &Transformer) -> Result<Self> {
        if transformer.is_identity() {
            return Ok(self.clone());
        }
        self.try_map_coords(|coord| transformer.transform_coord(coord))
    }
}

impl Reproject for GeometryTable {
    /// Fails without touching `self` if the table is not in the transformer's source CRS or if
    /// any coordinate cannot be converted.
    fn reproject(&self, transformer: &Transformer) -> Result<Self> {
        if self.crs() != transformer.source() {
            return Err(CartoError::Projection(format!(
                "table is in {} but the transformation starts from {}",
                self.crs(),
                transformer.source()
            )));
        }
        self.try_map_geometries(transformer.target().clone(), |geometry| {
            geometry.reproject(transformer)
        })
    }
}

impl GeometryTable {
    /// A copy of this table with every geometry expressed in `target`.
    pub fn to_crs(&self, target: &Crs) -> Result<Self> {
        let transformer = Transformer::new(self.crs(), target)?;
        self.reproject(&transformer)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use geo::{point, Point};

    use super::*;
    use crate::test::point::{p0, p1, p2};
    use crate::test::table;

    fn convert(p: Point, from: Crs, to: Crs) -> Point {
        let transformer = Transformer::new(&from, &to).unwrap();
        transformer.transform_coord(p.0).unwrap().into()
    }

    #[test]
    fn web_mercator_known_value() {
        // echo 1 0 | cs2cs EPSG:4326 EPSG:3857
        // 0.00	111325.14 0.00
        let out = convert(p0(), Crs::wgs84(), Crs::web_mercator());
        assert_eq!(out.x(), 0.0);
        assert_relative_eq!(out.y(), 111325.1428663851, epsilon = 1e-6);
    }

    #[test]
    fn world_mercator_known_value() {
        // echo 45 10 | cs2cs EPSG:4326 EPSG:3395
        let out = convert(point!(x: 10., y: 45.), Crs::wgs84(), Crs::world_mercator());
        assert_relative_eq!(out.x(), 1113194.9079327357, epsilon = 1e-6);
        assert_relative_eq!(out.y(), 5591295.9185533915, epsilon = 1e-3);
    }

    #[test]
    fn round_trips() {
        let near_zone = [point!(x: 13.4, y: 52.52), point!(x: 8.5, y: 47.3)];
        let cases = [
            (Crs::web_mercator(), vec![p0(), p1(), p2(), point!(x: -122.4, y: 37.8)]),
            (Crs::world_mercator(), vec![p0(), p1(), p2(), point!(x: -122.4, y: 37.8)]),
            (Crs::Epsg(32633), near_zone.to_vec()),
            (Crs::Epsg(25832), near_zone.to_vec()),
        ];
        for (target, points) in cases {
            for p in points {
                let there = convert(p, Crs::wgs84(), target.clone());
                let back = convert(there, target.clone(), Crs::wgs84());
                assert_relative_eq!(back.x(), p.x(), epsilon = 1e-9);
                assert_relative_eq!(back.y(), p.y(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn between_mercators_goes_through_geographic() {
        let p = point!(x: 8.5, y: 47.3);
        let direct = convert(p, Crs::web_mercator(), Crs::world_mercator());
        let via = convert(
            convert(p, Crs::web_mercator(), Crs::wgs84()),
            Crs::wgs84(),
            Crs::world_mercator(),
        );
        assert_relative_eq!(direct.x(), via.x(), epsilon = 1e-6);
        assert_relative_eq!(direct.y(), via.y(), epsilon = 1e-6);
    }

    #[test]
    fn poles_are_clamped() {
        let out = convert(point!(x: 0., y: 90.), Crs::wgs84(), Crs::web_mercator());
        assert!(out.y().is_finite());
        assert_relative_eq!(out.y(), 20037508.342789244, epsilon = 1e-3);
    }

    #[test]
    fn non_finite_input_rejected() {
        let transformer = Transformer::new(&Crs::wgs84(), &Crs::web_mercator()).unwrap();
        let err = transformer
            .transform_coord(Coord { x: f64::NAN, y: 0. })
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Projection);
    }

    #[test]
    fn utm_known_values() {
        // echo 16.3725 48.2083 | cs2cs EPSG:4326 EPSG:32633
        let out = convert(point!(x: 16.3725, y: 48.2083), Crs::wgs84(), Crs::Epsg(32633));
        assert_relative_eq!(out.x(), 601968.4286, epsilon = 1e-2);
        assert_relative_eq!(out.y(), 5340362.9829, epsilon = 1e-2);

        let out = convert(point!(x: 15., y: -45.), Crs::wgs84(), Crs::Epsg(32733));
        assert_relative_eq!(out.x(), 500000.0, epsilon = 1e-6);
        assert_relative_eq!(out.y(), 5017049.5998, epsilon = 1e-2);
    }

    #[test]
    fn utm_to_geographic() {
        let out = convert(point!(x: 500000., y: 0.), Crs::Epsg(32633), Crs::wgs84());
        assert_relative_eq!(out.x(), 15.0, epsilon = 1e-9);
        assert_relative_eq!(out.y(), 0.0, epsilon = 1e-9);

        let out = convert(point!(x: 391440.0321, y: 5820079.6669), Crs::Epsg(32633), Crs::wgs84());
        assert_relative_eq!(out.x(), 13.4, epsilon = 1e-7);
        assert_relative_eq!(out.y(), 52.52, epsilon = 1e-7);
    }

    #[cfg(not(feature = "proj"))]
    #[test]
    fn unsupported_pair_is_projection_error() {
        // CH1903+ / LV95
        let err = Transformer::new(&Crs::wgs84(), &Crs::Epsg(2056)).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Projection);
    }

    #[test]
    fn table_to_crs() {
        let table = table::points();
        let projected = table.to_crs(&Crs::web_mercator()).unwrap();
        assert_eq!(projected.crs(), &Crs::web_mercator());
        assert_eq!(projected.len(), table.len());
        assert_eq!(projected.attributes(), table.attributes());

        let back = projected.to_crs(&Crs::wgs84()).unwrap();
        for (a, b) in back.iter_geometries().zip(table.iter_geometries()) {
            let (Geometry::Point(a), Geometry::Point(b)) = (a, b) else {
                panic!("expected points");
            };
            assert_relative_eq!(a.x(), b.x(), epsilon = 1e-9);
            assert_relative_eq!(a.y(), b.y(), epsilon = 1e-9);
        }
    }

    #[test]
    fn wrong_source_crs_rejected() {
        let table = table::points();
        let transformer = Transformer::new(&Crs::web_mercator(), &Crs::wgs84()).unwrap();
        assert!(table.reproject(&transformer).is_err());
    }
}
