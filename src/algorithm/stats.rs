//! Area, perimeter and per-kind counts of a [`GeometryTable`].
//!
//! Measurements are taken on a working copy reprojected into a planar CRS, so their raw unit is
//! the meter. Conversion into a display unit happens once, at the end.

use std::fmt::Display;
use std::str::FromStr;

use geo::{Area, EuclideanLength, Geometry, Polygon};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{GeometryKind, GeometryTable};

/// Unit in which areas are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AreaUnit {
    #[default]
    SquareMeters,
    SquareKilometers,
    SquareMiles,
    Hectares,
    Acres,
}

impl AreaUnit {
    pub const ALL: [AreaUnit; 5] = [
        AreaUnit::SquareMeters,
        AreaUnit::SquareKilometers,
        AreaUnit::SquareMiles,
        AreaUnit::Hectares,
        AreaUnit::Acres,
    ];

    /// Square meters per one of this unit.
    pub fn divisor(&self) -> f64 {
        match self {
            AreaUnit::SquareMeters => 1.0,
            AreaUnit::SquareKilometers => 1e6,
            AreaUnit::SquareMiles => 2.59e6,
            AreaUnit::Hectares => 1e4,
            AreaUnit::Acres => 4046.86,
        }
    }

    pub fn from_square_meters(&self, area: f64) -> f64 {
        area / self.divisor()
    }

    pub fn label(&self) -> &'static str {
        match self {
            AreaUnit::SquareMeters => "Square Meters",
            AreaUnit::SquareKilometers => "Square Kilometers",
            AreaUnit::SquareMiles => "Square Miles",
            AreaUnit::Hectares => "Hectares",
            AreaUnit::Acres => "Acres",
        }
    }
}

impl Display for AreaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AreaUnit {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "square meters" | "square metres" | "m²" | "m2" | "sqm" => Ok(AreaUnit::SquareMeters),
            "square kilometers" | "square kilometres" | "km²" | "km2" => {
                Ok(AreaUnit::SquareKilometers)
            }
            "square miles" | "mi²" | "mi2" => Ok(AreaUnit::SquareMiles),
            "hectares" | "ha" => Ok(AreaUnit::Hectares),
            "acres" | "ac" => Ok(AreaUnit::Acres),
            _ => Err(CartoError::Parse(format!("unknown area unit: {}", s))),
        }
    }
}

impl TryFrom<String> for AreaUnit {
    type Error = CartoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AreaUnit> for String {
    fn from(value: AreaUnit) -> Self {
        value.label().to_string()
    }
}

/// Unit in which perimeters are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LengthUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
}

impl LengthUnit {
    /// Meters per one of this unit.
    pub fn divisor(&self) -> f64 {
        match self {
            LengthUnit::Meters => 1.0,
            LengthUnit::Kilometers => 1000.0,
            LengthUnit::Miles => 1609.344,
        }
    }

    pub fn from_meters(&self, length: f64) -> f64 {
        length / self.divisor()
    }

    pub fn label(&self) -> &'static str {
        match self {
            LengthUnit::Meters => "Meters",
            LengthUnit::Kilometers => "Kilometers",
            LengthUnit::Miles => "Miles",
        }
    }
}

impl Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LengthUnit {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "meters" | "metres" | "m" => Ok(LengthUnit::Meters),
            "kilometers" | "kilometres" | "km" => Ok(LengthUnit::Kilometers),
            "miles" | "mi" => Ok(LengthUnit::Miles),
            _ => Err(CartoError::Parse(format!("unknown length unit: {}", s))),
        }
    }
}

impl TryFrom<String> for LengthUnit {
    type Error = CartoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LengthUnit> for String {
    fn from(value: LengthUnit) -> Self {
        value.label().to_string()
    }
}

/// Options for [`compute_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    /// Planar CRS in which areas and lengths are measured.
    pub planar_crs: Crs,

    pub area_unit: AreaUnit,

    pub length_unit: LengthUnit,
}

impl StatsOptions {
    pub fn new(area_unit: AreaUnit, length_unit: LengthUnit) -> Self {
        Self {
            area_unit,
            length_unit,
            ..Default::default()
        }
    }

    pub fn with_planar_crs(self, planar_crs: Crs) -> Self {
        Self { planar_crs, ..self }
    }
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            planar_crs: Crs::web_mercator(),
            area_unit: AreaUnit::default(),
            length_unit: LengthUnit::default(),
        }
    }
}

/// Aggregate measurements of a table, already converted into the requested units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryStats {
    /// Total area in [`GeometryStats::area_unit`].
    pub area: f64,

    /// Total boundary length in [`GeometryStats::length_unit`].
    pub perimeter: f64,

    /// Number of rows, including rows without a geometry.
    pub count: usize,

    pub point_count: usize,

    pub line_count: usize,

    pub polygon_count: usize,

    pub area_unit: AreaUnit,

    pub length_unit: LengthUnit,
}

impl GeometryStats {
    /// Total area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.area * self.area_unit.divisor()
    }

    /// Total perimeter in meters.
    pub fn perimeter_m(&self) -> f64 {
        self.perimeter * self.length_unit.divisor()
    }

    /// The lines shown under the map.
    ///
    /// Polygonal tables report their total area and polygon count, point tables their point
    /// count. Tables of lines report their total length.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.polygon_count > 0 {
            lines.push(format!(
                "Total area: {:.2} {}",
                self.area,
                self.area_unit.label().to_lowercase()
            ));
            lines.push(format!("Count of polygons: {}", self.polygon_count));
        }
        if self.line_count > 0 {
            lines.push(format!(
                "Total length: {:.2} {}",
                self.perimeter,
                self.length_unit.label().to_lowercase()
            ));
            lines.push(format!("Count of lines: {}", self.line_count));
        }
        if self.point_count > 0 {
            lines.push(format!("Count of points: {}", self.point_count));
        }
        lines
    }
}

/// Unsigned area of a geometry; zero for anything that is not polygonal.
pub fn geometry_area(geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_)
        | Geometry::GeometryCollection(_) => geometry.unsigned_area(),
        _ => 0.0,
    }
}

/// Length of a geometry's boundary: every ring of a polygon, the full length of a line, nothing
/// for a point.
pub fn geometry_perimeter(geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => 0.0,
        Geometry::Line(line) => line.euclidean_length(),
        Geometry::LineString(line_string) => line_string.euclidean_length(),
        Geometry::MultiLineString(lines) => lines.euclidean_length(),
        Geometry::Polygon(polygon) => polygon_perimeter(polygon),
        Geometry::MultiPolygon(polygons) => polygons.iter().map(polygon_perimeter).sum(),
        Geometry::Rect(rect) => polygon_perimeter(&rect.to_polygon()),
        Geometry::Triangle(triangle) => polygon_perimeter(&triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            collection.iter().map(geometry_perimeter).sum()
        }
    }
}

fn polygon_perimeter(polygon: &Polygon) -> f64 {
    polygon.exterior().euclidean_length()
        + polygon
            .interiors()
            .iter()
            .map(|ring| ring.euclidean_length())
            .sum::<f64>()
}

/// Measure every geometry of `table` in `options.planar_crs`.
///
/// The table itself is not modified. A table whose CRS cannot be converted into the planar CRS
/// fails with [`CartoError::Projection`].
pub fn compute_stats(table: &GeometryTable, options: &StatsOptions) -> Result<GeometryStats> {
    let planar = table.to_crs(&options.planar_crs)?;

    let mut area = 0.0;
    let mut perimeter = 0.0;
    let mut point_count = 0;
    let mut line_count = 0;
    let mut polygon_count = 0;
    for geometry in planar.iter_geometries() {
        area += geometry_area(geometry);
        perimeter += geometry_perimeter(geometry);

        let kind = GeometryKind::of(geometry);
        if kind.is_puntal() {
            point_count += 1;
        } else if kind.is_lineal() {
            line_count += 1;
        } else if kind.is_polygonal() {
            polygon_count += 1;
        }
    }

    tracing::debug!(
        rows = table.len(),
        area_m2 = area,
        perimeter_m = perimeter,
        "Computed statistics"
    );

    Ok(GeometryStats {
        area: options.area_unit.from_square_meters(area),
        perimeter: options.length_unit.from_meters(perimeter),
        count: table.len(),
        point_count,
        line_count,
        polygon_count,
        area_unit: options.area_unit,
        length_unit: options.length_unit,
    })
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use geo::line_string;

    use super::*;
    use crate::test::{polygon, table};

    #[test]
    fn point_table_has_no_area() {
        let stats = compute_stats(&table::points(), &StatsOptions::default()).unwrap();
        assert_eq!(stats.area, 0.0);
        assert_eq!(stats.perimeter, 0.0);
        assert_eq!(stats.point_count, 3);
        assert_eq!(stats.polygon_count, 0);
        assert_eq!(stats.summary(), vec!["Count of points: 3".to_string()]);
    }

    #[test]
    fn unit_square_in_web_mercator() {
        let table = GeometryTable::single(polygon::unit_square().into(), Crs::wgs84()).unwrap();
        let stats = compute_stats(&table, &StatsOptions::default()).unwrap();
        assert!(stats.area.is_finite());
        assert!(stats.area > 0.0);
        assert_eq!(stats.polygon_count, 1);
        assert_eq!(stats.count, 1);

        // One degree of longitude at the equator
        let side = 6_378_137.0_f64 * 1.0_f64.to_radians();
        assert_relative_eq!(stats.area, side * 111325.14286638486, max_relative = 1e-9);
        assert_relative_eq!(
            stats.perimeter,
            2.0 * side + 2.0 * 111325.14286638486,
            max_relative = 1e-9
        );
    }

    #[test]
    fn units_convert_back_to_square_meters() {
        let table = table::polygons();
        let base = compute_stats(&table, &StatsOptions::default()).unwrap();
        for unit in AreaUnit::ALL {
            let stats =
                compute_stats(&table, &StatsOptions::new(unit, LengthUnit::Meters)).unwrap();
            assert_relative_eq!(stats.area * unit.divisor(), base.area, max_relative = 1e-12);
            assert_relative_eq!(stats.area_m2(), base.area, max_relative = 1e-12);
        }
        assert_eq!(AreaUnit::Acres.divisor(), 4046.86);
        assert_eq!(AreaUnit::SquareMiles.divisor(), 2.59e6);
    }

    #[test]
    fn holes_reduce_area_and_add_perimeter() {
        let with_hole: Geometry = polygon::square_with_hole().into();
        let exterior: Geometry =
            Polygon::new(polygon::square_with_hole().exterior().clone(), vec![]).into();
        assert!(geometry_area(&with_hole) < geometry_area(&exterior));
        assert!(geometry_perimeter(&with_hole) > geometry_perimeter(&exterior));
    }

    #[test]
    fn lines_have_length_but_no_area() {
        let line: Geometry = line_string![(x: 0., y: 0.), (x: 3., y: 4.)].into();
        assert_eq!(geometry_area(&line), 0.0);
        assert_eq!(geometry_perimeter(&line), 5.0);
    }

    #[test]
    fn summary_wording() {
        let stats = GeometryStats {
            area: 1234.5678,
            perimeter: 10.0,
            count: 2,
            point_count: 0,
            line_count: 0,
            polygon_count: 2,
            area_unit: AreaUnit::Hectares,
            length_unit: LengthUnit::Meters,
        };
        assert_eq!(
            stats.summary(),
            vec![
                "Total area: 1234.57 hectares".to_string(),
                "Count of polygons: 2".to_string()
            ]
        );
    }

    #[test]
    fn unit_labels() {
        assert_eq!("Square Kilometers".parse::<AreaUnit>().unwrap(), AreaUnit::SquareKilometers);
        assert_eq!("m²".parse::<AreaUnit>().unwrap(), AreaUnit::SquareMeters);
        assert_eq!("acres".parse::<AreaUnit>().unwrap(), AreaUnit::Acres);
        assert_eq!("square_miles".parse::<AreaUnit>().unwrap(), AreaUnit::SquareMiles);
        assert!("furlongs".parse::<AreaUnit>().is_err());
        assert_eq!("km".parse::<LengthUnit>().unwrap(), LengthUnit::Kilometers);
        for unit in AreaUnit::ALL {
            assert_eq!(unit.to_string().parse::<AreaUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn unknown_crs_is_projection_error() {
        let table = GeometryTable::single(
            polygon::unit_square().into(),
            Crs::Other("LOCAL_CS[\"grid\"]".to_string()),
        )
        .unwrap();
        let err = compute_stats(&table, &StatsOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Projection);
    }
}
