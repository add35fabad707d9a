//! Coordinate reference system identifiers attached to a [`GeometryTable`].
//!
//! A [`Crs`] is only an identifier: it never transforms coordinates by itself. Formats that carry
//! their own reference system (Shapefile `.prj`, the legacy GeoJSON `crs` member) are mapped onto
//! an EPSG code when the definition is recognisable and otherwise kept verbatim.
//!
//! [`GeometryTable`]: crate::table::GeometryTable

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CartoError, Result};

/// EPSG code of geographic WGS84 longitude/latitude.
pub const EPSG_WGS84: u32 = 4326;

/// EPSG code of spherical Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// EPSG code of ellipsoidal World Mercator.
pub const EPSG_WORLD_MERCATOR: u32 = 3395;

const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

const WEB_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;

const WORLD_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_World_Mercator",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],UNIT["Meter",1.0]]"#;

/// A coordinate reference system identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// A code in the EPSG registry.
    Epsg(u32),
    /// A definition that could not be mapped onto an EPSG code, kept as given.
    Other(String),
}

impl Crs {
    /// Geographic WGS84, the reference of every pasted WKT/WKB string.
    pub fn wgs84() -> Self {
        Crs::Epsg(EPSG_WGS84)
    }

    /// Spherical Web Mercator, the planar reference used for statistics.
    pub fn web_mercator() -> Self {
        Crs::Epsg(EPSG_WEB_MERCATOR)
    }

    /// Ellipsoidal World Mercator.
    pub fn world_mercator() -> Self {
        Crs::Epsg(EPSG_WORLD_MERCATOR)
    }

    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Other(_) => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Epsg(EPSG_WGS84))
    }

    /// Interpret the text of a Shapefile `.prj` sidecar.
    ///
    /// Both OGC WKT with a trailing `AUTHORITY["EPSG", ..]` and the ESRI flavour (names only) are
    /// recognised for the systems this crate knows about. Anything else is kept as
    /// [`Crs::Other`].
    pub fn from_prj(prj: &str) -> Self {
        let prj = prj.trim();

        // The outermost AUTHORITY is the last one in WKT1.
        if let Some(start) = prj.rfind("AUTHORITY[\"EPSG\"") {
            let code: String = prj[start + "AUTHORITY[\"EPSG\"".len()..]
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(code) = code.parse() {
                return Crs::Epsg(code);
            }
        }

        let head: String = prj.chars().take(64).collect::<String>().to_ascii_uppercase();
        if head.starts_with("GEOGCS[\"GCS_WGS_1984\"") || head.starts_with("GEOGCS[\"WGS 84\"") {
            Crs::wgs84()
        } else if head.contains("WEB_MERCATOR") || head.contains("PSEUDO-MERCATOR") {
            Crs::web_mercator()
        } else if head.contains("WORLD_MERCATOR") || head.contains("WORLD MERCATOR") {
            Crs::world_mercator()
        } else if let Some(utm) = utm_from_esri_name(&head) {
            utm
        } else {
            tracing::warn!("Unrecognised .prj definition, keeping it verbatim");
            Crs::Other(prj.to_string())
        }
    }

    /// The ESRI WKT to write into a `.prj` sidecar, when this crate knows one.
    pub fn to_prj(&self) -> Option<&'static str> {
        match self {
            Crs::Epsg(EPSG_WGS84) => Some(WGS84_PRJ),
            Crs::Epsg(EPSG_WEB_MERCATOR) => Some(WEB_MERCATOR_PRJ),
            Crs::Epsg(EPSG_WORLD_MERCATOR) => Some(WORLD_MERCATOR_PRJ),
            _ => None,
        }
    }
}

/// `WGS_1984_UTM_Zone_33N` and `ETRS_1989_UTM_Zone_32N` style projection names.
fn utm_from_esri_name(head: &str) -> Option<Crs> {
    let (datum, zone) = head.split_once("_UTM_ZONE_")?;
    let digits: String = zone.chars().take_while(|c| c.is_ascii_digit()).collect();
    let number: u32 = digits.parse().ok()?;
    let hemisphere = zone[digits.len()..].chars().next()?;
    let base = match (datum.rsplit('"').next()?, hemisphere) {
        ("WGS_1984", 'N') => 32600,
        ("WGS_1984", 'S') => 32700,
        ("ETRS_1989", 'N') => 25800,
        _ => return None,
    };
    (1..=60).contains(&number).then(|| Crs::Epsg(base + number))
}

impl Default for Crs {
    fn default() -> Self {
        Crs::wgs84()
    }
}

impl FromStr for Crs {
    type Err = CartoError;

    /// Accepts `EPSG:3857`, a bare `3857`, OGC URNs such as `urn:ogc:def:crs:EPSG::3857` and the
    /// `CRS84` alias of WGS84.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CartoError::Projection("empty CRS identifier".to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Crs::wgs84());
        }

        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            upper.rsplit(':').next().unwrap_or_default()
        } else if let Some(idx) = upper.find("/EPSG/") {
            upper[idx..].rsplit('/').next().unwrap_or_default()
        } else {
            upper.as_str()
        };

        match code.trim().parse::<u32>() {
            Ok(code) => Ok(Crs::Epsg(code)),
            Err(_) => Ok(Crs::Other(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Crs {
    type Error = CartoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.to_string()
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Other(definition) => write!(f, "{}", definition),
        }
    }
}
