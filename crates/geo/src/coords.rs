//! # Coordinate Transforms
//!
//! Brings lot geometry from its source CRS into geographic WGS84
//! (longitude, latitude), the frame flood samples live in.
//!
//! ## Pipeline
//! ```text
//! Projected (source CRS)  →  Geographic (WGS84)
//!   easting/northing           lon/lat degrees
//! ```
//!
//! ## Table of Contents
//! 1. Ellipsoid and Projection — built-in inverse projections
//! 2. CRS resolution from `.prj` WKT and EPSG codes
//! 3. PROJ-based accurate transforms (feature-gated)
//! 4. Reprojector — Main entry point

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::{GeoError, Result};
use crate::wkt::WktNode;

// ============================================================================
// 1. Ellipsoid and Projection — built-in inverse projections
// ============================================================================

/// Reference ellipsoid (semi-major axis in meters + flattening)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major: f64,
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        flattening: 1.0 / 298.257_222_101,
    };

    /// Build from a WKT `SPHEROID[name, a, inverse_flattening]`; an inverse
    /// flattening of 0 denotes a sphere.
    pub fn from_inverse_flattening(semi_major: f64, inverse_flattening: f64) -> Self {
        let flattening = if inverse_flattening == 0.0 { 0.0 } else { 1.0 / inverse_flattening };
        Self { semi_major, flattening }
    }

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }
}

/// Parameters shared by the conic and cylindrical projections. Angles are
/// degrees, false easting/northing are meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub ellipsoid: Ellipsoid,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

/// Projections with a built-in inverse (no PROJ dependency)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Already geographic; any datum is treated as WGS84 (sub-meter to a few
    /// meters difference for NAD83/ETRS89, irrelevant at lot scale).
    Geographic,
    /// EPSG:3857 spherical "pseudo" Mercator
    WebMercator,
    LambertConformalConic {
        params: ProjectionParams,
        standard_parallel_1: f64,
        standard_parallel_2: f64,
    },
    TransverseMercator { params: ProjectionParams },
}

/// Earth radius used by Web Mercator
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

impl Projection {
    /// Inverse-project `(x, y)` meters to `(lon, lat)` degrees
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => {
                let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
                let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
                (lon, lat)
            }
            Projection::LambertConformalConic { params, standard_parallel_1, standard_parallel_2 } => {
                lcc_inverse(&params, standard_parallel_1, standard_parallel_2, x, y)
            }
            Projection::TransverseMercator { params } => tm_inverse(&params, x, y),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::Geographic)
    }
}

fn lcc_m(e: f64, phi: f64) -> f64 {
    phi.cos() / (1.0 - e * e * phi.sin().powi(2)).sqrt()
}

fn lcc_t(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Cone constants `(n, F, rho0)` for Lambert Conformal Conic
fn lcc_constants(params: &ProjectionParams, sp1: f64, sp2: f64) -> (f64, f64, f64) {
    let a = params.ellipsoid.semi_major;
    let e = params.ellipsoid.e();
    let phi1 = sp1.to_radians();
    let phi2 = sp2.to_radians();
    let phi0 = params.latitude_of_origin.to_radians();

    let (m1, m2) = (lcc_m(e, phi1), lcc_m(e, phi2));
    let (t0, t1, t2) = (lcc_t(e, phi0), lcc_t(e, phi1), lcc_t(e, phi2));

    let n = if (phi1 - phi2).abs() < 1e-12 {
        phi1.sin()
    } else {
        (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
    };
    let big_f = m1 / (n * t1.powf(n));
    let rho0 = a * big_f * t0.powf(n) * params.scale_factor;
    (n, big_f, rho0)
}

fn lcc_inverse(params: &ProjectionParams, sp1: f64, sp2: f64, x: f64, y: f64) -> (f64, f64) {
    let a = params.ellipsoid.semi_major;
    let e = params.ellipsoid.e();
    let (n, big_f, rho0) = lcc_constants(params, sp1, sp2);

    let sign = n.signum();
    let dx = (x - params.false_easting) * sign;
    let dy = (rho0 - (y - params.false_northing)) * sign;
    let rho = sign * (dx * dx + dy * dy).sqrt();

    if rho == 0.0 {
        return (params.central_meridian, sign * 90.0);
    }

    let t = (rho / (a * params.scale_factor * big_f)).powf(1.0 / n);
    let theta = dx.atan2(dy);
    let lambda = theta / n + params.central_meridian.to_radians();

    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..15 {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        let converged = (next - phi).abs() < 1e-12;
        phi = next;
        if converged {
            break;
        }
    }

    (lambda.to_degrees(), phi.to_degrees())
}

/// Meridional arc length from the equator to `phi` (radians)
fn meridian_arc(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let e2 = ellipsoid.e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    ellipsoid.semi_major
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

fn tm_inverse(params: &ProjectionParams, x: f64, y: f64) -> (f64, f64) {
    let ell = params.ellipsoid;
    let a = ell.semi_major;
    let k0 = params.scale_factor;
    let e2 = ell.e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let m0 = meridian_arc(&ell, params.latitude_of_origin.to_radians());
    let m = m0 + (y - params.false_northing) / k0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_one_minus = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_one_minus) / (1.0 + sqrt_one_minus);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = (x - params.false_easting) / (n1 * k0);

    let phi = phi1
        - (n1 * tan1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lambda = params.central_meridian.to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

    (lambda.to_degrees(), phi.to_degrees())
}

// ============================================================================
// 2. CRS resolution from `.prj` WKT and EPSG codes
// ============================================================================

/// US survey foot in meters
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Resolve an `EPSG:<code>` string against the built-in table
pub fn projection_from_epsg(definition: &str) -> Result<Projection> {
    let code = definition
        .trim()
        .strip_prefix("EPSG:")
        .or_else(|| definition.trim().strip_prefix("epsg:"))
        .ok_or_else(|| GeoError::InvalidCrs(definition.to_string()))?
        .parse::<u32>()
        .map_err(|_| GeoError::InvalidCrs(definition.to_string()))?;

    match code {
        4326 | 4269 | 4258 => Ok(Projection::Geographic),
        3857 | 900913 => Ok(Projection::WebMercator),
        // NAD83 / New York Long Island (ftUS)
        2263 => Ok(Projection::LambertConformalConic {
            params: ProjectionParams {
                ellipsoid: Ellipsoid::GRS80,
                latitude_of_origin: 40.0 + 10.0 / 60.0,
                central_meridian: -74.0,
                scale_factor: 1.0,
                false_easting: 300_000.0,
                false_northing: 0.0,
            },
            standard_parallel_1: 41.0 + 2.0 / 60.0,
            standard_parallel_2: 40.0 + 40.0 / 60.0,
        }),
        // WGS84 / UTM north and south zones
        32601..=32660 | 32701..=32760 => {
            let south = code >= 32701;
            let zone = if south { code - 32700 } else { code - 32600 };
            Ok(Projection::TransverseMercator {
                params: ProjectionParams {
                    ellipsoid: Ellipsoid::WGS84,
                    latitude_of_origin: 0.0,
                    central_meridian: -183.0 + 6.0 * zone as f64,
                    scale_factor: 0.9996,
                    false_easting: 500_000.0,
                    false_northing: if south { 10_000_000.0 } else { 0.0 },
                },
            })
        }
        _ => Err(GeoError::UnsupportedCrs(definition.to_string())),
    }
}

/// A resolved source CRS plus the linear unit its coordinates are stored in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCrs {
    pub projection: Projection,
    /// Meters per source unit (1.0 for geographic sources)
    pub unit_to_meters: f64,
}

impl SourceCrs {
    pub const WGS84: SourceCrs = SourceCrs {
        projection: Projection::Geographic,
        unit_to_meters: 1.0,
    };

    /// Interpret a WKT1 (OGC or ESRI flavoured) CRS definition
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let root = WktNode::parse(wkt)?;

        if ["GEOGCS", "GEOGCRS", "GEODCRS"].iter().any(|k| root.is(k)) {
            return Ok(Self::WGS84);
        }
        if !root.is("PROJCS") {
            return Err(GeoError::UnsupportedCrs(root.keyword.clone()));
        }

        let name = root.name().unwrap_or_default().to_string();
        let method = root
            .child("PROJECTION")
            .and_then(|p| p.name())
            .map(normalize)
            .ok_or_else(|| GeoError::InvalidCrs(format!("{}: missing PROJECTION", name)))?;

        // The last UNIT directly under PROJCS is the linear unit
        let unit_to_meters = root
            .children()
            .filter(|c| c.is("UNIT"))
            .last()
            .and_then(|u| u.numbers().next())
            .unwrap_or(1.0);

        let ellipsoid = root
            .find("SPHEROID")
            .or_else(|| root.find("ELLIPSOID"))
            .and_then(|s| {
                let mut n = s.numbers();
                Some(Ellipsoid::from_inverse_flattening(n.next()?, n.next()?))
            })
            .unwrap_or(Ellipsoid::WGS84);

        let param = |key: &str| -> Option<f64> {
            root.children()
                .filter(|c| c.is("PARAMETER"))
                .find(|c| c.name().map(normalize).as_deref() == Some(key))
                .and_then(|c| c.numbers().next())
        };

        let latitude_of_origin = param("latitudeoforigin")
            .or_else(|| param("latitudeofcenter"))
            .unwrap_or(0.0);
        let params = ProjectionParams {
            ellipsoid,
            latitude_of_origin,
            central_meridian: param("centralmeridian")
                .or_else(|| param("longitudeofcenter"))
                .unwrap_or(0.0),
            scale_factor: param("scalefactor").unwrap_or(1.0),
            false_easting: param("falseeasting").unwrap_or(0.0) * unit_to_meters,
            false_northing: param("falsenorthing").unwrap_or(0.0) * unit_to_meters,
        };

        let projection = if method.contains("auxiliarysphere")
            || method.contains("pseudomercator")
            || method.contains("popularvisualisation")
            || name.to_ascii_lowercase().contains("web_mercator")
        {
            Projection::WebMercator
        } else if method.contains("lambertconformalconic") {
            let sp1 = param("standardparallel1").unwrap_or(latitude_of_origin);
            Projection::LambertConformalConic {
                params,
                standard_parallel_1: sp1,
                standard_parallel_2: param("standardparallel2").unwrap_or(sp1),
            }
        } else if method.contains("transversemercator") {
            Projection::TransverseMercator { params }
        } else {
            return Err(GeoError::UnsupportedCrs(format!("{} ({})", name, method)));
        };

        Ok(Self { projection, unit_to_meters })
    }

    /// Source coordinates → `(lon, lat)`
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        if self.projection.is_geographic() {
            return (x, y);
        }
        self.projection.to_lon_lat(x * self.unit_to_meters, y * self.unit_to_meters)
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Build the [`SourceCrs`] for an EPSG code; EPSG:2263 coordinates are in US feet
pub fn source_crs_from_epsg(definition: &str) -> Result<SourceCrs> {
    let projection = projection_from_epsg(definition)?;
    let unit_to_meters = if definition.trim().ends_with(":2263") {
        US_SURVEY_FOOT
    } else {
        1.0
    };
    Ok(SourceCrs { projection, unit_to_meters })
}

// ============================================================================
// 3. PROJ-based accurate transforms (feature-gated)
// ============================================================================

#[cfg(feature = "proj-transforms")]
fn proj_to_wgs84(definition: &str) -> Result<proj::Proj> {
    use proj::Proj;

    // new_known_crs normalizes axis order, so EPSG:4326 output is (lon, lat)
    Proj::new_known_crs(definition, "EPSG:4326", None)
        .map_err(|e| GeoError::UnsupportedCrs(format!("{}: {}", definition, e)))
}

// ============================================================================
// 4. Reprojector — Main entry point
// ============================================================================

/// Converts source coordinates into WGS84 `(lon, lat)`.
///
/// Uses the built-in projections when the CRS is recognised. With feature
/// `proj-transforms`, anything else falls through to PROJ.
pub enum Reprojector {
    Builtin(SourceCrs),
    #[cfg(feature = "proj-transforms")]
    Proj(proj::Proj),
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reprojector::Builtin(crs) => f.debug_tuple("Builtin").field(crs).finish(),
            #[cfg(feature = "proj-transforms")]
            Reprojector::Proj(_) => f.write_str("Proj(..)"),
        }
    }
}

impl Reprojector {
    /// Identity transform for data already in WGS84
    pub fn wgs84() -> Self {
        Reprojector::Builtin(SourceCrs::WGS84)
    }

    /// Resolve a CRS definition: an `EPSG:<code>` string or WKT text
    pub fn from_definition(definition: &str) -> Result<Self> {
        let trimmed = definition.trim();
        let builtin = if trimmed.to_ascii_uppercase().starts_with("EPSG:") {
            source_crs_from_epsg(trimmed)
        } else {
            SourceCrs::from_wkt(trimmed)
        };

        match builtin {
            Ok(crs) => Ok(Reprojector::Builtin(crs)),
            #[cfg(feature = "proj-transforms")]
            Err(GeoError::UnsupportedCrs(_)) => {
                tracing::info!("Falling back to PROJ for CRS '{}'", short(trimmed));
                Ok(Reprojector::Proj(proj_to_wgs84(trimmed)?))
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Reprojector::Builtin(crs) if crs.projection.is_geographic())
    }

    /// Source `(x, y)` → WGS84 `(lon, lat)`
    pub fn to_lon_lat(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lon, lat) = match self {
            Reprojector::Builtin(crs) => crs.to_lon_lat(x, y),
            #[cfg(feature = "proj-transforms")]
            Reprojector::Proj(p) => p
                .convert((x, y))
                .map_err(|e| GeoError::Transform(format!("({}, {}): {}", x, y, e)))?,
        };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeoError::Transform(format!("({}, {}) has no WGS84 image", x, y)));
        }
        Ok((lon, lat))
    }
}

#[cfg(feature = "proj-transforms")]
fn short(definition: &str) -> &str {
    definition.get(..60).unwrap_or(definition)
}
