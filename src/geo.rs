// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in meters.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6_371_008.8;

/// Mean diameter of Earth, in meters.
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// 2^31, the span of the fixed-point coordinate space.
const COORDINATE_SPAN: f64 = 2_147_483_648.0;

/// A position in the 31-bit fixed-point map coordinate space.
///
/// `x` grows eastward and is linear in longitude; `y` grows southward
/// and is Web-Mercator-projected, which keeps the space conformal:
/// bearings and local segment proportions survive the projection.
/// Both axes use 31 of the 32 bits, so values are never negative
/// for coordinates inside the usable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Point31 {
    pub x: i32,
    pub y: i32,
}

impl Point31 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts a latitude-longitude position (degrees) into map coordinates.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            x: lon_to_x31(lon),
            y: lat_to_y31(lat),
        }
    }

    pub fn lat(&self) -> f64 {
        y31_to_lat(self.y)
    }

    pub fn lon(&self) -> f64 {
        x31_to_lon(self.x)
    }

    /// Packs both axes into a single 62-bit key, used to anchor
    /// segments of different roads at the same physical vertex.
    pub fn key(&self) -> u64 {
        ((self.x as u64) << 31) | (self.y as u64)
    }
}

pub fn lon_to_x31(lon: f64) -> i32 {
    let x = (lon + 180.0) / 360.0 * COORDINATE_SPAN;
    x.clamp(0.0, COORDINATE_SPAN - 1.0) as i32
}

pub fn lat_to_y31(lat: f64) -> i32 {
    // Web Mercator cuts off near the poles; clamp to its usable band.
    let lat = lat.clamp(-85.0511, 85.0511);
    let projected = lat.to_radians().tan().asinh() / std::f64::consts::PI;
    let y = (1.0 - projected) / 2.0 * COORDINATE_SPAN;
    y.clamp(0.0, COORDINATE_SPAN - 1.0) as i32
}

pub fn x31_to_lon(x: i32) -> f64 {
    x as f64 / COORDINATE_SPAN * 360.0 - 180.0
}

pub fn y31_to_lat(y: i32) -> f64 {
    let projected = std::f64::consts::PI * (1.0 - 2.0 * (y as f64) / COORDINATE_SPAN);
    projected.sinh().atan().to_degrees()
}

/// Calculates the great-circle distance between two map positions
/// using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in meters, as route costs are seconds of travel.
pub fn distance31(a: Point31, b: Point31) -> f64 {
    let lat1 = a.lat().to_radians();
    let lon1 = a.lon().to_radians();
    let lat2 = b.lat().to_radians();
    let lon2 = b.lon().to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().asin()
}

/// Calculates the initial bearing of travel from `a` to `b`,
/// in degrees in `[0, 360)`, 0 = north, 90 = east.
///
/// The Mercator plane is conformal, so a flat atan2 over the
/// fixed-point deltas yields the true bearing; `y` grows southward,
/// hence the negation.
pub fn bearing31(a: Point31, b: Point31) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let bearing = dx.atan2(-dy).to_degrees();
    if bearing < 0.0 {
        bearing + 360.0
    } else {
        bearing
    }
}

/// Normalizes a bearing difference into `(-180, 180]` degrees,
/// positive = clockwise (a right-hand deviation).
pub fn normalize_degrees(mut delta: f64) -> f64 {
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Projects `p` onto the segment `a`-`b` and returns the projected
/// point together with its distance from `p` in meters.
///
/// The projection parameter is computed in the fixed-point plane,
/// which is locally uniform (same Mercator scale on both axes), so
/// no latitude correction is needed at road-segment lengths.
pub fn project_on_segment(p: Point31, a: Point31, b: Point31) -> (Point31, f64) {
    let abx = (b.x - a.x) as f64;
    let aby = (b.y - a.y) as f64;
    let apx = (p.x - a.x) as f64;
    let apy = (p.y - a.y) as f64;

    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let projected = Point31 {
        x: a.x + (abx * t) as i32,
        y: a.y + (aby * t) as i32,
    };
    (projected, distance31(p, projected))
}
