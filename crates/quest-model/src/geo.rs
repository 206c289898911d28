//! Geographic windowing around a user.
//!
//! Converts a center point and a half-side distance into a lat/lon box using
//! a spherical Earth. Good enough for the few-kilometer windows users pick;
//! no attempt is made to handle boxes that wrap the antimeridian.

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// An axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// A zero-area box collapsed onto a single point.
    pub fn point(center: Location) -> Self {
        Self {
            min_lat: center.latitude,
            max_lat: center.latitude,
            min_lon: center.longitude,
            max_lon: center.longitude,
        }
    }

    /// Box extending `half_side_km` north, south, east and west of `center`.
    ///
    /// ## Algorithm
    /// - delta_lat = (half_side / R) * (180 / PI)
    /// - delta_lon = (half_side / (R * cos(lat))) * (180 / PI)
    ///
    /// A non-positive (or NaN) half side collapses the box onto the center.
    /// Latitudes are clamped to [-90, 90] and longitudes to [-180, 180], which
    /// also covers the blow-up of delta_lon near the poles.
    pub fn around(center: Location, half_side_km: f64) -> Self {
        if !(half_side_km > 0.0) {
            return Self::point(center);
        }

        let delta_lat = (half_side_km / EARTH_RADIUS_KM).to_degrees();
        let delta_lon =
            (half_side_km / (EARTH_RADIUS_KM * center.latitude.to_radians().cos())).to_degrees();

        // cos() can go negative or zero past the poles
        let delta_lon = if delta_lon.is_finite() && delta_lon >= 0.0 {
            delta_lon
        } else {
            180.0
        };

        Self {
            min_lat: (center.latitude - delta_lat).max(-90.0),
            max_lat: (center.latitude + delta_lat).min(90.0),
            min_lon: (center.longitude - delta_lon).max(-180.0),
            max_lon: (center.longitude + delta_lon).min(180.0),
        }
    }

    /// True when the box has zero area on either axis.
    pub fn is_degenerate(&self) -> bool {
        self.min_lat >= self.max_lat || self.min_lon >= self.max_lon
    }

    pub fn contains(&self, location: Location) -> bool {
        (self.min_lat..=self.max_lat).contains(&location.latitude)
            && (self.min_lon..=self.max_lon).contains(&location.longitude)
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
