//! Physical-presence check by great-circle distance.

use crate::domain::{AccessError, AccessResult};
use serde::Serialize;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default unlock radius: 50 metres.
pub const DEFAULT_RADIUS_KM: f64 = 0.05;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    // ---
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point from client input, rejecting NaN and out-of-range degrees.
    pub fn checked(lat: f64, lon: f64) -> AccessResult<Self> {
        // ---
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AccessError::validation("Latitude must be between -90 and 90"));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AccessError::validation("Longitude must be between -180 and 180"));
        }
        Ok(Self { lat, lon })
    }
}

/// Haversine distance between two points, in kilometres.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    // ---
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Outcome of a geofence check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeofenceDecision {
    Granted { distance_km: f64 },
    /// Carries what the caller needs to offer directions.
    Denied { distance_km: f64, site: GeoPoint },
}

/// A circle around the site inside which the door may be opened.
#[derive(Debug, Clone, Copy)]
pub struct Geofence {
    site: GeoPoint,
    radius_km: f64,
}

impl Geofence {
    // ---
    pub fn new(site: GeoPoint, radius_km: f64) -> Self {
        Self { site, radius_km }
    }

    pub fn site(&self) -> GeoPoint {
        self.site
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Grant iff the client is within the radius, boundary included.
    pub fn authorize(&self, client: GeoPoint) -> GeofenceDecision {
        // ---
        let distance_km = distance_km(client, self.site);
        if distance_km <= self.radius_km {
            GeofenceDecision::Granted { distance_km }
        } else {
            GeofenceDecision::Denied {
                distance_km,
                site: self.site,
            }
        }
    }
}
