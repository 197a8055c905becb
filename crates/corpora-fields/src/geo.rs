//! Geographic point fields.
//!
//! Stored as GeoJSON (`{"type": "Point", "coordinates": [lon, lat]}`),
//! edited as `"lat, lon"`.

use std::f64::consts::PI;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use corpora_core::defaults::{MAP_ZOOM, OSM_TILE_URL};
use corpora_core::{Error, Result};

/// Highest zoom level served by the public tile server.
pub const MAX_ZOOM: u8 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::Validation(format!(
                "latitude must be within [-90, 90], got {}",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::Validation(format!(
                "longitude must be within [-180, 180], got {}",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Parse the `"lat, lon"` editor form.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split(',').map(str::trim);
        let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
            (Some(lat), Some(lon), None) => (lat, lon),
            _ => {
                return Err(Error::Validation(format!(
                    "expected \"latitude, longitude\", got: {}",
                    raw.trim()
                )))
            }
        };
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| Error::Validation(format!("not a coordinate: {}", s)))
        };
        Self::new(parse(lat)?, parse(lon)?)
    }

    pub fn to_form_string(&self) -> String {
        format!("{}, {}", self.lat, self.lon)
    }

    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        if value.get("type").and_then(JsonValue::as_str) != Some("Point") {
            return Err(Error::Validation(format!("not a GeoJSON point: {}", value)));
        }
        let coords = value
            .get("coordinates")
            .and_then(JsonValue::as_array)
            .filter(|c| c.len() >= 2)
            .ok_or_else(|| Error::Validation(format!("point has no coordinates: {}", value)))?;
        let lon = coords[0].as_f64();
        let lat = coords[1].as_f64();
        match (lat, lon) {
            (Some(lat), Some(lon)) => Self::new(lat, lon),
            _ => Err(Error::Validation(format!(
                "non-numeric coordinates: {}",
                value
            ))),
        }
    }

    pub fn to_geojson(&self) -> JsonValue {
        json!({"type": "Point", "coordinates": [self.lon, self.lat]})
    }

    /// Map tile containing this point at `zoom` (clamped to [`MAX_ZOOM`]).
    pub fn tile(&self, zoom: u8) -> Tile {
        let z = zoom.min(MAX_ZOOM);
        let n = f64::from(1u32 << z);
        let lat = self.lat.clamp(-85.0511, 85.0511).to_radians();
        let x = ((self.lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
        let max = n - 1.0;
        Tile {
            z,
            x: x.clamp(0.0, max) as u32,
            y: y.clamp(0.0, max) as u32,
        }
    }

    /// Tile at the default editor zoom.
    pub fn default_tile(&self) -> Tile {
        self.tile(MAP_ZOOM)
    }
}

/// One slippy-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn url(&self) -> String {
        OSM_TILE_URL
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}
