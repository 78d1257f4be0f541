use crate::consts::KEY_VALUE_SEPARATOR;
use crate::error::MapFileError;

pub(crate) const LONGITUDE_MIN: f64 = -180.0;
pub(crate) const LONGITUDE_MAX: f64 = 180.0;

const CONVERSION_FACTOR: f64 = 1_000_000.0;

/// Rough meters-per-degree at the equator, used for bounding box buffers.
const METERS_PER_DEGREE: f64 = 111_000.0;

pub(crate) fn microdegrees_to_degrees(microdegrees: i64) -> f64 {
    microdegrees as f64 / CONVERSION_FACTOR
}

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLong {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A rectangle in WGS84 degrees, min corner to max corner.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn new(
        min_latitude: f64,
        min_longitude: f64,
        max_latitude: f64,
        max_longitude: f64,
    ) -> Result<Self, MapFileError> {
        if min_latitude > max_latitude || min_longitude > max_longitude {
            return Err(MapFileError::Format(format!(
                "invalid bounding box: [{min_latitude}, {min_longitude}, {max_latitude}, {max_longitude}]"
            )));
        }
        Ok(Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        })
    }

    pub fn center(&self) -> LatLong {
        LatLong::new(
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(other.min_latitude > self.max_latitude
            || other.max_latitude < self.min_latitude
            || other.min_longitude > self.max_longitude
            || other.max_longitude < self.min_longitude)
    }

    /// Returns a copy grown by `meters` on every side, using an equatorial
    /// meters-to-degrees approximation.
    pub fn extend_meters(&self, meters: i32) -> BoundingBox {
        let delta = meters as f64 / METERS_PER_DEGREE;
        BoundingBox {
            min_latitude: self.min_latitude - delta,
            min_longitude: self.min_longitude - delta,
            max_latitude: self.max_latitude + delta,
            max_longitude: self.max_longitude + delta,
        }
    }
}

/// An OSM key/value pair. Equality and ordering compare both strings exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Splits a `"key=value"` literal at the first separator. A literal
    /// without a separator becomes a bare key with an empty value.
    pub fn from_keyvalue(tag: &str) -> Self {
        match tag.split_once(KEY_VALUE_SEPARATOR) {
            Some((key, value)) => Self::new(key, value),
            None => Self::new(tag, ""),
        }
    }
}
