use std::f64::consts::PI;

/// Latitude bound of the spherical mercator projection.
pub const LATITUDE_MAX: f64 = 85.051_128_779_806_59;
pub const LATITUDE_MIN: f64 = -LATITUDE_MAX;

/// Spherical mercator tile arithmetic on the XYZ scheme (Y grows southward).
pub struct MercatorProjection;

impl MercatorProjection {
    /// Longitude of the left edge of tile column `tile_x`.
    pub fn tile_x_to_longitude(tile_x: i64, zoom_level: u8) -> f64 {
        let n = (1i64 << zoom_level) as f64;
        tile_x as f64 * 360.0 / n - 180.0
    }

    /// Latitude of the top edge of tile row `tile_y`.
    pub fn tile_y_to_latitude(tile_y: i64, zoom_level: u8) -> f64 {
        let n = (1i64 << zoom_level) as f64;
        let y = PI * (1.0 - 2.0 * tile_y as f64 / n);
        y.sinh().atan().to_degrees()
    }

    /// Tile column containing `longitude`.
    pub fn longitude_to_tile_x(longitude: f64, zoom_level: u8) -> i64 {
        let n = 1i64 << zoom_level;
        let tile_x = ((longitude + 180.0) / 360.0 * n as f64).floor() as i64;
        tile_x.clamp(0, n - 1)
    }

    /// Tile row containing `latitude`, clamped to the projection's range.
    pub fn latitude_to_tile_y(latitude: f64, zoom_level: u8) -> i64 {
        let latitude = latitude.clamp(LATITUDE_MIN, LATITUDE_MAX);
        let n = 1i64 << zoom_level;
        let y = 0.5 - latitude.to_radians().sin().atanh() / (2.0 * PI);
        let tile_y = (y * n as f64).floor() as i64;
        tile_y.clamp(0, n - 1)
    }
}
