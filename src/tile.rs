use crate::projection::MercatorProjection;
use crate::types::{BoundingBox, LatLong};

/// A tile address in the XYZ scheme: column, row and zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub tile_x: i64,
    pub tile_y: i64,
    pub zoom_level: u8,
}

impl Tile {
    pub fn new(tile_x: i64, tile_y: i64, zoom_level: u8) -> Self {
        Self {
            tile_x,
            tile_y,
            zoom_level,
        }
    }

    /// The tile containing `position` at `zoom_level`.
    pub fn containing(position: &LatLong, zoom_level: u8) -> Self {
        Self::new(
            MercatorProjection::longitude_to_tile_x(position.longitude, zoom_level),
            MercatorProjection::latitude_to_tile_y(position.latitude, zoom_level),
            zoom_level,
        )
    }

    /// Geographic extent of this tile. The top edge has the larger latitude.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_latitude: MercatorProjection::tile_y_to_latitude(self.tile_y + 1, self.zoom_level),
            min_longitude: MercatorProjection::tile_x_to_longitude(self.tile_x, self.zoom_level),
            max_latitude: MercatorProjection::tile_y_to_latitude(self.tile_y, self.zoom_level),
            max_longitude: MercatorProjection::tile_x_to_longitude(
                self.tile_x + 1,
                self.zoom_level,
            ),
        }
    }
}
