//! Reader and tile query engine for Mapsforge binary map files.
//!
//! A [`MapFile`] wraps one `.map` file on disk, parses its header eagerly and
//! answers "what map features intersect this tile?" queries without loading
//! the file into memory. Decoded features come back as [`PointOfInterest`]
//! and [`Way`] records bundled into a [`MapQueryResult`].

mod buffer;
mod consts;
mod error;
mod header;
mod index_cache;
mod map_data;
mod map_file;
mod optional_fields;
mod projection;
mod query_calculations;
mod query_parameters;
mod required_fields;
mod tile;
mod types;

pub use buffer::ReadBuffer;
pub use error::MapFileError;
pub use header::{MapFileHeader, MapFileInfo, SubFileParameter};
pub use index_cache::IndexEntry;
pub use map_data::{MapQueryResult, PointOfInterest, TileDataBundle, Way};
pub use map_file::{MapFile, Selector};
pub use projection::MercatorProjection;
pub use query_calculations::QueryCalculations;
pub use query_parameters::QueryParameters;
pub use tile::Tile;
pub use types::{BoundingBox, LatLong, Tag};
