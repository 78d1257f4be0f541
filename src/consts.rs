//! Wire-format constants for the Mapsforge binary map format.
//!
//! These values are fixed by the format specification and must match the
//! writer bit for bit.

/// The first 20 bytes of every map file.
pub(crate) const MAGIC_BYTES: &str = "mapsforge binary OSM";

/// Projection literal required by the header.
pub(crate) const MERCATOR: &str = "Mercator";

pub(crate) const HEADER_SIZE_MIN: u32 = 70;
pub(crate) const HEADER_SIZE_MAX: u32 = 1_000_000;

pub(crate) const SUPPORTED_FILE_VERSION_MIN: u32 = 3;
pub(crate) const SUPPORTED_FILE_VERSION_MAX: u32 = 5;

/// Sanity floor for the map creation date: 2008-01-10 in milliseconds.
pub(crate) const MAP_DATE_MIN: i64 = 1_200_000_000_000;

pub(crate) const BASE_ZOOM_LEVEL_MAX: u8 = 20;
pub(crate) const ZOOM_LEVEL_MAX: u8 = 22;
pub(crate) const START_ZOOM_LEVEL_MAX: u8 = 22;

/// Largest block or header segment this reader is willing to load at once.
pub(crate) const MAXIMUM_BUFFER_SIZE: usize = 10 * 1024 * 1024;

// Header optional-field flags.
pub(crate) const HEADER_BITMASK_DEBUG: u8 = 0x80;
pub(crate) const HEADER_BITMASK_START_POSITION: u8 = 0x40;
pub(crate) const HEADER_BITMASK_START_ZOOM_LEVEL: u8 = 0x20;
pub(crate) const HEADER_BITMASK_LANGUAGES_PREFERENCE: u8 = 0x10;
pub(crate) const HEADER_BITMASK_COMMENT: u8 = 0x08;
pub(crate) const HEADER_BITMASK_CREATED_BY: u8 = 0x04;

// Sub-file index segment.
pub(crate) const BYTES_PER_INDEX_ENTRY: usize = 5;
pub(crate) const INDEX_ENTRIES_PER_BLOCK: u64 = 128;
pub(crate) const SIZE_OF_INDEX_BLOCK: u64 =
    INDEX_ENTRIES_PER_BLOCK * BYTES_PER_INDEX_ENTRY as u64;

/// Low 39 bits of an index entry: byte offset of the block in the sub-file.
pub(crate) const BITMASK_INDEX_OFFSET: u64 = 0x7F_FFFF_FFFF;
/// Bit 39 of an index entry: the block's tile is entirely covered by water.
pub(crate) const BITMASK_INDEX_WATER: u64 = 0x80_0000_0000;

// Debug signature lengths (debug builds of the writer only).
pub(crate) const SIGNATURE_LENGTH_INDEX: u64 = 16;
pub(crate) const SIGNATURE_LENGTH_BLOCK: usize = 32;
pub(crate) const SIGNATURE_LENGTH_POI: usize = 32;
pub(crate) const SIGNATURE_LENGTH_WAY: usize = 32;

// POI record layout.
pub(crate) const POI_FEATURE_NAME: u8 = 0x80;
pub(crate) const POI_FEATURE_HOUSE_NUMBER: u8 = 0x40;
pub(crate) const POI_FEATURE_ELEVATION: u8 = 0x20;
pub(crate) const POI_LAYER_BITMASK: u8 = 0xf0;
pub(crate) const POI_LAYER_SHIFT: u8 = 4;
pub(crate) const POI_NUMBER_OF_TAGS_BITMASK: u8 = 0x0f;

// Way record layout.
pub(crate) const WAY_FEATURE_NAME: u8 = 0x80;
pub(crate) const WAY_FEATURE_HOUSE_NUMBER: u8 = 0x40;
pub(crate) const WAY_FEATURE_REF: u8 = 0x20;
pub(crate) const WAY_FEATURE_LABEL_POSITION: u8 = 0x10;
pub(crate) const WAY_FEATURE_DATA_BLOCKS_BYTE: u8 = 0x08;
pub(crate) const WAY_FEATURE_DOUBLE_DELTA_ENCODING: u8 = 0x04;
pub(crate) const WAY_LAYER_BITMASK: u8 = 0xf0;
pub(crate) const WAY_LAYER_SHIFT: u8 = 4;
pub(crate) const WAY_NUMBER_OF_TAGS_BITMASK: u8 = 0x0f;

// Tag keys synthesized from feature fields.
pub(crate) const TAG_KEY_NAME: &str = "name";
pub(crate) const TAG_KEY_HOUSE_NUMBER: &str = "addr:housenumber";
pub(crate) const TAG_KEY_REF: &str = "ref";
pub(crate) const TAG_KEY_ELEVATION: &str = "ele";

pub(crate) const KEY_VALUE_SEPARATOR: char = '=';

/// Meters by which the query bounding box is enlarged before way filtering.
pub(crate) const WAY_FILTER_DISTANCE: i32 = 20;

pub(crate) const INDEX_CACHE_SIZE: usize = 64;
pub(crate) const DEFAULT_START_ZOOM_LEVEL: u8 = 12;
