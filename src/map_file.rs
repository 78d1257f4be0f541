use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::UNIX_EPOCH;

use tracing::{debug, info, warn};

use crate::buffer::ReadBuffer;
use crate::consts::{
    DEFAULT_START_ZOOM_LEVEL, INDEX_CACHE_SIZE, POI_FEATURE_ELEVATION, POI_FEATURE_HOUSE_NUMBER,
    POI_FEATURE_NAME, POI_LAYER_BITMASK, POI_LAYER_SHIFT, POI_NUMBER_OF_TAGS_BITMASK,
    SIGNATURE_LENGTH_BLOCK, SIGNATURE_LENGTH_POI, SIGNATURE_LENGTH_WAY, TAG_KEY_ELEVATION,
    TAG_KEY_HOUSE_NUMBER, TAG_KEY_NAME, TAG_KEY_REF, WAY_FEATURE_DATA_BLOCKS_BYTE,
    WAY_FEATURE_DOUBLE_DELTA_ENCODING, WAY_FEATURE_HOUSE_NUMBER, WAY_FEATURE_LABEL_POSITION,
    WAY_FEATURE_NAME, WAY_FEATURE_REF, WAY_FILTER_DISTANCE, WAY_LAYER_BITMASK, WAY_LAYER_SHIFT,
    WAY_NUMBER_OF_TAGS_BITMASK,
};
use crate::error::MapFileError;
use crate::header::{MapFileHeader, MapFileInfo, SubFileParameter};
use crate::index_cache::IndexCache;
use crate::map_data::{MapQueryResult, PointOfInterest, TileDataBundle, Way};
use crate::projection::MercatorProjection;
use crate::query_parameters::QueryParameters;
use crate::tile::Tile;
use crate::types::{
    microdegrees_to_degrees, BoundingBox, LatLong, Tag, LONGITUDE_MAX, LONGITUDE_MIN,
};

/// Which feature kinds a tile query should decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// POIs and ways.
    All,
    /// POIs only; way records are not parsed at all.
    Pois,
    /// POIs, plus only ways that carry a name, house number or ref.
    Named,
}

/// File handle and index cache, guarded together by one mutex so that every
/// seek-then-read sequence is serialized per map file.
struct FileState {
    file: File,
    index_cache: IndexCache,
}

/// A handle to one Mapsforge binary map file.
///
/// The header is parsed eagerly by [`MapFile::open`]; a handle therefore
/// always carries a valid [`MapFileInfo`]. Query methods take `&self` and may
/// be called from several threads; disk access is serialized internally while
/// decoding of already-read bytes runs without the lock.
pub struct MapFile {
    state: Mutex<FileState>,
    header: MapFileHeader,
    timestamp: i64,
    zoom_level_min: u8,
    zoom_level_max: u8,
    tag_filter: Option<Vec<Tag>>,
}

impl MapFile {
    /// Opens a map file and parses its header. Any header violation fails the
    /// open; no partially initialized handle is produced.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MapFileError> {
        Self::open_impl(path.as_ref(), None)
    }

    /// Like [`MapFile::open`], with a tag allowlist: a decoded way is kept
    /// only if at least one of its tags equals an allowlist entry exactly.
    pub fn open_filtered<P: AsRef<Path>>(
        path: P,
        tag_filter: Vec<Tag>,
    ) -> Result<Self, MapFileError> {
        Self::open_impl(path.as_ref(), Some(tag_filter))
    }

    fn open_impl(path: &Path, tag_filter: Option<Vec<Tag>>) -> Result<Self, MapFileError> {
        let mut file = File::open(path)?;
        let metadata = file.metadata()?;
        let timestamp = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();

        let header = MapFileHeader::read_from(&mut file, metadata.len())?;
        let map_file_info = header.map_file_info();
        info!(
            file_version = map_file_info.file_version,
            sub_files = map_file_info.number_of_sub_files,
            "opened map file"
        );

        Ok(Self {
            state: Mutex::new(FileState {
                file,
                index_cache: IndexCache::new(INDEX_CACHE_SIZE),
            }),
            header,
            timestamp,
            zoom_level_min: 0,
            zoom_level_max: u8::MAX,
            tag_filter,
        })
    }

    pub fn map_file_info(&self) -> &MapFileInfo {
        self.header.map_file_info()
    }

    /// The geographic extent covered by this map file.
    pub fn bounds(&self) -> &BoundingBox {
        &self.map_file_info().bounding_box
    }

    /// Modification time of the underlying file, seconds since the epoch.
    pub fn data_timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Language codes from the header's preference string, if present.
    pub fn map_languages(&self) -> Option<Vec<String>> {
        self.map_file_info()
            .languages_preference
            .as_ref()
            .map(|languages| languages.split(',').map(str::to_string).collect())
    }

    /// The header's start position, falling back to the bbox center.
    pub fn start_position(&self) -> LatLong {
        let info = self.map_file_info();
        info.start_position
            .unwrap_or_else(|| info.bounding_box.center())
    }

    pub fn start_zoom_level(&self) -> u8 {
        self.map_file_info()
            .start_zoom_level
            .unwrap_or(DEFAULT_START_ZOOM_LEVEL)
    }

    /// Narrows the zoom range this handle answers queries for. Tiles outside
    /// the range yield empty results.
    pub fn restrict_to_zoom_range(&mut self, zoom_level_min: u8, zoom_level_max: u8) {
        self.zoom_level_min = zoom_level_min;
        self.zoom_level_max = zoom_level_max;
    }

    /// Whether the tile lies inside the file's bounding box and both the
    /// file's and the handle's zoom ranges.
    pub fn contains_tile(&self, tile: &Tile) -> bool {
        let info = self.map_file_info();
        tile.zoom_level >= info.zoom_level_min
            && tile.zoom_level <= info.zoom_level_max
            && tile.zoom_level >= self.zoom_level_min
            && tile.zoom_level <= self.zoom_level_max
            && info.bounding_box.intersects(&tile.bounding_box())
    }

    /// Reads all POIs and ways intersecting the tile.
    pub fn read_map_data(&self, tile: &Tile) -> Result<MapQueryResult, MapFileError> {
        self.read_map_data_impl(tile, Selector::All)
    }

    /// Reads only POIs; way records are skipped without parsing.
    pub fn read_poi_data(&self, tile: &Tile) -> Result<MapQueryResult, MapFileError> {
        self.read_map_data_impl(tile, Selector::Pois)
    }

    /// Reads POIs and only those ways that carry label-worthy features.
    pub fn read_named_items(&self, tile: &Tile) -> Result<MapQueryResult, MapFileError> {
        self.read_map_data_impl(tile, Selector::Named)
    }

    fn read_map_data_impl(
        &self,
        tile: &Tile,
        selector: Selector,
    ) -> Result<MapQueryResult, MapFileError> {
        if !self.contains_tile(tile) {
            debug!(
                tile_x = tile.tile_x,
                tile_y = tile.tile_y,
                zoom_level = tile.zoom_level,
                "tile outside map file coverage"
            );
            return Ok(MapQueryResult::new());
        }

        let query_zoom_level = self.header.query_zoom_level(tile.zoom_level);
        let sub_file = self
            .header
            .sub_file_parameter(query_zoom_level)
            .ok_or_else(|| {
                MapFileError::Format(format!("no sub-file for zoom level: {query_zoom_level}"))
            })?;

        let mut query_parameters = QueryParameters::new(query_zoom_level);
        query_parameters.calculate_base_tiles(tile, sub_file);
        query_parameters.calculate_blocks(sub_file);

        let bounding_box = tile.bounding_box();
        self.process_blocks(&query_parameters, sub_file, &bounding_box, selector)
    }

    /// Walks the block rectangle of one query. A failure in any block aborts
    /// the whole query; the handle itself stays usable.
    fn process_blocks(
        &self,
        query_parameters: &QueryParameters,
        sub_file: &SubFileParameter,
        bounding_box: &BoundingBox,
        selector: Selector,
    ) -> Result<MapQueryResult, MapFileError> {
        let mut result = MapQueryResult::new();
        let mut query_is_water = true;
        let mut query_read_water_info = false;

        debug!(
            from_block_x = query_parameters.from_block_x,
            to_block_x = query_parameters.to_block_x,
            from_block_y = query_parameters.from_block_y,
            to_block_y = query_parameters.to_block_y,
            "processing block range"
        );

        for row in query_parameters.from_block_y..=query_parameters.to_block_y {
            for column in query_parameters.from_block_x..=query_parameters.to_block_x {
                let block_number = (row * sub_file.blocks_width + column) as u64;

                // Index lookups and the block read are one seek-then-read
                // sequence; decoding happens after the lock is released.
                let mut buffer = {
                    let mut guard = self
                        .state
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    let FileState { file, index_cache } = &mut *guard;

                    let index_entry =
                        index_cache.get_index_entry(sub_file, block_number, file)?;
                    query_read_water_info = true;
                    query_is_water &= index_entry.is_water;

                    let block_pointer = index_entry.offset;
                    if block_pointer < 1 || block_pointer > sub_file.sub_file_size {
                        return Err(MapFileError::Format(format!(
                            "invalid block pointer: {block_pointer}"
                        )));
                    }

                    let next_block_pointer = if block_number + 1 == sub_file.number_of_blocks {
                        sub_file.sub_file_size
                    } else {
                        let next_entry =
                            index_cache.get_index_entry(sub_file, block_number + 1, file)?;
                        if next_entry.offset > sub_file.sub_file_size {
                            return Err(MapFileError::Format(format!(
                                "invalid next block pointer: {}",
                                next_entry.offset
                            )));
                        }
                        next_entry.offset
                    };

                    if next_block_pointer < block_pointer {
                        return Err(MapFileError::Format(format!(
                            "invalid block size: block {block_number} ends before it starts"
                        )));
                    }
                    let block_size = (next_block_pointer - block_pointer) as usize;
                    if block_size == 0 {
                        debug!(block_number, "skipping empty block");
                        continue;
                    }

                    ReadBuffer::read_from_file_at(
                        file,
                        sub_file.start_address + block_pointer,
                        block_size,
                    )?
                };

                // Origin of the block's base tile; all coordinates in the
                // block are offsets from it.
                let tile_latitude = MercatorProjection::tile_y_to_latitude(
                    sub_file.boundary_tile_top + row,
                    sub_file.base_zoom_level,
                );
                let tile_longitude = MercatorProjection::tile_x_to_longitude(
                    sub_file.boundary_tile_left + column,
                    sub_file.base_zoom_level,
                );

                if let Some(bundle) = self.process_block(
                    query_parameters,
                    sub_file,
                    bounding_box,
                    tile_latitude,
                    tile_longitude,
                    selector,
                    &mut buffer,
                )? {
                    result.add(bundle);
                }
            }
        }

        if query_is_water && query_read_water_info {
            result.is_water = true;
        }
        Ok(result)
    }

    /// Decodes one block. Returns `Ok(None)` only for a failed debug
    /// signature check, which skips the block; every other problem is an
    /// error that cancels the query.
    #[allow(clippy::too_many_arguments)]
    fn process_block(
        &self,
        query_parameters: &QueryParameters,
        sub_file: &SubFileParameter,
        bounding_box: &BoundingBox,
        tile_latitude: f64,
        tile_longitude: f64,
        selector: Selector,
        buffer: &mut ReadBuffer,
    ) -> Result<Option<TileDataBundle>, MapFileError> {
        if !self.process_block_signature(buffer)? {
            return Ok(None);
        }

        let zoom_table = Self::read_zoom_table(sub_file, buffer)?;
        let zoom_table_row = (query_parameters.query_zoom_level - sub_file.zoom_level_min) as usize;
        let (pois_on_zoom_level, ways_on_zoom_level) =
            zoom_table.get(zoom_table_row).copied().ok_or_else(|| {
                MapFileError::Format(format!(
                    "zoom table has no row for zoom level {}",
                    query_parameters.query_zoom_level
                ))
            })?;

        // The way records start at a known offset so POI parsing can be
        // skipped over in case of drift; validate it against the window.
        let first_way_offset = buffer.read_var_uint()? as usize + buffer.position();
        if first_way_offset > buffer.len() {
            return Err(MapFileError::Format(format!(
                "invalid first way offset: {first_way_offset}"
            )));
        }

        let filter_required =
            query_parameters.query_zoom_level > sub_file.base_zoom_level;

        let pois = self.process_pois(
            tile_latitude,
            tile_longitude,
            pois_on_zoom_level,
            bounding_box,
            filter_required,
            buffer,
        )?;

        let ways = if selector == Selector::Pois {
            Vec::new()
        } else {
            if buffer.position() > first_way_offset {
                return Err(MapFileError::Format(format!(
                    "POI data overran the first way offset: {} > {first_way_offset}",
                    buffer.position()
                )));
            }
            buffer.set_position(first_way_offset)?;

            self.process_ways(
                query_parameters,
                ways_on_zoom_level,
                bounding_box,
                filter_required,
                tile_latitude,
                tile_longitude,
                selector,
                buffer,
            )?
        };

        Ok(Some(TileDataBundle::new(pois, ways)))
    }

    /// Debug-build files prefix each block with a signature. A mismatch is
    /// logged and skips the block rather than cancelling the query.
    fn process_block_signature(&self, buffer: &mut ReadBuffer) -> Result<bool, MapFileError> {
        if !self.map_file_info().debug_file {
            return Ok(true);
        }
        let signature = buffer.read_utf8_fixed(SIGNATURE_LENGTH_BLOCK)?;
        if !signature.starts_with("###TileStart") {
            warn!(%signature, "invalid block signature, skipping block");
            return Ok(false);
        }
        Ok(true)
    }

    /// Reads the cumulative (POI count, way count) row per zoom level of the
    /// sub-file's range.
    fn read_zoom_table(
        sub_file: &SubFileParameter,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<(usize, usize)>, MapFileError> {
        let rows = (sub_file.zoom_level_max - sub_file.zoom_level_min + 1) as usize;
        let mut zoom_table = Vec::with_capacity(rows);

        let mut cumulated_pois = 0usize;
        let mut cumulated_ways = 0usize;
        for _ in 0..rows {
            cumulated_pois += buffer.read_var_uint()? as usize;
            cumulated_ways += buffer.read_var_uint()? as usize;
            zoom_table.push((cumulated_pois, cumulated_ways));
        }
        Ok(zoom_table)
    }

    fn process_pois(
        &self,
        tile_latitude: f64,
        tile_longitude: f64,
        number_of_pois: usize,
        bounding_box: &BoundingBox,
        filter_required: bool,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<PointOfInterest>, MapFileError> {
        let map_file_info = self.map_file_info();
        let poi_tags = &map_file_info.poi_tags;
        let mut pois = Vec::new();

        for _ in 0..number_of_pois {
            if map_file_info.debug_file {
                let signature = buffer.read_utf8_fixed(SIGNATURE_LENGTH_POI)?;
                if !signature.starts_with("***POIStart") {
                    return Err(MapFileError::Format(format!(
                        "invalid POI signature: {signature}"
                    )));
                }
            }

            // Position offsets from the tile origin, latitude first.
            let latitude =
                tile_latitude + microdegrees_to_degrees(buffer.read_var_int()?);
            let longitude =
                tile_longitude + microdegrees_to_degrees(buffer.read_var_int()?);

            let special_byte = buffer.read_byte()?;
            let layer = ((special_byte & POI_LAYER_BITMASK) >> POI_LAYER_SHIFT) as i8;
            let number_of_tags = special_byte & POI_NUMBER_OF_TAGS_BITMASK;

            let mut tags = buffer.read_tags(poi_tags, number_of_tags)?;

            let feature_byte = buffer.read_byte()?;
            if feature_byte & POI_FEATURE_NAME != 0 {
                tags.push(Tag::new(TAG_KEY_NAME, buffer.read_utf8()?));
            }
            if feature_byte & POI_FEATURE_HOUSE_NUMBER != 0 {
                tags.push(Tag::new(TAG_KEY_HOUSE_NUMBER, buffer.read_utf8()?));
            }
            if feature_byte & POI_FEATURE_ELEVATION != 0 {
                tags.push(Tag::new(
                    TAG_KEY_ELEVATION,
                    buffer.read_var_int()?.to_string(),
                ));
            }

            if !filter_required || bounding_box.contains(latitude, longitude) {
                pois.push(PointOfInterest::new(
                    layer,
                    tags,
                    LatLong::new(latitude, longitude),
                ));
            }
        }

        Ok(pois)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_ways(
        &self,
        query_parameters: &QueryParameters,
        number_of_ways: usize,
        bounding_box: &BoundingBox,
        filter_required: bool,
        tile_latitude: f64,
        tile_longitude: f64,
        selector: Selector,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<Way>, MapFileError> {
        let map_file_info = self.map_file_info();
        let way_tags = &map_file_info.way_tags;
        let mut ways = Vec::new();

        // Above the base zoom the query tile covers only part of the block's
        // tile, so ways are filtered against a slightly enlarged query box.
        let way_filter_bbox = if filter_required {
            bounding_box.extend_meters(WAY_FILTER_DISTANCE)
        } else {
            bounding_box.clone()
        };

        for _ in 0..number_of_ways {
            if map_file_info.debug_file {
                let signature = buffer.read_utf8_fixed(SIGNATURE_LENGTH_WAY)?;
                if !signature.starts_with("---WayStart") {
                    return Err(MapFileError::Format(format!(
                        "invalid way signature: {signature}"
                    )));
                }
            }

            // Size of the record from the tile bitmask onwards; lets a
            // filtered-out way be skipped without parsing it.
            let way_data_size = buffer.read_var_uint()? as usize;

            if query_parameters.use_tile_bitmask {
                let way_tile_bitmask = buffer.read_short()? as u16;
                if query_parameters.query_tile_bitmask & way_tile_bitmask == 0 {
                    let remaining = way_data_size.checked_sub(2).ok_or_else(|| {
                        MapFileError::Format(format!(
                            "invalid way data size: {way_data_size}"
                        ))
                    })?;
                    buffer.skip(remaining)?;
                    continue;
                }
            } else {
                buffer.skip(2)?;
            }

            let special_byte = buffer.read_byte()?;
            let layer = ((special_byte & WAY_LAYER_BITMASK) >> WAY_LAYER_SHIFT) as i8;
            let number_of_tags = special_byte & WAY_NUMBER_OF_TAGS_BITMASK;

            let mut tags = buffer.read_tags(way_tags, number_of_tags)?;

            let feature_byte = buffer.read_byte()?;
            let feature_name = feature_byte & WAY_FEATURE_NAME != 0;
            let feature_house_number = feature_byte & WAY_FEATURE_HOUSE_NUMBER != 0;
            let feature_ref = feature_byte & WAY_FEATURE_REF != 0;
            let feature_label_position = feature_byte & WAY_FEATURE_LABEL_POSITION != 0;
            let feature_data_blocks_byte = feature_byte & WAY_FEATURE_DATA_BLOCKS_BYTE != 0;
            let feature_double_delta = feature_byte & WAY_FEATURE_DOUBLE_DELTA_ENCODING != 0;

            if feature_name {
                tags.push(Tag::new(TAG_KEY_NAME, buffer.read_utf8()?));
            }
            if feature_house_number {
                tags.push(Tag::new(TAG_KEY_HOUSE_NUMBER, buffer.read_utf8()?));
            }
            if feature_ref {
                tags.push(Tag::new(TAG_KEY_REF, buffer.read_utf8()?));
            }

            let label_offsets = if feature_label_position {
                Some(Self::read_optional_label_position(buffer)?)
            } else {
                None
            };

            let way_data_blocks =
                Self::read_optional_way_data_blocks_count(feature_data_blocks_byte, buffer)?;

            for _ in 0..way_data_blocks {
                let coordinate_blocks = Self::process_way_data_block(
                    tile_latitude,
                    tile_longitude,
                    feature_double_delta,
                    buffer,
                )?;

                if filter_required
                    && !Self::way_intersects_bounding_box(&coordinate_blocks, &way_filter_bbox)
                {
                    continue;
                }

                if let Some(tag_filter) = &self.tag_filter {
                    if !tags.iter().any(|tag| tag_filter.contains(tag)) {
                        continue;
                    }
                }

                if selector == Selector::Named
                    && !(feature_name
                        || feature_house_number
                        || feature_ref
                        || Self::has_label_tag(&tags))
                {
                    continue;
                }

                // The label position is an offset from the first way node.
                let label_position = label_offsets.and_then(|(lat_offset, lon_offset)| {
                    coordinate_blocks
                        .first()
                        .and_then(|block| block.first())
                        .map(|first| {
                            LatLong::new(
                                first.latitude + microdegrees_to_degrees(lat_offset),
                                first.longitude + microdegrees_to_degrees(lon_offset),
                            )
                        })
                });

                ways.push(Way::new(
                    layer,
                    tags.clone(),
                    coordinate_blocks,
                    label_position,
                ));
            }
        }

        Ok(ways)
    }

    /// Label offsets on the wire are latitude first, like positions.
    fn read_optional_label_position(
        buffer: &mut ReadBuffer,
    ) -> Result<(i64, i64), MapFileError> {
        let latitude_offset = buffer.read_var_int()?;
        let longitude_offset = buffer.read_var_int()?;
        Ok((latitude_offset, longitude_offset))
    }

    fn read_optional_way_data_blocks_count(
        feature_data_blocks_byte: bool,
        buffer: &mut ReadBuffer,
    ) -> Result<u64, MapFileError> {
        if !feature_data_blocks_byte {
            // Exactly one data block exists when the count field is absent.
            return Ok(1);
        }
        let count = buffer.read_var_uint()?;
        if count < 1 {
            return Err(MapFileError::Format(format!(
                "invalid number of way data blocks: {count}"
            )));
        }
        Ok(count)
    }

    fn process_way_data_block(
        tile_latitude: f64,
        tile_longitude: f64,
        double_delta: bool,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<Vec<LatLong>>, MapFileError> {
        let number_of_coordinate_blocks = buffer.read_var_uint()? as usize;
        if number_of_coordinate_blocks < 1 || number_of_coordinate_blocks > i16::MAX as usize {
            return Err(MapFileError::Format(format!(
                "invalid number of way coordinate blocks: {number_of_coordinate_blocks}"
            )));
        }

        let mut coordinate_blocks = Vec::with_capacity(number_of_coordinate_blocks);
        for _ in 0..number_of_coordinate_blocks {
            let number_of_way_nodes = buffer.read_var_uint()? as usize;
            if number_of_way_nodes < 2 || number_of_way_nodes > i16::MAX as usize {
                return Err(MapFileError::Format(format!(
                    "invalid number of way nodes: {number_of_way_nodes}"
                )));
            }

            let way_segment = if double_delta {
                Self::decode_way_nodes_double_delta(
                    number_of_way_nodes,
                    tile_latitude,
                    tile_longitude,
                    buffer,
                )?
            } else {
                Self::decode_way_nodes_single_delta(
                    number_of_way_nodes,
                    tile_latitude,
                    tile_longitude,
                    buffer,
                )?
            };
            coordinate_blocks.push(way_segment);
        }

        Ok(coordinate_blocks)
    }

    /// Single delta: the first node is an offset from the tile origin, every
    /// further node an offset from its predecessor.
    fn decode_way_nodes_single_delta(
        number_of_way_nodes: usize,
        tile_latitude: f64,
        tile_longitude: f64,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<LatLong>, MapFileError> {
        let mut way_segment = Vec::with_capacity(number_of_way_nodes);

        let mut latitude = tile_latitude + microdegrees_to_degrees(buffer.read_var_int()?);
        let mut longitude = tile_longitude + microdegrees_to_degrees(buffer.read_var_int()?);
        way_segment.push(LatLong::new(latitude, longitude));

        for _ in 1..number_of_way_nodes {
            latitude += microdegrees_to_degrees(buffer.read_var_int()?);
            longitude += microdegrees_to_degrees(buffer.read_var_int()?);
            longitude = Self::clamp_longitude(longitude);
            way_segment.push(LatLong::new(latitude, longitude));
        }

        Ok(way_segment)
    }

    /// Double delta: second-order differencing. Each stored value is the
    /// change of the single delta, which in turn accumulates into the
    /// position.
    fn decode_way_nodes_double_delta(
        number_of_way_nodes: usize,
        tile_latitude: f64,
        tile_longitude: f64,
        buffer: &mut ReadBuffer,
    ) -> Result<Vec<LatLong>, MapFileError> {
        let mut way_segment = Vec::with_capacity(number_of_way_nodes);

        let mut latitude = tile_latitude + microdegrees_to_degrees(buffer.read_var_int()?);
        let mut longitude = tile_longitude + microdegrees_to_degrees(buffer.read_var_int()?);
        way_segment.push(LatLong::new(latitude, longitude));

        let mut previous_single_delta_latitude = 0.0;
        let mut previous_single_delta_longitude = 0.0;

        for _ in 1..number_of_way_nodes {
            let double_delta_latitude = microdegrees_to_degrees(buffer.read_var_int()?);
            let double_delta_longitude = microdegrees_to_degrees(buffer.read_var_int()?);

            let single_delta_latitude = double_delta_latitude + previous_single_delta_latitude;
            let single_delta_longitude = double_delta_longitude + previous_single_delta_longitude;

            latitude += single_delta_latitude;
            longitude += single_delta_longitude;
            longitude = Self::clamp_longitude(longitude);
            way_segment.push(LatLong::new(latitude, longitude));

            previous_single_delta_latitude = single_delta_latitude;
            previous_single_delta_longitude = single_delta_longitude;
        }

        Ok(way_segment)
    }

    /// Floating point drift near the antimeridian may push a longitude
    /// marginally out of range; snap it back within a small tolerance.
    fn clamp_longitude(longitude: f64) -> f64 {
        if longitude < LONGITUDE_MIN && LONGITUDE_MIN - longitude < 0.001 {
            LONGITUDE_MIN
        } else if longitude > LONGITUDE_MAX && longitude - LONGITUDE_MAX < 0.001 {
            LONGITUDE_MAX
        } else {
            longitude
        }
    }

    fn has_label_tag(tags: &[Tag]) -> bool {
        tags.iter()
            .any(|tag| tag.key == TAG_KEY_NAME || tag.key == TAG_KEY_REF)
    }

    fn way_intersects_bounding_box(
        coordinate_blocks: &[Vec<LatLong>],
        bounding_box: &BoundingBox,
    ) -> bool {
        coordinate_blocks.iter().any(|block| {
            block
                .iter()
                .any(|node| bounding_box.contains(node.latitude, node.longitude))
        })
    }
}
