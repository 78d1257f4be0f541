use std::io::Read;

use tracing::debug;

use crate::buffer::ReadBuffer;
use crate::consts::{
    BASE_ZOOM_LEVEL_MAX, BYTES_PER_INDEX_ENTRY, HEADER_SIZE_MIN, MAGIC_BYTES,
    SIGNATURE_LENGTH_INDEX, ZOOM_LEVEL_MAX,
};
use crate::error::MapFileError;
use crate::optional_fields::OptionalFields;
use crate::projection::MercatorProjection;
use crate::required_fields::RequiredFields;
use crate::types::{BoundingBox, LatLong, Tag};

/// One zoom interval of the map file: grid geometry and file addresses of a
/// sub-file.
///
/// Blocks are numbered row-major from the sub-file's top-left boundary tile.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFileParameter {
    pub base_zoom_level: u8,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub start_address: u64,
    pub sub_file_size: u64,
    pub index_start_address: u64,
    pub index_end_address: u64,
    pub boundary_tile_left: i64,
    pub boundary_tile_top: i64,
    pub boundary_tile_right: i64,
    pub boundary_tile_bottom: i64,
    pub blocks_width: i64,
    pub blocks_height: i64,
    pub number_of_blocks: u64,
}

/// Mutable staging struct filled during header parsing, then frozen into a
/// [`SubFileParameter`].
#[derive(Debug, Default)]
pub(crate) struct SubFileParameterBuilder {
    pub base_zoom_level: u8,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub start_address: u64,
    pub index_start_address: u64,
    pub sub_file_size: u64,
    pub bounding_box: Option<BoundingBox>,
}

impl SubFileParameterBuilder {
    pub(crate) fn build(self) -> Result<SubFileParameter, MapFileError> {
        let bounding_box = self
            .bounding_box
            .ok_or_else(|| MapFileError::Format("missing bounding box".to_string()))?;

        // Boundary tiles of the bbox at base zoom. Tile rows grow southward,
        // so the top row comes from the maximum latitude.
        let boundary_tile_left =
            MercatorProjection::longitude_to_tile_x(bounding_box.min_longitude, self.base_zoom_level);
        let boundary_tile_top =
            MercatorProjection::latitude_to_tile_y(bounding_box.max_latitude, self.base_zoom_level);
        let boundary_tile_right =
            MercatorProjection::longitude_to_tile_x(bounding_box.max_longitude, self.base_zoom_level);
        let boundary_tile_bottom =
            MercatorProjection::latitude_to_tile_y(bounding_box.min_latitude, self.base_zoom_level);

        let blocks_width = boundary_tile_right - boundary_tile_left + 1;
        let blocks_height = boundary_tile_bottom - boundary_tile_top + 1;
        let number_of_blocks = (blocks_width * blocks_height) as u64;

        let index_end_address =
            self.index_start_address + number_of_blocks * BYTES_PER_INDEX_ENTRY as u64;

        Ok(SubFileParameter {
            base_zoom_level: self.base_zoom_level,
            zoom_level_min: self.zoom_level_min,
            zoom_level_max: self.zoom_level_max,
            start_address: self.start_address,
            sub_file_size: self.sub_file_size,
            index_start_address: self.index_start_address,
            index_end_address,
            boundary_tile_left,
            boundary_tile_top,
            boundary_tile_right,
            boundary_tile_bottom,
            blocks_width,
            blocks_height,
            number_of_blocks,
        })
    }
}

/// The fully parsed, immutable map file header.
///
/// The tag vectors are the wire-format dictionaries: index *i* is tag ID *i*.
#[derive(Debug, Clone)]
pub struct MapFileInfo {
    pub bounding_box: BoundingBox,
    pub file_size: u64,
    pub file_version: u32,
    pub map_date: i64,
    pub number_of_sub_files: u8,
    pub poi_tags: Vec<Tag>,
    pub way_tags: Vec<Tag>,
    pub projection_name: String,
    pub tile_pixel_size: u16,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub debug_file: bool,
    pub start_position: Option<LatLong>,
    pub start_zoom_level: Option<u8>,
    pub languages_preference: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
}

/// Mutable staging struct for [`MapFileInfo`], written field by field by the
/// header parsing steps.
#[derive(Debug, Default)]
pub(crate) struct MapFileInfoBuilder {
    pub bounding_box: Option<BoundingBox>,
    pub file_size: u64,
    pub file_version: u32,
    pub map_date: i64,
    pub number_of_sub_files: u8,
    pub poi_tags: Vec<Tag>,
    pub way_tags: Vec<Tag>,
    pub projection_name: String,
    pub tile_pixel_size: u16,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub optional_fields: OptionalFields,
}

impl MapFileInfoBuilder {
    pub(crate) fn build(self) -> Result<MapFileInfo, MapFileError> {
        let bounding_box = self
            .bounding_box
            .ok_or_else(|| MapFileError::Format("missing bounding box".to_string()))?;

        Ok(MapFileInfo {
            bounding_box,
            file_size: self.file_size,
            file_version: self.file_version,
            map_date: self.map_date,
            number_of_sub_files: self.number_of_sub_files,
            poi_tags: self.poi_tags,
            way_tags: self.way_tags,
            projection_name: self.projection_name,
            tile_pixel_size: self.tile_pixel_size,
            zoom_level_min: self.zoom_level_min,
            zoom_level_max: self.zoom_level_max,
            debug_file: self.optional_fields.is_debug_file,
            start_position: self.optional_fields.start_position,
            start_zoom_level: self.optional_fields.start_zoom_level,
            languages_preference: self.optional_fields.languages_preference,
            comment: self.optional_fields.comment,
            created_by: self.optional_fields.created_by,
        })
    }
}

/// Parsed header plus the zoom-level-to-sub-file lookup table.
#[derive(Debug)]
pub struct MapFileHeader {
    map_file_info: MapFileInfo,
    /// Index = zoom level. When zoom intervals overlap, the sub-file listed
    /// last in the header wins; this matches the reference reader and is kept
    /// as a compatibility constraint.
    sub_file_parameters: Vec<Option<SubFileParameter>>,
    zoom_level_minimum: u8,
    zoom_level_maximum: u8,
}

impl MapFileHeader {
    /// Parses the complete header from the start of the file. Any malformed
    /// field is fatal; no partial header is produced.
    pub fn read_from<R: Read>(reader: &mut R, file_size: u64) -> Result<Self, MapFileError> {
        // The magic string and the header size field are loaded first; the
        // size field then tells how many bytes the rest of the header needs.
        let mut buffer = ReadBuffer::read_from_file(reader, MAGIC_BYTES.len() + 4)?;
        RequiredFields::check_magic_bytes(&mut buffer)?;
        let remaining_size = RequiredFields::read_remaining_header_size(&mut buffer)?;
        let mut buffer = ReadBuffer::read_from_file(reader, remaining_size as usize)?;

        let mut info_builder = MapFileInfoBuilder::default();
        RequiredFields::read_file_version(&mut buffer, &mut info_builder)?;
        RequiredFields::read_file_size(&mut buffer, file_size, &mut info_builder)?;
        RequiredFields::read_map_date(&mut buffer, &mut info_builder)?;
        RequiredFields::read_bounding_box(&mut buffer, &mut info_builder)?;
        RequiredFields::read_tile_pixel_size(&mut buffer, &mut info_builder)?;
        RequiredFields::read_projection_name(&mut buffer, &mut info_builder)?;

        let mut optional_fields = OptionalFields::from_flags(buffer.read_byte()?);
        optional_fields.read_optional_fields(&mut buffer)?;
        info_builder.optional_fields = optional_fields;

        RequiredFields::read_poi_tags(&mut buffer, &mut info_builder)?;
        RequiredFields::read_way_tags(&mut buffer, &mut info_builder)?;

        let (sub_file_parameters, zoom_minimum, zoom_maximum) =
            Self::read_sub_file_parameters(&mut buffer, file_size, &mut info_builder)?;

        Ok(Self {
            map_file_info: info_builder.build()?,
            sub_file_parameters,
            zoom_level_minimum: zoom_minimum,
            zoom_level_maximum: zoom_maximum,
        })
    }

    pub fn map_file_info(&self) -> &MapFileInfo {
        &self.map_file_info
    }

    /// Clamps a requested zoom level into the range the file serves.
    pub fn query_zoom_level(&self, zoom_level: u8) -> u8 {
        zoom_level.clamp(self.zoom_level_minimum, self.zoom_level_maximum)
    }

    /// The sub-file serving `query_zoom_level`, if any.
    pub fn sub_file_parameter(&self, query_zoom_level: u8) -> Option<&SubFileParameter> {
        self.sub_file_parameters
            .get(query_zoom_level as usize)
            .and_then(|entry| entry.as_ref())
    }

    fn read_sub_file_parameters(
        buffer: &mut ReadBuffer,
        file_size: u64,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(Vec<Option<SubFileParameter>>, u8, u8), MapFileError> {
        let number_of_sub_files = buffer.read_byte()?;
        if number_of_sub_files < 1 {
            return Err(MapFileError::Format(format!(
                "invalid number of sub-files: {number_of_sub_files}"
            )));
        }
        info_builder.number_of_sub_files = number_of_sub_files;

        let mut zoom_minimum = u8::MAX;
        let mut zoom_maximum = 0;
        let mut sub_files = Vec::with_capacity(number_of_sub_files as usize);

        for _ in 0..number_of_sub_files {
            let mut builder = SubFileParameterBuilder::default();

            let base_zoom_level = buffer.read_byte()?;
            if base_zoom_level > BASE_ZOOM_LEVEL_MAX {
                return Err(MapFileError::Format(format!(
                    "invalid base zoom level: {base_zoom_level}"
                )));
            }
            builder.base_zoom_level = base_zoom_level;

            let zoom_level_min = buffer.read_byte()?;
            if zoom_level_min > ZOOM_LEVEL_MAX {
                return Err(MapFileError::Format(format!(
                    "invalid minimum zoom level: {zoom_level_min}"
                )));
            }
            builder.zoom_level_min = zoom_level_min;

            let zoom_level_max = buffer.read_byte()?;
            if zoom_level_max > ZOOM_LEVEL_MAX {
                return Err(MapFileError::Format(format!(
                    "invalid maximum zoom level: {zoom_level_max}"
                )));
            }
            builder.zoom_level_max = zoom_level_max;

            if zoom_level_min > zoom_level_max {
                return Err(MapFileError::Format(format!(
                    "invalid zoom level range: {zoom_level_min} to {zoom_level_max}"
                )));
            }

            let start_address = buffer.read_long()?;
            if start_address < HEADER_SIZE_MIN as i64 || start_address as u64 >= file_size {
                return Err(MapFileError::Format(format!(
                    "invalid sub-file start address: {start_address}"
                )));
            }
            builder.start_address = start_address as u64;

            // Debug builds of the writer put a signature in front of the
            // index segment.
            builder.index_start_address = if info_builder.optional_fields.is_debug_file {
                start_address as u64 + SIGNATURE_LENGTH_INDEX
            } else {
                start_address as u64
            };

            let sub_file_size = buffer.read_long()?;
            if sub_file_size < 1 {
                return Err(MapFileError::Format(format!(
                    "invalid sub-file size: {sub_file_size}"
                )));
            }
            builder.sub_file_size = sub_file_size as u64;

            builder.bounding_box = info_builder.bounding_box.clone();
            let sub_file = builder.build()?;
            debug!(
                base_zoom = sub_file.base_zoom_level,
                blocks_width = sub_file.blocks_width,
                blocks_height = sub_file.blocks_height,
                "parsed sub-file"
            );

            zoom_minimum = zoom_minimum.min(zoom_level_min);
            zoom_maximum = zoom_maximum.max(zoom_level_max);
            sub_files.push(sub_file);
        }

        info_builder.zoom_level_min = zoom_minimum;
        info_builder.zoom_level_max = zoom_maximum;

        // Assign every zoom level to its sub-file, in header order. Overlaps
        // resolve to the last sub-file listed (last-write-wins).
        let mut lookup: Vec<Option<SubFileParameter>> =
            vec![None; zoom_maximum as usize + 1];
        for sub_file in &sub_files {
            for zoom_level in sub_file.zoom_level_min..=sub_file.zoom_level_max {
                lookup[zoom_level as usize] = Some(sub_file.clone());
            }
        }

        Ok((lookup, zoom_minimum, zoom_maximum))
    }
}
