use crate::buffer::ReadBuffer;
use crate::consts::{
    HEADER_SIZE_MAX, HEADER_SIZE_MIN, MAGIC_BYTES, MAP_DATE_MIN, MERCATOR,
    SUPPORTED_FILE_VERSION_MAX, SUPPORTED_FILE_VERSION_MIN,
};
use crate::error::MapFileError;
use crate::header::MapFileInfoBuilder;
use crate::types::{microdegrees_to_degrees, BoundingBox, Tag};

/// The required header fields, read in wire order. Each step validates its
/// field and writes it into the [`MapFileInfoBuilder`]; any violation is
/// fatal to the whole open.
pub(crate) struct RequiredFields;

impl RequiredFields {
    pub(crate) fn check_magic_bytes(buffer: &mut ReadBuffer) -> Result<(), MapFileError> {
        let magic = buffer.read_utf8_fixed(MAGIC_BYTES.len())?;
        if magic != MAGIC_BYTES {
            return Err(MapFileError::Format(format!(
                "invalid magic bytes: {magic:?}"
            )));
        }
        Ok(())
    }

    pub(crate) fn read_remaining_header_size(
        buffer: &mut ReadBuffer,
    ) -> Result<u32, MapFileError> {
        let remaining_size = buffer.read_int()?;
        if remaining_size < HEADER_SIZE_MIN as i32 || remaining_size > HEADER_SIZE_MAX as i32 {
            return Err(MapFileError::Format(format!(
                "invalid remaining header size: {remaining_size}"
            )));
        }
        Ok(remaining_size as u32)
    }

    pub(crate) fn read_file_version(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        let file_version = buffer.read_int()?;
        if file_version < SUPPORTED_FILE_VERSION_MIN as i32
            || file_version > SUPPORTED_FILE_VERSION_MAX as i32
        {
            return Err(MapFileError::Unsupported(format!(
                "file version: {file_version}"
            )));
        }
        info_builder.file_version = file_version as u32;
        Ok(())
    }

    pub(crate) fn read_file_size(
        buffer: &mut ReadBuffer,
        actual_file_size: u64,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        let header_file_size = buffer.read_long()?;
        if header_file_size != actual_file_size as i64 {
            return Err(MapFileError::Format(format!(
                "file size in header ({header_file_size}) does not match size on disk ({actual_file_size})"
            )));
        }
        info_builder.file_size = actual_file_size;
        Ok(())
    }

    pub(crate) fn read_map_date(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        let map_date = buffer.read_long()?;
        // Sanity floor, some time after the format's first release.
        if map_date < MAP_DATE_MIN {
            return Err(MapFileError::Format(format!("invalid map date: {map_date}")));
        }
        info_builder.map_date = map_date;
        Ok(())
    }

    pub(crate) fn read_bounding_box(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        let min_latitude = microdegrees_to_degrees(buffer.read_int()? as i64);
        let min_longitude = microdegrees_to_degrees(buffer.read_int()? as i64);
        let max_latitude = microdegrees_to_degrees(buffer.read_int()? as i64);
        let max_longitude = microdegrees_to_degrees(buffer.read_int()? as i64);

        info_builder.bounding_box = Some(BoundingBox::new(
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        )?);
        Ok(())
    }

    pub(crate) fn read_tile_pixel_size(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        info_builder.tile_pixel_size = buffer.read_short()? as u16;
        Ok(())
    }

    pub(crate) fn read_projection_name(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        let projection_name = buffer.read_utf8()?;
        if projection_name != MERCATOR {
            return Err(MapFileError::Unsupported(format!(
                "projection: {projection_name}"
            )));
        }
        info_builder.projection_name = projection_name;
        Ok(())
    }

    pub(crate) fn read_poi_tags(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        info_builder.poi_tags = Self::read_tag_dictionary(buffer, "POI")?;
        Ok(())
    }

    pub(crate) fn read_way_tags(
        buffer: &mut ReadBuffer,
        info_builder: &mut MapFileInfoBuilder,
    ) -> Result<(), MapFileError> {
        info_builder.way_tags = Self::read_tag_dictionary(buffer, "way")?;
        Ok(())
    }

    /// Reads one tag dictionary: a u16 count followed by that many non-empty
    /// `key=value` strings. Position in the dictionary is the tag ID.
    fn read_tag_dictionary(
        buffer: &mut ReadBuffer,
        kind: &str,
    ) -> Result<Vec<Tag>, MapFileError> {
        let number_of_tags = buffer.read_short()?;
        if number_of_tags < 0 {
            return Err(MapFileError::Format(format!(
                "invalid number of {kind} tags: {number_of_tags}"
            )));
        }

        let mut tags = Vec::with_capacity(number_of_tags as usize);
        for tag_id in 0..number_of_tags {
            let literal = buffer.read_utf8()?;
            if literal.is_empty() {
                return Err(MapFileError::Format(format!(
                    "{kind} tag {tag_id} must not be empty"
                )));
            }
            tags.push(Tag::from_keyvalue(&literal));
        }
        Ok(tags)
    }
}
