use crate::buffer::ReadBuffer;
use crate::consts::{
    HEADER_BITMASK_COMMENT, HEADER_BITMASK_CREATED_BY, HEADER_BITMASK_DEBUG,
    HEADER_BITMASK_LANGUAGES_PREFERENCE, HEADER_BITMASK_START_POSITION,
    HEADER_BITMASK_START_ZOOM_LEVEL, START_ZOOM_LEVEL_MAX,
};
use crate::error::MapFileError;
use crate::types::{microdegrees_to_degrees, LatLong};

/// The gated optional header block. Which fields are present is decided by
/// the flag byte; present fields follow in the order of the flag bits.
#[derive(Debug, Default)]
pub(crate) struct OptionalFields {
    pub is_debug_file: bool,
    has_start_position: bool,
    has_start_zoom_level: bool,
    has_languages_preference: bool,
    has_comment: bool,
    has_created_by: bool,
    pub start_position: Option<LatLong>,
    pub start_zoom_level: Option<u8>,
    pub languages_preference: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
}

impl OptionalFields {
    pub(crate) fn from_flags(flags: u8) -> Self {
        Self {
            is_debug_file: flags & HEADER_BITMASK_DEBUG != 0,
            has_start_position: flags & HEADER_BITMASK_START_POSITION != 0,
            has_start_zoom_level: flags & HEADER_BITMASK_START_ZOOM_LEVEL != 0,
            has_languages_preference: flags & HEADER_BITMASK_LANGUAGES_PREFERENCE != 0,
            has_comment: flags & HEADER_BITMASK_COMMENT != 0,
            has_created_by: flags & HEADER_BITMASK_CREATED_BY != 0,
            ..Self::default()
        }
    }

    pub(crate) fn read_optional_fields(
        &mut self,
        buffer: &mut ReadBuffer,
    ) -> Result<(), MapFileError> {
        if self.has_start_position {
            let latitude = microdegrees_to_degrees(buffer.read_int()? as i64);
            let longitude = microdegrees_to_degrees(buffer.read_int()? as i64);
            self.start_position = Some(LatLong::new(latitude, longitude));
        }

        if self.has_start_zoom_level {
            let start_zoom_level = buffer.read_byte()?;
            if start_zoom_level > START_ZOOM_LEVEL_MAX {
                return Err(MapFileError::Format(format!(
                    "invalid map start zoom level: {start_zoom_level}"
                )));
            }
            self.start_zoom_level = Some(start_zoom_level);
        }

        if self.has_languages_preference {
            self.languages_preference = Some(buffer.read_utf8()?);
        }

        if self.has_comment {
            self.comment = Some(buffer.read_utf8()?);
        }

        if self.has_created_by {
            self.created_by = Some(buffer.read_utf8()?);
        }

        Ok(())
    }
}
