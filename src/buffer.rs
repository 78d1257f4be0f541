use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder};

use crate::consts::MAXIMUM_BUFFER_SIZE;
use crate::error::MapFileError;
use crate::types::Tag;

/// A byte window loaded from the map file, with a shared decode cursor.
///
/// Every tile query loads its own windows (one per block), so no buffer state
/// is shared between queries. All fixed-width values are big-endian; the
/// variable-length encodings are MSB-continuation with the least significant
/// seven bits in the first byte.
///
/// Every read is bounds-checked up front and fails with
/// [`MapFileError::BufferUnderrun`] instead of truncating silently.
pub struct ReadBuffer {
    data: Vec<u8>,
    position: usize,
}

impl ReadBuffer {
    /// Wraps an already-loaded byte window.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Reads exactly `length` bytes from the reader's current position.
    pub fn read_from_file<R: Read>(reader: &mut R, length: usize) -> Result<Self, MapFileError> {
        if length > MAXIMUM_BUFFER_SIZE {
            return Err(MapFileError::Format(format!(
                "read length exceeds maximum buffer size: {length}"
            )));
        }
        let mut data = vec![0u8; length];
        reader.read_exact(&mut data)?;
        Ok(Self { data, position: 0 })
    }

    /// Seeks to `offset` and reads exactly `length` bytes.
    pub fn read_from_file_at<R: Read + Seek>(
        reader: &mut R,
        offset: u64,
        length: usize,
    ) -> Result<Self, MapFileError> {
        reader.seek(SeekFrom::Start(offset))?;
        Self::read_from_file(reader, length)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Moves the cursor to an absolute position inside the window.
    pub fn set_position(&mut self, position: usize) -> Result<(), MapFileError> {
        if position > self.data.len() {
            return Err(MapFileError::BufferUnderrun {
                wanted: position,
                position: self.position,
                size: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Advances the cursor by `count` bytes without decoding them.
    pub fn skip(&mut self, count: usize) -> Result<(), MapFileError> {
        self.require(count)?;
        self.position += count;
        Ok(())
    }

    fn require(&self, count: usize) -> Result<(), MapFileError> {
        if self.position + count > self.data.len() {
            return Err(MapFileError::BufferUnderrun {
                wanted: count,
                position: self.position,
                size: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, MapFileError> {
        self.require(1)?;
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    pub fn read_short(&mut self) -> Result<i16, MapFileError> {
        self.require(2)?;
        let value = BigEndian::read_i16(&self.data[self.position..]);
        self.position += 2;
        Ok(value)
    }

    pub fn read_int(&mut self) -> Result<i32, MapFileError> {
        self.require(4)?;
        let value = BigEndian::read_i32(&self.data[self.position..]);
        self.position += 4;
        Ok(value)
    }

    pub fn read_long(&mut self) -> Result<i64, MapFileError> {
        self.require(8)?;
        let value = BigEndian::read_i64(&self.data[self.position..]);
        self.position += 8;
        Ok(value)
    }

    /// Reads a 5-byte big-endian unsigned value, the width of a block index
    /// entry.
    pub fn read_five_bytes_long(&mut self) -> Result<u64, MapFileError> {
        self.require(5)?;
        let value = BigEndian::read_uint(&self.data[self.position..], 5);
        self.position += 5;
        Ok(value)
    }

    pub fn read_float(&mut self) -> Result<f32, MapFileError> {
        self.require(4)?;
        let value = BigEndian::read_f32(&self.data[self.position..]);
        self.position += 4;
        Ok(value)
    }

    /// Decodes an unsigned variable-length integer: seven data bits per byte,
    /// high bit set on every byte except the last.
    pub fn read_var_uint(&mut self) -> Result<u64, MapFileError> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            self.require(1)?;
            let byte = self.data[self.position];
            self.position += 1;
            if byte & 0x80 == 0 {
                return Ok(value | (u64::from(byte) << shift));
            }
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;
            if shift > 63 {
                return Err(MapFileError::Format(
                    "variable-length integer exceeds 64 bits".to_string(),
                ));
            }
        }
    }

    /// Decodes a signed variable-length integer. The final byte carries six
    /// data bits and a sign flag in bit 6.
    pub fn read_var_int(&mut self) -> Result<i64, MapFileError> {
        let mut value: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            self.require(1)?;
            let byte = self.data[self.position];
            self.position += 1;
            if byte & 0x80 == 0 {
                value |= i64::from(byte & 0x3f) << shift;
                return Ok(if byte & 0x40 != 0 { -value } else { value });
            }
            value |= i64::from(byte & 0x7f) << shift;
            shift += 7;
            if shift > 63 {
                return Err(MapFileError::Format(
                    "variable-length integer exceeds 64 bits".to_string(),
                ));
            }
        }
    }

    /// Reads a string prefixed with its var-uint byte length.
    pub fn read_utf8(&mut self) -> Result<String, MapFileError> {
        let length = self.read_var_uint()? as usize;
        self.read_utf8_fixed(length)
    }

    /// Reads exactly `length` bytes as UTF-8. A zero length yields an empty
    /// string; a length past the window end is an error.
    pub fn read_utf8_fixed(&mut self, length: usize) -> Result<String, MapFileError> {
        if length == 0 {
            return Ok(String::new());
        }
        self.require(length)?;
        let bytes = self.data[self.position..self.position + length].to_vec();
        self.position += length;
        Ok(String::from_utf8(bytes)?)
    }

    /// Resolves `count` var-uint tag IDs against the file-global dictionary.
    ///
    /// Dictionary entries whose value is a two-character `%` placeholder carry
    /// their actual value inline after the ID list; those values are decoded
    /// here, interleaved with the resolution, on this same cursor. An ID
    /// outside the dictionary is a fatal format error.
    pub fn read_tags(
        &mut self,
        dictionary: &[Tag],
        count: u8,
    ) -> Result<Vec<Tag>, MapFileError> {
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = self.read_var_uint()? as usize;
            if id >= dictionary.len() {
                return Err(MapFileError::Format(format!(
                    "invalid tag ID: {id} (dictionary holds {})",
                    dictionary.len()
                )));
            }
            ids.push(id);
        }

        let mut tags = Vec::with_capacity(ids.len());
        for id in ids {
            let template = &dictionary[id];
            if let Some(kind) = placeholder_kind(&template.value) {
                let value = self.read_placeholder_value(kind, &template.key)?;
                tags.push(Tag::new(template.key.clone(), value));
            } else {
                tags.push(template.clone());
            }
        }
        Ok(tags)
    }

    fn read_placeholder_value(
        &mut self,
        kind: u8,
        key: &str,
    ) -> Result<String, MapFileError> {
        Ok(match kind {
            b'b' => (self.read_byte()? as i8).to_string(),
            b'i' => {
                let value = self.read_int()?;
                if key.contains(":colour") {
                    format!("#{:08x}", value as u32)
                } else {
                    value.to_string()
                }
            }
            b'f' => self.read_float()?.to_string(),
            b'h' => self.read_short()?.to_string(),
            b's' => self.read_utf8()?,
            _ => unreachable!("placeholder_kind only yields known kinds"),
        })
    }
}

fn placeholder_kind(value: &str) -> Option<u8> {
    let bytes = value.as_bytes();
    if bytes.len() == 2 && bytes[0] == b'%' && matches!(bytes[1], b'b' | b'i' | b'f' | b'h' | b's')
    {
        Some(bytes[1])
    } else {
        None
    }
}
