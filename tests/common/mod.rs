//! Builds minimal synthetic `.map` files for the integration tests.
//!
//! The writer mirrors the wire format the reader expects: header, a single
//! sub-file with a 1×1 block grid, and one block holding the configured POIs
//! and ways. Tests patch individual bytes of the produced buffer to model
//! corruption.

// Each integration test crate uses a different slice of this module.
#![allow(dead_code)]

use std::path::PathBuf;

use mapsforge_reader::MercatorProjection;

// Byte offsets of fixed header fields, for corruption tests.
pub const OFFSET_MAGIC: usize = 0;
pub const OFFSET_FILE_VERSION: usize = 24;
pub const OFFSET_FILE_SIZE: usize = 28;
pub const OFFSET_MAP_DATE: usize = 36;

pub const MAGIC: &[u8] = b"mapsforge binary OSM";
const MAP_DATE: i64 = 1_600_000_000_000;
const INDEX_SIGNATURE: &[u8; 16] = b"+++IndexStart+++";

/// Encodes an unsigned value as an MSB-continuation varint.
pub fn write_var_uint(out: &mut Vec<u8>, mut value: u64) {
    while value > 0x7f {
        out.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Encodes a signed value: seven data bits per continuation byte, six data
/// bits plus a sign flag in the final byte.
pub fn write_var_int(out: &mut Vec<u8>, value: i64) {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    while magnitude > 0x3f {
        out.push((magnitude & 0x7f) as u8 | 0x80);
        magnitude >>= 7;
    }
    out.push(if negative { 0x40 } else { 0 } | magnitude as u8);
}

fn write_utf8(out: &mut Vec<u8>, text: &str) {
    write_var_uint(out, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

fn write_signature(out: &mut Vec<u8>, prefix: &str, length: usize) {
    let mut signature = prefix.as_bytes().to_vec();
    signature.resize(length, b' ');
    out.extend_from_slice(&signature);
}

fn to_microdegrees(degrees: f64) -> i64 {
    (degrees * 1_000_000.0).round() as i64
}

#[derive(Clone, Default)]
pub struct TestPoi {
    pub latitude: f64,
    pub longitude: f64,
    pub layer: u8,
    pub tag_ids: Vec<u64>,
    pub name: Option<String>,
    pub house_number: Option<String>,
    pub elevation: Option<i64>,
}

impl TestPoi {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }

    pub fn named(latitude: f64, longitude: f64, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::at(latitude, longitude)
        }
    }
}

#[derive(Clone)]
pub struct TestWay {
    pub layer: u8,
    pub tag_ids: Vec<u64>,
    pub name: Option<String>,
    pub house_number: Option<String>,
    pub reference: Option<String>,
    /// Microdegree offsets (latitude, longitude) from the first way node.
    pub label_offsets: Option<(i64, i64)>,
    pub tile_bitmask: u16,
    pub double_delta: bool,
    /// Coordinate blocks of (latitude, longitude) nodes.
    pub coordinate_blocks: Vec<Vec<(f64, f64)>>,
    /// Writes an invalid node count of 1 into the first coordinate block.
    pub corrupt_node_count: bool,
}

impl Default for TestWay {
    fn default() -> Self {
        Self {
            layer: 0,
            tag_ids: Vec::new(),
            name: None,
            house_number: None,
            reference: None,
            label_offsets: None,
            tile_bitmask: 0xffff,
            double_delta: false,
            coordinate_blocks: Vec::new(),
            corrupt_node_count: false,
        }
    }
}

impl TestWay {
    pub fn with_nodes(nodes: Vec<(f64, f64)>) -> Self {
        Self {
            coordinate_blocks: vec![nodes],
            ..Self::default()
        }
    }
}

pub struct TestMapBuilder {
    /// Microdegrees: min latitude, min longitude, max latitude, max longitude.
    bounding_box: (i32, i32, i32, i32),
    base_zoom: u8,
    zoom_min: u8,
    zoom_max: u8,
    file_version: i32,
    projection: String,
    tile_pixel_size: u16,
    poi_tag_literals: Vec<String>,
    way_tag_literals: Vec<String>,
    pois: Vec<TestPoi>,
    ways: Vec<TestWay>,
    debug: bool,
    break_block_signature: bool,
    water_block: bool,
    comment: Option<String>,
    created_by: Option<String>,
    languages: Option<String>,
    start_position: Option<(i32, i32)>,
    start_zoom: Option<u8>,
}

impl Default for TestMapBuilder {
    fn default() -> Self {
        Self {
            // Degrees 0.01 .. 0.09 on both axes: a 1×1 block grid at zoom 10.
            bounding_box: (10_000, 10_000, 90_000, 90_000),
            base_zoom: 10,
            zoom_min: 10,
            zoom_max: 10,
            file_version: 3,
            projection: "Mercator".to_string(),
            tile_pixel_size: 256,
            poi_tag_literals: Vec::new(),
            way_tag_literals: Vec::new(),
            pois: Vec::new(),
            ways: Vec::new(),
            debug: false,
            break_block_signature: false,
            water_block: false,
            comment: None,
            created_by: None,
            languages: None,
            start_position: None,
            start_zoom: None,
        }
    }
}

impl TestMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom_interval(mut self, base: u8, min: u8, max: u8) -> Self {
        self.base_zoom = base;
        self.zoom_min = min;
        self.zoom_max = max;
        self
    }

    pub fn projection(mut self, projection: &str) -> Self {
        self.projection = projection.to_string();
        self
    }

    pub fn poi_tags(mut self, literals: &[&str]) -> Self {
        self.poi_tag_literals = literals.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn way_tags(mut self, literals: &[&str]) -> Self {
        self.way_tag_literals = literals.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn poi(mut self, poi: TestPoi) -> Self {
        self.pois.push(poi);
        self
    }

    pub fn way(mut self, way: TestWay) -> Self {
        self.ways.push(way);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn break_block_signature(mut self) -> Self {
        self.break_block_signature = true;
        self
    }

    pub fn water_block(mut self) -> Self {
        self.water_block = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn created_by(mut self, created_by: &str) -> Self {
        self.created_by = Some(created_by.to_string());
        self
    }

    pub fn languages(mut self, languages: &str) -> Self {
        self.languages = Some(languages.to_string());
        self
    }

    pub fn start_position(mut self, latitude_micro: i32, longitude_micro: i32) -> Self {
        self.start_position = Some((latitude_micro, longitude_micro));
        self
    }

    pub fn start_zoom(mut self, zoom: u8) -> Self {
        self.start_zoom = Some(zoom);
        self
    }

    /// The origin (top-left corner) of the single base tile the default
    /// bounding box maps to.
    pub fn tile_origin(&self) -> (f64, f64) {
        let (_, min_lon, max_lat, _) = self.bounding_box_degrees();
        let left = MercatorProjection::longitude_to_tile_x(min_lon, self.base_zoom);
        let top = MercatorProjection::latitude_to_tile_y(max_lat, self.base_zoom);
        (
            MercatorProjection::tile_y_to_latitude(top, self.base_zoom),
            MercatorProjection::tile_x_to_longitude(left, self.base_zoom),
        )
    }

    fn bounding_box_degrees(&self) -> (f64, f64, f64, f64) {
        let (min_lat, min_lon, max_lat, max_lon) = self.bounding_box;
        (
            min_lat as f64 / 1_000_000.0,
            min_lon as f64 / 1_000_000.0,
            max_lat as f64 / 1_000_000.0,
            max_lon as f64 / 1_000_000.0,
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let (min_lat, min_lon, max_lat, max_lon) = self.bounding_box_degrees();
        let left = MercatorProjection::longitude_to_tile_x(min_lon, self.base_zoom);
        let right = MercatorProjection::longitude_to_tile_x(max_lon, self.base_zoom);
        let top = MercatorProjection::latitude_to_tile_y(max_lat, self.base_zoom);
        let bottom = MercatorProjection::latitude_to_tile_y(min_lat, self.base_zoom);
        assert_eq!(
            (right - left, bottom - top),
            (0, 0),
            "test bounding box must map to a 1x1 block grid"
        );

        let (origin_lat, origin_lon) = self.tile_origin();
        let block = self.build_block(origin_lat, origin_lon);

        // Sub-file: optional index signature, one 5-byte index entry, block.
        let mut sub_file = Vec::new();
        if self.debug {
            sub_file.extend_from_slice(INDEX_SIGNATURE);
        }
        let block_offset =
            (if self.debug { INDEX_SIGNATURE.len() } else { 0 } + 5) as u64;
        let raw_entry = block_offset | if self.water_block { 0x80_0000_0000 } else { 0 };
        sub_file.extend_from_slice(&raw_entry.to_be_bytes()[3..8]);
        sub_file.extend_from_slice(&block);

        // Header fields behind the size field, up to the sub-file table.
        let mut fields = Vec::new();
        fields.extend_from_slice(&self.file_version.to_be_bytes());
        fields.extend_from_slice(&0u64.to_be_bytes()); // file size, patched below
        fields.extend_from_slice(&MAP_DATE.to_be_bytes());
        let (bb0, bb1, bb2, bb3) = self.bounding_box;
        fields.extend_from_slice(&bb0.to_be_bytes());
        fields.extend_from_slice(&bb1.to_be_bytes());
        fields.extend_from_slice(&bb2.to_be_bytes());
        fields.extend_from_slice(&bb3.to_be_bytes());
        fields.extend_from_slice(&self.tile_pixel_size.to_be_bytes());
        write_utf8(&mut fields, &self.projection);

        let mut flags = 0u8;
        if self.debug {
            flags |= 0x80;
        }
        if self.start_position.is_some() {
            flags |= 0x40;
        }
        if self.start_zoom.is_some() {
            flags |= 0x20;
        }
        if self.languages.is_some() {
            flags |= 0x10;
        }
        if self.comment.is_some() {
            flags |= 0x08;
        }
        if self.created_by.is_some() {
            flags |= 0x04;
        }
        fields.push(flags);
        if let Some((lat, lon)) = self.start_position {
            fields.extend_from_slice(&lat.to_be_bytes());
            fields.extend_from_slice(&lon.to_be_bytes());
        }
        if let Some(zoom) = self.start_zoom {
            fields.push(zoom);
        }
        if let Some(languages) = &self.languages {
            write_utf8(&mut fields, languages);
        }
        if let Some(comment) = &self.comment {
            write_utf8(&mut fields, comment);
        }
        if let Some(created_by) = &self.created_by {
            write_utf8(&mut fields, created_by);
        }

        fields.extend_from_slice(&(self.poi_tag_literals.len() as u16).to_be_bytes());
        for literal in &self.poi_tag_literals {
            write_utf8(&mut fields, literal);
        }
        fields.extend_from_slice(&(self.way_tag_literals.len() as u16).to_be_bytes());
        for literal in &self.way_tag_literals {
            write_utf8(&mut fields, literal);
        }

        // Sub-file table: count byte plus one 19-byte descriptor.
        let remaining_size = fields.len() + 1 + 19;
        let start_address = (MAGIC.len() + 4 + remaining_size) as u64;

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(remaining_size as i32).to_be_bytes());
        out.extend_from_slice(&fields);
        out.push(1); // number of sub-files
        out.push(self.base_zoom);
        out.push(self.zoom_min);
        out.push(self.zoom_max);
        out.extend_from_slice(&start_address.to_be_bytes());
        out.extend_from_slice(&(sub_file.len() as u64).to_be_bytes());
        out.extend_from_slice(&sub_file);

        let file_size = (out.len() as u64).to_be_bytes();
        out[OFFSET_FILE_SIZE..OFFSET_FILE_SIZE + 8].copy_from_slice(&file_size);
        out
    }

    fn build_block(&self, origin_lat: f64, origin_lon: f64) -> Vec<u8> {
        let mut block = Vec::new();
        if self.debug {
            let prefix = if self.break_block_signature {
                "xxxTileStart"
            } else {
                "###TileStart"
            };
            write_signature(&mut block, prefix, 32);
        }

        // Cumulative zoom table, written as per-row increments. All content
        // sits on the base zoom row.
        let base_row = self.base_zoom - self.zoom_min;
        for row in 0..=(self.zoom_max - self.zoom_min) {
            let (pois, ways) = if row == base_row {
                (self.pois.len() as u64, self.ways.len() as u64)
            } else {
                (0, 0)
            };
            write_var_uint(&mut block, pois);
            write_var_uint(&mut block, ways);
        }

        let poi_data = self.build_pois(origin_lat, origin_lon);
        let way_data = self.build_ways(origin_lat, origin_lon);

        write_var_uint(&mut block, poi_data.len() as u64);
        block.extend_from_slice(&poi_data);
        block.extend_from_slice(&way_data);
        block
    }

    fn build_pois(&self, origin_lat: f64, origin_lon: f64) -> Vec<u8> {
        let mut out = Vec::new();
        for poi in &self.pois {
            if self.debug {
                write_signature(&mut out, "***POIStart", 32);
            }
            write_var_int(&mut out, to_microdegrees(poi.latitude - origin_lat));
            write_var_int(&mut out, to_microdegrees(poi.longitude - origin_lon));
            out.push((poi.layer << 4) | poi.tag_ids.len() as u8);
            for &tag_id in &poi.tag_ids {
                write_var_uint(&mut out, tag_id);
            }

            let mut feature_byte = 0u8;
            if poi.name.is_some() {
                feature_byte |= 0x80;
            }
            if poi.house_number.is_some() {
                feature_byte |= 0x40;
            }
            if poi.elevation.is_some() {
                feature_byte |= 0x20;
            }
            out.push(feature_byte);
            if let Some(name) = &poi.name {
                write_utf8(&mut out, name);
            }
            if let Some(house_number) = &poi.house_number {
                write_utf8(&mut out, house_number);
            }
            if let Some(elevation) = poi.elevation {
                write_var_int(&mut out, elevation);
            }
        }
        out
    }

    fn build_ways(&self, origin_lat: f64, origin_lon: f64) -> Vec<u8> {
        let mut out = Vec::new();
        for way in &self.ways {
            if self.debug {
                write_signature(&mut out, "---WayStart", 32);
            }

            // The record body from the tile bitmask onwards; its length is
            // the way data size.
            let mut body = Vec::new();
            body.extend_from_slice(&way.tile_bitmask.to_be_bytes());
            body.push((way.layer << 4) | way.tag_ids.len() as u8);
            for &tag_id in &way.tag_ids {
                write_var_uint(&mut body, tag_id);
            }

            let mut feature_byte = 0u8;
            if way.name.is_some() {
                feature_byte |= 0x80;
            }
            if way.house_number.is_some() {
                feature_byte |= 0x40;
            }
            if way.reference.is_some() {
                feature_byte |= 0x20;
            }
            if way.label_offsets.is_some() {
                feature_byte |= 0x10;
            }
            if way.double_delta {
                feature_byte |= 0x04;
            }
            body.push(feature_byte);
            if let Some(name) = &way.name {
                write_utf8(&mut body, name);
            }
            if let Some(house_number) = &way.house_number {
                write_utf8(&mut body, house_number);
            }
            if let Some(reference) = &way.reference {
                write_utf8(&mut body, reference);
            }
            if let Some((lat_offset, lon_offset)) = way.label_offsets {
                write_var_int(&mut body, lat_offset);
                write_var_int(&mut body, lon_offset);
            }

            // No data-block count byte: exactly one way data block.
            write_var_uint(&mut body, way.coordinate_blocks.len() as u64);
            for (index, nodes) in way.coordinate_blocks.iter().enumerate() {
                let node_count = if way.corrupt_node_count && index == 0 {
                    1
                } else {
                    nodes.len() as u64
                };
                write_var_uint(&mut body, node_count);
                Self::write_nodes(&mut body, nodes, origin_lat, origin_lon, way.double_delta);
            }

            write_var_uint(&mut out, body.len() as u64);
            out.extend_from_slice(&body);
        }
        out
    }

    /// Encodes node deltas so that the decoder's running sums land on the
    /// target coordinates: per-node deltas are differences of cumulative
    /// microdegree offsets from the tile origin.
    fn write_nodes(
        out: &mut Vec<u8>,
        nodes: &[(f64, f64)],
        origin_lat: f64,
        origin_lon: f64,
        double_delta: bool,
    ) {
        let cumulative: Vec<(i64, i64)> = nodes
            .iter()
            .map(|&(lat, lon)| {
                (
                    to_microdegrees(lat - origin_lat),
                    to_microdegrees(lon - origin_lon),
                )
            })
            .collect();

        let mut deltas = Vec::with_capacity(cumulative.len());
        for (index, &(lat, lon)) in cumulative.iter().enumerate() {
            if index == 0 {
                deltas.push((lat, lon));
            } else {
                let (prev_lat, prev_lon) = cumulative[index - 1];
                deltas.push((lat - prev_lat, lon - prev_lon));
            }
        }

        if double_delta {
            // First node plain, then second-order differences.
            write_var_int(out, deltas[0].0);
            write_var_int(out, deltas[0].1);
            let mut previous = (0i64, 0i64);
            for &(lat, lon) in &deltas[1..] {
                write_var_int(out, lat - previous.0);
                write_var_int(out, lon - previous.1);
                previous = (lat, lon);
            }
        } else {
            for &(lat, lon) in &deltas {
                write_var_int(out, lat);
                write_var_int(out, lon);
            }
        }
    }
}

/// Writes the map bytes into `dir` and returns the file path.
pub fn write_map_file(dir: &tempfile::TempDir, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join("test.map");
    std::fs::write(&path, bytes).expect("write synthetic map file");
    path
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
