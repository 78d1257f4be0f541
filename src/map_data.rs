use crate::types::{LatLong, Tag};

/// A point feature decoded from one block.
#[derive(Debug, Clone)]
pub struct PointOfInterest {
    /// OSM `layer=` value, bit-packed in the wire format.
    pub layer: i8,
    pub tags: Vec<Tag>,
    pub position: LatLong,
}

impl PointOfInterest {
    pub fn new(layer: i8, tags: Vec<Tag>, position: LatLong) -> Self {
        Self {
            layer,
            tags,
            position,
        }
    }
}

/// Equality compares layer and tags only, NOT the position. Two POIs at
/// different coordinates with the same tags are considered equal. This weak
/// policy is what the duplicate filter in [`MapQueryResult::merge`] relies
/// on and is kept for compatibility with the reference reader.
impl PartialEq for PointOfInterest {
    fn eq(&self, other: &Self) -> bool {
        self.layer == other.layer && self.tags == other.tags
    }
}

/// A line or polygon feature decoded from one block. Each coordinate block
/// is one delta-decoded polyline or ring.
#[derive(Debug, Clone)]
pub struct Way {
    pub layer: i8,
    pub tags: Vec<Tag>,
    pub coordinate_blocks: Vec<Vec<LatLong>>,
    pub label_position: Option<LatLong>,
}

impl Way {
    pub fn new(
        layer: i8,
        tags: Vec<Tag>,
        coordinate_blocks: Vec<Vec<LatLong>>,
        label_position: Option<LatLong>,
    ) -> Self {
        Self {
            layer,
            tags,
            coordinate_blocks,
            label_position,
        }
    }
}

/// Equality compares layer and tags only, NOT the geometry. Two ways with
/// identical tags but different coordinates are considered equal; see
/// [`MapQueryResult::merge`]. Kept for compatibility with the reference
/// reader.
impl PartialEq for Way {
    fn eq(&self, other: &Self) -> bool {
        self.layer == other.layer && self.tags == other.tags
    }
}

/// The POIs and ways of exactly one processed block.
#[derive(Debug, Clone, Default)]
pub struct TileDataBundle {
    pub pois: Vec<PointOfInterest>,
    pub ways: Vec<Way>,
}

impl TileDataBundle {
    pub fn new(pois: Vec<PointOfInterest>, ways: Vec<Way>) -> Self {
        Self { pois, ways }
    }
}

/// Accumulated result of one tile query, one bundle per visited block.
#[derive(Debug, Clone, Default)]
pub struct MapQueryResult {
    bundles: Vec<TileDataBundle>,
    /// True when every visited block was flagged as all-water in the index.
    pub is_water: bool,
}

impl MapQueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundles(&self) -> &[TileDataBundle] {
        &self.bundles
    }

    pub fn pois(&self) -> impl Iterator<Item = &PointOfInterest> {
        self.bundles.iter().flat_map(|bundle| bundle.pois.iter())
    }

    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.bundles.iter().flat_map(|bundle| bundle.ways.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.bundles
            .iter()
            .all(|bundle| bundle.pois.is_empty() && bundle.ways.is_empty())
    }

    /// Appends one block's data. No duplicate checking.
    pub fn add(&mut self, bundle: TileDataBundle) {
        self.bundles.push(bundle);
    }

    /// Merges another result into this one.
    ///
    /// With `check_duplicates`, incoming items already present by the weak
    /// equality of [`PointOfInterest`] and [`Way`] (layer + tags, geometry
    /// ignored) are dropped. The scan is linear per item, acceptable for
    /// tile-sized results only.
    pub fn merge(&mut self, other: MapQueryResult, check_duplicates: bool) {
        self.is_water = self.is_water && other.is_water;
        if !check_duplicates {
            self.bundles.extend(other.bundles);
            return;
        }

        for bundle in other.bundles {
            let mut pois: Vec<PointOfInterest> = Vec::new();
            for poi in bundle.pois {
                if !self.pois().chain(pois.iter()).any(|existing| existing == &poi) {
                    pois.push(poi);
                }
            }
            let mut ways: Vec<Way> = Vec::new();
            for way in bundle.ways {
                if !self.ways().chain(ways.iter()).any(|existing| existing == &way) {
                    ways.push(way);
                }
            }
            self.bundles.push(TileDataBundle::new(pois, ways));
        }
    }
}
