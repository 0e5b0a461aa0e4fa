//! Advisory records as delivered upstream and in their canonical, renderer-ready form.

use std::fmt;

use serde::{
    Deserialize, Serialize, Serializer,
    ser::{SerializeMap, SerializeStruct},
};
use serde_json::{Map, Value};

/// The two advisory feeds served by the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryKind {
    /// International SIGMETs.
    IntlSigmet,
    /// Domestic AIRMETs, SIGMETs and G-AIRMETs.
    AirSigmet,
}

impl AdvisoryKind {
    /// Path segment of the upstream endpoint serving this kind.
    pub fn path_segment(self) -> &'static str {
        match self {
            AdvisoryKind::IntlSigmet => "isigmet",
            AdvisoryKind::AirSigmet => "airsigmet",
        }
    }
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Presentation category a canonical feature is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "SIGMET")]
    Sigmet,
    #[serde(rename = "AIRMET")]
    Airmet,
    #[serde(rename = "G_AIRMET")]
    GAirmet,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sigmet => "SIGMET",
            Category::Airmet => "AIRMET",
            Category::GAirmet => "G_AIRMET",
        }
    }

    /// Resolve a domestic sub-type label. Unknown or missing labels are G-AIRMETs.
    pub fn from_sub_type(label: Option<&str>) -> Self {
        match label {
            Some(value) if value.eq_ignore_ascii_case("SIGMET") => Category::Sigmet,
            Some(value) if value.eq_ignore_ascii_case("AIRMET") => Category::Airmet,
            _ => Category::GAirmet,
        }
    }
}

/// A single upstream record, kept as the loosely-typed object the provider sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.lon, self.lat].serialize(serializer)
    }
}

/// Minimum number of distinct vertices a ring must be built from.
pub const MIN_RING_VERTICES: usize = 3;

/// A closed polygon ring. Every value satisfies: at least four positions, the first
/// equal to the last, built from at least three distinct finite vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<Position>,
}

impl Polygon {
    /// Build a closed ring from vertices in their original order.
    ///
    /// Non-finite vertices are discarded. Returns `None` when fewer than three valid or
    /// three distinct vertices remain. A closing vertex equal to the first one is
    /// appended only when the ring is open.
    pub fn from_vertices<I>(vertices: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut ring: Vec<Position> = vertices
            .into_iter()
            .filter(|p| p.lon.is_finite() && p.lat.is_finite())
            .collect();

        if ring.len() < MIN_RING_VERTICES || distinct_count(&ring) < MIN_RING_VERTICES {
            return None;
        }

        let first = ring[0];
        if ring.last() != Some(&first) {
            ring.push(first);
        }

        Some(Self { ring })
    }

    pub fn ring(&self) -> &[Position] {
        &self.ring
    }
}

impl Serialize for Polygon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Polygon", 2)?;
        state.serialize_field("type", "Polygon")?;
        state.serialize_field("coordinates", &[&self.ring])?;
        state.end()
    }
}

fn distinct_count(points: &[Position]) -> usize {
    let mut seen: Vec<Position> = Vec::with_capacity(points.len());
    for point in points {
        if !seen.contains(point) {
            seen.push(*point);
        }
        if seen.len() >= MIN_RING_VERTICES {
            break;
        }
    }
    seen.len()
}

/// The normalized shape every downstream consumer works with.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFeature {
    pub id: String,
    pub category: Category,
    pub geometry: Polygon,
    pub raw_text: String,
    /// RFC 3339 timestamp.
    pub start_time: Option<String>,
    /// RFC 3339 timestamp.
    pub end_time: Option<String>,
    pub min_flight_level: Option<f64>,
    pub max_flight_level: Option<f64>,
    pub hazard: Option<String>,
    /// Upstream fields with no typed slot, kept for popups and other presentation.
    pub extra: Map<String, Value>,
}

impl Serialize for CanonicalFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Feature", 3)?;
        state.serialize_field("type", "Feature")?;
        state.serialize_field("geometry", &self.geometry)?;
        state.serialize_field("properties", &Properties(self))?;
        state.end()
    }
}

struct Properties<'a>(&'a CanonicalFeature);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let feature = self.0;
        let mut map = serializer.serialize_map(None)?;
        // Passthrough fields first so typed fields win on a name clash.
        for (key, value) in &feature.extra {
            if !TYPED_PROPERTIES.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("id", &feature.id)?;
        map.serialize_entry("type", &feature.category)?;
        map.serialize_entry("rawText", &feature.raw_text)?;
        map.serialize_entry("startTime", &feature.start_time)?;
        map.serialize_entry("endTime", &feature.end_time)?;
        map.serialize_entry("minFlightLevel", &feature.min_flight_level)?;
        map.serialize_entry("maxFlightLevel", &feature.max_flight_level)?;
        map.serialize_entry("hazard", &feature.hazard)?;
        map.end()
    }
}

const TYPED_PROPERTIES: [&str; 8] = [
    "id",
    "type",
    "rawText",
    "startTime",
    "endTime",
    "minFlightLevel",
    "maxFlightLevel",
    "hazard",
];

/// Filtered output handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<CanonicalFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<CanonicalFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Serialize for FeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureCollection", 2)?;
        state.serialize_field("type", "FeatureCollection")?;
        state.serialize_field("features", &self.features)?;
        state.end()
    }
}
