//! Conversion of upstream advisory records into canonical features.
//!
//! Both upstream schemas go through [`normalize`]; the differences between them live in
//! a [`SchemaProfile`]. Records that cannot produce a valid polygon are skipped, and
//! fields that cannot be interpreted degrade to `None`. Nothing here fails.

use serde_json::{Map, Value};

use super::advisory::{AdvisoryKind, CanonicalFeature, Category, Polygon, Position, RawRecord};
use super::timestamp;

const FIELD_ID: &str = "id";
const FIELD_ICAO: &str = "icaoId";
const FIELD_RECEIPT_TIME: &str = "receiptTime";
const FIELD_COORDS: &str = "coords";
const FIELD_HAZARD: &str = "hazard";

/// How a schema assigns categories.
#[derive(Debug, Clone, Copy)]
pub enum CategoryRule {
    Fixed(Category),
    /// Resolved from a sub-type label via [`Category::from_sub_type`].
    SubType(&'static str),
}

/// A lower/upper altitude field pair.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeFields {
    pub lower: &'static str,
    pub upper: &'static str,
}

/// Field mapping for one upstream schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaProfile {
    pub raw_text: &'static str,
    pub valid_from: &'static str,
    pub valid_to: &'static str,
    /// Altitude pairs in order of preference. Each bound falls back independently to
    /// the next pair when absent.
    pub altitudes: &'static [AltitudeFields],
    pub category: CategoryRule,
}

pub const INTL_SIGMET_PROFILE: SchemaProfile = SchemaProfile {
    raw_text: "rawSigmet",
    valid_from: "validTimeFrom",
    valid_to: "validTimeTo",
    altitudes: &[AltitudeFields {
        lower: "base",
        upper: "top",
    }],
    category: CategoryRule::Fixed(Category::Sigmet),
};

pub const AIR_SIGMET_PROFILE: SchemaProfile = SchemaProfile {
    raw_text: "rawAirSigmet",
    valid_from: "validTimeFrom",
    valid_to: "validTimeTo",
    altitudes: &[
        AltitudeFields {
            lower: "altitudeLow1",
            upper: "altitudeHi1",
        },
        AltitudeFields {
            lower: "altitudeLow2",
            upper: "altitudeHi2",
        },
    ],
    category: CategoryRule::SubType("airSigmetType"),
};

impl SchemaProfile {
    pub fn for_kind(kind: AdvisoryKind) -> &'static SchemaProfile {
        match kind {
            AdvisoryKind::IntlSigmet => &INTL_SIGMET_PROFILE,
            AdvisoryKind::AirSigmet => &AIR_SIGMET_PROFILE,
        }
    }

    fn consumes(&self, field: &str) -> bool {
        if [
            FIELD_ID,
            FIELD_COORDS,
            FIELD_HAZARD,
            self.raw_text,
            self.valid_from,
            self.valid_to,
        ]
        .contains(&field)
        {
            return true;
        }
        if let CategoryRule::SubType(sub_type) = self.category {
            if sub_type == field {
                return true;
            }
        }
        self.altitudes
            .iter()
            .any(|pair| pair.lower == field || pair.upper == field)
    }
}

/// Normalize records of the given kind, dropping those without a valid polygon.
pub fn normalize(kind: AdvisoryKind, records: &[RawRecord]) -> Vec<CanonicalFeature> {
    let profile = SchemaProfile::for_kind(kind);
    records
        .iter()
        .filter_map(|record| normalize_record(profile, record))
        .collect()
}

pub fn normalize_intl_sigmets(records: &[RawRecord]) -> Vec<CanonicalFeature> {
    normalize(AdvisoryKind::IntlSigmet, records)
}

pub fn normalize_air_sigmets(records: &[RawRecord]) -> Vec<CanonicalFeature> {
    normalize(AdvisoryKind::AirSigmet, records)
}

/// Normalize a single record; `None` when its geometry is unusable.
pub fn normalize_record(profile: &SchemaProfile, record: &RawRecord) -> Option<CanonicalFeature> {
    let geometry = polygon(record.get(FIELD_COORDS))?;

    let category = match profile.category {
        CategoryRule::Fixed(category) => category,
        CategoryRule::SubType(field) => {
            Category::from_sub_type(record.get(field).and_then(Value::as_str))
        }
    };

    let min_flight_level = flight_level(record, profile.altitudes, |pair| pair.lower);
    let max_flight_level = flight_level(record, profile.altitudes, |pair| pair.upper);

    Some(CanonicalFeature {
        id: feature_id(record),
        category,
        geometry,
        raw_text: record
            .get(profile.raw_text)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        start_time: timestamp::canonical(record.get(profile.valid_from)),
        end_time: timestamp::canonical(record.get(profile.valid_to)),
        min_flight_level,
        max_flight_level,
        hazard: record
            .get(FIELD_HAZARD)
            .and_then(Value::as_str)
            .filter(|hazard| !hazard.is_empty())
            .map(str::to_string),
        extra: passthrough(profile, record),
    })
}

fn polygon(coords: Option<&Value>) -> Option<Polygon> {
    let vertices = coords?.as_array()?.iter().filter_map(|coord| {
        let lon = number(coord.get("lon")?)?;
        let lat = number(coord.get("lat")?)?;
        Some(Position::new(lon, lat))
    });
    Polygon::from_vertices(vertices)
}

/// First present value across the preferred pairs, then coerced. A present but
/// non-numeric value does not fall through to the next pair.
fn flight_level(
    record: &RawRecord,
    pairs: &[AltitudeFields],
    pick: impl Fn(&AltitudeFields) -> &'static str,
) -> Option<f64> {
    pairs
        .iter()
        .find_map(|pair| record.get(pick(pair)))
        .and_then(number)
}

fn feature_id(record: &RawRecord) -> String {
    if let Some(id) = record.get(FIELD_ID) {
        return display(id);
    }
    let icao = record.get(FIELD_ICAO).map(display).unwrap_or_default();
    let receipt = record
        .get(FIELD_RECEIPT_TIME)
        .map(display)
        .unwrap_or_default();
    format!("{icao}-{receipt}")
}

fn passthrough(profile: &SchemaProfile, record: &RawRecord) -> Map<String, Value> {
    record
        .fields()
        .iter()
        .filter(|(key, _)| !profile.consumes(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Finite number from a JSON number or numeric string.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
