//! Category, altitude and time-window filtering over canonical features.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::advisory::{CanonicalFeature, Category, FeatureCollection};
use super::timestamp;

/// Lower bound assumed when a feature only carries an upper flight level.
pub const FLIGHT_LEVEL_FLOOR: f64 = 0.0;
/// Upper bound assumed when a feature only carries a lower flight level.
pub const FLIGHT_LEVEL_CEILING: f64 = 480.0;

pub const MIN_FROM_OFFSET_HOURS: f64 = -24.0;
pub const MAX_TO_OFFSET_HOURS: f64 = 6.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryVisibility {
    pub sigmet: bool,
    pub airmet: bool,
    pub g_airmet: bool,
}

impl Default for CategoryVisibility {
    fn default() -> Self {
        Self {
            sigmet: true,
            airmet: true,
            g_airmet: true,
        }
    }
}

impl CategoryVisibility {
    pub fn is_visible(&self, category: Category) -> bool {
        match category {
            Category::Sigmet => self.sigmet,
            Category::Airmet => self.airmet,
            Category::GAirmet => self.g_airmet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AltitudeRange {
    fn default() -> Self {
        Self {
            min: FLIGHT_LEVEL_FLOOR,
            max: FLIGHT_LEVEL_CEILING,
        }
    }
}

/// Offsets in hours relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub from_offset_hours: f64,
    pub to_offset_hours: f64,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            from_offset_hours: MIN_FROM_OFFSET_HOURS,
            to_offset_hours: MAX_TO_OFFSET_HOURS,
        }
    }
}

/// Presentation filter state. Passed by value; the engine never mutates it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub categories: CategoryVisibility,
    pub altitude: AltitudeRange,
    pub time: TimeWindow,
}

impl FilterState {
    /// Bring user input within the ranges the controls allow: a reversed altitude
    /// range is swapped, `from` is clamped to `[-24, 0]` and `to` to `[0, 6]`.
    pub fn sanitized(self) -> Self {
        let AltitudeRange { min, max } = self.altitude;
        let altitude = if min <= max {
            AltitudeRange { min, max }
        } else {
            AltitudeRange { min: max, max: min }
        };
        let time = TimeWindow {
            from_offset_hours: clamp_hours(self.time.from_offset_hours, MIN_FROM_OFFSET_HOURS, 0.0),
            to_offset_hours: clamp_hours(self.time.to_offset_hours, 0.0, MAX_TO_OFFSET_HOURS),
        };
        Self {
            categories: self.categories,
            altitude,
            time,
        }
    }
}

/// Parse a user-supplied filter number. Only finite values are accepted.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn clamp_hours(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() { lo } else { value.clamp(lo, hi) }
}

/// Closed-interval intersection; touching intervals overlap.
pub fn overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.1 >= b.0 && a.0 <= b.1
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn category_matches(feature: &CanonicalFeature, categories: &CategoryVisibility) -> bool {
    categories.is_visible(feature.category)
}

/// A feature without any altitude information cannot be evaluated and is excluded.
pub fn altitude_matches(feature: &CanonicalFeature, range: &AltitudeRange) -> bool {
    if feature.min_flight_level.is_none() && feature.max_flight_level.is_none() {
        return false;
    }
    let low = feature.min_flight_level.unwrap_or(FLIGHT_LEVEL_FLOOR);
    let high = feature.max_flight_level.unwrap_or(FLIGHT_LEVEL_CEILING);
    overlaps((low, high), ordered(range.min, range.max))
}

/// A feature without any validity information is always kept.
pub fn time_matches(feature: &CanonicalFeature, window: &TimeWindow, now: OffsetDateTime) -> bool {
    let start = feature.start_time.as_deref().and_then(timestamp::parse);
    let end = feature.end_time.as_deref().and_then(timestamp::parse);

    let (start, end) = match (start, end) {
        (None, None) => return true,
        (Some(start), None) => (start, start),
        (None, Some(end)) => (end, end),
        (Some(start), Some(end)) => (start, end),
    };

    let now_ms = timestamp::unix_millis(now);
    let query = ordered(
        now_ms + window.from_offset_hours * MILLIS_PER_HOUR,
        now_ms + window.to_offset_hours * MILLIS_PER_HOUR,
    );
    overlaps(
        (timestamp::unix_millis(start), timestamp::unix_millis(end)),
        query,
    )
}

pub fn matches(feature: &CanonicalFeature, state: &FilterState, now: OffsetDateTime) -> bool {
    category_matches(feature, &state.categories)
        && altitude_matches(feature, &state.altitude)
        && time_matches(feature, &state.time, now)
}

/// Keep the features passing every predicate, in their input order.
pub fn apply(
    features: &[CanonicalFeature],
    state: &FilterState,
    now: OffsetDateTime,
) -> Vec<CanonicalFeature> {
    features
        .iter()
        .filter(|feature| matches(feature, state, now))
        .cloned()
        .collect()
}

pub fn apply_collection(
    features: &[CanonicalFeature],
    state: &FilterState,
    now: OffsetDateTime,
) -> FeatureCollection {
    FeatureCollection::new(apply(features, state, now))
}

#[cfg(test)]
mod tests {
    use serde_json::Map;
    use time::macros::datetime;

    use super::*;
    use crate::domain::{
        advisory::{Polygon, Position, RawRecord},
        normalize::normalize_intl_sigmets,
    };

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn feature(id: &str) -> CanonicalFeature {
        CanonicalFeature {
            id: id.to_string(),
            category: Category::Sigmet,
            geometry: Polygon::from_vertices([
                Position::new(0.0, 0.0),
                Position::new(1.0, 0.0),
                Position::new(1.0, 1.0),
            ])
            .expect("valid ring"),
            raw_text: String::new(),
            start_time: None,
            end_time: None,
            min_flight_level: Some(0.0),
            max_flight_level: Some(480.0),
            hazard: None,
            extra: Map::new(),
        }
    }

    fn ids(features: &[CanonicalFeature]) -> Vec<&str> {
        features.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn hidden_categories_are_removed() {
        let mut airmet = feature("air1");
        airmet.category = Category::Airmet;
        let state = FilterState {
            categories: CategoryVisibility {
                sigmet: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let result = apply(&[feature("sig1"), airmet], &state, NOW);
        assert_eq!(ids(&result), vec!["air1"]);
    }

    #[test]
    fn altitude_range_cuts_high_features() {
        let mut low = feature("low");
        low.max_flight_level = Some(100.0);
        let mut high = feature("high");
        high.min_flight_level = Some(300.0);
        high.max_flight_level = Some(400.0);
        let state = FilterState {
            altitude: AltitudeRange {
                min: 0.0,
                max: 200.0,
            },
            ..Default::default()
        };

        let result = apply(&[low, high], &state, NOW);
        assert_eq!(ids(&result), vec!["low"]);
    }

    #[test]
    fn features_without_altitude_never_pass() {
        let mut unknown = feature("unknown");
        unknown.min_flight_level = None;
        unknown.max_flight_level = None;

        for (min, max) in [(0.0, 480.0), (-1e9, 1e9), (100.0, 100.0), (480.0, 0.0)] {
            assert!(!altitude_matches(&unknown, &AltitudeRange { min, max }));
        }
    }

    #[test]
    fn a_single_altitude_bound_uses_the_open_extreme() {
        let mut floor_only = feature("floor");
        floor_only.min_flight_level = Some(300.0);
        floor_only.max_flight_level = None;
        assert!(altitude_matches(
            &floor_only,
            &AltitudeRange {
                min: 400.0,
                max: 450.0
            }
        ));

        let mut top_only = feature("top");
        top_only.min_flight_level = None;
        top_only.max_flight_level = Some(50.0);
        assert!(altitude_matches(
            &top_only,
            &AltitudeRange { min: 0.0, max: 10.0 }
        ));
        assert!(!altitude_matches(
            &top_only,
            &AltitudeRange {
                min: 60.0,
                max: 100.0
            }
        ));
    }

    #[test]
    fn overlap_is_boundary_inclusive() {
        assert!(overlaps((100.0, 200.0), (200.0, 300.0)));
        assert!(!overlaps((100.0, 199.0), (200.0, 300.0)));
        assert!(overlaps((200.0, 300.0), (100.0, 200.0)));
        assert!(!overlaps((200.0, 300.0), (100.0, 199.0)));
    }

    #[test]
    fn time_window_keeps_current_and_drops_expired() {
        let mut current = feature("current");
        current.start_time = Some("2024-05-01T11:00:00Z".to_string());
        current.end_time = Some("2024-05-01T13:00:00Z".to_string());
        let mut past = feature("past");
        past.start_time = Some("2024-05-01T00:00:00Z".to_string());
        past.end_time = Some("2024-05-01T01:00:00Z".to_string());
        let state = FilterState {
            time: TimeWindow {
                from_offset_hours: -2.0,
                to_offset_hours: 2.0,
            },
            ..Default::default()
        };

        let result = apply(&[current, past], &state, NOW);
        assert_eq!(ids(&result), vec!["current"]);
    }

    #[test]
    fn expired_features_with_offsetless_times_are_dropped() {
        let record: RawRecord = serde_json::from_value(serde_json::json!({
            "coords": [
                { "lon": 0, "lat": 0 }, { "lon": 1, "lat": 0 }, { "lon": 1, "lat": 1 }
            ],
            "base": 0,
            "top": 300,
            "validTimeFrom": "2024-04-20T00:00:00",
            "validTimeTo": "2024-04-20T06:00"
        }))
        .expect("object record");
        let features = normalize_intl_sigmets(&[record]);
        assert_eq!(
            features[0].start_time.as_deref(),
            Some("2024-04-20T00:00:00Z")
        );
        assert_eq!(features[0].end_time.as_deref(), Some("2024-04-20T06:00:00Z"));

        let state = FilterState {
            time: TimeWindow {
                from_offset_hours: -1.0,
                to_offset_hours: 1.0,
            },
            ..Default::default()
        };
        assert!(apply(&features, &state, NOW).is_empty());
        let during = datetime!(2024-04-20 03:00 UTC);
        assert_eq!(apply(&features, &FilterState::default(), during).len(), 1);
    }

    #[test]
    fn features_without_validity_always_pass() {
        let timeless = feature("timeless");
        for (from, to) in [(-24.0, 6.0), (0.0, 0.0), (5.0, 6.0), (6.0, -24.0)] {
            let window = TimeWindow {
                from_offset_hours: from,
                to_offset_hours: to,
            };
            assert!(time_matches(&timeless, &window, NOW));
        }
    }

    #[test]
    fn a_single_validity_bound_is_an_instant() {
        let mut starts_later = feature("later");
        starts_later.start_time = Some("2024-05-01T15:00:00Z".to_string());
        let window = TimeWindow {
            from_offset_hours: -1.0,
            to_offset_hours: 2.0,
        };
        assert!(!time_matches(&starts_later, &window, NOW));

        let mut ends_soon = feature("soon");
        ends_soon.end_time = Some("2024-05-01T14:00:00Z".to_string());
        assert!(time_matches(&ends_soon, &window, NOW));
    }

    #[test]
    fn window_edges_touching_validity_count() {
        let mut edge = feature("edge");
        edge.start_time = Some("2024-05-01T14:00:00Z".to_string());
        edge.end_time = Some("2024-05-01T18:00:00Z".to_string());
        let window = TimeWindow {
            from_offset_hours: 0.0,
            to_offset_hours: 2.0,
        };
        assert!(time_matches(&edge, &window, NOW));
    }

    #[test]
    fn output_preserves_input_order() {
        let features: Vec<CanonicalFeature> =
            ["c", "a", "b"].into_iter().map(feature).collect();
        let result = apply(&features, &FilterState::default(), NOW);
        assert_eq!(ids(&result), vec!["c", "a", "b"]);
    }

    #[test]
    fn sanitized_swaps_and_clamps() {
        let state = FilterState {
            altitude: AltitudeRange {
                min: 300.0,
                max: 100.0,
            },
            time: TimeWindow {
                from_offset_hours: -48.0,
                to_offset_hours: 12.0,
            },
            ..Default::default()
        }
        .sanitized();

        assert_eq!(
            state.altitude,
            AltitudeRange {
                min: 100.0,
                max: 300.0
            }
        );
        assert_eq!(state.time.from_offset_hours, -24.0);
        assert_eq!(state.time.to_offset_hours, 6.0);
    }
}
