// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pure view-facing transforms over a snapshot.
//!
//! Status classification, filtering, and the compact "live flights"
//! selection are stateless functions with no side effects. Display-unit
//! conversion happens here, not in the provider layer, which passes values
//! through in provider units.

use chrono::{DateTime, Utc};

use crate::poller::{Snapshot, TrackedAircraft};
use crate::provider::StateVector;

const METRES_TO_FEET: f64 = 3.28084;
const MPS_TO_KNOTS: f64 = 1.94384;

/// Computed status of one tracked aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    /// Report present and not on the ground.
    Airborne,
    /// Report present and on the ground.
    Ground,
    /// No current report.
    Offline,
}

/// Classify an aircraft from its (possibly absent) report.
#[must_use]
pub fn flight_status(state: Option<&StateVector>) -> FlightStatus {
    match state {
        Some(state) if state.on_ground => FlightStatus::Ground,
        Some(_) => FlightStatus::Airborne,
        None => FlightStatus::Offline,
    }
}

/// Status filter for list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Any report present, airborne or on the ground.
    Active,
    Airborne,
    Ground,
    Offline,
}

impl StatusFilter {
    /// Whether an aircraft with the given report passes this filter.
    #[must_use]
    pub fn matches(self, state: Option<&StateVector>) -> bool {
        match self {
            Self::All => true,
            Self::Active => state.is_some(),
            Self::Airborne => flight_status(state) == FlightStatus::Airborne,
            Self::Ground => flight_status(state) == FlightStatus::Ground,
            Self::Offline => state.is_none(),
        }
    }
}

/// Select the tracked aircraft whose snapshot entry passes the filter,
/// preserving tracked-set order.
#[must_use]
pub fn filter_by_status<'a>(
    snapshot: &Snapshot,
    tracked: &'a [TrackedAircraft],
    filter: StatusFilter,
) -> Vec<&'a TrackedAircraft> {
    tracked
        .iter()
        .filter(|aircraft| filter.matches(snapshot.state(&aircraft.tail_number)))
        .collect()
}

/// Select the airborne subset for compact display: sorted by barometric
/// altitude descending (missing altitude sorts last), capped to `max`.
#[must_use]
pub fn live_flights<'a>(snapshot: &'a Snapshot, max: usize) -> Vec<(&'a str, &'a StateVector)> {
    let mut flights: Vec<(&str, &StateVector)> = snapshot
        .states
        .iter()
        .filter_map(|(tail, state)| state.as_ref().map(|s| (tail.as_str(), s)))
        .filter(|(_, state)| !state.on_ground)
        .collect();

    flights.sort_by(|(_, a), (_, b)| {
        b.baro_altitude
            .unwrap_or(f64::NEG_INFINITY)
            .total_cmp(&a.baro_altitude.unwrap_or(f64::NEG_INFINITY))
    });
    flights.truncate(max);
    flights
}

/// Metres to feet, for altitude display.
#[must_use]
pub fn metres_to_feet(metres: f64) -> f64 {
    metres * METRES_TO_FEET
}

/// Metres per second to knots, for speed display.
#[must_use]
pub fn mps_to_knots(mps: f64) -> f64 {
    mps * MPS_TO_KNOTS
}

/// Human-readable age of a last-contact timestamp (epoch seconds).
#[must_use]
pub fn format_last_contact(last_contact: i64, now: DateTime<Utc>) -> String {
    let minutes = (now.timestamp() - last_contact) / 60;
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;

    use super::*;

    fn state(on_ground: bool, baro_altitude: Option<f64>) -> StateVector {
        StateVector {
            icao24: "a1b2c3".to_string(),
            callsign: None,
            origin_country: None,
            time_position: None,
            last_contact: 1_700_000_000,
            longitude: Some(-118.0),
            latitude: Some(34.0),
            baro_altitude,
            on_ground,
            velocity: None,
            true_track: None,
            vertical_rate: None,
            geo_altitude: None,
            squawk: None,
            spi: false,
            position_source: None,
        }
    }

    fn snapshot(entries: Vec<(&str, Option<StateVector>)>) -> Snapshot {
        Snapshot {
            states: entries
                .into_iter()
                .map(|(tail, s)| (tail.to_string(), s))
                .collect::<HashMap<_, _>>(),
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(flight_status(None), FlightStatus::Offline);
        assert_eq!(
            flight_status(Some(&state(true, None))),
            FlightStatus::Ground
        );
        assert_eq!(
            flight_status(Some(&state(false, Some(1000.0)))),
            FlightStatus::Airborne
        );
    }

    #[test]
    fn airborne_filter_selects_only_airborne() {
        let snapshot = snapshot(vec![
            ("A", Some(state(false, Some(10000.0)))),
            ("B", None),
        ]);
        let tracked = vec![
            TrackedAircraft::new("A", "a1"),
            TrackedAircraft::new("B", "b2"),
        ];

        let airborne = filter_by_status(&snapshot, &tracked, StatusFilter::Airborne);
        assert_eq!(airborne.len(), 1);
        assert_eq!(airborne[0].tail_number, "A");

        let offline = filter_by_status(&snapshot, &tracked, StatusFilter::Offline);
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].tail_number, "B");

        let active = filter_by_status(&snapshot, &tracked, StatusFilter::Active);
        assert_eq!(active.len(), 1);

        let all = filter_by_status(&snapshot, &tracked, StatusFilter::All);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn live_flights_sorted_by_altitude_and_capped() {
        let snapshot = snapshot(vec![
            ("LOW", Some(state(false, Some(3000.0)))),
            ("HIGH", Some(state(false, Some(11000.0)))),
            ("MID", Some(state(false, Some(7000.0)))),
            ("TAXI", Some(state(true, Some(0.0)))),
            ("GONE", None),
            ("NOALT", Some(state(false, None))),
        ]);

        let flights = live_flights(&snapshot, 3);
        let tails: Vec<&str> = flights.iter().map(|(tail, _)| *tail).collect();
        assert_eq!(tails, vec!["HIGH", "MID", "LOW"]);

        let all = live_flights(&snapshot, 10);
        assert_eq!(all.len(), 4);
        assert_eq!(all.last().unwrap().0, "NOALT");
    }

    #[test]
    fn unit_conversions() {
        assert!((metres_to_feet(10668.0) - 35000.0).abs() < 1.0);
        assert!((mps_to_knots(257.2) - 500.0).abs() < 0.5);
    }

    #[test]
    fn last_contact_formatting() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(format_last_contact(1_700_000_000 - 30, now), "Just now");
        assert_eq!(format_last_contact(1_700_000_000 - 300, now), "5m ago");
        assert_eq!(format_last_contact(1_700_000_000 - 7200, now), "2h ago");
        assert_eq!(format_last_contact(1_700_000_000 - 172_800, now), "2d ago");
    }
}
