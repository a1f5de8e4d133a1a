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

//! Terminal rendering for tracking snapshots.
//!
//! Builds display strings from a snapshot and the tracked set; conversion
//! to display units (feet, knots) happens here via the view helpers. All
//! functions are pure so they can be asserted on directly.

use chrono::{DateTime, Utc};
use opensky_client::view::{
    filter_by_status, flight_status, format_last_contact, live_flights, metres_to_feet,
    mps_to_knots, FlightStatus, StatusFilter,
};
use opensky_client::{Snapshot, StateVector, Suggestion, SuggestionKind, TrackedAircraft};

fn status_label(status: FlightStatus) -> &'static str {
    match status {
        FlightStatus::Airborne => "Airborne",
        FlightStatus::Ground => "On Ground",
        FlightStatus::Offline => "Offline",
    }
}

fn state_line(state: &StateVector, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();

    if let Some(callsign) = &state.callsign {
        parts.push(format!("callsign {}", callsign));
    }
    if let (Some(lat), Some(lon)) = (state.latitude, state.longitude) {
        parts.push(format!("{:.4}, {:.4}", lat, lon));
    }
    if let Some(altitude) = state.baro_altitude {
        parts.push(format!("{} ft", metres_to_feet(altitude).round() as i64));
    }
    if let Some(velocity) = state.velocity {
        parts.push(format!("{} kt", mps_to_knots(velocity).round() as i64));
    }
    parts.push(format_last_contact(state.last_contact, now));

    parts.join("  ")
}

/// Full dashboard: status counts followed by one line per tracked aircraft.
pub fn render_dashboard(
    snapshot: &Snapshot,
    tracked: &[TrackedAircraft],
    now: DateTime<Utc>,
) -> String {
    let active = filter_by_status(snapshot, tracked, StatusFilter::Active).len();
    let offline = tracked.len() - active;

    let mut out = format!(
        "Tracking {} aircraft ({} active, {} offline) as of {}\n",
        tracked.len(),
        active,
        offline,
        snapshot.taken_at.format("%H:%M:%S")
    );

    for aircraft in tracked {
        let state = snapshot.state(&aircraft.tail_number);
        let status = status_label(flight_status(state));
        match state {
            Some(state) => {
                out.push_str(&format!(
                    "  {:<10} {:<10} {}\n",
                    aircraft.tail_number,
                    status,
                    state_line(state, now)
                ));
            }
            None => {
                out.push_str(&format!(
                    "  {:<10} {:<10} no flight data available\n",
                    aircraft.tail_number, status
                ));
            }
        }
    }

    out
}

/// Compact widget: airborne aircraft only, highest first.
pub fn render_live_flights(snapshot: &Snapshot, max: usize, now: DateTime<Utc>) -> String {
    let flights = live_flights(snapshot, max);
    if flights.is_empty() {
        return "No aircraft currently airborne\n".to_string();
    }

    let mut out = String::new();
    for (tail_number, state) in flights {
        out.push_str(&format!(
            "  {:<10} {}\n",
            tail_number,
            state_line(state, now)
        ));
    }
    out
}

/// Quick-access list with a marker per suggestion kind.
pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    let mut out = "Quick access: ".to_string();
    let rendered: Vec<String> = suggestions
        .iter()
        .map(|s| {
            let marker = match s.kind {
                SuggestionKind::Favorite => "*",
                SuggestionKind::Frequent => "+",
                SuggestionKind::Recent => "~",
            };
            format!("{}{}", marker, s.tail_number)
        })
        .collect();
    out.push_str(&rendered.join(" "));
    out.push('\n');
    out
}
