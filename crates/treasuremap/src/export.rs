//! Export payloads for the logbook application.
//!
//! Two formats exist: a plain multi-line listing and a structured JSON
//! document with integer micro-degree coordinates. One is chosen per
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::marker::Marker;

/// Task label used in structured payloads unless configured otherwise.
pub const DEFAULT_TASK_LABEL: &str = "Schatzkarte";

/// Which payload shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// `Flag <n>: <lat>, <lng>` lines.
    #[default]
    Plain,
    /// `{"task": ..., "points": [{"lat": .., "lon": ..}]}`.
    Structured,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

/// One point of a structured payload, in degrees × 10⁶.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookPoint {
    /// Latitude in micro-degrees.
    pub lat: i64,
    /// Longitude in micro-degrees.
    pub lon: i64,
}

impl LogbookPoint {
    /// Convert a marker's coordinates, rounding to the nearest micro-degree.
    #[must_use]
    pub fn from_marker(marker: &Marker) -> Self {
        Self {
            lat: to_micro_degrees(marker.latitude),
            lon: to_micro_degrees(marker.longitude),
        }
    }
}

/// Structured payload sent to the logbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookEntry {
    /// Fixed label naming the exercise.
    pub task: String,
    /// Marker positions in list order.
    pub points: Vec<LogbookPoint>,
}

impl LogbookEntry {
    /// Build an entry for `markers` under the given task label.
    #[must_use]
    pub fn new(task: impl Into<String>, markers: &[Marker]) -> Self {
        Self {
            task: task.into(),
            points: markers.iter().map(LogbookPoint::from_marker).collect(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_micro_degrees(degrees: f64) -> i64 {
    (degrees * 1_000_000.0).round() as i64
}

/// Format markers as 1-indexed `Flag` lines joined by `\n`.
///
/// Coordinates are rounded to six decimal places. There is no trailing
/// newline, and an empty list yields an empty string.
#[must_use]
pub fn plain_text(markers: &[Marker]) -> String {
    markers
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            format!(
                "Flag {}: {:.6}, {:.6}",
                index + 1,
                marker.latitude,
                marker.longitude
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format markers as a compact structured JSON document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn structured(markers: &[Marker], task: &str) -> Result<String> {
    Ok(serde_json::to_string(&LogbookEntry::new(task, markers))?)
}

/// Produce the payload for `markers` in the requested format.
///
/// # Errors
///
/// Returns an error if the structured payload cannot be serialized.
pub fn render(markers: &[Marker], format: ExportFormat, task: &str) -> Result<String> {
    match format {
        ExportFormat::Plain => Ok(plain_text(markers)),
        ExportFormat::Structured => structured(markers, task),
    }
}
