//! Output formatters for view-state snapshots.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use chrono::NaiveDate;

use crate::models::Imagery;
use crate::state::ViewState;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const GREEN: &str = "\x1b[92m";

// Icons for visual richness
const ICON_CURSOR: &str = "◎";
const ICON_SCENE: &str = "🛰";
const ICON_LOADING: &str = "⏳";
const ICON_ERROR: &str = "⚠️";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// Pretty-printed JSON object
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Heading shown above a scene's raw record, e.g. `Landsat data on Fri Mar 01 2024`.
#[must_use]
pub fn details_heading(date: NaiveDate) -> String {
    format!("Landsat data on {}", date.format("%a %b %d %Y"))
}

fn scene_summary(imagery: &Imagery) -> String {
    let id = imagery.feature.id().unwrap_or("unnamed scene");
    match imagery.feature.datetime() {
        Some(acquired) => format!("{id} at {} {DIM}({acquired}){RESET}", imagery.coordinate),
        None => format!("{id} at {}", imagery.coordinate),
    }
}

/// Write one state snapshot as a single status line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, state: &ViewState) -> io::Result<()> {
    let scene = match &state.imagery {
        Some(imagery) => format!("{GREEN}{ICON_SCENE} {}{RESET}", scene_summary(imagery)),
        None => format!("{DIM}{ICON_SCENE} no scene{RESET}"),
    };

    let status = if state.loading {
        format!(" │ {YELLOW}{ICON_LOADING} loading{RESET}")
    } else {
        String::new()
    };

    let error = match &state.error {
        Some(message) => format!(" │ {RED}{ICON_ERROR} {message}{RESET}"),
        None => String::new(),
    };

    writeln!(
        writer,
        "{DIM}{}{RESET} │ {CYAN}{ICON_CURSOR} {}{RESET} │ {scene}{status}{error}",
        state.selected_date, state.cursor
    )
}

/// Write the raw record of the found scene, if any, under a heading.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_details<W: Write>(writer: &mut W, state: &ViewState) -> io::Result<()> {
    let Some(imagery) = &state.imagery else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(imagery.feature.as_json())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{BOLD}{}{RESET}", details_heading(state.selected_date))?;
    writeln!(writer, "{json}")
}

/// Write a snapshot as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, state: &ViewState) -> io::Result<()> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write a snapshot as a single line of JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, state: &ViewState) -> io::Result<()> {
    let json =
        serde_json::to_string(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write a snapshot in the specified format.
///
/// `details` adds the raw scene record to human output; JSON formats always
/// carry it.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_state<W: Write>(
    writer: &mut W,
    state: &ViewState,
    format: Format,
    details: bool,
) -> io::Result<()> {
    match format {
        Format::Human => {
            write_human(writer, state)?;
            if details {
                write_details(writer, state)?;
            }
            Ok(())
        }
        Format::Json => write_json(writer, state),
        Format::Ndjson => write_ndjson(writer, state),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::models::{Coordinate, ImageryFeature};
    use crate::testing::scene_json;

    fn state_with_scene() -> ViewState {
        let mut state = ViewState::new(
            Coordinate::new(37.77, -122.42).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        state.imagery =
            Some(Imagery::try_from(ImageryFeature::new(scene_json(-122.0, 37.0))).unwrap());
        state
    }

    fn render(state: &ViewState, format: Format, details: bool) -> String {
        let mut buf = Vec::new();
        write_state(&mut buf, state, format, details).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_details_heading() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(details_heading(date), "Landsat data on Fri Mar 01 2024");
    }

    #[test]
    fn test_human_line_shows_status() {
        let mut state = state_with_scene();
        state.loading = true;
        state.error = Some("Error fetching Landsat data".into());

        let out = render(&state, Format::Human, false);
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("2024-03-01"));
        assert!(out.contains("scene-37--122"));
        assert!(out.contains("loading"));
        assert!(out.contains("Error fetching Landsat data"));
    }

    #[test]
    fn test_human_details_include_raw_record() {
        let out = render(&state_with_scene(), Format::Human, true);
        assert!(out.contains("Landsat data on Fri Mar 01 2024"));
        assert!(out.contains("\"coordinates\""));
    }

    #[test]
    fn test_json_snapshot_fields() {
        let out = render(&state_with_scene(), Format::Ndjson, false);
        assert_eq!(out.lines().count(), 1);

        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["selected_date"], "2024-03-01");
        assert_eq!(v["loading"], false);
        assert_eq!(v["cursor"]["lat"], 37.77);
        assert_eq!(v["imagery"]["coordinate"]["lat"], 37.0);
        assert_eq!(v["imagery"]["feature"]["geometry"]["type"], "Point");
    }
}
