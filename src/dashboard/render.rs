//! Plain-text rendering of the chart and form

use std::fmt::Write;
use std::time::Duration;

use super::chart::{ChartState, RefreshStrategy};
use super::form::{FormMessage, FormState};
use crate::record::ChartPoint;

pub const CHART_TITLE: &str = "Student Marks Distribution";
pub const LOADING_TEXT: &str = "Loading data...";
pub const EMPTY_TEXT: &str = "No records yet";

/// Bars never scale below this, so a lone 40 still looks like 40%
const MIN_SCALE: f64 = 100.0;

const BAR: char = '█';

/// Subtitle under the chart title
pub fn subtitle(strategy: RefreshStrategy) -> String {
    match strategy {
        RefreshStrategy::Polling { interval } => format!(
            "Showing marks for all students (Updates every {})",
            describe_interval(interval)
        ),
        RefreshStrategy::Subscription => "Showing marks for all students (Live updates)".to_string(),
    }
}

fn describe_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 1000 != 0 {
        format!("{} ms", millis)
    } else if millis == 1000 {
        "second".to_string()
    } else {
        format!("{} seconds", millis / 1000)
    }
}

/// Render the chart card: title, subtitle, then bars or a status line
pub fn render_chart(state: &ChartState, strategy: RefreshStrategy, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", CHART_TITLE);
    let _ = writeln!(out, "{}", subtitle(strategy));
    out.push('\n');

    if state.loading {
        let _ = writeln!(out, "{}", LOADING_TEXT);
        return out;
    }

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{}", error);
    }

    let points = state.points();
    if points.is_empty() {
        if state.error.is_none() {
            let _ = writeln!(out, "{}", EMPTY_TEXT);
        }
        return out;
    }

    out.push_str(&render_bars(&points, width));
    out
}

/// One row per point: padded name, bar, value
pub fn render_bars(points: &[ChartPoint], width: usize) -> String {
    let scale = points
        .iter()
        .map(|p| p.marks)
        .filter(|m| m.is_finite())
        .fold(MIN_SCALE, f64::max);

    let name_width = points
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for point in points {
        let len = bar_length(point.marks, scale, width);
        let pad = name_width - point.name.chars().count();

        let _ = writeln!(
            out,
            "{}{} | {}{} {}",
            point.name,
            " ".repeat(pad),
            BAR.to_string().repeat(len),
            " ".repeat(width - len),
            format_marks(point.marks)
        );
    }
    out
}

fn bar_length(marks: f64, scale: f64, width: usize) -> usize {
    if !marks.is_finite() || marks <= 0.0 {
        return 0;
    }
    let len = (marks / scale * width as f64).round() as usize;
    len.min(width)
}

/// `87` for whole numbers, `87.5` otherwise
pub fn format_marks(marks: f64) -> String {
    if marks.fract() == 0.0 && marks.is_finite() {
        format!("{:.0}", marks)
    } else {
        format!("{}", marks)
    }
}

/// Render the form card
pub fn render_form(state: &FormState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Enter Marks for Candidate");

    if state.submitting {
        let _ = writeln!(out, "Submitting...");
    }

    match &state.message {
        Some(FormMessage::Success(text)) => {
            let _ = writeln!(out, "✓ {}", text);
        }
        Some(FormMessage::Error(text)) => {
            let _ = writeln!(out, "✗ {}", text);
        }
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, Timestamp};

    fn state_with(points: &[(&str, f64)]) -> ChartState {
        ChartState {
            records: points
                .iter()
                .enumerate()
                .map(|(i, (name, marks))| Record {
                    id: i.to_string(),
                    name: name.to_string(),
                    marks: *marks,
                    created_at: Timestamp {
                        seconds: i as i64,
                        nanoseconds: 0,
                    },
                })
                .collect(),
            loading: false,
            error: None,
            last_updated: None,
        }
    }

    const POLL: RefreshStrategy = RefreshStrategy::Polling {
        interval: Duration::from_secs(5),
    };

    #[test]
    fn test_subtitles() {
        assert_eq!(
            subtitle(POLL),
            "Showing marks for all students (Updates every 5 seconds)"
        );
        assert_eq!(
            subtitle(RefreshStrategy::Subscription),
            "Showing marks for all students (Live updates)"
        );
    }

    #[test]
    fn test_loading_state() {
        let out = render_chart(&ChartState::default(), POLL, 20);
        assert!(out.starts_with(CHART_TITLE));
        assert!(out.contains(LOADING_TEXT));
    }

    #[test]
    fn test_bars_scale_to_hundred() {
        let out = render_chart(&state_with(&[("Ava", 50.0), ("Bo", 100.0)]), POLL, 10);
        let rows: Vec<&str> = out.lines().skip(3).collect();

        assert_eq!(rows[0], "Ava | █████      50");
        assert_eq!(rows[1], "Bo  | ██████████ 100");
    }

    #[test]
    fn test_bars_scale_to_largest_above_hundred() {
        let out = render_bars(
            &[
                ChartPoint {
                    name: "a".to_string(),
                    marks: 100.0,
                },
                ChartPoint {
                    name: "b".to_string(),
                    marks: 200.0,
                },
            ],
            10,
        );
        let lens: Vec<usize> = out.lines().map(|l| l.matches(BAR).count()).collect();
        assert_eq!(lens, vec![5, 10]);
    }

    #[test]
    fn test_error_keeps_previous_bars() {
        let mut state = state_with(&[("Ava", 87.5)]);
        state.error = Some("Failed to load student data".to_string());

        let out = render_chart(&state, POLL, 10);
        assert!(out.contains("Failed to load student data"));
        assert!(out.contains("87.5"));
    }

    #[test]
    fn test_empty_state() {
        let out = render_chart(&state_with(&[]), RefreshStrategy::Subscription, 10);
        assert!(out.contains(EMPTY_TEXT));
    }

    #[test]
    fn test_negative_marks_draw_no_bar() {
        assert_eq!(bar_length(-5.0, 100.0, 10), 0);
        assert_eq!(bar_length(f64::NAN, 100.0, 10), 0);
    }

    #[test]
    fn test_form_messages() {
        let state = FormState {
            message: Some(FormMessage::Error("Name and marks are required".to_string())),
            ..Default::default()
        };
        assert!(render_form(&state).contains("✗ Name and marks are required"));
    }
}
