//! Dashboard
//!
//! The submission form, the chart view, and the page that wires a successful
//! submit to a chart refresh. Everything here is UI-agnostic state; the
//! terminal front end in `main.rs` renders it with [`render`].

mod chart;
mod form;
mod page;
pub mod render;

pub use chart::{ChartState, ChartView, RefreshStrategy, DEFAULT_POLL_INTERVAL, LOAD_FAILED_MESSAGE};
pub use form::{FormMessage, FormState, SubmissionForm, SubmitError, DEFAULT_SUCCESS_MESSAGE};
pub use page::{marks_policy_for, Dashboard};
