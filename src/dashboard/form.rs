//! Submission form
//!
//! Holds the two text fields, validates them, and hands valid input to the
//! store. Only one submission may be in flight at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::record::{validate_submission, MarksPolicy, ValidationError};
use crate::store::{RecordStore, StoreError};

/// Shown when the store confirms without a message of its own
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Data stored successfully";

/// Why a submit did not store anything
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] StoreError),

    #[error("A submission is already in progress")]
    Busy,
}

/// Feedback line under the form
#[derive(Debug, Clone, PartialEq)]
pub enum FormMessage {
    Success(String),
    Error(String),
}

impl FormMessage {
    pub fn text(&self) -> &str {
        match self {
            FormMessage::Success(text) | FormMessage::Error(text) => text,
        }
    }
}

/// Everything the form displays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub name: String,
    pub marks: String,
    pub submitting: bool,
    pub message: Option<FormMessage>,
}

/// Name/marks entry bound to a store
pub struct SubmissionForm {
    store: Arc<dyn RecordStore>,
    policy: MarksPolicy,
    state: watch::Sender<FormState>,
    busy: AtomicBool,
}

/// Clears the in-flight flag however the submit ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SubmissionForm {
    pub fn new(store: Arc<dyn RecordStore>, policy: MarksPolicy) -> Self {
        let (state, _) = watch::channel(FormState::default());
        Self {
            store,
            policy,
            state,
            busy: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> MarksPolicy {
        self.policy
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.state.send_modify(|s| s.name = name);
    }

    pub fn set_marks(&self, marks: impl Into<String>) {
        let marks = marks.into();
        self.state.send_modify(|s| s.marks = marks);
    }

    pub fn state(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Watch the form for changes
    pub fn watch(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Fill both fields and submit them
    ///
    /// The in-flight flag is claimed before the fields are written, so a
    /// refused call never replaces the input of the running one.
    pub async fn submit_input(&self, name: &str, marks: &str) -> Result<String, SubmitError> {
        let in_flight = self.claim()?;
        self.set_name(name);
        self.set_marks(marks);
        self.submit_claimed(in_flight).await
    }

    /// Validate the current fields and create a record
    ///
    /// On success both fields are cleared and the confirmation text is
    /// returned. The caller decides what to refresh.
    pub async fn submit(&self) -> Result<String, SubmitError> {
        let in_flight = self.claim()?;
        self.submit_claimed(in_flight).await
    }

    fn claim(&self) -> Result<InFlight<'_>, SubmitError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::debug!("Submit ignored, another one is in flight");
            return Err(SubmitError::Busy);
        }
        Ok(InFlight(&self.busy))
    }

    async fn submit_claimed(&self, _in_flight: InFlight<'_>) -> Result<String, SubmitError> {
        let (name, marks) = {
            let state = self.state.borrow();
            (state.name.clone(), state.marks.clone())
        };

        let valid = match validate_submission(&name, &marks, self.policy) {
            Ok(valid) => valid,
            Err(e) => {
                self.state
                    .send_modify(|s| s.message = Some(FormMessage::Error(e.to_string())));
                return Err(e.into());
            }
        };

        self.state.send_modify(|s| {
            s.submitting = true;
            s.message = None;
        });

        match self.store.create_record(&valid.name, valid.marks).await {
            Ok(created) => {
                let message = created
                    .message
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());

                tracing::info!(name = %valid.name, marks = valid.marks, "Record submitted");

                self.state.send_modify(|s| {
                    s.name.clear();
                    s.marks.clear();
                    s.submitting = false;
                    s.message = Some(FormMessage::Success(message.clone()));
                });
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Submission failed");

                // Fields are kept so the user can retry
                self.state.send_modify(|s| {
                    s.submitting = false;
                    s.message = Some(FormMessage::Error(e.to_string()));
                });
                Err(e.into())
            }
        }
    }
}
