//! Page composition: one form, one chart, one store

use std::sync::Arc;
use std::time::Duration;

use super::chart::{ChartView, RefreshStrategy};
use super::form::{SubmissionForm, SubmitError};
use crate::record::MarksPolicy;
use crate::store::{RecordStore, StoreKind};

/// Marks range the form enforces for a given backend
///
/// The REST backend (and the in-process store that stands in for it)
/// stores percentages; the document store takes any number.
pub fn marks_policy_for(kind: StoreKind) -> MarksPolicy {
    match kind {
        StoreKind::Rest | StoreKind::Memory => MarksPolicy::PERCENT,
        StoreKind::Document => MarksPolicy::Unbounded,
    }
}

/// The dashboard page
///
/// A successful submit refreshes the chart before returning.
pub struct Dashboard {
    store: Arc<dyn RecordStore>,
    form: SubmissionForm,
    chart: ChartView,
}

impl Dashboard {
    pub fn new(store: Arc<dyn RecordStore>, poll_interval: Duration) -> Self {
        let strategy = RefreshStrategy::for_store(store.as_ref(), poll_interval);
        let policy = marks_policy_for(store.kind());

        Self {
            form: SubmissionForm::new(Arc::clone(&store), policy),
            chart: ChartView::new(Arc::clone(&store), strategy),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn form(&self) -> &SubmissionForm {
        &self.form
    }

    pub fn chart(&self) -> &ChartView {
        &self.chart
    }

    pub fn mount(&self) {
        tracing::info!(
            backend = %self.store.kind(),
            strategy = ?self.chart.strategy(),
            "Dashboard mounted"
        );
        self.chart.mount();
    }

    pub fn unmount(&self) {
        self.chart.unmount();
    }

    /// Submit the form's current fields
    pub async fn submit(&self) -> Result<String, SubmitError> {
        let message = self.form.submit().await?;
        self.chart.refresh().await;
        Ok(message)
    }

    /// Fill the form and submit it
    pub async fn submit_input(&self, name: &str, marks: &str) -> Result<String, SubmitError> {
        let message = self.form.submit_input(name, marks).await?;
        self.chart.refresh().await;
        Ok(message)
    }
}
