//! Debounced autocomplete channels.
//!
//! One channel per autocomplete field. Each channel owns a worker task that:
//! - waits for `debounce` of input silence,
//! - drops the emission if it equals the previous one,
//! - expands the field's concept subset filtered by the input text,
//! - publishes the result on a `watch` channel.
//!
//! At most one lookup is in flight per channel. Starting a new lookup aborts the previous one,
//! and every published state carries the sequence number of the lookup that produced it so an
//! older lookup can never overwrite a newer one.

use crate::boost::{merge_boosted, PreferredDiagnoses};
use crate::coding::{AutocompleteField, CodedValue, FieldInput};
use crate::terminology::{ConceptSubset, TerminologyService};
use crate::{EncounterError, EncounterResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Outcome of the most recent lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LookupStatus {
    #[default]
    Idle,
    Pending,
    Ready,
    /// The server returned no `contains`; the previous items were kept.
    Empty,
    /// The lookup failed; the previous items were kept.
    Failed(String),
}

/// Published state of a channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Suggestions {
    pub items: Vec<CodedValue>,
    pub status: LookupStatus,
    /// Sequence number of the lookup that produced this state (0 before the first lookup).
    pub sequence: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct ChannelSettings {
    pub debounce: Duration,
    pub result_count: u32,
}

/// Preferred-diagnosis overlay wired into the diagnosis channel.
#[derive(Clone, Debug)]
pub struct BoostOverlay {
    pub preferred: Arc<PreferredDiagnoses>,
    pub enabled: watch::Receiver<bool>,
}

impl BoostOverlay {
    fn active_matches(&self, term: &str) -> Option<Vec<CodedValue>> {
        if *self.enabled.borrow() {
            Some(self.preferred.matching(term))
        } else {
            None
        }
    }
}

/// Handle to a running autocomplete channel.
///
/// Call [`AutocompleteChannel::close`] to release it. Dropping the handle aborts the worker.
pub struct AutocompleteChannel {
    field: AutocompleteField,
    input_tx: Option<mpsc::UnboundedSender<FieldInput>>,
    suggestions_rx: watch::Receiver<Suggestions>,
    worker: Option<JoinHandle<()>>,
}

impl AutocompleteChannel {
    /// Spawn the channel worker on the current tokio runtime.
    pub fn spawn(
        field: AutocompleteField,
        service: Arc<dyn TerminologyService>,
        settings: ChannelSettings,
        boost: Option<BoostOverlay>,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (suggestions_tx, suggestions_rx) = watch::channel(Suggestions::default());

        let worker = Worker {
            field,
            service,
            settings,
            boost,
            suggestions_tx: Arc::new(suggestions_tx),
        };
        let worker = tokio::spawn(worker.run(input_rx));

        Self {
            field,
            input_tx: Some(input_tx),
            suggestions_rx,
            worker: Some(worker),
        }
    }

    pub fn field(&self) -> AutocompleteField {
        self.field
    }

    /// Feed a keystroke or selection into the channel.
    pub fn push(&self, input: FieldInput) -> EncounterResult<()> {
        let sender = self
            .input_tx
            .as_ref()
            .ok_or(EncounterError::ChannelClosed(self.field.name()))?;
        sender
            .send(input)
            .map_err(|_| EncounterError::ChannelClosed(self.field.name()))
    }

    pub fn snapshot(&self) -> Suggestions {
        self.suggestions_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Suggestions> {
        self.suggestions_rx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.input_tx.is_none()
    }

    /// Stop the worker, abort any in-flight lookup and wait for the task to finish.
    pub async fn close(&mut self) {
        // Dropping the sender ends the worker loop.
        self.input_tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    tracing::warn!("{} autocomplete worker failed: {}", self.field, e);
                }
            }
        }
        tracing::debug!("{} autocomplete channel released", self.field);
    }
}

impl Drop for AutocompleteChannel {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Aborts the wrapped lookup when dropped, so replacing or dropping it cancels the request.
struct InFlight(JoinHandle<()>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Worker {
    field: AutocompleteField,
    service: Arc<dyn TerminologyService>,
    settings: ChannelSettings,
    boost: Option<BoostOverlay>,
    suggestions_tx: Arc<watch::Sender<Suggestions>>,
}

impl Worker {
    async fn run(self, mut input_rx: mpsc::UnboundedReceiver<FieldInput>) {
        let mut pending: Option<FieldInput> = None;
        let mut last_emitted: Option<FieldInput> = None;
        let mut in_flight: Option<InFlight> = None;
        let mut sequence = 0u64;

        let deadline = tokio::time::sleep(self.settings.debounce);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                received = input_rx.recv() => match received {
                    Some(input) => {
                        pending = Some(input);
                        deadline.as_mut().reset(Instant::now() + self.settings.debounce);
                    }
                    None => break,
                },
                () = &mut deadline, if pending.is_some() => {
                    let Some(input) = pending.take() else {
                        continue;
                    };
                    if last_emitted.as_ref() == Some(&input) {
                        tracing::trace!("{} input unchanged, skipping lookup", self.field);
                        continue;
                    }
                    last_emitted = Some(input.clone());
                    sequence += 1;
                    // Replacing the previous handle aborts its request.
                    in_flight = self.start_lookup(&input, sequence);
                }
            }
        }

        drop(in_flight);
        tracing::debug!("{} autocomplete worker stopped", self.field);
    }

    fn start_lookup(&self, input: &FieldInput, sequence: u64) -> Option<InFlight> {
        let filter = input.filter_text().to_owned();
        let preferred = self
            .boost
            .as_ref()
            .and_then(|boost| boost.active_matches(&filter));

        let request = match ConceptSubset::from(self.field)
            .request(Some(self.settings.result_count))
        {
            Ok(request) => request.with_filter(&filter),
            Err(e) => {
                publish(&self.suggestions_tx, sequence, |state| {
                    state.status = LookupStatus::Failed(e.to_string());
                });
                return None;
            }
        };

        publish(&self.suggestions_tx, sequence, |state| {
            if let Some(preferred) = &preferred {
                state.items = preferred.clone();
            }
            state.status = LookupStatus::Pending;
        });

        tracing::debug!("{} lookup #{} for {:?}", self.field, sequence, filter);

        let field = self.field;
        let service = Arc::clone(&self.service);
        let suggestions_tx = Arc::clone(&self.suggestions_tx);

        let handle = tokio::spawn(async move {
            let result = service.expand(&request).await;
            publish(&suggestions_tx, sequence, |state| match result {
                Ok(items) => {
                    state.items = match preferred {
                        Some(preferred) => merge_boosted(preferred, items),
                        None => items,
                    };
                    state.status = LookupStatus::Ready;
                }
                Err(EncounterError::EmptyExpansion) => {
                    state.status = LookupStatus::Empty;
                }
                Err(e) => {
                    tracing::warn!("{} lookup #{} failed: {}", field, sequence, e);
                    state.status = LookupStatus::Failed(e.to_string());
                }
            });
        });

        Some(InFlight(handle))
    }
}

/// Apply `update` unless a newer lookup has already published.
fn publish(
    tx: &watch::Sender<Suggestions>,
    sequence: u64,
    update: impl FnOnce(&mut Suggestions),
) {
    tx.send_if_modified(|state| {
        if state.sequence > sequence {
            return false;
        }
        state.sequence = sequence;
        update(state);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineTerminology;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn settings() -> ChannelSettings {
        ChannelSettings {
            debounce: DEBOUNCE,
            result_count: 20,
        }
    }

    fn diagnoses() -> Vec<CodedValue> {
        vec![
            CodedValue::new("38341003", "Hypertensive disorder"),
            CodedValue::new("44054006", "Type 2 diabetes mellitus"),
            CodedValue::new("73211009", "Diabetes mellitus"),
        ]
    }

    async fn settle() {
        tokio::time::sleep(DEBOUNCE * 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_sends_only_the_last_value() {
        let terminology = OfflineTerminology::new().with_concepts("< 404684003", diagnoses());
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        for text in ["d", "di", "dia", "diab"] {
            channel.push(FieldInput::Text(text.into())).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        settle().await;

        let calls = terminology.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter(), Some("diab"));
        assert_eq!(calls[0].count(), Some(20));

        let suggestions = channel.snapshot();
        assert_eq!(suggestions.status, LookupStatus::Ready);
        assert_eq!(suggestions.items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_value_is_not_looked_up_twice() {
        let terminology = OfflineTerminology::new().with_concepts("< 404684003", diagnoses());
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        channel.push(FieldInput::Text("diab".into())).unwrap();
        settle().await;
        channel.push(FieldInput::Text("diab".into())).unwrap();
        settle().await;
        assert_eq!(terminology.call_count(), 1);

        // Typing away and back within one window is also a single unchanged emission.
        channel.push(FieldInput::Text("diabe".into())).unwrap();
        channel.push(FieldInput::Text("diab".into())).unwrap();
        settle().await;
        assert_eq!(terminology.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn selection_filters_by_display() {
        let terminology = OfflineTerminology::new().with_concepts("< 71388002", Vec::new());
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Procedure,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        channel
            .push(FieldInput::Selected(CodedValue::new("80146002", "Appendectomy")))
            .unwrap();
        settle().await;

        assert_eq!(terminology.calls()[0].filter(), Some("Appendectomy"));
        assert_eq!(channel.snapshot().status, LookupStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_items() {
        let terminology = OfflineTerminology::new().with_concepts("< 404684003", diagnoses());
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        channel.push(FieldInput::Text("diab".into())).unwrap();
        settle().await;
        let before = channel.snapshot().items;
        assert_eq!(before.len(), 2);

        terminology.set_unavailable(true);
        channel.push(FieldInput::Text("hyper".into())).unwrap();
        settle().await;

        let after = channel.snapshot();
        assert_eq!(after.items, before);
        assert!(matches!(after.status, LookupStatus::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_contains_keeps_previous_items() {
        let terminology = OfflineTerminology::new()
            .with_concepts("< 404684003", diagnoses())
            .with_missing_contains_for("zzz");
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        channel.push(FieldInput::Text("diab".into())).unwrap();
        settle().await;
        channel.push(FieldInput::Text("zzz".into())).unwrap();
        settle().await;

        let state = channel.snapshot();
        assert_eq!(state.status, LookupStatus::Empty);
        assert_eq!(state.items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_lookup_supersedes_slow_one() {
        let terminology = OfflineTerminology::new()
            .with_concepts("< 404684003", diagnoses())
            .with_delay("diab", Duration::from_secs(5));
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology.clone()),
            settings(),
            None,
        );

        channel.push(FieldInput::Text("diab".into())).unwrap();
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(10)).await;
        channel.push(FieldInput::Text("hyper".into())).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(terminology.call_count(), 2);
        let state = channel.snapshot();
        assert_eq!(state.sequence, 2);
        assert_eq!(
            state.items,
            vec![CodedValue::new("38341003", "Hypertensive disorder")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn boost_puts_preferred_first_without_duplicates() {
        let terminology = OfflineTerminology::new().with_concepts(
            "< 404684003",
            vec![
                CodedValue::new("38341003", "Hypertension"),
                CodedValue::new("48146000", "Diastolic hypertension"),
            ],
        );
        let preferred = PreferredDiagnoses::new(vec![
            CodedValue::new("38341003", "Hypertension"),
            CodedValue::new("34486009", "Hyperthyroidism"),
            CodedValue::new("195967001", "Asthma"),
        ])
        .unwrap();
        let (boost_tx, boost_rx) = watch::channel(true);
        let channel = AutocompleteChannel::spawn(
            AutocompleteField::Diagnosis,
            Arc::new(terminology),
            settings(),
            Some(BoostOverlay {
                preferred: Arc::new(preferred),
                enabled: boost_rx,
            }),
        );

        channel.push(FieldInput::Text("hyper".into())).unwrap();
        settle().await;

        let codes: Vec<String> = channel
            .snapshot()
            .items
            .into_iter()
            .map(|v| v.value)
            .collect();
        assert_eq!(codes, vec!["38341003", "34486009", "48146000"]);

        boost_tx.send(false).unwrap();
        channel.push(FieldInput::Text("hypert".into())).unwrap();
        settle().await;
        let codes: Vec<String> = channel
            .snapshot()
            .items
            .into_iter()
            .map(|v| v.value)
            .collect();
        assert_eq!(codes, vec!["38341003", "48146000"]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_rejects_input() {
        let mut channel = AutocompleteChannel::spawn(
            AutocompleteField::ReasonForEncounter,
            Arc::new(OfflineTerminology::new()),
            settings(),
            None,
        );

        channel.close().await;
        assert!(channel.is_closed());
        let err = channel
            .push(FieldInput::Text("pain".into()))
            .expect_err("closed");
        assert!(matches!(err, EncounterError::ChannelClosed("reason_for_encounter")));
    }
}
