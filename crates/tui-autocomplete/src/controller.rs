//! Interaction controller: the autocomplete state machine for one field.
//!
//! The controller consumes key, pointer, focus and blur notifications from
//! the host, looks candidates up in its cache or through the fetch gateway,
//! and drives the candidate list, the list view and the bound field.
//!
//! Work that completes later (fetch responses, the blur teardown timer) is
//! posted back to the controller as a [`Message`] and applied by
//! [`AutocompleteController::next_message`] or
//! [`AutocompleteController::process_pending`]. Fetches are never cancelled:
//! whichever response is applied last decides the list, even if it answers
//! an older query.
//!
//! Keys follow browser ordering. Tab and Enter act on key-down, before the
//! host's default action; every other key acts on key-up, after the host has
//! applied the edit to the field text. Hosts that only see key presses call
//! [`handle_key_down`](AutocompleteController::handle_key_down), apply the
//! edit unless suppressed, then call
//! [`handle_key_up`](AutocompleteController::handle_key_up).

use crate::binding::FieldBinding;
use crate::cache::CandidateCache;
use crate::candidate::{Candidate, CandidateSet};
use crate::config::{AutocompleteConfig, BLUR_TEARDOWN_DELAY, FOCUS_ADVANCE_STRIDE, MIN_QUERY_LEN};
use crate::error::AutocompleteResult;
use crate::fetch::{unwrap_payload, FetchGateway, Payload};
use crate::list::CandidateList;
use crate::view::CandidateListView;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Whether the host should carry out its default action for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Run the default action
    PassThrough,
    /// Default action suppressed
    Suppressed,
}

impl KeyDisposition {
    /// Check if the default action was suppressed.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

/// Deferred work delivered back to the controller.
#[derive(Debug)]
pub enum Message {
    /// A fetch issued for `query` finished.
    FetchResolved {
        query: String,
        result: AutocompleteResult<Value>,
    },
    /// The delay scheduled by a blur has passed.
    BlurElapsed,
}

/// Autocomplete controller bound to one field.
///
/// Each instance owns its cache and session; nothing is shared between
/// fields. Methods that issue fetches or schedule the blur teardown spawn
/// onto the current Tokio runtime and must be called from within one.
pub struct AutocompleteController<G, F, V> {
    config: AutocompleteConfig,
    gateway: G,
    field: F,
    view: V,
    cache: CandidateCache,
    list: CandidateList,
    /// Pointer clicks are honored once per opened list
    click_armed: bool,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl<G, F, V> AutocompleteController<G, F, V>
where
    G: FetchGateway,
    F: FieldBinding,
    V: CandidateListView,
{
    /// Bind a controller to `field`.
    pub fn new(config: AutocompleteConfig, gateway: G, field: F, view: V) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            gateway,
            field,
            view,
            cache: CandidateCache::new(),
            list: CandidateList::new(),
            click_armed: false,
            tx,
            rx,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &AutocompleteConfig {
        &self.config
    }

    /// Bound field.
    pub fn field(&self) -> &F {
        &self.field
    }

    /// Bound field, mutably.
    pub fn field_mut(&mut self) -> &mut F {
        &mut self.field
    }

    /// List view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// List view, mutably.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Candidate list model.
    pub fn list(&self) -> &CandidateList {
        &self.list
    }

    /// Query cache.
    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.list.is_active()
    }

    /// Currently selected candidate.
    pub fn selected(&self) -> Option<&Candidate> {
        self.list.selected()
    }

    /// Handle a key going down. Only Tab and Enter act here.
    pub fn handle_key_down(&mut self, key: KeyEvent) -> KeyDisposition {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                let backwards =
                    key.code == KeyCode::BackTab || key.modifiers.contains(KeyModifiers::SHIFT);
                self.on_tab(backwards)
            }
            KeyCode::Enter => self.on_enter(),
            _ => KeyDisposition::PassThrough,
        }
    }

    /// Handle a key coming up, after the host applied any text edit.
    pub fn handle_key_up(&mut self, key: KeyEvent) -> KeyDisposition {
        match key.code {
            // Handled on key-down
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Enter => KeyDisposition::PassThrough,
            KeyCode::Backspace | KeyCode::Delete => {
                self.teardown();
                KeyDisposition::PassThrough
            }
            KeyCode::Esc => {
                self.teardown();
                self.field.select_all();
                KeyDisposition::Suppressed
            }
            KeyCode::Right => {
                if let Some(index) = self.list.cursor() {
                    self.commit(index);
                }
                self.teardown();
                KeyDisposition::PassThrough
            }
            KeyCode::Up => {
                if let Some(index) = self.list.prev() {
                    self.view.highlight(Some(index));
                    self.commit(index);
                }
                KeyDisposition::PassThrough
            }
            KeyCode::Down => {
                if let Some(index) = self.list.next() {
                    self.view.highlight(Some(index));
                    self.commit(index);
                }
                KeyDisposition::PassThrough
            }
            _ => {
                self.lookup();
                KeyDisposition::PassThrough
            }
        }
    }

    /// Handle a pointer click on the rendered candidate at `index`.
    ///
    /// Commits the candidate and advances focus. The list itself goes away
    /// through the blur that moving focus causes. Returns whether the click
    /// was taken.
    pub fn handle_click(&mut self, index: usize) -> bool {
        if !self.click_armed || self.list.get(index).is_none() {
            return false;
        }
        self.click_armed = false;
        self.commit(index);
        self.field.advance_focus(FOCUS_ADVANCE_STRIDE);
        true
    }

    /// Handle the field gaining focus.
    pub fn handle_focus(&mut self) {
        debug!("field focused");
    }

    /// Handle the field losing focus.
    ///
    /// Teardown is deferred by [`BLUR_TEARDOWN_DELAY`] so a click on a
    /// candidate, which is what blurred the field, still finds it in place.
    pub fn handle_blur(&mut self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(BLUR_TEARDOWN_DELAY).await;
            let _ = tx.send(Message::BlurElapsed);
        });
    }

    /// Wait for the next deferred message and apply it.
    pub async fn next_message(&mut self) -> AutocompleteResult<()> {
        match self.rx.recv().await {
            Some(message) => self.apply(message),
            None => Ok(()),
        }
    }

    /// Apply every message that has already arrived.
    ///
    /// Stops at the first transport failure; later messages stay queued.
    pub fn process_pending(&mut self) -> AutocompleteResult<usize> {
        let mut processed = 0;
        while let Ok(message) = self.rx.try_recv() {
            processed += 1;
            self.apply(message)?;
        }
        Ok(processed)
    }

    /// Apply one deferred message.
    pub fn apply(&mut self, message: Message) -> AutocompleteResult<()> {
        match message {
            Message::FetchResolved { query, result } => match result {
                Ok(raw) => {
                    self.on_fetched(query, raw);
                    Ok(())
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "candidate fetch failed");
                    Err(e)
                }
            },
            Message::BlurElapsed => {
                debug!("blur delay elapsed");
                self.teardown();
                Ok(())
            }
        }
    }

    fn on_tab(&mut self, backwards: bool) -> KeyDisposition {
        if !self.list.is_active() {
            return KeyDisposition::PassThrough;
        }

        if self.config.tab_cycle {
            let moved = if backwards { self.list.prev() } else { self.list.next() };
            if let Some(index) = moved {
                self.view.highlight(Some(index));
                self.commit(index);
            }
            KeyDisposition::Suppressed
        } else {
            if let Some(index) = self.list.cursor() {
                self.commit(index);
            }
            KeyDisposition::PassThrough
        }
    }

    fn on_enter(&mut self) -> KeyDisposition {
        let target = match (self.list.total_count(), self.list.cursor()) {
            (0, _) => {
                self.teardown();
                return KeyDisposition::PassThrough;
            }
            // A lone candidate is taken whether or not it is selected
            (1, _) => 0,
            (_, None) => return KeyDisposition::Suppressed,
            (_, Some(index)) => index,
        };

        self.commit(target);
        self.field.advance_focus(FOCUS_ADVANCE_STRIDE);
        self.teardown();
        KeyDisposition::Suppressed
    }

    fn lookup(&mut self) {
        let query = self.field.read();
        // Length in UTF-16 units, so one astral character is enough
        if query.encode_utf16().count() < MIN_QUERY_LEN {
            return;
        }

        if let Some(set) = self.cache.get(&query).cloned() {
            debug!(query = %query, "candidate cache hit");
            self.show(set);
            return;
        }

        let extra = self.config.request_data.resolve();
        debug!(query = %query, "fetching candidates");
        let pending = self.gateway.fetch(&query, extra);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = pending.await;
            let _ = tx.send(Message::FetchResolved { query, result });
        });
    }

    fn on_fetched(&mut self, query: String, raw: Value) {
        match unwrap_payload(raw, self.config.data_property.as_deref()) {
            Payload::Empty => {
                debug!(query = %query, "no candidates");
                self.teardown();
            }
            Payload::Malformed(payload) => {
                warn!(query = %query, payload = %payload, "ignoring malformed candidate payload");
            }
            Payload::Candidates(records) => {
                if let Some(set) =
                    CandidateSet::from_records(records, self.config.object_data.as_deref())
                {
                    self.cache.put(query, set.clone());
                    self.show(set);
                }
            }
        }
    }

    fn show(&mut self, set: CandidateSet) {
        if !self.list.is_active() {
            debug!(count = set.len(), "candidate list opened");
            self.click_armed = true;
        }
        self.list.populate(set, self.config.auto_select_first);

        if let Some(candidates) = self.list.candidates() {
            self.view
                .render(candidates, self.list.cursor(), &self.config.placement());
        }
    }

    fn commit(&mut self, index: usize) {
        let Some(candidate) = self.list.get(index) else {
            return;
        };
        self.field.write(candidate.display());
        self.field.notify_changed(Some(candidate.record()));
    }

    fn teardown(&mut self) {
        if self.list.is_active() {
            debug!("candidate list closed");
            self.list.teardown();
            self.view.destroy();
        }
        self.click_armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BufferedField;
    use crate::config::{ListWidth, Placement, RequestData};
    use crate::error::AutocompleteError;
    use crate::fetch::FetchFuture;
    use crate::view::NullView;
    use serde_json::{json, Map};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Answers from a fixed table and records every request.
    #[derive(Default)]
    struct MapGateway {
        responses: HashMap<String, Value>,
        failures: Vec<String>,
        calls: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
    }

    impl MapGateway {
        fn with(mut self, query: &str, response: Value) -> Self {
            self.responses.insert(query.to_string(), response);
            self
        }

        fn failing(mut self, query: &str) -> Self {
            self.failures.push(query.to_string());
            self
        }
    }

    impl FetchGateway for MapGateway {
        fn fetch(&self, query: &str, extra: Map<String, Value>) -> FetchFuture {
            self.calls.lock().unwrap().push((query.to_string(), extra));
            if self.failures.iter().any(|q| q == query) {
                return Box::pin(async { Err(AutocompleteError::Http { status: 503 }) });
            }
            let response = self.responses.get(query).cloned().unwrap_or_else(|| json!([]));
            Box::pin(async move { Ok(response) })
        }
    }

    /// Leaves every request pending until the test resolves it.
    #[derive(Default)]
    struct ManualGateway {
        pending: Arc<Mutex<Vec<(String, oneshot::Sender<Value>)>>>,
    }

    impl ManualGateway {
        fn resolve(&self, query: &str, response: Value) {
            let mut pending = self.pending.lock().unwrap();
            let pos = pending.iter().position(|(q, _)| q == query).unwrap();
            let (_, tx) = pending.remove(pos);
            tx.send(response).unwrap();
        }
    }

    impl FetchGateway for ManualGateway {
        fn fetch(&self, query: &str, _extra: Map<String, Value>) -> FetchFuture {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push((query.to_string(), tx));
            Box::pin(async move {
                rx.await
                    .map_err(|_| AutocompleteError::Config("request dropped".to_string()))
            })
        }
    }

    struct FailingGateway;

    impl FetchGateway for FailingGateway {
        fn fetch(&self, _query: &str, _extra: Map<String, Value>) -> FetchFuture {
            Box::pin(async { Err(AutocompleteError::Http { status: 500 }) })
        }
    }

    /// Records what the controller asked it to show.
    #[derive(Debug, Default)]
    struct RecordingView {
        shown: Option<Vec<String>>,
        highlighted: Option<usize>,
        placement: Option<Placement>,
        renders: usize,
        destroys: usize,
    }

    impl CandidateListView for RecordingView {
        fn render(&mut self, candidates: &CandidateSet, selected: Option<usize>, placement: &Placement) {
            self.shown = Some(candidates.iter().map(|c| c.display().to_string()).collect());
            self.highlighted = selected;
            self.placement = Some(*placement);
            self.renders += 1;
        }

        fn highlight(&mut self, selected: Option<usize>) {
            self.highlighted = selected;
        }

        fn destroy(&mut self) {
            self.shown = None;
            self.highlighted = None;
            self.destroys += 1;
        }
    }

    type TestController<G> = AutocompleteController<G, BufferedField, RecordingView>;

    fn controller<G: FetchGateway>(config: AutocompleteConfig, gateway: G) -> TestController<G> {
        AutocompleteController::new(config, gateway, BufferedField::new(), RecordingView::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Simulate typing that leaves `value` in the field.
    fn type_value<G: FetchGateway>(ctrl: &mut TestController<G>, value: &str) {
        ctrl.field_mut().set_value(value);
        let last = value.chars().last().unwrap_or('x');
        ctrl.handle_key_up(key(KeyCode::Char(last)));
    }

    fn names() -> Value {
        json!([
            {"name": "John", "email": "j@x.com"},
            {"name": "Joan", "email": "jo@x.com"}
        ])
    }

    fn three() -> Value {
        json!(["Ann", "Anna", "Annie"])
    }

    async fn open<G: FetchGateway>(ctrl: &mut TestController<G>, value: &str) {
        type_value(ctrl, value);
        ctrl.next_message().await.unwrap();
        assert!(ctrl.is_active());
    }

    #[tokio::test]
    async fn test_short_query_issues_no_fetch() {
        let gateway = MapGateway::default().with("J", json!(["John"]));
        let calls = gateway.calls.clone();
        let mut ctrl = controller(AutocompleteConfig::default(), gateway);

        type_value(&mut ctrl, "J");
        tokio::task::yield_now().await;

        assert_eq!(ctrl.process_pending().unwrap(), 0);
        assert!(calls.lock().unwrap().is_empty());
        assert!(!ctrl.is_active());

        type_value(&mut ctrl, "");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_astral_character_meets_minimum_length() {
        let gateway = MapGateway::default().with("😀", json!(["😀 grinning"]));
        let calls = gateway.calls.clone();
        let mut ctrl = controller(AutocompleteConfig::default(), gateway);

        // One scalar value, two UTF-16 units
        open(&mut ctrl, "😀").await;

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(ctrl.list().candidates().unwrap().display_texts(), vec!["😀 grinning"]);

        ctrl.handle_key_up(key(KeyCode::Backspace));
        type_value(&mut ctrl, "é");
        tokio::task::yield_now().await;
        assert_eq!(ctrl.process_pending().unwrap(), 0);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_object_candidates_open_session() {
        let config = AutocompleteConfig::new().url("/names").object_data("name");
        let mut ctrl = controller(config, MapGateway::default().with("Jo", names()));

        open(&mut ctrl, "Jo").await;

        assert_eq!(ctrl.list().total_count(), 2);
        assert_eq!(ctrl.list().candidates().unwrap().display_texts(), vec!["John", "Joan"]);
        assert_eq!(ctrl.list().cursor(), None);
        assert_eq!(
            ctrl.view().shown,
            Some(vec!["John".to_string(), "Joan".to_string()])
        );
        assert_eq!(ctrl.field().value(), "Jo");
        assert!(ctrl.field().changes().is_empty());
    }

    #[tokio::test]
    async fn test_arrow_down_commits_full_record() {
        let config = AutocompleteConfig::new().url("/names").object_data("name");
        let mut ctrl = controller(config, MapGateway::default().with("Jo", names()));
        open(&mut ctrl, "Jo").await;

        let disposition = ctrl.handle_key_up(key(KeyCode::Down));

        assert_eq!(disposition, KeyDisposition::PassThrough);
        assert_eq!(ctrl.list().cursor(), Some(0));
        assert_eq!(ctrl.view().highlighted, Some(0));
        assert_eq!(ctrl.field().value(), "John");
        assert_eq!(
            ctrl.field().last_change().unwrap().payload,
            Some(json!({"name": "John", "email": "j@x.com"}))
        );
        assert!(ctrl.is_active());
    }

    #[tokio::test]
    async fn test_cached_query_skips_fetch() {
        let gateway = MapGateway::default().with("Jo", names());
        let calls = gateway.calls.clone();
        let mut ctrl = controller(AutocompleteConfig::new().object_data("name"), gateway);
        open(&mut ctrl, "Jo").await;
        let first = ctrl.list().candidates().unwrap().clone();

        ctrl.handle_key_up(key(KeyCode::Backspace));
        assert!(!ctrl.is_active());

        // Same value again: served synchronously from the cache
        type_value(&mut ctrl, "Jo");

        assert!(ctrl.is_active());
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(ctrl.list().candidates().unwrap().ptr_eq(&first));
        assert!(ctrl.cache().contains("Jo"));
    }

    #[tokio::test]
    async fn test_empty_result_tears_down() {
        let gateway = MapGateway::default()
            .with("Jo", names())
            .with("Jox", json!([]));
        let mut ctrl = controller(AutocompleteConfig::new().object_data("name"), gateway);

        // No session from an empty result
        type_value(&mut ctrl, "Zz");
        ctrl.next_message().await.unwrap();
        assert!(!ctrl.is_active());
        assert_eq!(ctrl.view().renders, 0);

        // Existing session is torn down
        open(&mut ctrl, "Jo").await;
        type_value(&mut ctrl, "Jox");
        ctrl.next_message().await.unwrap();

        assert!(!ctrl.is_active());
        assert_eq!(ctrl.view().shown, None);
        assert_eq!(ctrl.view().destroys, 1);
        assert_eq!(ctrl.field().value(), "Jox");
        assert!(ctrl.field().changes().is_empty());
        assert!(!ctrl.cache().contains("Jox"));
    }

    #[tokio::test]
    async fn test_shift_tab_cycles_backwards() {
        let config = AutocompleteConfig::new().tab_cycle(true);
        let mut ctrl = controller(config, MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Down));
        ctrl.handle_key_up(key(KeyCode::Down));
        assert_eq!(ctrl.list().cursor(), Some(1));

        let disposition = ctrl.handle_key_down(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));

        assert_eq!(disposition, KeyDisposition::Suppressed);
        assert_eq!(ctrl.list().cursor(), Some(0));
        assert_eq!(ctrl.field().value(), "Ann");
        assert!(ctrl.is_active());
    }

    #[tokio::test]
    async fn test_tab_cycles_forward() {
        let config = AutocompleteConfig::new().tab_cycle(true);
        let mut ctrl = controller(config, MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;

        assert!(ctrl.handle_key_down(key(KeyCode::Tab)).is_suppressed());
        assert_eq!(ctrl.field().value(), "Ann");
        assert!(ctrl.handle_key_down(key(KeyCode::Tab)).is_suppressed());
        assert_eq!(ctrl.field().value(), "Anna");
        assert!(ctrl.handle_key_down(key(KeyCode::Tab)).is_suppressed());
        assert_eq!(ctrl.field().value(), "Annie");

        // Last candidate: swallowed without moving or notifying
        let changes = ctrl.field().changes().len();
        assert!(ctrl.handle_key_down(key(KeyCode::Tab)).is_suppressed());
        assert_eq!(ctrl.list().cursor(), Some(2));
        assert_eq!(ctrl.view().highlighted, Some(2));
        assert_eq!(ctrl.field().value(), "Annie");
        assert_eq!(ctrl.field().changes().len(), changes);
        assert!(ctrl.is_active());

        ctrl.handle_key_down(key(KeyCode::BackTab));
        assert_eq!(ctrl.field().value(), "Anna");

        // Shift held on a plain Tab also goes backwards
        ctrl.handle_key_down(KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT));
        assert_eq!(ctrl.field().value(), "Ann");
    }

    #[tokio::test]
    async fn test_tab_without_cycling_commits_and_passes_through() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));

        // No session: plain field navigation
        assert_eq!(ctrl.handle_key_down(key(KeyCode::Tab)), KeyDisposition::PassThrough);

        open(&mut ctrl, "An").await;
        assert_eq!(ctrl.handle_key_down(key(KeyCode::Tab)), KeyDisposition::PassThrough);
        assert!(ctrl.field().changes().is_empty());

        ctrl.handle_key_up(key(KeyCode::Down));
        let changes = ctrl.field().changes().len();
        assert_eq!(ctrl.handle_key_down(key(KeyCode::Tab)), KeyDisposition::PassThrough);

        assert_eq!(ctrl.field().changes().len(), changes + 1);
        assert_eq!(ctrl.field().value(), "Ann");
        assert!(ctrl.is_active());
    }

    #[tokio::test]
    async fn test_enter_with_single_candidate() {
        let mut ctrl = controller(
            AutocompleteConfig::new().object_data("name"),
            MapGateway::default().with("Jo", json!([{"name": "John", "email": "j@x.com"}])),
        );
        open(&mut ctrl, "Jo").await;
        assert_eq!(ctrl.list().cursor(), None);

        let disposition = ctrl.handle_key_down(key(KeyCode::Enter));

        assert!(disposition.is_suppressed());
        assert_eq!(ctrl.field().value(), "John");
        assert_eq!(
            ctrl.field().last_change().unwrap().payload,
            Some(json!({"name": "John", "email": "j@x.com"}))
        );
        assert_eq!(ctrl.field().focus_moves(), &[FOCUS_ADVANCE_STRIDE]);
        assert!(!ctrl.is_active());
        assert_eq!(ctrl.view().destroys, 1);
    }

    #[tokio::test]
    async fn test_enter_with_single_selected_candidate() {
        let config = AutocompleteConfig::new()
            .object_data("name")
            .auto_select_first(true);
        let mut ctrl = controller(
            config,
            MapGateway::default().with("Jo", json!([{"name": "John", "email": "j@x.com"}])),
        );
        open(&mut ctrl, "Jo").await;
        assert_eq!(ctrl.list().cursor(), Some(0));

        assert!(ctrl.handle_key_down(key(KeyCode::Enter)).is_suppressed());

        assert_eq!(ctrl.field().value(), "John");
        assert_eq!(ctrl.field().changes().len(), 1);
        assert_eq!(
            ctrl.field().last_change().unwrap().payload,
            Some(json!({"name": "John", "email": "j@x.com"}))
        );
        assert_eq!(ctrl.field().focus_moves(), &[FOCUS_ADVANCE_STRIDE]);
        assert!(!ctrl.is_active());
    }

    #[tokio::test]
    async fn test_enter_with_several_candidates() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;

        // Nothing selected: swallowed, session kept
        assert!(ctrl.handle_key_down(key(KeyCode::Enter)).is_suppressed());
        assert!(ctrl.is_active());
        assert!(ctrl.field().changes().is_empty());
        assert!(ctrl.field().focus_moves().is_empty());

        ctrl.handle_key_up(key(KeyCode::Down));
        ctrl.handle_key_up(key(KeyCode::Down));
        assert!(ctrl.handle_key_down(key(KeyCode::Enter)).is_suppressed());

        assert_eq!(ctrl.field().value(), "Anna");
        assert_eq!(ctrl.field().focus_moves(), &[2]);
        assert!(!ctrl.is_active());
    }

    #[tokio::test]
    async fn test_enter_without_session_passes_through() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default());
        assert_eq!(ctrl.handle_key_down(key(KeyCode::Enter)), KeyDisposition::PassThrough);
        assert!(ctrl.field().focus_moves().is_empty());
    }

    #[tokio::test]
    async fn test_escape_tears_down_and_selects_text() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));

        // Even without a session
        assert!(ctrl.handle_key_up(key(KeyCode::Esc)).is_suppressed());
        assert!(ctrl.field().is_all_selected());

        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Down));
        assert!(ctrl.handle_key_up(key(KeyCode::Esc)).is_suppressed());

        assert!(!ctrl.is_active());
        assert!(ctrl.field().is_all_selected());
        assert_eq!(ctrl.view().shown, None);
    }

    #[tokio::test]
    async fn test_backspace_and_delete_tear_down() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));

        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Backspace));
        assert!(!ctrl.is_active());

        type_value(&mut ctrl, "An");
        assert!(ctrl.is_active());
        ctrl.handle_key_up(key(KeyCode::Delete));
        assert!(!ctrl.is_active());
    }

    #[tokio::test]
    async fn test_arrow_right_commits_selection() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));

        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Right));
        assert!(!ctrl.is_active());
        assert!(ctrl.field().changes().is_empty());
        assert_eq!(ctrl.field().value(), "An");

        type_value(&mut ctrl, "An");
        ctrl.handle_key_up(key(KeyCode::Up));
        let changes = ctrl.field().changes().len();
        ctrl.handle_key_up(key(KeyCode::Right));

        assert!(!ctrl.is_active());
        assert_eq!(ctrl.field().changes().len(), changes + 1);
        assert_eq!(ctrl.field().value(), "Annie");
    }

    #[tokio::test]
    async fn test_arrow_navigation_bounds() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));

        // Idle arrows do nothing
        ctrl.handle_key_up(key(KeyCode::Down));
        ctrl.handle_key_up(key(KeyCode::Up));
        assert!(ctrl.field().changes().is_empty());

        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Up));
        assert_eq!(ctrl.list().cursor(), Some(2));
        assert_eq!(ctrl.field().value(), "Annie");

        // Already at the last candidate: no successor, nothing written
        let changes = ctrl.field().changes().len();
        ctrl.handle_key_up(key(KeyCode::Down));
        assert_eq!(ctrl.list().cursor(), Some(2));
        assert_eq!(ctrl.field().changes().len(), changes);

        ctrl.handle_key_up(key(KeyCode::Up));
        ctrl.handle_key_up(key(KeyCode::Up));
        ctrl.handle_key_up(key(KeyCode::Up));
        assert_eq!(ctrl.list().cursor(), Some(0));
        assert_eq!(ctrl.field().value(), "Ann");
    }

    #[tokio::test]
    async fn test_click_commits_once() {
        let mut ctrl = controller(
            AutocompleteConfig::new().object_data("name"),
            MapGateway::default().with("Jo", names()),
        );
        assert!(!ctrl.handle_click(0));

        open(&mut ctrl, "Jo").await;
        assert!(!ctrl.handle_click(5));
        assert!(ctrl.handle_click(1));

        assert_eq!(ctrl.field().value(), "Joan");
        assert_eq!(
            ctrl.field().last_change().unwrap().payload,
            Some(json!({"name": "Joan", "email": "jo@x.com"}))
        );
        assert_eq!(ctrl.field().focus_moves(), &[FOCUS_ADVANCE_STRIDE]);
        // Removal is left to the blur
        assert!(ctrl.is_active());

        // Handler is spent until a new list opens
        assert!(!ctrl.handle_click(0));
        type_value(&mut ctrl, "Jo");
        assert!(!ctrl.handle_click(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_tears_down_after_delay() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;

        ctrl.handle_blur();
        let early = tokio::time::timeout(Duration::from_millis(150), ctrl.next_message()).await;
        assert!(early.is_err());
        assert!(ctrl.is_active());

        ctrl.next_message().await.unwrap();
        assert!(!ctrl.is_active());
        assert_eq!(ctrl.view().destroys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_inside_blur_window_survives_teardown() {
        let mut ctrl = controller(
            AutocompleteConfig::new().object_data("name"),
            MapGateway::default().with("Jo", names()),
        );
        open(&mut ctrl, "Jo").await;

        // Clicking blurs the field before the click itself is delivered
        ctrl.handle_blur();
        assert!(ctrl.handle_click(0));
        ctrl.next_message().await.unwrap();

        assert!(!ctrl.is_active());
        assert_eq!(ctrl.field().value(), "John");
        assert_eq!(ctrl.field().changes().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_response_wins_when_applied_last() {
        let gateway = ManualGateway::default();
        let pending = gateway.pending.clone();
        let mut ctrl = controller(AutocompleteConfig::default(), gateway);

        type_value(&mut ctrl, "Jo");
        type_value(&mut ctrl, "Joh");
        tokio::task::yield_now().await;
        assert_eq!(pending.lock().unwrap().len(), 2);

        let resolver = ManualGateway {
            pending: pending.clone(),
        };

        // Newer query answers first
        resolver.resolve("Joh", json!(["John"]));
        ctrl.next_message().await.unwrap();
        assert_eq!(ctrl.list().candidates().unwrap().display_texts(), vec!["John"]);

        // The older answer arrives afterwards and replaces the list
        resolver.resolve("Jo", json!(["John", "Joan", "Jody"]));
        ctrl.next_message().await.unwrap();

        assert_eq!(ctrl.field().value(), "Joh");
        assert_eq!(ctrl.list().total_count(), 3);
        assert!(ctrl.cache().contains("Jo"));
        assert!(ctrl.cache().contains("Joh"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let mut ctrl = controller(AutocompleteConfig::default(), FailingGateway);

        type_value(&mut ctrl, "Jo");
        let result = ctrl.next_message().await;

        assert!(matches!(result, Err(AutocompleteError::Http { status: 500 })));
        assert!(!ctrl.is_active());
        assert!(ctrl.cache().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_open_session() {
        let gateway = MapGateway::default().with("An", three()).failing("Anx");
        let mut ctrl = controller(AutocompleteConfig::default(), gateway);
        open(&mut ctrl, "An").await;
        ctrl.handle_key_up(key(KeyCode::Down));
        let renders = ctrl.view().renders;
        let changes = ctrl.field().changes().len();

        type_value(&mut ctrl, "Anx");
        let result = ctrl.next_message().await;

        assert!(matches!(result, Err(AutocompleteError::Http { status: 503 })));
        assert!(ctrl.is_active());
        assert_eq!(ctrl.list().total_count(), 3);
        assert_eq!(ctrl.list().cursor(), Some(0));
        assert_eq!(ctrl.view().renders, renders);
        assert_eq!(ctrl.view().destroys, 0);
        assert_eq!(ctrl.field().changes().len(), changes);
        assert!(!ctrl.cache().contains("Anx"));
    }

    #[tokio::test]
    async fn test_process_pending_stops_at_failure() {
        let mut ctrl = controller(AutocompleteConfig::default(), MapGateway::default());
        ctrl.tx
            .send(Message::FetchResolved {
                query: "Jo".to_string(),
                result: Err(AutocompleteError::Http { status: 502 }),
            })
            .unwrap();
        ctrl.tx
            .send(Message::FetchResolved {
                query: "An".to_string(),
                result: Ok(three()),
            })
            .unwrap();

        let result = ctrl.process_pending();
        assert!(matches!(result, Err(AutocompleteError::Http { status: 502 })));
        assert!(!ctrl.is_active());

        // The second answer is still queued
        assert_eq!(ctrl.process_pending().unwrap(), 1);
        assert!(ctrl.is_active());
        assert_eq!(ctrl.list().total_count(), 3);
        assert_eq!(ctrl.process_pending().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_request_data_evaluated_per_request() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();
        let config = AutocompleteConfig::new().request_data(RequestData::dynamic(move || {
            let mut map = Map::new();
            map.insert("nonce".into(), json!(c.fetch_add(1, Ordering::SeqCst)));
            map
        }));
        let gateway = MapGateway::default().with("Jo", names()).with("Joa", names());
        let calls = gateway.calls.clone();
        let mut ctrl = controller(config, gateway);

        type_value(&mut ctrl, "Jo");
        ctrl.next_message().await.unwrap();
        type_value(&mut ctrl, "Joa");
        ctrl.next_message().await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1.get("nonce"), Some(&json!(0)));
        assert_eq!(calls[1].1.get("nonce"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_data_property_unwrapped() {
        let config = AutocompleteConfig::new().data_property("items");
        let gateway = MapGateway::default().with("An", json!({"items": ["Ann", "Anna"], "total": 2}));
        let mut ctrl = controller(config, gateway);

        open(&mut ctrl, "An").await;
        assert_eq!(ctrl.list().candidates().unwrap().display_texts(), vec!["Ann", "Anna"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_leaves_session() {
        let gateway = MapGateway::default()
            .with("An", three())
            .with("Ann", json!({"error": "busy"}));
        let mut ctrl = controller(AutocompleteConfig::default(), gateway);
        open(&mut ctrl, "An").await;

        type_value(&mut ctrl, "Ann");
        ctrl.next_message().await.unwrap();

        assert!(ctrl.is_active());
        assert_eq!(ctrl.list().total_count(), 3);
        assert!(!ctrl.cache().contains("Ann"));
    }

    #[tokio::test]
    async fn test_auto_select_first() {
        let config = AutocompleteConfig::new().auto_select_first(true);
        let mut ctrl = controller(config, MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;

        assert_eq!(ctrl.list().cursor(), Some(0));
        assert_eq!(ctrl.view().highlighted, Some(0));

        ctrl.handle_key_up(key(KeyCode::Down));
        assert_eq!(ctrl.field().value(), "Anna");
    }

    #[tokio::test]
    async fn test_view_receives_placement() {
        let config = AutocompleteConfig::new().z_index(10).width(ListWidth::Cells(24)).offset(1);
        let mut ctrl = controller(config, MapGateway::default().with("An", three()));
        open(&mut ctrl, "An").await;

        assert_eq!(
            ctrl.view().placement,
            Some(Placement {
                z_index: 10,
                width: ListWidth::Cells(24),
                offset: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_instances_do_not_share_cache() {
        let mut first = controller(AutocompleteConfig::default(), MapGateway::default().with("An", three()));
        let second_gateway = MapGateway::default().with("An", three());
        let second_calls = second_gateway.calls.clone();
        let mut second = controller(AutocompleteConfig::default(), second_gateway);

        open(&mut first, "An").await;
        open(&mut second, "An").await;

        assert_eq!(second_calls.lock().unwrap().len(), 1);
        assert!(first.cache().contains("An"));
        assert!(second.cache().contains("An"));
    }

    #[tokio::test]
    async fn test_headless_controller() {
        let mut ctrl = AutocompleteController::new(
            AutocompleteConfig::default(),
            MapGateway::default().with("An", three()),
            BufferedField::with_value("An"),
            NullView,
        );

        ctrl.handle_key_up(key(KeyCode::Char('n')));
        ctrl.next_message().await.unwrap();
        ctrl.handle_key_up(key(KeyCode::Down));

        assert_eq!(ctrl.list().total_count(), 3);
        assert_eq!(ctrl.selected().map(Candidate::display), Some("Ann"));
        assert_eq!(ctrl.field().value(), "Ann");
    }
}
