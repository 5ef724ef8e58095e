//! Field binding: the controller's view of the input field it serves.

use serde_json::Value;

/// Operations the controller needs from the bound field and its form.
pub trait FieldBinding {
    /// Current text of the field.
    fn read(&self) -> String;

    /// Replace the field text.
    fn write(&mut self, text: &str);

    /// Raise the field's "changed" notification.
    ///
    /// `payload` carries the committed candidate's full record. Listeners
    /// must also accept `None`, which hosts raise for ordinary edits.
    fn notify_changed(&mut self, payload: Option<&Value>);

    /// Highlight all of the field's text.
    fn select_all(&mut self);

    /// Move keyboard focus `stride` controls forward within the form.
    fn advance_focus(&mut self, stride: usize);
}

/// A recorded change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Field text at notification time
    pub value: String,
    /// Attached candidate record
    pub payload: Option<Value>,
}

/// In-memory field that records everything done to it.
#[derive(Debug, Clone, Default)]
pub struct BufferedField {
    value: String,
    changes: Vec<FieldChange>,
    all_selected: bool,
    focus_moves: Vec<usize>,
}

impl BufferedField {
    /// Create an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a field holding `value`.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Simulate the user editing the text.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.all_selected = false;
    }

    /// Current text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Change notifications in the order raised.
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    /// Most recent change notification.
    pub fn last_change(&self) -> Option<&FieldChange> {
        self.changes.last()
    }

    /// Whether the text is currently highlighted.
    pub fn is_all_selected(&self) -> bool {
        self.all_selected
    }

    /// Focus moves requested, as strides.
    pub fn focus_moves(&self) -> &[usize] {
        &self.focus_moves
    }
}

impl FieldBinding for BufferedField {
    fn read(&self) -> String {
        self.value.clone()
    }

    fn write(&mut self, text: &str) {
        self.set_value(text);
    }

    fn notify_changed(&mut self, payload: Option<&Value>) {
        self.changes.push(FieldChange {
            value: self.value.clone(),
            payload: payload.cloned(),
        });
    }

    fn select_all(&mut self) {
        self.all_selected = true;
    }

    fn advance_focus(&mut self, stride: usize) {
        self.focus_moves.push(stride);
    }
}
