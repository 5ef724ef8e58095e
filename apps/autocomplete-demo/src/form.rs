//! Contact form model and the name field binding.

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;
use tui_autocomplete::FieldBinding;

pub const NAME: usize = 0;
pub const CONTACT_ID: usize = 1;
pub const EMAIL: usize = 2;

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    /// Not focusable from the keyboard
    pub hidden: bool,
    /// Text is highlighted; the next typed character replaces it
    pub all_selected: bool,
}

impl FormField {
    fn new(label: &'static str, hidden: bool) -> Self {
        Self {
            label,
            value: String::new(),
            hidden,
            all_selected: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormModel {
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl Default for FormModel {
    fn default() -> Self {
        Self {
            fields: vec![
                FormField::new("Name", false),
                FormField::new("Contact ID", true),
                FormField::new("Email", false),
                FormField::new("Notes", false),
            ],
            focus: NAME,
        }
    }
}

impl FormModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&mut self) -> &mut FormField {
        &mut self.fields[self.focus]
    }

    pub fn focus(&mut self, index: usize) {
        if index < self.fields.len() {
            self.focus = index;
        }
    }

    pub fn focus_next(&mut self) {
        let len = self.fields.len();
        let mut idx = self.focus;
        for _ in 0..len {
            idx = (idx + 1) % len;
            if !self.fields[idx].hidden {
                self.focus = idx;
                return;
            }
        }
    }

    pub fn focus_previous(&mut self) {
        let len = self.fields.len();
        let mut idx = self.focus;
        for _ in 0..len {
            idx = (idx + len - 1) % len;
            if !self.fields[idx].hidden {
                self.focus = idx;
                return;
            }
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let field = self.focused();
        if field.all_selected {
            field.value.clear();
            field.all_selected = false;
        }
        field.value.push(c);
    }

    pub fn delete_back(&mut self) {
        let field = self.focused();
        if field.all_selected {
            field.value.clear();
            field.all_selected = false;
        } else {
            field.value.pop();
        }
    }

    /// React to a change on the name field, filling the paired fields from
    /// a committed contact record.
    pub fn name_changed(&mut self, payload: Option<&Value>) {
        let Some(record) = payload else {
            return;
        };
        if let Some(email) = record.get("email").and_then(Value::as_str) {
            self.fields[EMAIL].value = email.to_string();
        }
        if let Some(id) = record.get("id") {
            self.fields[CONTACT_ID].value = match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
        info!(name = %self.fields[NAME].value, "contact selected");
    }
}

/// Binds the autocomplete controller to one field of a shared form.
pub struct FormFieldBinding {
    form: Rc<RefCell<FormModel>>,
    index: usize,
}

impl FormFieldBinding {
    pub fn new(form: Rc<RefCell<FormModel>>, index: usize) -> Self {
        Self { form, index }
    }
}

impl FieldBinding for FormFieldBinding {
    fn read(&self) -> String {
        self.form.borrow().fields[self.index].value.clone()
    }

    fn write(&mut self, text: &str) {
        let mut form = self.form.borrow_mut();
        let field = &mut form.fields[self.index];
        field.value = text.to_string();
        field.all_selected = false;
    }

    fn notify_changed(&mut self, payload: Option<&Value>) {
        if self.index == NAME {
            self.form.borrow_mut().name_changed(payload);
        }
    }

    fn select_all(&mut self) {
        self.form.borrow_mut().fields[self.index].all_selected = true;
    }

    fn advance_focus(&mut self, stride: usize) {
        let mut form = self.form.borrow_mut();
        let target = (self.index + stride).min(form.fields.len() - 1);
        form.focus(target);
    }
}
