//! Application state and input routing.

use crate::config::Config;
use crate::form::{FormFieldBinding, FormModel, EMAIL, NAME};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::cell::RefCell;
use std::rc::Rc;
use tui_autocomplete::{AutocompleteController, HttpFetchGateway, PopupState};

pub type NameController = AutocompleteController<HttpFetchGateway, FormFieldBinding, PopupState>;

pub struct App {
    pub form: Rc<RefCell<FormModel>>,
    pub controller: NameController,
    pub status: Option<String>,
    pub max_rows: usize,
    /// Screen areas of the visible fields, refreshed on every draw
    pub field_areas: Vec<(usize, Rect)>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let form = Rc::new(RefCell::new(FormModel::new()));
        let gateway = HttpFetchGateway::new(&config.autocomplete, &config.location)?;
        let binding = FormFieldBinding::new(form.clone(), NAME);
        let controller = AutocompleteController::new(
            config.autocomplete.clone(),
            gateway,
            binding,
            PopupState::new(),
        );

        Ok(Self {
            form,
            controller,
            status: None,
            max_rows: config.display.max_rows,
            field_areas: Vec::new(),
        })
    }

    fn focus(&self) -> usize {
        self.form.borrow().focus
    }

    /// Apply finished lookups and expired blur timers.
    pub fn tick(&mut self) {
        if let Err(e) = self.controller.process_pending() {
            self.status = Some(format!("Lookup failed: {e}"));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let was_on_name = self.focus() == NAME;

        if was_on_name {
            let disposition = self.controller.handle_key_down(key);
            if !disposition.is_suppressed() {
                self.apply_default(key);
            }
            // Key-up goes to whichever field holds focus afterwards
            if self.focus() == NAME {
                self.controller.handle_key_up(key);
            }
        } else {
            self.apply_default(key);
        }

        self.sync_focus(was_on_name);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let was_on_name = self.focus() == NAME;

        if let Some(index) = self.controller.view().candidate_at(mouse.column, mouse.row) {
            self.controller.handle_click(index);
        } else if let Some(&(field, _)) = self
            .field_areas
            .iter()
            .find(|(_, area)| contains(area, mouse.column, mouse.row))
        {
            self.form.borrow_mut().focus(field);
        }

        self.sync_focus(was_on_name);
    }

    fn apply_default(&mut self, key: KeyEvent) {
        let mut form = self.form.borrow_mut();
        match key.code {
            KeyCode::Char(c) => form.insert_char(c),
            KeyCode::Backspace | KeyCode::Delete => form.delete_back(),
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_previous(),
            KeyCode::Enter => {
                self.status = Some(format!(
                    "Submitted {} <{}>",
                    form.fields[NAME].value, form.fields[EMAIL].value
                ));
            }
            _ => {}
        }
    }

    fn sync_focus(&mut self, was_on_name: bool) {
        let on_name = self.focus() == NAME;
        if was_on_name && !on_name {
            self.controller.handle_blur();
        } else if !was_on_name && on_name {
            self.controller.handle_focus();
        }
    }
}

fn contains(area: &Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}
