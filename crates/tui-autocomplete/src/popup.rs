//! CandidatePopup widget - floating candidate list drawn below a field.
//!
//! # Example
//!
//! ```ignore
//! use tui_autocomplete::{CandidatePopup, PopupState};
//!
//! // `controller` owns a `PopupState` as its view
//! let popup = CandidatePopup::new(name_field_area).max_rows(6);
//! frame.render_stateful_widget(popup, frame.area(), controller.view_mut());
//! ```

use crate::candidate::CandidateSet;
use crate::config::Placement;
use crate::view::CandidateListView;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, StatefulWidget, Widget};
use unicode_width::UnicodeWidthStr;

/// State for CandidatePopup, driven by the controller.
#[derive(Debug, Clone, Default)]
pub struct PopupState {
    /// Display texts of the active candidates
    items: Vec<String>,
    /// Highlighted candidate
    selected: Option<usize>,
    /// Present while the list is shown
    placement: Option<Placement>,
    /// First visible candidate
    scroll: usize,
    /// Candidate rows as last drawn
    rows: Option<Rect>,
}

impl PopupState {
    /// Create a hidden popup state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the list is shown.
    pub fn is_visible(&self) -> bool {
        self.placement.is_some()
    }

    /// Display texts currently shown.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Highlighted candidate.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Stacking order requested for the list, while shown.
    pub fn z_index(&self) -> Option<i32> {
        self.placement.map(|p| p.z_index)
    }

    /// Candidate under a terminal cell, based on the last draw.
    pub fn candidate_at(&self, column: u16, row: u16) -> Option<usize> {
        let rows = self.rows?;
        if column < rows.x || column >= rows.right() || row < rows.y || row >= rows.bottom() {
            return None;
        }
        let index = self.scroll + (row - rows.y) as usize;
        (index < self.items.len()).then_some(index)
    }

    fn scroll_to_selected(&mut self, visible: usize) {
        if let Some(selected) = self.selected {
            if selected < self.scroll {
                self.scroll = selected;
            } else if selected >= self.scroll + visible {
                self.scroll = selected + 1 - visible;
            }
        }
        self.scroll = self.scroll.min(self.items.len().saturating_sub(visible));
    }
}

impl CandidateListView for PopupState {
    fn render(&mut self, candidates: &CandidateSet, selected: Option<usize>, placement: &Placement) {
        self.items = candidates.iter().map(|c| c.display().to_string()).collect();
        self.selected = selected;
        self.placement = Some(*placement);
        self.scroll = 0;
    }

    fn highlight(&mut self, selected: Option<usize>) {
        self.selected = selected;
    }

    fn destroy(&mut self) {
        *self = Self::default();
    }
}

/// Floating list of candidates anchored below an input field.
pub struct CandidatePopup {
    /// Area occupied by the bound field
    anchor: Rect,
    /// Maximum visible candidates
    max_rows: usize,
    /// Block wrapper
    block: Option<Block<'static>>,
    /// Style of the highlighted candidate
    highlight_style: Style,
}

impl CandidatePopup {
    /// Create a popup anchored below `anchor`.
    pub fn new(anchor: Rect) -> Self {
        Self {
            anchor,
            max_rows: 8,
            block: None,
            highlight_style: Style::default().bg(Color::Blue).fg(Color::White),
        }
    }

    /// Set maximum visible candidates.
    pub fn max_rows(mut self, max: usize) -> Self {
        self.max_rows = max.max(1);
        self
    }

    /// Set the block wrapper.
    pub fn block(mut self, block: Block<'static>) -> Self {
        self.block = Some(block);
        self
    }

    /// Set the highlight style.
    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }
}

impl StatefulWidget for CandidatePopup {
    type State = PopupState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.rows = None;
        let Some(placement) = state.placement else {
            return;
        };
        if state.items.is_empty() {
            return;
        }

        // Widest candidate plus borders
        let widest = state.items.iter().map(|s| s.width()).max().unwrap_or(0);
        let content = u16::try_from(widest).unwrap_or(u16::MAX).saturating_add(2);
        let available = area.right().saturating_sub(self.anchor.x);
        let width = placement.width.resolve(content, available);

        let y = self.anchor.bottom().saturating_add(placement.offset);
        if y >= area.bottom() {
            return;
        }
        let rows = u16::try_from(state.items.len().min(self.max_rows)).unwrap_or(u16::MAX);
        let height = rows.saturating_add(2).min(area.bottom() - y);
        if width < 3 || height < 3 {
            return;
        }

        let popup_area = Rect::new(self.anchor.x, y, width, height);
        Clear.render(popup_area, buf);

        let block = self
            .block
            .unwrap_or_else(|| Block::default().borders(Borders::ALL));
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let visible = inner.height as usize;
        state.scroll_to_selected(visible);

        for (row, (index, item)) in state
            .items
            .iter()
            .enumerate()
            .skip(state.scroll)
            .take(visible)
            .enumerate()
        {
            let line_y = inner.y + row as u16;
            let style = if state.selected == Some(index) {
                self.highlight_style
            } else {
                Style::default()
            };

            for col_x in inner.x..inner.right() {
                buf[(col_x, line_y)].set_style(style);
            }
            buf.set_stringn(inner.x, line_y, item, inner.width as usize, style);
        }

        state.rows = Some(inner);
    }
}
