//! Render contract between the controller and whatever draws the list.

use crate::candidate::CandidateSet;
use crate::config::Placement;

/// Floating candidate list as seen by the controller.
///
/// Implementations own all presentation concerns. The controller calls
/// `render` whenever a set becomes active or is replaced, `highlight` when
/// only the selection moves, and `destroy` when the session ends.
pub trait CandidateListView {
    /// Show `candidates`, replacing anything previously shown.
    fn render(&mut self, candidates: &CandidateSet, selected: Option<usize>, placement: &Placement);

    /// Mark `selected` as the single highlighted candidate.
    fn highlight(&mut self, selected: Option<usize>);

    /// Hide and discard the list.
    fn destroy(&mut self);
}

/// View that draws nothing, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl CandidateListView for NullView {
    fn render(&mut self, _candidates: &CandidateSet, _selected: Option<usize>, _placement: &Placement) {}

    fn highlight(&mut self, _selected: Option<usize>) {}

    fn destroy(&mut self) {}
}
