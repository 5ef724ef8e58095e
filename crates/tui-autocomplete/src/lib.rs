//! # tui-autocomplete
//!
//! Server-backed autocomplete for TUI Suite input fields.
//!
//! As the user types, the controller asks a remote source for candidate
//! completions, shows them in a floating list, and lets the user pick one
//! with the keyboard or the mouse. The chosen candidate's text is written
//! back into the field and a change notification carrying the candidate's
//! full record is raised.
//!
//! ## Components
//!
//! - [`AutocompleteController`] - per-field state machine
//! - [`CandidateList`] - active candidates and selection cursor
//! - [`CandidateCache`] - per-field memo of query results
//! - [`FetchGateway`] / [`HttpFetchGateway`] - candidate source
//! - [`FieldBinding`] - access to the bound field
//! - [`CandidateListView`] / [`CandidatePopup`] - floating list rendering
//!
//! ## Architecture
//!
//! The controller never blocks. Fetches and the blur teardown timer run on
//! the Tokio runtime and report back as messages that the host applies from
//! its event loop. Matching is left entirely to the server.

mod binding;
mod cache;
mod candidate;
mod config;
mod controller;
mod error;
mod fetch;
mod list;
mod popup;
mod view;

pub use binding::{BufferedField, FieldBinding, FieldChange};
pub use cache::CandidateCache;
pub use candidate::{Candidate, CandidateSet};
pub use config::{
    AutocompleteConfig, ListWidth, Placement, RequestData, BLUR_TEARDOWN_DELAY,
    FOCUS_ADVANCE_STRIDE, MIN_QUERY_LEN,
};
pub use controller::{AutocompleteController, KeyDisposition, Message};
pub use error::{AutocompleteError, AutocompleteResult};
pub use fetch::{build_query, unwrap_payload, FetchFuture, FetchGateway, HttpFetchGateway, Payload};
pub use list::CandidateList;
pub use popup::{CandidatePopup, PopupState};
pub use view::{CandidateListView, NullView};
