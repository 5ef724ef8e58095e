//! Autocomplete configuration.

use crate::error::{AutocompleteError, AutocompleteResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Minimum number of characters before a lookup is issued.
pub const MIN_QUERY_LEN: usize = 2;

/// Delay between a blur and the teardown it schedules.
///
/// Must exceed the time a host needs to deliver a pointer click on a
/// candidate, since that click is what blurs the field in the first place.
pub const BLUR_TEARDOWN_DELAY: Duration = Duration::from_millis(200);

/// How many form controls focus jumps after a candidate is committed.
///
/// The control immediately after the bound field is assumed to be a paired
/// placeholder, so focus lands on the one after it.
pub const FOCUS_ADVANCE_STRIDE: usize = 2;

/// Extra parameters sent along with every candidate request.
#[derive(Clone, Default)]
pub enum RequestData {
    /// No extra parameters
    #[default]
    None,
    /// Fixed parameters
    Static(Map<String, Value>),
    /// Parameters recomputed right before each request
    Dynamic(Arc<dyn Fn() -> Map<String, Value> + Send + Sync>),
}

impl RequestData {
    /// Build dynamic request data from a closure.
    pub fn dynamic(f: impl Fn() -> Map<String, Value> + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    /// Evaluate the parameters for one request.
    pub fn resolve(&self) -> Map<String, Value> {
        match self {
            Self::None => Map::new(),
            Self::Static(map) => map.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for RequestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").finish(),
        }
    }
}

impl Serialize for RequestData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Closures have no serialized form
        match self {
            Self::Static(map) => map.serialize(serializer),
            Self::None | Self::Dynamic(_) => Map::new().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RequestData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        if map.is_empty() {
            Ok(Self::None)
        } else {
            Ok(Self::Static(map))
        }
    }
}

/// Width of the floating candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ListWidth {
    /// Fit the widest candidate
    #[default]
    Auto,
    /// Fixed number of cells
    Cells(u16),
    /// Percentage of the available area
    Percent(u16),
}

impl ListWidth {
    /// Resolve to a cell count given the content width and available width.
    pub fn resolve(&self, content: u16, available: u16) -> u16 {
        let width = match self {
            Self::Auto => content,
            Self::Cells(n) => *n,
            Self::Percent(p) => ((available as u32 * (*p).min(100) as u32) / 100) as u16,
        };
        width.min(available)
    }
}

impl FromStr for ListWidth {
    type Err = AutocompleteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if let Some(pct) = s.strip_suffix('%') {
            return pct
                .trim()
                .parse()
                .map(Self::Percent)
                .map_err(|_| AutocompleteError::Config(format!("invalid width: {s}")));
        }
        s.parse()
            .map(Self::Cells)
            .map_err(|_| AutocompleteError::Config(format!("invalid width: {s}")))
    }
}

impl TryFrom<String> for ListWidth {
    type Error = AutocompleteError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ListWidth> for String {
    fn from(width: ListWidth) -> Self {
        match width {
            ListWidth::Auto => "auto".to_string(),
            ListWidth::Cells(n) => n.to_string(),
            ListWidth::Percent(p) => format!("{p}%"),
        }
    }
}

/// Where and how the floating list is placed relative to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Stacking order among overlays
    pub z_index: i32,
    /// List width
    pub width: ListWidth,
    /// Gap between the field and the list
    pub offset: u16,
}

/// Autocomplete configuration for one bound field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteConfig {
    /// Fetch target. When absent the host's current location is used.
    #[serde(default)]
    pub url: Option<String>,
    /// Request parameter carrying the field value.
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Response property holding the candidate array.
    #[serde(default)]
    pub data_property: Option<String>,
    /// Record field holding display text. Absent means plain strings.
    #[serde(default)]
    pub object_data: Option<String>,
    /// Tab cycles through candidates instead of leaving the field.
    #[serde(default)]
    pub tab_cycle: bool,
    /// Stacking order of the list.
    #[serde(default = "default_z_index")]
    pub z_index: i32,
    /// List width.
    #[serde(default)]
    pub width: ListWidth,
    /// Gap between field and list.
    #[serde(default)]
    pub offset: u16,
    /// Extra request parameters.
    #[serde(default)]
    pub request_data: RequestData,
    /// Select the first candidate as soon as a list appears.
    #[serde(default)]
    pub auto_select_first: bool,
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_z_index() -> i32 {
    9999
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            url: None,
            query_param: default_query_param(),
            data_property: None,
            object_data: None,
            tab_cycle: false,
            z_index: default_z_index(),
            width: ListWidth::default(),
            offset: 0,
            request_data: RequestData::default(),
            auto_select_first: false,
        }
    }
}

impl AutocompleteConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> AutocompleteResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Set the fetch target.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the query parameter name.
    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    /// Set the response property to unwrap.
    pub fn data_property(mut self, name: impl Into<String>) -> Self {
        self.data_property = Some(name.into());
        self
    }

    /// Treat candidates as records and read display text from `field`.
    pub fn object_data(mut self, field: impl Into<String>) -> Self {
        self.object_data = Some(field.into());
        self
    }

    /// Set whether Tab cycles candidates.
    pub fn tab_cycle(mut self, enabled: bool) -> Self {
        self.tab_cycle = enabled;
        self
    }

    /// Set the list stacking order.
    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set the list width.
    pub fn width(mut self, width: ListWidth) -> Self {
        self.width = width;
        self
    }

    /// Set the gap between field and list.
    pub fn offset(mut self, offset: u16) -> Self {
        self.offset = offset;
        self
    }

    /// Set extra request parameters.
    pub fn request_data(mut self, data: RequestData) -> Self {
        self.request_data = data;
        self
    }

    /// Set whether the first candidate is preselected.
    pub fn auto_select_first(mut self, enabled: bool) -> Self {
        self.auto_select_first = enabled;
        self
    }

    /// Placement handed to the list view.
    pub fn placement(&self) -> Placement {
        Placement {
            z_index: self.z_index,
            width: self.width,
            offset: self.offset,
        }
    }
}
