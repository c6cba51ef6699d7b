//! Visibility and listing-mode policy.
//!
//! | mode | Native | Discoverable |
//! |---|---|---|
//! | `Default` | listed | hidden, searchable |
//! | `ShowAll` | listed | listed |
//!
//! Every tool stays callable by exact name in both modes.

pub mod listing;
pub mod meta;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use listing::{compose_listing, search_pool, ListingSources};
pub use meta::{ExecuteRequest, SearchRequest, EXECUTE_TOOL, TOOL_SEARCH};

/// Header carrying the show-all flag.
pub const SHOW_ALL_HEADER: &str = "x-mcp-show-all";
/// Query parameter carrying the show-all flag.
pub const SHOW_ALL_QUERY_PARAM: &str = "show_all";

/// Per-call listing mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ListingMode {
    /// Native tools listed; Discoverable tools reachable through the meta-tools.
    #[default]
    Default,
    /// Everything listed; no meta-tools.
    ShowAll,
}

impl ListingMode {
    /// Interpret a header or query-parameter value.
    ///
    /// Unrecognized values mean `Default`.
    pub fn from_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "all" | "show_all" => Self::ShowAll,
            _ => Self::Default,
        }
    }

    pub fn is_show_all(self) -> bool {
        self == Self::ShowAll
    }

    /// Whether a tool with `visibility` appears in a listing under this mode.
    pub fn lists(self, visibility: crate::tools::Visibility) -> bool {
        self.is_show_all() || visibility == crate::tools::Visibility::Native
    }
}
