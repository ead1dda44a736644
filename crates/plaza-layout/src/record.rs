//! Layout records: tab groups, tabs, tab templates, and gadgets.
//!
//! Records form an arena-of-records design: each entity lives in an
//! id-indexed table and relationships are expressed as id fields, never
//! back-pointers. Cascades are explicit queries over the tables.
//!
//! # Positional Invariants
//!
//! - Within a tab group, the active tabs' `tab_index` values are exactly
//!   `0..N` in membership order.
//! - Within a `(template, zone_number)` pair, the active gadgets'
//!   `zone_index` values are exactly `0..M` with no gaps or duplicates.
//!
//! A tombstoned record keeps its last position so it can be reinserted at
//! the same place on undelete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plaza_core::id::{GadgetId, TabGroupId, TabId, TabTemplateId};

/// Maximum length of a tab name, in characters.
pub const MAX_TAB_NAME_LENGTH: usize = 16;

/// Maximum length of a gadget's user-preference blob, in characters.
pub const MAX_USER_PREFS_LENGTH: usize = 100_000;

/// Column arrangement of a tab template.
///
/// The variant determines how many gadget zones the template exposes;
/// a gadget's `zone_number` must stay below that count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutKind {
    /// A single full-width zone.
    OneColumn,
    /// Two equal-width zones.
    TwoColumn,
    /// Two zones, the left one wider.
    TwoColumnLeftWide,
    /// Two zones, the right one wider.
    TwoColumnRightWide,
    /// Three equal-width zones.
    ThreeColumn,
    /// Three zones beneath a full-width header zone on the left.
    ThreeColumnLeftWideHeader,
}

impl LayoutKind {
    /// Number of gadget zones this layout exposes.
    #[must_use]
    pub const fn zone_count(self) -> u32 {
        match self {
            Self::OneColumn => 1,
            Self::TwoColumn | Self::TwoColumnLeftWide | Self::TwoColumnRightWide => 2,
            Self::ThreeColumn | Self::ThreeColumnLeftWideHeader => 3,
        }
    }
}

/// An ordered set of tabs making up one start page.
///
/// The group owns its tabs' membership list, not the tabs themselves;
/// tabs are independently addressable through the tab table. Active tab
/// positions are re-derived from `tab_ids` order after every structural
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    /// Unique group ID.
    pub id: TabGroupId,

    /// Read-only groups (gallery archives) reject membership changes.
    pub read_only: bool,

    /// Active tab ids, in display order.
    pub tab_ids: Vec<TabId>,
}

/// A placement of a tab template within a tab group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Unique tab ID.
    pub id: TabId,

    /// Display name, 1..=[`MAX_TAB_NAME_LENGTH`] characters.
    pub name: String,

    /// The group whose membership list this tab appears in.
    pub tab_group_id: TabGroupId,

    /// The template holding this tab's layout and gadgets.
    pub template_id: TabTemplateId,

    /// Position within the group; contiguous `0..N` among active tabs.
    /// Tombstones keep their last value for reinsertion.
    pub tab_index: u32,

    /// Soft-delete flag.
    pub deleted: bool,

    /// When the tab was soft-deleted, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_deleted: Option<DateTime<Utc>>,
}

impl Tab {
    /// Returns true if the tab has not been soft-deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// A reusable layout definition: a column arrangement plus a set of gadgets.
///
/// Referenced by exactly one live tab at a time (an archived gallery copy
/// may share it). Soft-deleted only when its last referencing tab is
/// deleted; never purged while any tab still references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabTemplate {
    /// Unique template ID.
    pub id: TabTemplateId,

    /// Column arrangement.
    pub layout: LayoutKind,

    /// Soft-delete flag.
    pub deleted: bool,

    /// When the template was soft-deleted, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_deleted: Option<DateTime<Utc>>,
}

impl TabTemplate {
    /// Returns true if the template has not been soft-deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// An instance of a gadget definition placed in a template's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gadget {
    /// Unique gadget ID.
    pub id: GadgetId,

    /// The template whose layout this gadget appears in.
    pub template_id: TabTemplateId,

    /// URL of the gadget definition (the definition registry is external).
    pub definition_url: String,

    /// Zone (column) within the template layout.
    pub zone_number: u32,

    /// Position within the zone; contiguous `0..M` among active gadgets.
    /// Tombstones keep their last value for reinsertion.
    pub zone_index: u32,

    /// Collapsed to its title bar.
    pub minimized: bool,

    /// Expanded over the whole tab.
    pub maximized: bool,

    /// Opaque user-preference blob, at most [`MAX_USER_PREFS_LENGTH`] characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prefs: Option<String>,

    /// Soft-delete flag.
    pub deleted: bool,

    /// When the gadget was soft-deleted, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_deleted: Option<DateTime<Utc>>,
}

impl Gadget {
    /// Returns true if the gadget has not been soft-deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// A tab with its template and active gadgets eagerly resolved.
///
/// Gadgets are sorted by `(zone_number, zone_index)`, the order the
/// start page renders them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTab {
    /// The tab record.
    pub tab: Tab,
    /// The tab's template.
    pub template: TabTemplate,
    /// Active gadgets of the template, in render order.
    pub gadgets: Vec<Gadget>,
}
