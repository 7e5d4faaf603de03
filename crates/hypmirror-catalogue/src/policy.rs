//! Declarative selection of what a stream mirrors.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogueError;

/// Which patch groups of a branch to keep.
///
/// On the wire this is `true` (all), `false` (none) or `"latest-only"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatchSelectionRepr", into = "PatchSelectionRepr")]
pub enum PatchSelection {
    #[default]
    None,
    All,
    LatestOnly,
}

impl PatchSelection {
    pub fn includes(self, is_latest: bool) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::LatestOnly => is_latest,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PatchSelectionRepr {
    Flag(bool),
    Mode(String),
}

impl TryFrom<PatchSelectionRepr> for PatchSelection {
    type Error = CatalogueError;

    fn try_from(repr: PatchSelectionRepr) -> Result<Self, Self::Error> {
        match repr {
            PatchSelectionRepr::Flag(true) => Ok(Self::All),
            PatchSelectionRepr::Flag(false) => Ok(Self::None),
            PatchSelectionRepr::Mode(mode) if mode == "latest-only" => Ok(Self::LatestOnly),
            PatchSelectionRepr::Mode(mode) => Err(CatalogueError::UnknownPatchSelection(mode)),
        }
    }
}

impl From<PatchSelection> for PatchSelectionRepr {
    fn from(selection: PatchSelection) -> Self {
        match selection {
            PatchSelection::None => Self::Flag(false),
            PatchSelection::All => Self::Flag(true),
            PatchSelection::LatestOnly => Self::Mode("latest-only".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPolicy {
    #[serde(default)]
    pub major:   bool,
    #[serde(default)]
    pub patches: PatchSelection,
}

impl BranchPolicy {
    pub fn everything() -> Self {
        Self {
            major:   true,
            patches: PatchSelection::All,
        }
    }
}

/// Branches are mirrored only when they have a policy; audio packages only
/// when their locale is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPolicy {
    #[serde(default)]
    pub audio_languages:     BTreeSet<String>,
    #[serde(default)]
    pub branch_main:         Option<BranchPolicy>,
    #[serde(default)]
    pub branch_pre_download: Option<BranchPolicy>,
}

impl SelectionPolicy {
    pub fn accepts_language(&self, language: &str) -> bool { self.audio_languages.contains(language) }
}
