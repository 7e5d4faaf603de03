//! Payload shapes of the HYP launcher API.
//!
//! Only the fields the mirror reads are modelled; unknown fields are ignored so
//! that additive API changes do not break parsing.

use serde::{Deserialize, Serialize};

/// Identity of a game within a launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameId {
    /// Opaque id, usually ten alphanumerics.
    pub id:  String,
    /// Business code, e.g. `hk4e_global`.
    pub biz: String,
}

/// Entry of `getGames`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id:      String,
    pub biz:     String,
    #[serde(default)]
    pub display: GameDisplay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDisplay {
    pub language: String,
    pub name:     String,
    pub title:    String,
    pub subtitle: String,
}

/// Entry of `getGamePackages`: everything downloadable for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePackage {
    pub game:         GameId,
    #[serde(default)]
    pub main:         Option<GamePackageBranch>,
    #[serde(default)]
    pub pre_download: Option<GamePackageBranch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePackageBranch {
    /// Full package of the branch's current version.
    #[serde(default)]
    pub major:   Option<GamePackageGroup>,
    /// Differential packages, newest base version first.
    #[serde(default)]
    pub patches: Vec<GamePackageGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePackageGroup {
    /// Current version for a major group, base version for a patch group.
    pub version:      String,
    #[serde(default)]
    pub game_pkgs:    Vec<GamePackageFile>,
    #[serde(default)]
    pub audio_pkgs:   Vec<GamePackageFile>,
    #[serde(default)]
    pub res_list_url: String,
}

/// One file of a package group. Sizes are decimal strings on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePackageFile {
    /// Locale of an audio package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language:          Option<String>,
    pub url:               String,
    /// MD5 of the file, letter case varies.
    pub md5:               String,
    /// Archive size.
    pub size:              String,
    /// Archive size plus unpacked size.
    pub decompressed_size: String,
}
