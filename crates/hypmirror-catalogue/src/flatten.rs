//! Provider shape to an ordered sequence of [`FileDescriptor`]s.

use std::collections::HashSet;

use url::Url;

use crate::descriptor::{ContentHash, FileDescriptor, validate_file_name};
use crate::error::{CatalogueError, Result};
use crate::hyp::{GamePackage, GamePackageBranch, GamePackageFile, GamePackageGroup};
use crate::policy::SelectionPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Main,
    PreDownload,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::PreDownload => "pre_download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Major,
    Patch,
}

impl PackageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Patch => "patch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Game,
    Audio,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Audio => "audio",
        }
    }
}

/// Where a file sits in the provider's tree.
#[derive(Debug, Clone, Copy)]
struct Origin<'a> {
    branch:       Branch,
    package:      PackageKind,
    latest_patch: bool,
    version:      &'a str,
    resource:     ResourceKind,
    language:     Option<&'a str>,
}

impl Origin<'_> {
    fn tags(&self) -> Vec<String> {
        let mut tags = vec![
            format!("branch:{}", self.branch.as_str()),
            format!("pkg:{}", self.package.as_str()),
        ];
        if self.latest_patch {
            tags.push("patch:latest".to_string());
        }
        tags.push(format!("ver:{}", self.version));
        tags.push(format!("res:{}", self.resource.as_str()));
        if let Some(language) = self.language {
            tags.push(format!("lang:{language}"));
        }
        tags
    }

    fn selected_by(&self, policy: &SelectionPolicy) -> bool {
        let branch = match self.branch {
            Branch::Main => policy.branch_main,
            Branch::PreDownload => policy.branch_pre_download,
        };
        let Some(branch) = branch else {
            return false;
        };
        let wanted = match self.package {
            PackageKind::Major => branch.major,
            PackageKind::Patch => branch.patches.includes(self.latest_patch),
        };
        wanted && self.language.is_none_or(|language| policy.accepts_language(language))
    }
}

/// Flatten `package` under `policy`.
///
/// Every file in the payload is validated, selected or not, so a malformed
/// payload fails as a whole instead of yielding a partial set that would look
/// like a deprecation. Output order is main before pre-download, major before
/// patches (in source order), game packages before audio packages. When two
/// selected files share a content hash only the first is kept.
pub fn flatten(package: &GamePackage, policy: &SelectionPolicy) -> Result<Vec<FileDescriptor>> {
    let mut candidates = Vec::new();
    for (branch, data) in [(Branch::Main, &package.main), (Branch::PreDownload, &package.pre_download)] {
        if let Some(data) = data {
            collect_branch(branch, data, &mut candidates)?;
        }
    }

    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(candidates.len());
    for (origin, descriptor) in candidates {
        if !origin.selected_by(policy) {
            continue;
        }
        if !seen.insert(descriptor.content_hash.clone()) {
            tracing::debug!(
                hash = %descriptor.content_hash,
                name = %descriptor.name,
                game = %package.game.biz,
                "dropping duplicate content hash"
            );
            continue;
        }
        files.push(descriptor);
    }
    Ok(files)
}

fn collect_branch<'a>(
    branch: Branch,
    data: &'a GamePackageBranch,
    out: &mut Vec<(Origin<'a>, FileDescriptor)>,
) -> Result<()> {
    if let Some(major) = &data.major {
        collect_group(branch, PackageKind::Major, false, major, out)?;
    }
    let latest = data.patches.first().map(|group| group.version.as_str());
    for patch in &data.patches {
        let is_latest = Some(patch.version.as_str()) == latest;
        collect_group(branch, PackageKind::Patch, is_latest, patch, out)?;
    }
    Ok(())
}

fn collect_group<'a>(
    branch: Branch,
    package: PackageKind,
    latest_patch: bool,
    group: &'a GamePackageGroup,
    out: &mut Vec<(Origin<'a>, FileDescriptor)>,
) -> Result<()> {
    let resources = group
        .game_pkgs
        .iter()
        .map(|file| (ResourceKind::Game, file))
        .chain(group.audio_pkgs.iter().map(|file| (ResourceKind::Audio, file)));

    for (resource, file) in resources {
        let origin = Origin {
            branch,
            package,
            latest_patch,
            version: &group.version,
            resource,
            language: match resource {
                ResourceKind::Game => None,
                // An empty locale is not a partition.
                ResourceKind::Audio => file.language.as_deref().filter(|language| !language.trim().is_empty()),
            },
        };
        let descriptor = describe(file, origin.tags())?;
        out.push((origin, descriptor));
    }
    Ok(())
}

fn describe(file: &GamePackageFile, tags: Vec<String>) -> Result<FileDescriptor> {
    let source = Url::parse(&file.url).map_err(|source| CatalogueError::InvalidUrl {
        url: file.url.clone(),
        source,
    })?;
    let content_hash = ContentHash::new(&file.md5)?;
    let size = parse_u64("size", &file.size, &file.url)?;
    let required_free_space = parse_u64("decompressed_size", &file.decompressed_size, &file.url)?;

    let name = source
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| content_hash.to_string());
    validate_file_name(&name)?;

    Ok(FileDescriptor {
        name,
        content_hash,
        source,
        size,
        required_free_space,
        tags,
    })
}

fn parse_u64(field: &'static str, value: &str, url: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| CatalogueError::MalformedNumber {
        field,
        value: value.to_string(),
        url: url.to_string(),
    })
}
