//! Release asset classification
//!
//! Turns the raw asset list of one release into installable candidates:
//! each asset gets an operating system, an architecture and a file kind, or
//! is dropped. Resolution is a pure function of its inputs.

use crate::types::*;
use std::collections::HashSet;

/// Suffixes of files that ship next to installers but are never installable
/// themselves (update manifests, checksums, signatures, logs).
const NON_INSTALLABLE_EXTS: &[&str] = &[
    "blockmap", "yml", "yaml", "sha", "sha1", "sha256", "sha512", "md5", "sig", "asc", "pem",
    "pub", "txt", "zsync", "sym",
];

/// Name fragments per OS. macOS is checked before Windows because
/// "darwin" contains "win".
const OS_NAME_HINTS: &[(Os, &[&str])] = &[
    (Os::Linux, &["linux", "lin"]),
    (Os::MacOs, &["darwin", "macos", "mac", "osx"]),
    (Os::Windows, &["windows", "win"]),
];

const OS_EXTENSIONS: &[(Os, &[&str])] = &[
    (Os::Windows, &["exe", "msi", "msix", "appinstaller"]),
    (Os::MacOs, &["dmg", "pkg"]),
    (Os::Linux, &["deb", "appimage", "rpm", "flatpak"]),
];

const ARCH_NAME_HINTS: &[(Arch, &[&str])] = &[
    (Arch::Arm64, &["arm64", "aarch64"]),
    (Arch::X64, &["x64", "x86_64", "amd64"]),
];

/// One step of the OS classification chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsRule {
    /// Per-repository substring overrides from the directory.
    Override,
    /// Well-known OS names inside the file name.
    NameHint,
    /// Installer formats that only exist on one OS.
    Extension,
}

/// Rules in precedence order; the first one that answers wins.
pub const OS_RULES: [OsRule; 3] = [OsRule::Override, OsRule::NameHint, OsRule::Extension];

impl OsRule {
    pub fn classify(&self, name_lower: &str, ext: &str, overrides: &OsOverrides) -> Option<Os> {
        match self {
            OsRule::Override => overrides.lookup(name_lower),
            OsRule::NameHint => OS_NAME_HINTS
                .iter()
                .find(|(_, hints)| hints.iter().any(|h| name_lower.contains(h)))
                .map(|(os, _)| *os),
            OsRule::Extension => OS_EXTENSIONS
                .iter()
                .find(|(_, exts)| exts.contains(&ext))
                .map(|(os, _)| *os),
        }
    }
}

/// Lower-cased text after the last `.`; the whole name if there is none.
pub fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

pub fn is_installable_ext(ext: &str) -> bool {
    !NON_INSTALLABLE_EXTS.contains(&ext)
}

pub fn classify_os(name: &str, overrides: &OsOverrides) -> Option<Os> {
    let name_lower = name.to_lowercase();
    let ext = extension_of(name);
    OS_RULES
        .iter()
        .find_map(|rule| rule.classify(&name_lower, &ext, overrides))
}

/// Architecture named in the asset, or the caller's own when it names none.
pub fn classify_arch(name: &str, host_arch: Arch) -> Arch {
    let name_lower = name.to_lowercase();
    ARCH_NAME_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| name_lower.contains(h)))
        .map(|(arch, _)| *arch)
        .unwrap_or(host_arch)
}

fn dedup_key(policy: DedupPolicy, os: Os, arch: Arch, ext: &str) -> String {
    match policy {
        DedupPolicy::OsArch => format!("{}-{}", os, arch),
        DedupPolicy::OsExt => format!("{}-{}", os, ext),
    }
    .to_uppercase()
}

/// Classify the assets of one release. Input order is preserved and the
/// first asset per dedup key wins.
pub fn resolve(
    assets: &[GitHubAsset],
    overrides: &OsOverrides,
    host_arch: Arch,
    policy: DedupPolicy,
) -> Vec<ResolvedCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for asset in assets {
        let ext = extension_of(&asset.name);
        if !is_installable_ext(&ext) {
            tracing::trace!("Skipping '{}': not an installer", asset.name);
            continue;
        }

        let Some(os) = classify_os(&asset.name, overrides) else {
            tracing::trace!("Skipping '{}': unknown operating system", asset.name);
            continue;
        };
        let arch = classify_arch(&asset.name, host_arch);

        if !seen.insert(dedup_key(policy, os, arch, &ext)) {
            tracing::trace!("Skipping '{}': duplicate of an earlier asset", asset.name);
            continue;
        }

        candidates.push(ResolvedCandidate {
            os,
            arch,
            ext: ext.to_uppercase(),
            url: asset.browser_download_url.clone(),
            size: asset.size,
            name: asset.name.clone(),
        });
    }

    candidates
}

/// The candidate built for exactly this OS and architecture, if any.
pub fn best_match<'a>(
    candidates: &'a [ResolvedCandidate],
    platform: &PlatformInfo,
) -> Option<&'a ResolvedCandidate> {
    candidates
        .iter()
        .find(|c| c.os == platform.os && c.arch == platform.arch)
}

/// Pick the asset to install for the caller: from the release tagged `tag`,
/// or else from the newest release that has one. `None` means the install
/// action is unavailable.
pub fn compatible_install(
    app: &App,
    tag: Option<&str>,
    platform: &PlatformInfo,
    policy: DedupPolicy,
) -> Option<ResolvedCandidate> {
    let found = app
        .releases
        .iter()
        .filter(|release| tag.map_or(true, |tag| release.tag_name == tag))
        .find_map(|release| {
            let candidates = resolve(&release.assets, &app.os_overrides, platform.arch, policy);
            best_match(&candidates, platform)
                .cloned()
                .map(|candidate| (release, candidate))
        });

    match &found {
        Some((release, c)) => {
            tracing::debug!("{} {}: compatible asset '{}'", app.id, release.tag_name, c.name)
        }
        None => tracing::debug!("{}: no asset for {} {}", app.id, platform.os, platform.arch),
    }

    found.map(|(_, candidate)| candidate)
}

/// Human-readable byte size (`1.5 MB`).
pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if size == 0 {
        return "0 B".to_string();
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", size)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
