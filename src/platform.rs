use crate::types::*;
use anyhow::{anyhow, Result};

pub fn get_system_info() -> PlatformInfo {
    let os = match std::env::consts::OS {
        "windows" => Os::Windows,
        "macos" => Os::MacOs,
        // Every other unix gets the Linux artifacts
        _ => Os::Linux,
    };

    let arch = match std::env::consts::ARCH {
        "aarch64" | "arm64" => Arch::Arm64,
        _ => Arch::X64,
    };

    PlatformInfo { os, arch }
}

/// Host platform, with either half optionally overridden by the user.
pub fn resolve_platform(os: Option<&str>, arch: Option<&str>) -> Result<PlatformInfo> {
    let mut info = get_system_info();

    if let Some(os) = os {
        info.os = os.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(arch) = arch {
        info.arch = arch.parse().map_err(|e: String| anyhow!(e))?;
    }

    tracing::debug!("Caller platform: {} {}", info.os, info.arch);
    Ok(info)
}
