use std::{
    path::{Component, Path},
    sync::LazyLock,
};

use regex::Regex;

use crate::error::ValidationError;

pub const MIN_PORT: u32 = 1024;
pub const MAX_PORT: u32 = 65535;
pub const MIN_MEMORY_MB: u32 = 512;
pub const MAX_MEMORY_MB: u32 = 65536;

pub const DEFAULT_PORT: u16 = 25565;
pub const DEFAULT_MEMORY_MB: u32 = 2048;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("name pattern compiles"));

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+-]{0,63}$").expect("version pattern compiles")
});

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

pub fn name(name: &str) -> Result<&str, ValidationError> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

pub fn port(port: u32) -> Result<u16, ValidationError> {
    if (MIN_PORT..=MAX_PORT).contains(&port) {
        Ok(port as u16)
    } else {
        Err(ValidationError::PortOutOfRange(port))
    }
}

pub fn memory_mb(memory: u32) -> Result<u32, ValidationError> {
    if (MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&memory) {
        Ok(memory)
    } else {
        Err(ValidationError::MemoryOutOfRange(memory))
    }
}

pub fn exact_version(version: &str) -> Result<&str, ValidationError> {
    if VERSION_RE.is_match(version) {
        Ok(version)
    } else {
        Err(ValidationError::InvalidVersion(version.to_string()))
    }
}

/// Accepts only paths that stay below the directory they are joined onto.
pub fn relative_jar(jar: &str) -> Result<&Path, ValidationError> {
    let path = Path::new(jar);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if jar.trim().is_empty() || escapes {
        return Err(ValidationError::InvalidJarPath(jar.to_string()));
    }

    Ok(path)
}

/// Replaces control characters with spaces and trims the result.
pub fn sanitize_motd(motd: &str) -> String {
    let replaced: String = motd
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    replaced.trim().to_string()
}

/// Motd to use when none was supplied or the supplied one sanitizes to nothing.
pub fn motd_or_name(motd: Option<&str>, name: &str) -> String {
    let cleaned = motd.map(sanitize_motd).unwrap_or_default();
    if cleaned.is_empty() {
        sanitize_motd(name)
    } else {
        cleaned
    }
}
