use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub mod properties;
pub mod record;
pub mod settings;
pub mod validate;

pub use record::{BuildId, InstallationConfig, ManagedInstallation, Source, StoredRecord};
pub use settings::{ManagerSettings, UpstreamEndpoints};

/// Software flavor of a managed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerVariant {
    #[default]
    Vanilla,
    Paper,
    Purpur,
    Custom,
}

/// How a variant discovers its builds upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    DirectManifest,
    ChannelFiltered,
    CurrentPointer,
}

impl ServerVariant {
    pub fn strategy(self) -> Option<ResolveStrategy> {
        match self {
            ServerVariant::Vanilla => Some(ResolveStrategy::DirectManifest),
            ServerVariant::Paper => Some(ResolveStrategy::ChannelFiltered),
            ServerVariant::Purpur => Some(ResolveStrategy::CurrentPointer),
            ServerVariant::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerVariant::Vanilla => "vanilla",
            ServerVariant::Paper => "paper",
            ServerVariant::Purpur => "purpur",
            ServerVariant::Custom => "custom",
        }
    }
}

impl Display for ServerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServerVariant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(ServerVariant::Vanilla),
            "paper" => Ok(ServerVariant::Paper),
            "purpur" => Ok(ServerVariant::Purpur),
            "custom" => Ok(ServerVariant::Custom),
            _ => Err(ValidationError::UnknownVariant(s.to_string())),
        }
    }
}

/// Version requested by a caller: the newest release, or an exact id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(String),
}

impl VersionSpec {
    pub fn is_latest(&self) -> bool {
        matches!(self, VersionSpec::Latest)
    }
}

impl Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => write!(f, "latest"),
            VersionSpec::Exact(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for VersionSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(VersionSpec::Latest);
        }

        validate::exact_version(trimmed).map(|v| VersionSpec::Exact(v.to_string()))
    }
}

fn numeric_segments(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter_map(|segment| segment.parse::<u64>().ok())
        .collect()
}

/// Compares two dotted version strings segment by segment.
///
/// Non-numeric segments are dropped rather than rejected, and a missing
/// segment counts as `0`, so `"1.20"` and `"1.20.0"` compare equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = numeric_segments(a);
    let right = numeric_segments(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Highest version in `versions`; later entries win ties.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .max_by(|a, b| compare_versions(a, b))
}
