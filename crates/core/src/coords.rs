//! Build coordinates: app slug, version, platform and channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated app slug (`[a-z0-9-]`, 1..=64 chars).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppSlug(String);

impl AppSlug {
    /// Create from a string, validating format.
    pub fn new(slug: impl Into<String>) -> crate::Result<Self> {
        let slug = slug.into();
        if slug.is_empty() || slug.len() > 64 {
            return Err(crate::Error::InvalidSlug(format!(
                "slug must be 1-64 chars, got {}",
                slug.len()
            )));
        }
        for c in slug.chars() {
            if !matches!(c, 'a'..='z' | '0'..='9' | '-') {
                return Err(crate::Error::InvalidSlug(format!(
                    "invalid character in slug: {c}"
                )));
            }
        }
        Ok(Self(slug))
    }

    /// Get the slug string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppSlug {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<AppSlug> for String {
    fn from(slug: AppSlug) -> Self {
        slug.0
    }
}

impl fmt::Debug for AppSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppSlug({self})")
    }
}

impl fmt::Display for AppSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated version string (`[A-Za-z0-9._-]`, 1..=64 chars).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Create from a string, validating format.
    pub fn new(version: impl Into<String>) -> crate::Result<Self> {
        let version = version.into();
        if version.is_empty() || version.len() > 64 {
            return Err(crate::Error::InvalidCoordinate(format!(
                "version must be 1-64 chars, got {}",
                version.len()
            )));
        }
        for c in version.chars() {
            if !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-') {
                return Err(crate::Error::InvalidCoordinate(format!(
                    "invalid character in version: {c}"
                )));
            }
        }
        Ok(Self(version))
    }

    /// Get the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Version {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target platform for a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Mac,
}

impl Platform {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "mac" => Ok(Self::Mac),
            _ => Err(crate::Error::InvalidCoordinate(format!(
                "unknown platform: {s}"
            ))),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Mac => "mac",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Release channel for a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Beta,
}

impl Channel {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "stable" => Ok(Self::Stable),
            "beta" => Ok(Self::Beta),
            _ => Err(crate::Error::InvalidCoordinate(format!(
                "unknown channel: {s}"
            ))),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The full identity of a build: (slug, version, platform, channel).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildCoords {
    pub slug: AppSlug,
    pub version: Version,
    pub platform: Platform,
    pub channel: Channel,
}

impl BuildCoords {
    /// Create new build coordinates.
    pub fn new(slug: AppSlug, version: Version, platform: Platform, channel: Channel) -> Self {
        Self {
            slug,
            version,
            platform,
            channel,
        }
    }

    /// Parse all four coordinates from raw strings.
    pub fn parse(slug: &str, version: &str, platform: &str, channel: &str) -> crate::Result<Self> {
        Ok(Self {
            slug: AppSlug::new(slug)?,
            version: Version::new(version)?,
            platform: Platform::parse(platform)?,
            channel: Channel::parse(channel)?,
        })
    }

    /// Get the deterministic object store key for this build's manifest.
    pub fn manifest_object_key(&self) -> String {
        format!(
            "apps/{}/builds/{}/{}/{}/manifest.json",
            self.slug, self.version, self.platform, self.channel
        )
    }
}

impl fmt::Display for BuildCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.slug, self.version, self.platform, self.channel
        )
    }
}
