use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

/// Parse human-readable size strings to bytes
///
/// Supports: B, KB, MB, GB, TB (case-insensitive)
/// Examples:
/// - "100MB" -> 104_857_600
/// - "1GB"   -> 1_073_741_824
/// - "500KB" -> 512_000
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();

    if s.is_empty() {
        bail!("Empty size string");
    }

    // Find where the number ends and unit begins
    let num_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    if num_end == s.len() {
        // No unit found, assume bytes
        return Ok(s.parse::<u64>()?);
    }

    if num_end == 0 {
        bail!("Size string must start with a number: {}", s);
    }

    let num_str = &s[..num_end];
    let unit_str = s[num_end..].trim().to_uppercase();

    let num: f64 = num_str
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid number: {}", num_str))?;

    let multiplier = match unit_str.as_str() {
        "B" => 1u64,
        "KB" => 1024u64,
        "MB" => MB,
        "GB" => GB,
        "TB" => 1024 * GB,
        _ => bail!("Unknown size unit: {}. Supported: B, KB, MB, GB, TB", unit_str),
    };

    Ok((num * multiplier as f64) as u64)
}

/// Fixed large-file thresholds offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LargeFileThreshold {
    Mb100,
    Mb500,
    Gb1,
    Gb2,
    Gb5,
}

impl LargeFileThreshold {
    pub const ALL: [LargeFileThreshold; 5] = [
        LargeFileThreshold::Mb100,
        LargeFileThreshold::Mb500,
        LargeFileThreshold::Gb1,
        LargeFileThreshold::Gb2,
        LargeFileThreshold::Gb5,
    ];

    pub fn bytes(&self) -> u64 {
        match self {
            LargeFileThreshold::Mb100 => 100 * MB,
            LargeFileThreshold::Mb500 => 500 * MB,
            LargeFileThreshold::Gb1 => GB,
            LargeFileThreshold::Gb2 => 2 * GB,
            LargeFileThreshold::Gb5 => 5 * GB,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LargeFileThreshold::Mb100 => "100MB",
            LargeFileThreshold::Mb500 => "500MB",
            LargeFileThreshold::Gb1 => "1GB",
            LargeFileThreshold::Gb2 => "2GB",
            LargeFileThreshold::Gb5 => "5GB",
        }
    }

    /// Highest fixed threshold a file of `size` bytes reaches, if any.
    pub fn bucket_for(size: u64) -> Option<LargeFileThreshold> {
        Self::ALL.iter().rev().find(|t| size >= t.bytes()).copied()
    }
}

impl Default for LargeFileThreshold {
    fn default() -> Self {
        LargeFileThreshold::Mb100
    }
}

impl fmt::Display for LargeFileThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LargeFileThreshold {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = parse_size(s)?;
        match Self::ALL.iter().find(|t| t.bytes() == bytes) {
            Some(t) => Ok(*t),
            None => bail!(
                "Unsupported threshold: {}. Choose one of: 100MB, 500MB, 1GB, 2GB, 5GB",
                s
            ),
        }
    }
}

impl Serialize for LargeFileThreshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for LargeFileThreshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
