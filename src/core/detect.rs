use crate::core::fetch::ByteBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use zip::ZipArchive;

/// Archive formats the extractor knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTag {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl FormatTag {
    pub const ALL: [FormatTag; 2] = [FormatTag::Zip, FormatTag::TarGz];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Zip => "zip",
            FormatTag::TarGz => "tar.gz",
        }
    }

    /// File name suffix, including the leading dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            FormatTag::Zip => ".zip",
            FormatTag::TarGz => ".tar.gz",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Longest suffix first so ".tar.gz" is matched as a unit.
const SUFFIX_ORDER: [FormatTag; 2] = [FormatTag::TarGz, FormatTag::Zip];

/// Classifies a path or URL by its trailing characters.
pub fn detect_by_name(name: &str) -> Option<FormatTag> {
    SUFFIX_ORDER
        .into_iter()
        .find(|tag| name.ends_with(tag.suffix()))
}

/// Structural check for the one format that can be positively identified.
///
/// Returns `None` when the buffer is not a zip archive; callers then assume
/// tar.gz by elimination and let its decoder report a mismatch.
pub fn detect_by_content(buffer: &ByteBuffer) -> Option<FormatTag> {
    match ZipArchive::new(buffer.cursor()) {
        Ok(_) => Some(FormatTag::Zip),
        Err(_) => None,
    }
}
