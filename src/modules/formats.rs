use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TargetFormat {
    #[default]
    Png,
    Jpg,
    Jpeg,
    Webp,
    Gif,
    Bmp,
    Tiff,
    Ico,
    Pdf,
    Heic,
}

impl TargetFormat {
    /// Lowercase token, also used as the output file extension.
    pub fn token(&self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
            TargetFormat::Gif => "gif",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Tiff => "tiff",
            TargetFormat::Ico => "ico",
            TargetFormat::Pdf => "pdf",
            TargetFormat::Heic => "heic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetFormat::Png => "PNG",
            TargetFormat::Jpg => "JPG",
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Webp => "WEBP",
            TargetFormat::Gif => "GIF",
            TargetFormat::Bmp => "BMP",
            TargetFormat::Tiff => "TIFF",
            TargetFormat::Ico => "ICO",
            TargetFormat::Pdf => "PDF",
            TargetFormat::Heic => "HEIC",
        }
    }

    pub fn all() -> [TargetFormat; 10] {
        [
            TargetFormat::Png,
            TargetFormat::Jpg,
            TargetFormat::Jpeg,
            TargetFormat::Webp,
            TargetFormat::Gif,
            TargetFormat::Bmp,
            TargetFormat::Tiff,
            TargetFormat::Ico,
            TargetFormat::Pdf,
            TargetFormat::Heic,
        ]
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported target format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for TargetFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        TargetFormat::all()
            .into_iter()
            .find(|format| format.token() == token)
            .ok_or(UnknownFormat(s.to_string()))
    }
}

impl TryFrom<String> for TargetFormat {
    type Error = UnknownFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Extensions offered by the file picker.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "heic", "tiff", "tif", "bmp", "psd", "gif", "ico",
];
