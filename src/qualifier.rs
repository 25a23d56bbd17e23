//! Resource folder name parsing.
//!
//! A folder name like `values-en-rUS` splits at the first `-` into a
//! folder kind prefix and a qualifier suffix. The prefix must exactly
//! match one of the closed folder kind names; the suffix must parse into
//! a [`Configuration`]. Folders failing either check are not resource
//! folders and are skipped silently — unrecognized directories (tooling
//! metadata and the like) are common and not an error.

use serde::{Deserialize, Serialize};

use crate::model::ResourceKind;

/// The closed set of resource folder kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Anim,
    Animator,
    Color,
    Drawable,
    Font,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Navigation,
    Raw,
    Transition,
    Values,
    Xml,
}

impl FolderKind {
    /// Exact-match lookup of the folder kind prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "anim" => Self::Anim,
            "animator" => Self::Animator,
            "color" => Self::Color,
            "drawable" => Self::Drawable,
            "font" => Self::Font,
            "interpolator" => Self::Interpolator,
            "layout" => Self::Layout,
            "menu" => Self::Menu,
            "mipmap" => Self::Mipmap,
            "navigation" => Self::Navigation,
            "raw" => Self::Raw,
            "transition" => Self::Transition,
            "values" => Self::Values,
            "xml" => Self::Xml,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anim => "anim",
            Self::Animator => "animator",
            Self::Color => "color",
            Self::Drawable => "drawable",
            Self::Font => "font",
            Self::Interpolator => "interpolator",
            Self::Layout => "layout",
            Self::Menu => "menu",
            Self::Mipmap => "mipmap",
            Self::Navigation => "navigation",
            Self::Raw => "raw",
            Self::Transition => "transition",
            Self::Values => "values",
            Self::Xml => "xml",
        }
    }

    /// The resource kind a file in this folder declares for itself.
    ///
    /// Meaningless for `Values` folders, whose items are declared per
    /// element rather than per file.
    pub fn file_kind(self) -> ResourceKind {
        match self {
            Self::Anim => ResourceKind::Anim,
            Self::Animator => ResourceKind::Animator,
            Self::Color => ResourceKind::Color,
            Self::Drawable => ResourceKind::Drawable,
            Self::Font => ResourceKind::Font,
            Self::Interpolator => ResourceKind::Interpolator,
            Self::Layout => ResourceKind::Layout,
            Self::Menu => ResourceKind::Menu,
            Self::Mipmap => ResourceKind::Mipmap,
            Self::Navigation => ResourceKind::Navigation,
            Self::Raw => ResourceKind::Raw,
            Self::Transition => ResourceKind::Transition,
            Self::Values => ResourceKind::String,
            Self::Xml => ResourceKind::Xml,
        }
    }

    /// Whether documents of this kind implicitly declare `id` resources.
    pub fn is_id_generating(self) -> bool {
        matches!(self, Self::Layout | Self::Menu)
    }
}

/// Screen orientation qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Night mode qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NightMode {
    Night,
    NotNight,
}

/// Pixel density qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Ldpi,
    Mdpi,
    Hdpi,
    Xhdpi,
    Xxhdpi,
    Xxxhdpi,
    NoDpi,
    AnyDpi,
    /// Explicit `NNNdpi` value.
    Exact(u16),
}

impl Density {
    fn parse(segment: &str) -> Option<Self> {
        Some(match segment {
            "ldpi" => Self::Ldpi,
            "mdpi" => Self::Mdpi,
            "hdpi" => Self::Hdpi,
            "xhdpi" => Self::Xhdpi,
            "xxhdpi" => Self::Xxhdpi,
            "xxxhdpi" => Self::Xxxhdpi,
            "nodpi" => Self::NoDpi,
            "anydpi" => Self::AnyDpi,
            _ => {
                let digits = segment.strip_suffix("dpi")?;
                Self::Exact(digits.parse().ok()?)
            }
        })
    }
}

/// A parsed qualifier configuration.
///
/// Axes are a closed subset of the full configuration space, in the
/// canonical folder-name order. Consumers match configurations against a
/// device configuration for override resolution; that resolution is not
/// this crate's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub language: Option<String>,
    pub region: Option<String>,
    pub smallest_width_dp: Option<u16>,
    pub orientation: Option<Orientation>,
    pub night: Option<NightMode>,
    pub density: Option<Density>,
    pub version: Option<u16>,
}

impl Configuration {
    /// Parses a qualifier suffix such as `en-rUS-land-night-xxhdpi-v21`.
    ///
    /// Returns `None` if any segment is unrecognized or out of canonical
    /// order. The empty string parses to the default configuration.
    pub fn parse(qualifiers: &str) -> Option<Self> {
        let mut config = Self::default();
        if qualifiers.is_empty() {
            return Some(config);
        }
        // Axis ordering: each segment must belong to an axis at or after
        // the last one consumed.
        let mut axis = 0;
        for segment in qualifiers.split('-') {
            if segment.is_empty() {
                return None;
            }
            if axis == 0 && is_language(segment) {
                config.language = Some(segment.to_string());
                axis = 1;
                continue;
            }
            if axis <= 1 {
                if let Some(region) = parse_region(segment) {
                    config.region = Some(region);
                    axis = 2;
                    continue;
                }
            }
            if axis <= 2 {
                if let Some(width) = parse_smallest_width(segment) {
                    config.smallest_width_dp = Some(width);
                    axis = 3;
                    continue;
                }
            }
            if axis <= 3 {
                match segment {
                    "port" => {
                        config.orientation = Some(Orientation::Portrait);
                        axis = 4;
                        continue;
                    }
                    "land" => {
                        config.orientation = Some(Orientation::Landscape);
                        axis = 4;
                        continue;
                    }
                    _ => {}
                }
            }
            if axis <= 4 {
                match segment {
                    "night" => {
                        config.night = Some(NightMode::Night);
                        axis = 5;
                        continue;
                    }
                    "notnight" => {
                        config.night = Some(NightMode::NotNight);
                        axis = 5;
                        continue;
                    }
                    _ => {}
                }
            }
            if axis <= 5 {
                if let Some(density) = Density::parse(segment) {
                    config.density = Some(density);
                    axis = 6;
                    continue;
                }
            }
            if axis <= 6 {
                if let Some(version) = parse_version(segment) {
                    config.version = Some(version);
                    axis = 7;
                    continue;
                }
            }
            return None;
        }
        Some(config)
    }
}

fn is_language(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_lowercase())
}

fn parse_region(segment: &str) -> Option<String> {
    let rest = segment.strip_prefix('r')?;
    if rest.len() == 2 && rest.bytes().all(|b| b.is_ascii_uppercase()) {
        Some(rest.to_string())
    } else {
        None
    }
}

fn parse_smallest_width(segment: &str) -> Option<u16> {
    segment.strip_prefix("sw")?.strip_suffix("dp")?.parse().ok()
}

fn parse_version(segment: &str) -> Option<u16> {
    let digits = segment.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parses a folder name into its kind, raw qualifier string, and
/// configuration. `None` means "not a resource folder".
pub fn parse_folder_name(folder_name: &str) -> Option<(FolderKind, &str, Configuration)> {
    let (prefix, qualifiers) = match folder_name.find('-') {
        // A trailing dash is malformed, not the default configuration.
        Some(index) if index + 1 == folder_name.len() => return None,
        Some(index) => (&folder_name[..index], &folder_name[index + 1..]),
        None => (folder_name, ""),
    };
    let kind = FolderKind::from_name(prefix)?;
    let config = Configuration::parse(qualifiers)?;
    Some((kind, qualifiers, config))
}
