//! Environment, speed, model size and platform enums.

use serde::{Deserialize, Serialize};

/// Driving environment family.
///
/// Parsed through [`std::str::FromStr`] rather than `clap::ValueEnum` so the
/// gym ids work as aliases on the command line.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Highway,
    #[default]
    Merge,
    Roundabout,
    Intersection,
}

impl Environment {
    pub const ALL: [Self; 4] = [
        Self::Highway,
        Self::Merge,
        Self::Roundabout,
        Self::Intersection,
    ];
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Highway => write!(f, "highway"),
            Self::Merge => write!(f, "merge"),
            Self::Roundabout => write!(f, "roundabout"),
            Self::Intersection => write!(f, "intersection"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "highway" | "highway-v0" => Ok(Self::Highway),
            "merge" | "merge-v0" | "highway-merge" => Ok(Self::Merge),
            "roundabout" | "roundabout-v0" => Ok(Self::Roundabout),
            "intersection" | "intersection-v0" | "intersection-v1" => Ok(Self::Intersection),
            _ => Err(format!(
                "unknown environment '{s}'. Use: highway, merge, roundabout, intersection"
            )),
        }
    }
}

/// Vehicle speed variant of an environment.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SpeedVariant {
    #[default]
    Default,
    Fast,
}

impl std::fmt::Display for SpeedVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Fast => write!(f, "fast"),
        }
    }
}

/// World-model size presets understood by the training framework.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ModelSize {
    #[cfg_attr(feature = "clap", value(name = "1m"))]
    #[serde(rename = "1m")]
    M1,
    #[default]
    #[cfg_attr(feature = "clap", value(name = "12m"))]
    #[serde(rename = "12m")]
    M12,
    #[cfg_attr(feature = "clap", value(name = "25m"))]
    #[serde(rename = "25m")]
    M25,
    #[cfg_attr(feature = "clap", value(name = "50m"))]
    #[serde(rename = "50m")]
    M50,
    #[cfg_attr(feature = "clap", value(name = "100m"))]
    #[serde(rename = "100m")]
    M100,
    #[cfg_attr(feature = "clap", value(name = "200m"))]
    #[serde(rename = "200m")]
    M200,
    #[cfg_attr(feature = "clap", value(name = "400m"))]
    #[serde(rename = "400m")]
    M400,
}

impl ModelSize {
    /// Name of the framework config block selecting this size.
    #[must_use]
    pub fn config_id(self) -> String {
        format!("size{self}")
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::M1 => write!(f, "1m"),
            Self::M12 => write!(f, "12m"),
            Self::M25 => write!(f, "25m"),
            Self::M50 => write!(f, "50m"),
            Self::M100 => write!(f, "100m"),
            Self::M200 => write!(f, "200m"),
            Self::M400 => write!(f, "400m"),
        }
    }
}

/// Accelerator platform for the framework's JAX backend.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Cpu,
    Gpu,
    Tpu,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
            Self::Tpu => write!(f, "tpu"),
        }
    }
}

/// Simulator render mode.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    None,
    Human,
    RgbArray,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Human => write!(f, "human"),
            Self::RgbArray => write!(f, "rgb_array"),
        }
    }
}
