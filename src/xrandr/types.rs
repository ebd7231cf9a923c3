//! Output records produced by the report parser
//!
//! These are also the persisted form of a layout: a [`Snapshot`] serializes to
//! a JSON array of outputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Screen header values (`Screen 0: minimum .., current .., maximum ..`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Screen {
    pub index: u32,
    pub minimum: Resolution,
    pub current: Resolution,
    pub maximum: Resolution,
}

/// Everything parsed out of one report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub screen: Screen,
    pub snapshot: Snapshot,
}

/// The complete set of outputs observed by one query, in reported order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub outputs: Vec<Output>,
}

impl Snapshot {
    pub fn new(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }

    pub fn connected(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter().filter(|output| output.is_connected)
    }
}

/// A display connector and its negotiated state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub is_connected: bool,
    pub is_primary: bool,
    /// Only set when the report carries a current resolution for the output
    pub is_enabled: bool,
    pub resolution: Resolution,
    pub position: Position,
    pub rotation: Rotation,
    pub reflection: Reflection,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default)]
    pub modes: Vec<OutputMode>,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First mode with a preferred rate
    pub fn preferred_mode(&self) -> Option<&OutputMode> {
        self.modes
            .iter()
            .find(|mode| mode.rates.iter().any(|rate| rate.is_preferred))
    }

    /// Mode with the rate currently in use
    pub fn current_mode(&self) -> Option<&OutputMode> {
        self.modes
            .iter()
            .find(|mode| mode.rates.iter().any(|rate| rate.is_current))
    }
}

/// Pixel dimensions of an output or screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Formats as an xrandr mode name, e.g. `1920x1080`
impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel position of an output's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Position {
    pub fn new(offset_x: i32, offset_y: i32) -> Self {
        Self { offset_x, offset_y }
    }
}

/// Formats as an xrandr `--pos` argument, e.g. `1920x0`
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.offset_x, self.offset_y)
    }
}

/// Physical size of an output, in millimetres
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_mm: u32,
    pub height_mm: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Normal,
    Left,
    Inverted,
    Right,
}

impl Rotation {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "normal" => Some(Self::Normal),
            "left" => Some(Self::Left),
            "inverted" => Some(Self::Inverted),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Left and right rotations swap the reported width and height
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Left => "left",
            Self::Inverted => "inverted",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reflection {
    #[default]
    None,
    XAxis,
    YAxis,
    XyAxis,
}

impl Reflection {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::None => "normal",
            Self::XAxis => "x",
            Self::YAxis => "y",
            Self::XyAxis => "xy",
        }
    }
}

/// A supported resolution and its refresh rates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputMode {
    pub resolution: Resolution,
    #[serde(default)]
    pub rates: Vec<Rate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Sometimes oddly precise (e.g. 59.96)
    pub rate: f64,
    /// Marked with `*` in the report
    pub is_current: bool,
    /// Marked with `+` in the report
    pub is_preferred: bool,
}
