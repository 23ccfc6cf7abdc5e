//! Grid geometry per device class.

use serde::{Deserialize, Serialize};

/// Device class, ordered narrow to wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 3] = [Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop];

    /// Breakpoint whose arrangement is authored by the user
    pub fn source() -> Self {
        Breakpoint::Desktop
    }

    pub fn is_narrowest(&self) -> bool {
        *self == Breakpoint::Mobile
    }

    /// Container width used when a layout is derived without a real viewport
    pub fn reference_width(&self) -> f64 {
        match self {
            Breakpoint::Mobile => 375.0,
            Breakpoint::Tablet => 768.0,
            Breakpoint::Desktop => 1200.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl std::str::FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(Breakpoint::Mobile),
            "tablet" => Ok(Breakpoint::Tablet),
            "desktop" => Ok(Breakpoint::Desktop),
            other => Err(format!(
                "Invalid breakpoint: {}. Use: mobile, tablet, or desktop",
                other
            )),
        }
    }
}

impl std::fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell geometry and block width limits of one breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointGridConfig {
    pub columns: u32,
    pub min_block_width: u32,
    pub max_block_width: u32,

    /// Row height in pixels
    pub row_height: f64,

    /// Gap between cells in pixels
    pub gap: f64,
}

impl BreakpointGridConfig {
    pub fn new(columns: u32, row_height: f64, gap: f64) -> Self {
        let columns = columns.max(1);
        Self {
            columns,
            min_block_width: 1,
            max_block_width: columns,
            row_height,
            gap,
        }
    }

    /// Clamp a width to this breakpoint's limits (never wider than the grid)
    pub fn clamp_width(&self, width: u32) -> u32 {
        let max = self.max_block_width.min(self.columns).max(1);
        let min = self.min_block_width.clamp(1, max);
        width.clamp(min, max)
    }
}

/// Minimum viewport width (px) at which each breakpoint applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointWidths {
    #[serde(default)]
    pub mobile: f64,
    pub tablet: f64,
    pub desktop: f64,
}

impl Default for BreakpointWidths {
    fn default() -> Self {
        Self {
            mobile: 0.0,
            tablet: 768.0,
            desktop: 1024.0,
        }
    }
}

/// Static grid table for every breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    #[serde(default = "default_min_rows")]
    pub min_rows: u32,

    /// 0 = unbounded
    #[serde(default)]
    pub max_rows: u32,

    #[serde(default)]
    pub breakpoints: BreakpointWidths,

    #[serde(default = "default_desktop")]
    pub desktop: BreakpointGridConfig,

    #[serde(default = "default_tablet")]
    pub tablet: BreakpointGridConfig,

    #[serde(default = "default_mobile")]
    pub mobile: BreakpointGridConfig,
}

fn default_min_rows() -> u32 {
    10
}

fn default_desktop() -> BreakpointGridConfig {
    BreakpointGridConfig::new(12, 60.0, 16.0)
}

fn default_tablet() -> BreakpointGridConfig {
    BreakpointGridConfig::new(8, 60.0, 12.0)
}

fn default_mobile() -> BreakpointGridConfig {
    BreakpointGridConfig::new(4, 50.0, 8.0)
}

impl GridConfig {
    pub fn for_breakpoint(&self, breakpoint: Breakpoint) -> &BreakpointGridConfig {
        match breakpoint {
            Breakpoint::Mobile => &self.mobile,
            Breakpoint::Tablet => &self.tablet,
            Breakpoint::Desktop => &self.desktop,
        }
    }

    /// Column count of the authored (desktop) grid
    pub fn columns(&self) -> u32 {
        self.desktop.columns
    }

    pub fn breakpoint_for_width(&self, width: f64) -> Breakpoint {
        if width >= self.breakpoints.desktop {
            Breakpoint::Desktop
        } else if width >= self.breakpoints.tablet {
            Breakpoint::Tablet
        } else {
            Breakpoint::Mobile
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_rows: default_min_rows(),
            max_rows: 0,
            breakpoints: BreakpointWidths::default(),
            desktop: default_desktop(),
            tablet: default_tablet(),
            mobile: default_mobile(),
        }
    }
}
