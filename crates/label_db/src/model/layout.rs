//! Label shapes and sheet layouts

use serde::{Deserialize, Serialize};

/// Slack allowed when checking that a layout fits on its paper
const FIT_TOLERANCE: f64 = 0.01;

/// Outline of a single label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum LabelShape {
    /// Rectangular label, optionally with rounded corners
    Rectangle {
        width: f64,
        height: f64,
        corner_radius: Option<f64>,
    },
    /// Circular label
    Round { radius: f64 },
    /// Elliptical label
    Ellipse { width: f64, height: f64 },
    /// CD/DVD label with a center hole, optionally clipped to a
    /// business-card sized rectangle
    Cd {
        radius: f64,
        hole: f64,
        width: Option<f64>,
        height: Option<f64>,
    },
}

impl LabelShape {
    /// Create a square-cornered rectangle
    pub fn rectangle(width: f64, height: f64) -> Self {
        LabelShape::Rectangle {
            width,
            height,
            corner_radius: None,
        }
    }

    /// Create a rectangle with rounded corners
    pub fn rounded(width: f64, height: f64, corner_radius: f64) -> Self {
        LabelShape::Rectangle {
            width,
            height,
            corner_radius: Some(corner_radius),
        }
    }

    /// Create a circle
    pub fn round(radius: f64) -> Self {
        LabelShape::Round { radius }
    }

    /// Create an ellipse
    pub fn ellipse(width: f64, height: f64) -> Self {
        LabelShape::Ellipse { width, height }
    }

    /// Create an unclipped CD label
    pub fn cd(radius: f64, hole: f64) -> Self {
        LabelShape::Cd {
            radius,
            hole,
            width: None,
            height: None,
        }
    }

    /// Bounding box width
    pub fn width(&self) -> f64 {
        match self {
            LabelShape::Rectangle { width, .. } | LabelShape::Ellipse { width, .. } => *width,
            LabelShape::Round { radius } => 2.0 * radius,
            LabelShape::Cd { radius, width, .. } => width.unwrap_or(2.0 * radius),
        }
    }

    /// Bounding box height
    pub fn height(&self) -> f64 {
        match self {
            LabelShape::Rectangle { height, .. } | LabelShape::Ellipse { height, .. } => *height,
            LabelShape::Round { radius } => 2.0 * radius,
            LabelShape::Cd { radius, height, .. } => height.unwrap_or(2.0 * radius),
        }
    }

    /// Short lowercase name of the shape
    pub fn kind(&self) -> &'static str {
        match self {
            LabelShape::Rectangle { .. } => "rectangle",
            LabelShape::Round { .. } => "round",
            LabelShape::Ellipse { .. } => "ellipse",
            LabelShape::Cd { .. } => "cd",
        }
    }

    fn check(&self) -> Result<(), String> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.width()) || !positive(self.height()) {
            return Err(format!("{} label must have a positive size", self.kind()));
        }
        match self {
            LabelShape::Rectangle {
                width,
                height,
                corner_radius: Some(r),
            } if !r.is_finite() || *r < 0.0 || 2.0 * r > width.min(*height) => {
                Err(format!("corner radius {} does not fit the label", r))
            }
            LabelShape::Cd { radius, .. } if !positive(*radius) => {
                Err(format!("cd radius {} must be positive", radius))
            }
            LabelShape::Cd { radius, hole, .. } if !hole.is_finite() || *hole < 0.0 || hole >= radius => {
                Err(format!("hole radius {} must be smaller than radius {}", hole, radius))
            }
            _ => Ok(()),
        }
    }
}

/// A grid of identical labels on one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Left edge of the first label column
    pub x0: f64,
    /// Top edge of the first label row
    pub y0: f64,
    /// Number of columns
    pub nx: u32,
    /// Number of rows
    pub ny: u32,
    /// Horizontal pitch between label origins
    pub dx: f64,
    /// Vertical pitch between label origins
    pub dy: f64,
    /// Shape of every label in this grid
    pub shape: LabelShape,
}

impl Layout {
    /// Create a new layout
    pub fn new(shape: LabelShape, nx: u32, ny: u32, x0: f64, y0: f64, dx: f64, dy: f64) -> Self {
        Self {
            x0,
            y0,
            nx,
            ny,
            dx,
            dy,
            shape,
        }
    }

    /// Labels in this grid
    pub fn label_count(&self) -> u32 {
        self.nx.saturating_mul(self.ny)
    }

    /// Label origins in row-major order
    pub fn origins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.ny).flat_map(move |iy| {
            (0..self.nx).map(move |ix| {
                (
                    self.x0 + f64::from(ix) * self.dx,
                    self.y0 + f64::from(iy) * self.dy,
                )
            })
        })
    }

    /// Right and bottom extent of the whole grid
    pub fn extent(&self) -> (f64, f64) {
        let cols = f64::from(self.nx.saturating_sub(1));
        let rows = f64::from(self.ny.saturating_sub(1));
        (
            self.x0 + cols * self.dx + self.shape.width(),
            self.y0 + rows * self.dy + self.shape.height(),
        )
    }

    /// Check the grid is non-empty and lies inside a page of the given size
    pub fn check(&self, page_width: f64, page_height: f64) -> Result<(), String> {
        if self.label_count() == 0 {
            return Err(format!("layout {} x {} has no labels", self.nx, self.ny));
        }
        self.shape.check()?;

        if ![self.x0, self.y0, self.dx, self.dy].iter().all(|v| v.is_finite()) {
            return Err("layout origin and pitch must be finite".to_string());
        }
        // Grids run right and down from the first label
        if self.dx < 0.0 || self.dy < 0.0 {
            return Err(format!("layout pitch ({}, {}) is negative", self.dx, self.dy));
        }
        if self.x0 < -FIT_TOLERANCE || self.y0 < -FIT_TOLERANCE {
            return Err(format!("layout origin ({}, {}) is off the page", self.x0, self.y0));
        }
        let (right, bottom) = self.extent();
        if right > page_width + FIT_TOLERANCE || bottom > page_height + FIT_TOLERANCE {
            return Err(format!(
                "layout extends to ({:.2}, {:.2}) beyond page {:.2} x {:.2}",
                right, bottom, page_width, page_height
            ));
        }
        Ok(())
    }
}
