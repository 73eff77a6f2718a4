//! Length units
//!
//! All geometry is stored in points (1/72 inch). Definition files may carry a
//! unit suffix on any length attribute; bare numbers are points.

use serde::{Deserialize, Serialize};

/// Display and input units for lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// PostScript points (1/72 inch)
    #[default]
    Point,
    /// Inches
    Inch,
    /// Millimeters
    Mm,
    /// Centimeters
    Cm,
    /// Picas (12 points)
    Pica,
}

impl Units {
    /// All units, in suffix-matching order
    pub const ALL: [Units; 5] = [Units::Point, Units::Inch, Units::Mm, Units::Cm, Units::Pica];

    /// Number of points in one unit
    pub fn points_per_unit(&self) -> f64 {
        match self {
            Units::Point => 1.0,
            Units::Inch => 72.0,
            Units::Mm => 72.0 / 25.4,
            Units::Cm => 720.0 / 25.4,
            Units::Pica => 12.0,
        }
    }

    /// Suffix used in definition files
    pub fn suffix(&self) -> &'static str {
        match self {
            Units::Point => "pt",
            Units::Inch => "in",
            Units::Mm => "mm",
            Units::Cm => "cm",
            Units::Pica => "pc",
        }
    }

    /// Look up a unit by its suffix
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.suffix() == suffix)
    }

    /// Convert a length in points to this unit
    pub fn from_points(&self, points: f64) -> f64 {
        points / self.points_per_unit()
    }

    /// Convert a length in this unit to points
    pub fn to_points(&self, value: f64) -> f64 {
        value * self.points_per_unit()
    }

    /// Format a length given in points for display in this unit.
    ///
    /// Inches are rendered as fractions where a close one exists.
    pub fn format(&self, points: f64) -> String {
        let value = self.from_points(points);
        match self {
            Units::Inch => fraction(value),
            _ => trim_decimal(value, 2),
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Parse a length with an optional unit suffix into points.
///
/// Returns `None` for anything that is not a finite number followed by a
/// known suffix.
pub fn parse_length(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let units = if suffix.is_empty() {
        Units::Point
    } else {
        Units::from_suffix(suffix)?
    };

    Some(units.to_points(value))
}

/// Format a length in points for writing back to a definition file
pub fn format_points(points: f64) -> String {
    format!("{}pt", points)
}

/// Render a value as a whole number plus a fraction with a power-of-two
/// denominator, falling back to three decimals.
pub fn fraction(value: f64) -> String {
    const DENOMINATORS: [u32; 6] = [1, 2, 4, 8, 16, 32];
    const TOLERANCE: f64 = 0.003;

    let whole = value.trunc();
    let frac = value - whole;

    for denominator in DENOMINATORS {
        let d = f64::from(denominator);
        let numerator = (frac * d).round();
        if (frac - numerator / d).abs() < TOLERANCE {
            let whole = whole as i64;
            let numerator = numerator as u32;
            return if numerator == 0 {
                whole.to_string()
            } else if numerator == denominator {
                (whole + 1).to_string()
            } else if whole == 0 {
                format!("{}/{}", numerator, denominator)
            } else {
                format!("{} {}/{}", whole, numerator, denominator)
            };
        }
    }

    format!("{:.3}", value)
}

fn trim_decimal(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
