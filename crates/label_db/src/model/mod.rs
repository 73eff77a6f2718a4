//! Geometry and template model
//!
//! Immutable value types describing papers, categories, and label templates.
//! All lengths are in points.

mod category;
mod layout;
mod paper;
mod summary;
mod template;

pub use category::*;
pub use layout::*;
pub use paper::*;
pub use summary::*;
pub use template::*;
