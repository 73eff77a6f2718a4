//! Definition file format
//!
//! Papers, categories, and templates are described in a small XML dialect:
//!
//! ```xml
//! <Glabels-templates>
//!   <Paper id="US-Letter" name="US Letter" width="8.5in" height="11in"/>
//!   <Category id="mail" name="Mailing labels"/>
//!   <Template brand="Avery" part="5160" size="US-Letter" description="Address Labels">
//!     <Meta category="mail"/>
//!     <Label-rectangle width="2.625in" height="1in" round="0.0625in">
//!       <Markup-margin size="0.0625in"/>
//!       <Layout nx="3" ny="10" x0="0.1875in" y0="0.5in" dx="2.75in" dy="1in"/>
//!     </Label-rectangle>
//!     <Alias brand="Avery" part="8160"/>
//!   </Template>
//! </Glabels-templates>
//! ```
//!
//! Lengths accept the suffixes understood by [`crate::units::parse_length`].

mod reader;
mod writer;

pub use reader::*;
pub use writer::*;

/// Root element name
pub const ROOT_ELEMENT: &str = "Glabels-templates";
