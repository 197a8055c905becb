//! # corpora-fields
//!
//! Editors and viewers for the field types a content type can declare.
//! Each field type has a codec between its stored JSON value and the value
//! an editor control holds; the richer types (maps, timespans, references,
//! files, IIIF images and links) add the lookups their widgets need.

pub mod crossref;
pub mod field_type;
pub mod file;
pub mod geo;
pub mod html;
pub mod iiif;
pub mod link;
pub mod registry;
pub mod timespan;

pub use crossref::{CrossReference, CrossReferencePicker};
pub use field_type::{from_form, to_form, FieldType, FormValue};
pub use file::{validate_relative_path, FileEditor};
pub use geo::{GeoPoint, Tile};
pub use html::{normalize_html, text_preview};
pub use iiif::{IiifImage, IiifInfo, IiifLoad};
pub use link::{fetch_preview, validate_url, LinkPreview};
pub use registry::WidgetRegistry;
pub use timespan::{Granularity, Timespan};
