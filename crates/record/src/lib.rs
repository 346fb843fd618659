//! # Civic Record
//!
//! Normalized public-meeting records shared by every source and by the diff engine.
//!
//! ## Lifecycle
//!
//! ```text
//! Source item (calendar event, table cell)
//!     │
//!     ├──> NormalizedRecord::new (title, start, source name)
//!     │      └─> extractor fills description, location, links, ...
//!     │
//!     ├──> assign_identity()   "<source>/<YYYYmmddHHMM>/x/<title_slug>"
//!     │
//!     └──> assign_status(now)  cancelled | passed | tentative
//! ```
//!
//! The identity is a pure function of `(source_name, start, title)` and is what the diff engine
//! uses to recognise the same meeting across runs.

mod identity;
mod record;
mod status;

pub use identity::{identity, title_slug};
pub use record::{Classification, Link, Location, NormalizedRecord, SourceInfo};
pub use status::{meeting_status, Status};
