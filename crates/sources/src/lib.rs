//! Meeting sources
//!
//! Each source turns a municipal publication into [`civic_record::NormalizedRecord`] batches.
//! Fetching goes through a [`Transport`], so sources run against canned pages in tests.
//!
//! | Source | Publication |
//! |---|---|
//! | `monroeville_public_meetings` | Google Calendar, paginated (one batch per page) |
//! | `pa_mt_lebanon` | HTML schedule table (one batch) |

pub mod calendar;
mod error;
mod html;
pub mod monroeville;
pub mod mt_lebanon;
mod source;
mod transport;

pub use error::{Result, SourceError};
pub use source::{build_source, source_names, MeetingSource, SourceOptions};
pub use transport::{FixtureTransport, HttpTransport, Transport};
