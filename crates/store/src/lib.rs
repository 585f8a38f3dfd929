//! Read-only access to the databases populated by the mining tools.
//!
//! Every source gets its own [`Reader`] per generation run. A reader
//! enumerates [`EventSummary`](kesi_core::EventSummary) keys newer than a
//! checkpoint and hydrates them one at a time into domain events.

mod cache;
pub mod error;
pub mod its;
pub mod reader;
pub mod scm;
pub mod summary;

pub use error::{ExtractionError, HydrationError};
pub use its::{Dialect, ItsReader};
pub use reader::{EventReader, MySqlReaderFactory, Reader, ReaderFactory};
pub use scm::ScmReader;
pub use summary::SummarySet;
