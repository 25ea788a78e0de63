pub mod client;
pub mod error;
pub mod resolver;

pub use client::{RawImage, SourceClient};
pub use error::{AttemptOutcome, FetchError, OffsetAttempt, ResolveError};
pub use resolver::{resolve, ResolveOutcome};
