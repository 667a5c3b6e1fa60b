pub mod fetch;
pub mod id;
pub mod record;
pub mod timestamp;

pub use fetch::{CveFetcher, Source};
pub use id::{CveId, Location, DEFAULT_BASE_URL, STDIN_MARKER};
pub use record::CveRecord;
pub use timestamp::Timestamp;
