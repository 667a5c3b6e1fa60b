pub mod cli;
pub mod cve;
pub mod error;
pub mod settings;
pub mod template;

pub use error::{CvecatError, Result};
