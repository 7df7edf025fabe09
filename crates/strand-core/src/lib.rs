pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AppConfig, GraphOptions};
pub use error::{Result, StrandError};
pub use traits::{Predicate, Step};
pub use types::*;
