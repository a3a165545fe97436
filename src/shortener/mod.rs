//! Short code allocation and resolution.

pub mod allocator;
pub mod clicks;
pub mod error;
pub mod resolver;
pub mod service;
pub mod validation;

pub use allocator::CodeAllocator;
pub use clicks::{ClickRecorder, ClickRecorderConfig};
pub use error::ShortenerError;
pub use resolver::{RedirectResolver, Resolution};
pub use service::LinkService;
pub use validation::UrlValidator;
