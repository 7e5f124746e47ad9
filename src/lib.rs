// Re-export modules
pub mod config;
pub mod extract;
pub mod extractor;
pub mod filter;
pub mod logging;
pub mod renderer;
pub mod results;
pub mod server;
pub mod utils;
pub mod validation;

// Re-export commonly used types for convenience
pub use extract::extract_critical_css;
pub use extractor::{ExtractError, Extractor};
pub use results::ExtractionResult;
pub use validation::{ExtractRequest, ValidationError, Viewport};
