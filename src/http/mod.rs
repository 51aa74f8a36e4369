//! HTTP protocol layer module
//!
//! Response builders shared by the handlers, decoupled from archive logic.

pub mod response;

// Re-export commonly used items
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_415_response, build_document_response, build_health_response, build_problem_response,
    Problem,
};
