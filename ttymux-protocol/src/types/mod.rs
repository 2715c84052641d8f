pub mod index;
pub mod json;
pub mod output;
pub mod request;

pub use index::*;
pub use json::*;
pub use output::*;
pub use request::*;
