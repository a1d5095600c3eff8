pub mod json;
pub mod umya;

pub use json::{JsonAdapter, JsonBackendError};
pub use umya::UmyaAdapter;
