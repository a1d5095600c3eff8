pub mod address;
pub mod value;

pub use address::*;
pub use value::*;
