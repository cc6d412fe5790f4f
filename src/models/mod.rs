pub mod document;
pub mod enums;
pub mod knowledge;

pub use document::*;
pub use enums::*;
pub use knowledge::*;
