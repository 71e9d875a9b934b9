pub mod language;
pub mod module;
pub mod platform;
pub mod result;

pub use language::*;
pub use module::*;
pub use platform::*;
pub use result::*;
