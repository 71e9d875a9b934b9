//! Build orchestration: prerequisites, compiler flags, native and
//! containerized builds, and the results they produce.

pub mod config;
pub mod container;
pub mod dispatcher;
pub mod flags;
pub mod native;
pub mod prerequisites;
pub mod reporter;
pub mod results;

pub use config::*;
pub use container::*;
pub use dispatcher::*;
pub use flags::*;
pub use native::*;
pub use prerequisites::*;
pub use reporter::*;
pub use results::*;
