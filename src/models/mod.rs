pub mod common;
pub mod plan;
pub mod subscription;

pub use common::*;
pub use plan::*;
pub use subscription::*;
