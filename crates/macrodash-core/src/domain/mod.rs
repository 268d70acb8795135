//! 도메인 모델.

pub mod calculations;
pub mod catalog;
pub mod indicator;
pub mod screening;
pub mod snapshot;

pub use calculations::*;
pub use catalog::*;
pub use indicator::*;
pub use screening::*;
pub use snapshot::*;
