pub mod event;
pub mod kind;
pub mod payload;

pub use event::*;
pub use kind::*;
pub use payload::*;
