//! Data models for Heroes

mod event;
mod identity;
mod news;
mod ngo;
mod registration;

pub use event::*;
pub use identity::*;
pub use news::*;
pub use ngo::*;
pub use registration::*;
