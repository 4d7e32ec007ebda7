//! Types for sift-corpus

mod article;
mod case;
mod decision;
mod entry;
mod event;
pub mod ids;
mod log;

pub use article::*;
pub use case::*;
pub use decision::*;
pub use entry::*;
pub use event::*;
pub use log::*;
