//! Social platform publishers
//!
//! Instagram is the one live integration. Facebook and Pinterest ship as
//! disabled publishers so the engine can report them as skipped instead of
//! failing runs that target them.

mod facebook;
mod instagram;
mod pinterest;

pub use facebook::FacebookPublisher;
pub use instagram::InstagramPublisher;
pub use pinterest::PinterestPublisher;
