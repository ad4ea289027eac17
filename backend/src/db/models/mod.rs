//! Stored document types plus the link platform registry.

pub mod profile;
pub mod social_link;

pub use self::profile::*;
pub use self::social_link::*;
