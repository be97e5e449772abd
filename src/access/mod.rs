//! Device access shared by discovery and the conceal operation:
//! namespace aliases and exclusive opens.

mod opener;
mod resolver;

pub use opener::{open_exclusive, retry_open};
pub use resolver::{alias_name, resolve, Disambiguator, DosAlias};
