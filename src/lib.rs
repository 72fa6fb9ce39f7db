//! guard-jump library crate
//!
//! Finds the project root above a directory (memoized briefly), parses the
//! guard/rspec failure report under it, and drives "pick a failure, open the
//! file, jump to the line" against any host that implements [`host::Host`].

pub mod cache;
pub mod config;
pub mod host;
pub mod navigator;
pub mod report;
pub mod root;
pub mod terminal;
pub mod ui;
pub mod util;
pub mod wait;
