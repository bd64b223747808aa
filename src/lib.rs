//! Apache Helper
//!
//! Sets up the usual pieces of a local Apache development environment:
//! enabling PHP, loading a per-user configuration file, adding virtual hosts
//! and mapping their domains in the hosts file. Every change is idempotent,
//! backed up first, and followed by an Apache restart where needed.
pub mod builders;
pub mod core;
pub mod utils;
