//! # mailattic-dirstore
//!
//! Directory-tree backend for the `mailattic` engine. Each store is a
//! directory under one storage root, each canonical subfolder a
//! subdirectory, each message a single RFC 822-style file:
//!
//! ```text
//! root/
//!   andyw@glawster.com (2024)/
//!     Inbox/
//!       0001.eml
//!     Sent Items/
//! ```
//!
//! Send dates come from the `Date:` header, receive dates from file
//! modification time, and moves are plain renames with a copy-and-remove
//! fallback for paths that cross filesystems.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod message;
mod session;
mod store;

pub use message::write_message;
pub use session::DirConnector;
