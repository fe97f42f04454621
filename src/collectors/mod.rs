/// Byte stream sources: file, container and unit log followers
pub mod source;

/// Per-source follower task
pub mod follower;

pub use follower::{Follower, FollowerExit, DEFAULT_READ_BUFFER_BYTES};
pub use source::{ByteStream, ByteStreamSource, LogSource};
