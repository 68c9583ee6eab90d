//! Tiamat shared crate.
//!
//! The contract between the host process and the hot-reloadable game module:
//! packed colors, the arena allocator, the render-command protocol, the input
//! snapshot, and the C ABI surface. Both sides depend on this crate and on
//! nothing else of each other.

pub mod abi;
pub mod color;
pub mod commands;
pub mod input;
pub mod memory;
