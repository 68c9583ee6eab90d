//! Memory primitives shared by the host and the game module.

mod arena;

pub use arena::{Arena, ArenaMark};
