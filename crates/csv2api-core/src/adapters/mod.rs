//! Remote API adapters.

pub mod clearpass;

pub use clearpass::{ClearPassClient, Credentials};
