//! Table Resolution
//!
//! Backend schemas drift: the same logical resource has lived under
//! `posts`, `articles` and `post`. This module answers "which physical
//! table serves this resource right now":
//!
//! - **TableResolver**: free lookup (hard mapping → cached mapping → aliases)
//! - **ConnectivityProber**: sequential probing when the lookup is not enough
//!
//! # Resolution Order
//!
//! ```text
//! resolve("posts")
//!   1. hard mapping?   → use it, no network
//!   2. cached mapping? → use it, no network
//!   3. alias list      → probe [posts, articles, post], cache the winner
//! ```

pub mod prober;
pub mod table;

pub use prober::{
    AttemptResult, ConnectivityProber, ProbeAttempt, ProbeMode, ProbeOutcome, ProbeReport,
};
pub use table::{MappingOrigin, Resolution, TableResolver};
