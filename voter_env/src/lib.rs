//! Voter Model Environment Layer
//!
//! Shared vocabulary for the voter model workspace: node identifiers,
//! lattice coordinates, the binary opinion `Status`, the error type and
//! deterministic seed derivation.
//!
//! # Core Concept: One Seed, Many Streams
//!
//! Every source of randomness in a run is derived from a single 64-bit
//! master seed:
//! - **Topology**: which long-range edges are added
//! - **Initialization**: which nodes start with status 1
//! - **Dynamics**: which node copies which neighbor at each step
//!
//! Each stream is its own `ChaCha8Rng`, so changing the initial fraction
//! never perturbs the graph, and any run is reproducible from its seed.
//!
//! # Example
//!
//! ```ignore
//! use voter_env::SeedStreams;
//!
//! let streams = SeedStreams::new(3407);
//! let mut topology_rng = streams.topology_rng();
//! let mut dynamics_rng = streams.dynamics_rng();
//! ```

mod context;
mod error;
mod types;

pub use context::SeedStreams;
pub use error::{VoterError, VoterResult};
pub use types::{Coord, NodeId, Status};
