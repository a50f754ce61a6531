pub mod types;
pub mod rng;
pub mod odds;
pub mod processor;
pub mod vrf_engine;

pub use types::*;
pub use rng::{RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
pub use processor::GameProcessor;
pub use vrf_engine::{ProofLog, VrfBundle, VrfGameEngine, VrfRandomSource};
