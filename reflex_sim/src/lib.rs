// reflex_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the reflex_sim crate.
pub mod prelude;

pub mod cli;
pub mod config;
pub mod controller;
pub mod episode;
pub mod logging;
pub mod prng;
pub mod sensor;
