// reflex_core/src/estimation/filters/mod.rs

pub mod delay_compensated;
pub mod open_loop;
