pub mod cli;
pub mod diff;
pub mod neatify;
pub mod telemetry;
