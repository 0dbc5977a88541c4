//! The Fire Weather Index calculation engine.
//!
//! Dependency-ordered stage pipeline over raster inputs: check inputs,
//! warp onto the predecessor grid, apply the closed-form index equations
//! per cell, persist at the resolver's address. Daily and hourly
//! cadences, forecast (model grid) and actual (station interpolated)
//! run types.

pub mod daily;
pub mod formulas;
pub mod grid;
pub mod hourly;
pub mod stage;

pub use daily::DailyFwiProcessor;
pub use formulas::{IndexFormulas, VanWagnerFormulas};
pub use hourly::HourlyFfmcProcessor;
pub use stage::{StageOutcome, StageReport, StageState};
