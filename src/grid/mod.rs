mod hysteresis;
mod snap_grid;

pub use hysteresis::Hysteresis;
pub use snap_grid::{SnapGrid, Throw, ThrowParams};
