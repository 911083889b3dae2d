pub mod device;
pub mod sampler;
pub mod slot;
pub mod watcher;

pub use device::{TouchDevice, TOUCHPAD_OWNER};
pub use sampler::{AxisRange, Calibration, RawTouchEvent, TouchSampler};
pub use slot::TouchSlot;
pub use watcher::{plan_changes, DevicePlan, DeviceRegistry, DeviceScanner, DeviceWatcher, EvdevScanner};
