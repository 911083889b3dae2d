pub mod gesture;
pub mod touch;

pub use gesture::{Channel, GestureKind, GestureValues, Handled};
pub use touch::{TouchPoint, TouchSnapshot};
