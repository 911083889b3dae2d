pub mod classifier;
pub mod gesture;
pub mod lowpass;
pub mod variants;

pub use classifier::GestureClassifier;
pub use gesture::{Gesture, GestureEmitter, GesturePhase, GestureState};
pub use lowpass::{Lowpass, LowpassFilter, LowpassGesture};
pub use variants::{ActiveGesture, Progress};

/// Получатель жестов, прошедших валидацию (арбитр захвата)
pub trait GestureSink: Send + Sync {
    /// Предложить жест; `true` если он захвачен
    fn offer(&self, owner: &'static str, gesture: Gesture) -> bool;
}
