use crate::config::Config;
use crate::error::Result;
use crate::events::Handled;
use std::sync::Arc;

use super::capture::CaptureArbiter;

/// Ориентация события прокрутки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

/// Trait for gesture sources feeding the capture arbiter.
///
/// Raw compositor callbacks answer with a tri-state [`Handled`]; the chain
/// stops at the first provider that handles the event.
#[async_trait::async_trait]
pub trait GestureProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Native compositor gesture (e.g. libinput swipe begin/update/end)
    fn on_native_gesture(&self, _kind: &str, _time_msec: u32, _args: &[f64]) -> Handled {
        Handled::NotHandled
    }

    /// Relative pointer motion
    fn on_motion(&self, _time_msec: u32, _delta_x: f64, _delta_y: f64) -> Handled {
        Handled::NotHandled
    }

    /// Scroll axis event
    fn on_axis(
        &self,
        _time_msec: u32,
        _orientation: AxisOrientation,
        _delta: f64,
        _delta_discrete: i32,
    ) -> Handled {
        Handled::NotHandled
    }

    /// Drop in-flight gestures that have not been validated yet
    fn reset(&self) {}

    /// Shell modifier pressed or released; providers that only work while
    /// the modifier is held arm and disarm themselves here
    fn on_modifiers(&self, _held: bool) {}

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) {}
}

/// Factory function creating the provider chain in dispatch order
pub fn create_providers(
    config: Arc<Config>,
    arbiter: Arc<CaptureArbiter>,
) -> Vec<Arc<dyn GestureProvider>> {
    let touchpad: Arc<dyn GestureProvider> = Arc::new(
        super::touchpad::TouchpadGestureProvider::new(Arc::clone(&config), Arc::clone(&arbiter)),
    );
    let pointer: Arc<dyn GestureProvider> = Arc::new(super::pointer::PointerGestureProvider::new(
        config.pointer,
        config.gestures.validate_threshold,
        arbiter,
    ));
    vec![touchpad, pointer]
}
