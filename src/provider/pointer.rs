use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::capture::CaptureArbiter;
use super::r#trait::{AxisOrientation, GestureProvider};
use crate::config::PointerConfig;
use crate::events::{GestureKind, GestureValues, Handled};
use crate::gestures::{Gesture, GestureEmitter, GestureSink};

/// Имя владельца захвата для жестов указателя
pub const POINTER_OWNER: &str = "pointer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerSource {
    Motion,
    Axis,
}

struct PointerGesture {
    source: PointerSource,
    emitter: GestureEmitter,
    delta_x: f64,
    delta_y: f64,
    last_event_msec: u32,
}

impl PointerGesture {
    fn new(source: PointerSource, validate_threshold: f64, time_msec: u32) -> Self {
        let kind = match source {
            PointerSource::Motion => GestureKind::Move,
            PointerSource::Axis => GestureKind::Swipe(2),
        };
        Self {
            source,
            emitter: GestureEmitter::new(kind, validate_threshold),
            delta_x: 0.0,
            delta_y: 0.0,
            last_event_msec: time_msec,
        }
    }

    fn values(&self) -> GestureValues {
        match self.source {
            PointerSource::Motion => GestureValues::Move {
                delta_x: self.delta_x,
                delta_y: self.delta_y,
            },
            PointerSource::Axis => GestureValues::SwipePinch {
                delta_x: self.delta_x,
                delta_y: self.delta_y,
                scale: 1.0,
            },
        }
    }
}

#[derive(Default)]
struct PointerState {
    armed: bool,
    active: Option<PointerGesture>,
}

/// Провайдер, превращающий движение указателя в move-1, а прокрутку в swipe-2,
/// пока оболочка держит его взведённым (например, зажат модификатор).
pub struct PointerGestureProvider {
    config: PointerConfig,
    validate_threshold: f64,
    arbiter: Arc<CaptureArbiter>,
    state: Mutex<PointerState>,
}

impl PointerGestureProvider {
    pub fn new(config: PointerConfig, validate_threshold: f64, arbiter: Arc<CaptureArbiter>) -> Self {
        Self {
            config,
            validate_threshold,
            arbiter,
            state: Mutex::new(PointerState::default()),
        }
    }

    pub fn arm(&self) {
        let mut state = self.state.lock();
        if !state.armed {
            debug!("Провайдер указателя взведён");
            state.armed = true;
        }
    }

    /// Снять взвод; активный жест завершается
    pub fn disarm(&self) {
        let mut state = self.state.lock();
        state.armed = false;
        if let Some(mut gesture) = state.active.take() {
            gesture.emitter.terminate();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    fn feed(&self, source: PointerSource, time_msec: u32, delta_x: f64, delta_y: f64) -> Handled {
        let validated = {
            let mut state = self.state.lock();
            if !state.armed {
                return Handled::NotHandled;
            }

            let idle_ms = self.config.idle_timeout_ms;
            let expired = state.active.as_ref().map_or(false, |g| {
                g.source != source || time_msec.wrapping_sub(g.last_event_msec) as u64 > idle_ms
            });
            if expired {
                if let Some(mut gesture) = state.active.take() {
                    debug!("Жест указателя #{} завершён", gesture.emitter.id());
                    gesture.emitter.terminate();
                }
            }

            let threshold = self.validate_threshold;
            let gesture = state
                .active
                .get_or_insert_with(|| PointerGesture::new(source, threshold, time_msec));
            gesture.delta_x += delta_x;
            gesture.delta_y += delta_y;
            gesture.last_event_msec = time_msec;

            let values = gesture.values();
            gesture
                .emitter
                .update(values)
                .then(|| gesture.emitter.subscribe())
        };

        // Арбитр вызывается без лока состояния
        if let Some(gesture) = validated {
            self.offer(gesture);
        }

        if self.arbiter.is_captured_by(POINTER_OWNER) {
            Handled::HandledExclusive
        } else {
            Handled::NotHandled
        }
    }

    fn offer(&self, gesture: Gesture) {
        if !self.arbiter.offer(POINTER_OWNER, gesture) {
            debug!("Жест указателя не захвачен");
        }
    }
}

#[async_trait::async_trait]
impl GestureProvider for PointerGestureProvider {
    fn name(&self) -> &'static str {
        POINTER_OWNER
    }

    fn on_motion(&self, time_msec: u32, delta_x: f64, delta_y: f64) -> Handled {
        let scale = self.config.motion_scale;
        self.feed(PointerSource::Motion, time_msec, delta_x / scale, delta_y / scale)
    }

    fn on_axis(
        &self,
        time_msec: u32,
        orientation: AxisOrientation,
        delta: f64,
        _delta_discrete: i32,
    ) -> Handled {
        let delta = delta / self.config.axis_scale;
        match orientation {
            AxisOrientation::Vertical => self.feed(PointerSource::Axis, time_msec, 0.0, delta),
            AxisOrientation::Horizontal => self.feed(PointerSource::Axis, time_msec, delta, 0.0),
        }
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        let pending = state.active.as_ref().map_or(false, |g| g.emitter.is_pending());
        if pending {
            if let Some(mut gesture) = state.active.take() {
                gesture.emitter.terminate();
            }
        }
    }

    fn on_modifiers(&self, held: bool) {
        if held {
            self.arm();
        } else {
            self.disarm();
        }
    }

    async fn stop(&self) {
        self.disarm();
    }
}
