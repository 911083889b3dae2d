use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::gestures::{Gesture, GestureSink};

/// Оболочка, решающая, принимать ли жест
pub trait GestureHandler: Send + Sync {
    /// `true` - жест захвачен оболочкой. Вызывается под локом арбитра,
    /// поэтому обратно в арбитр из обработчика обращаться нельзя.
    fn on_gesture(&self, gesture: Gesture) -> bool;
}

struct Captured {
    owner: &'static str,
    gesture: Gesture,
}

/// Арбитр эксклюзивного захвата: пока захваченный жест не завершён,
/// новые жесты ни от одного провайдера оболочке не предлагаются.
pub struct CaptureArbiter {
    handler: Arc<dyn GestureHandler>,
    captured: Mutex<Option<Captured>>,
}

impl CaptureArbiter {
    pub fn new(handler: Arc<dyn GestureHandler>) -> Arc<Self> {
        Arc::new(Self {
            handler,
            captured: Mutex::new(None),
        })
    }

    /// Есть ли незавершённый захваченный жест
    pub fn is_captured(&self) -> bool {
        self.captured_owner().is_some()
    }

    /// Захвачен ли жест именно этим провайдером
    pub fn is_captured_by(&self, owner: &str) -> bool {
        self.captured_owner() == Some(owner)
    }

    fn captured_owner(&self) -> Option<&'static str> {
        let mut captured = self.captured.lock();
        Self::release_terminated(&mut captured);
        captured.as_ref().map(|c| c.owner)
    }

    fn release_terminated(captured: &mut Option<Captured>) {
        if let Some(c) = captured.as_ref() {
            if c.gesture.is_terminated() {
                debug!("Захват жеста {} ({}) снят", c.gesture, c.owner);
                *captured = None;
            }
        }
    }
}

impl GestureSink for CaptureArbiter {
    fn offer(&self, owner: &'static str, gesture: Gesture) -> bool {
        let mut captured = self.captured.lock();
        Self::release_terminated(&mut captured);

        if let Some(current) = captured.as_ref() {
            debug!(
                "Жест {} от {} не предложен: захвачен {} от {}",
                gesture, owner, current.gesture, current.owner
            );
            return false;
        }

        if self.handler.on_gesture(gesture.clone()) {
            info!("Жест {} от {} захвачен", gesture, owner);
            *captured = Some(Captured { owner, gesture });
            true
        } else {
            debug!("Жест {} от {} отклонён оболочкой", gesture, owner);
            false
        }
    }
}
