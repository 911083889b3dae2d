use tracing::debug;

use super::gesture::Gesture;
use super::variants::{ActiveGesture, Progress};
use crate::config::GesturesConfig;
use crate::events::{GestureKind, TouchSnapshot};
use crate::trace_if_enabled;

/// Классификатор жестов одного тачпада: не больше одного активного жеста.
pub struct GestureClassifier {
    device: String,
    config: GesturesConfig,
    active: Option<ActiveGesture>,
}

impl GestureClassifier {
    pub fn new(device: impl Into<String>, config: GesturesConfig) -> Self {
        Self {
            device: device.into(),
            config,
            active: None,
        }
    }

    /// Обработать снимок. Возвращает жест, который прошёл валидацию именно
    /// на этом снимке; его нужно предложить арбитру захвата.
    pub fn on_snapshot(&mut self, snapshot: &TouchSnapshot) -> Option<Gesture> {
        trace_if_enabled!("{}: {}", self.device, snapshot);

        if let Some(active) = self.active.as_mut() {
            let was_pending = active.is_pending();
            match active.process(snapshot) {
                Progress::Continue => {
                    if was_pending && !active.is_pending() {
                        return Some(active.emitter().subscribe());
                    }
                    return None;
                }
                Progress::Terminate => {
                    debug!("{}: жест {} завершён", self.device, active.kind());
                    active.terminate();
                    self.active = None;
                }
            }
        }

        // Тот же снимок сразу классифицируется заново
        self.active = ActiveGesture::begin(snapshot, &self.config);
        if let Some(active) = &self.active {
            debug!("{}: начат жест {}", self.device, active.kind());
        }
        None
    }

    /// Сбросить жест, ещё не прошедший валидацию. Подтверждённые жесты не трогаются.
    pub fn reset(&mut self) -> bool {
        match self.active.as_mut() {
            Some(active) if active.is_pending() => {
                debug!("{}: сброс неподтверждённого жеста {}", self.device, active.kind());
                active.terminate();
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Завершить любой активный жест (устройство пропало или останавливается)
    pub fn shutdown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.terminate();
        }
    }

    pub fn active_kind(&self) -> Option<GestureKind> {
        self.active.as_ref().map(ActiveGesture::kind)
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TouchPoint;
    use std::time::Instant;

    fn snap(count: usize, touches: &[(i32, f64, f64)]) -> TouchSnapshot {
        TouchSnapshot::new(
            Instant::now(),
            count,
            touches.iter().map(|&(id, x, y)| TouchPoint::new(id, x, y, 1.0)),
        )
    }

    fn classifier() -> GestureClassifier {
        GestureClassifier::new("test-pad", GesturesConfig::default())
    }

    #[test]
    fn test_validated_gesture_reported_once() {
        let mut c = classifier();
        assert!(c.on_snapshot(&snap(1, &[(1, 0.5, 0.5)])).is_none());
        assert_eq!(c.active_kind(), Some(GestureKind::Move));

        assert!(c.on_snapshot(&snap(1, &[(1, 0.505, 0.5)])).is_none());
        let gesture = c.on_snapshot(&snap(1, &[(1, 0.6, 0.5)]));
        assert_eq!(gesture.as_ref().map(Gesture::kind), Some(GestureKind::Move));
        assert!(c.on_snapshot(&snap(1, &[(1, 0.7, 0.5)])).is_none());
    }

    #[test]
    fn test_reclassify_on_finger_change() {
        let mut c = classifier();
        c.on_snapshot(&snap(1, &[(1, 0.5, 0.5)]));
        let first = c.on_snapshot(&snap(1, &[(1, 0.6, 0.5)])).unwrap();

        c.on_snapshot(&snap(2, &[(1, 0.6, 0.5), (2, 0.8, 0.5)]));
        assert!(first.is_terminated());
        assert_eq!(c.active_kind(), Some(GestureKind::Swipe(2)));

        c.on_snapshot(&snap(0, &[]));
        assert_eq!(c.active_kind(), None);
    }

    #[test]
    fn test_reset_drops_only_pending() {
        let mut c = classifier();
        c.on_snapshot(&snap(1, &[(1, 0.5, 0.5)]));
        assert!(c.reset());
        assert_eq!(c.active_kind(), None);

        c.on_snapshot(&snap(1, &[(1, 0.5, 0.5)]));
        let validated = c.on_snapshot(&snap(1, &[(1, 0.6, 0.5)])).unwrap();
        assert!(!c.reset());
        assert!(!validated.is_terminated());
        assert_eq!(c.active_kind(), Some(GestureKind::Move));
    }

    #[test]
    fn test_shutdown_terminates_validated() {
        let mut c = classifier();
        c.on_snapshot(&snap(1, &[(1, 0.5, 0.5)]));
        let gesture = c.on_snapshot(&snap(1, &[(1, 0.6, 0.5)])).unwrap();
        c.shutdown();
        assert!(gesture.is_terminated());
        assert_eq!(c.active_kind(), None);
    }
}
