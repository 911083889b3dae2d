use std::time::{Duration, Instant};
use tracing::debug;

use super::gesture::GestureEmitter;
use crate::config::GesturesConfig;
use crate::events::{GestureKind, GestureValues, TouchSnapshot};

/// Результат обработки снимка активным жестом
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Terminate,
}

/// Перемещение одним пальцем
pub struct SingleFingerMove {
    emitter: GestureEmitter,
    initial_x: f64,
    initial_y: f64,
}

impl SingleFingerMove {
    fn begin(snapshot: &TouchSnapshot, validate_threshold: f64) -> Option<Self> {
        if snapshot.touch_count != 1 || snapshot.touches.len() != 1 {
            return None;
        }
        let touch = snapshot.touches[0];
        Some(Self {
            emitter: GestureEmitter::new(GestureKind::Move, validate_threshold),
            initial_x: touch.x,
            initial_y: touch.y,
        })
    }

    fn process(&mut self, snapshot: &TouchSnapshot) -> Progress {
        if snapshot.touch_count != 1 {
            return Progress::Terminate;
        }
        // Кадр без касания или с лишним касанием тоже завершает жест
        let [touch] = snapshot.touches.as_slice() else {
            return Progress::Terminate;
        };

        self.emitter.update(GestureValues::Move {
            delta_x: touch.x - self.initial_x,
            delta_y: touch.y - self.initial_y,
        });
        Progress::Continue
    }
}

/// Свайп двумя пальцами с масштабом по расстоянию между ними
pub struct TwoFingerSwipePinch {
    emitter: GestureEmitter,
    min_dist: f64,
    initial_cog_x: f64,
    initial_cog_y: f64,
    initial_dist: f64,
}

impl TwoFingerSwipePinch {
    fn begin(snapshot: &TouchSnapshot, config: &GesturesConfig) -> Option<Self> {
        if snapshot.touch_count != 2 || snapshot.touches.len() != 2 {
            return None;
        }
        let (cog_x, cog_y, dist) = Self::measure(snapshot, config.two_finger_min_dist);
        Some(Self {
            emitter: GestureEmitter::new(GestureKind::Swipe(2), config.validate_threshold),
            min_dist: config.two_finger_min_dist,
            initial_cog_x: cog_x,
            initial_cog_y: cog_y,
            initial_dist: dist,
        })
    }

    /// Центр масс и расстояние между пальцами (не меньше `min_dist`)
    fn measure(snapshot: &TouchSnapshot, min_dist: f64) -> (f64, f64, f64) {
        let (a, b) = (&snapshot.touches[0], &snapshot.touches[1]);
        let cog_x = (a.x + b.x) / 2.0;
        let cog_y = (a.y + b.y) / 2.0;
        let dist = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        (cog_x, cog_y, dist.max(min_dist))
    }

    fn process(&mut self, snapshot: &TouchSnapshot) -> Progress {
        if snapshot.touch_count != 2 {
            return Progress::Terminate;
        }
        if snapshot.touches.len() != 2 {
            return Progress::Continue;
        }

        let (cog_x, cog_y, dist) = Self::measure(snapshot, self.min_dist);
        self.emitter.update(GestureValues::SwipePinch {
            delta_x: cog_x - self.initial_cog_x,
            delta_y: cog_y - self.initial_cog_y,
            scale: dist / self.initial_dist,
        });
        Progress::Continue
    }
}

/// Свайп тремя и более пальцами; накапливает смещения по совпадающим tracking id
pub struct HigherSwipe {
    emitter: GestureEmitter,
    fingers: usize,
    began: Instant,
    upgrade_delay: Duration,
    previous: TouchSnapshot,
    delta_x: f64,
    delta_y: f64,
    delta2_s: f64,
}

impl HigherSwipe {
    fn begin(snapshot: &TouchSnapshot, config: &GesturesConfig) -> Option<Self> {
        if snapshot.touch_count < 3 {
            return None;
        }
        let fingers = snapshot.touch_count.min(GestureKind::MAX_FINGERS as usize);
        Some(Self {
            emitter: GestureEmitter::new(GestureKind::Swipe(fingers as u8), config.validate_threshold),
            fingers,
            began: snapshot.timestamp,
            upgrade_delay: config.upgrade_delay(),
            previous: snapshot.clone(),
            delta_x: 0.0,
            delta_y: 0.0,
            delta2_s: 0.0,
        })
    }

    fn process(&mut self, snapshot: &TouchSnapshot) -> Progress {
        if snapshot.touch_count == 0 {
            return Progress::Terminate;
        }

        // Пальцы касаются не одновременно: повышаем число только в начале жеста
        if snapshot.touch_count > self.fingers {
            let elapsed = snapshot.timestamp.saturating_duration_since(self.began);
            if elapsed >= self.upgrade_delay {
                let fingers = snapshot.touch_count.min(GestureKind::MAX_FINGERS as usize);
                if fingers > self.fingers {
                    debug!(
                        "Свайп #{}: {} -> {} пальцев через {:?}",
                        self.emitter.id(),
                        self.fingers,
                        fingers,
                        elapsed
                    );
                    self.fingers = fingers;
                    self.emitter.set_kind(GestureKind::Swipe(fingers as u8));
                }
            }
        }

        if snapshot.touches.is_empty() {
            return Progress::Continue;
        }

        let (mut dx, mut dy, mut d2s) = (0.0, 0.0, 0.0);
        for touch in &snapshot.touches {
            if let Some(prev) = self.previous.find(touch.tracking_id) {
                let (ddx, ddy) = (touch.x - prev.x, touch.y - prev.y);
                dx += ddx;
                dy += ddy;
                d2s += ddx * ddx + ddy * ddy;
            }
        }

        let n = self.fingers as f64;
        self.delta_x += dx / n;
        self.delta_y += dy / n;
        self.delta2_s += d2s / n;
        self.emitter.update(GestureValues::Swipe {
            delta_x: self.delta_x,
            delta_y: self.delta_y,
            delta2_s: self.delta2_s,
        });

        self.previous = snapshot.clone();
        Progress::Continue
    }
}

/// Жест, который сейчас ведёт классификатор одного устройства
pub enum ActiveGesture {
    Move(SingleFingerMove),
    SwipePinch(TwoFingerSwipePinch),
    Swipe(HigherSwipe),
}

impl ActiveGesture {
    /// Классифицировать снимок; `None` если ни один вариант не подходит
    pub fn begin(snapshot: &TouchSnapshot, config: &GesturesConfig) -> Option<Self> {
        if let Some(g) = SingleFingerMove::begin(snapshot, config.validate_threshold) {
            return Some(ActiveGesture::Move(g));
        }
        if let Some(g) = TwoFingerSwipePinch::begin(snapshot, config) {
            return Some(ActiveGesture::SwipePinch(g));
        }
        HigherSwipe::begin(snapshot, config).map(ActiveGesture::Swipe)
    }

    pub fn process(&mut self, snapshot: &TouchSnapshot) -> Progress {
        match self {
            ActiveGesture::Move(g) => g.process(snapshot),
            ActiveGesture::SwipePinch(g) => g.process(snapshot),
            ActiveGesture::Swipe(g) => g.process(snapshot),
        }
    }

    pub fn emitter(&self) -> &GestureEmitter {
        match self {
            ActiveGesture::Move(g) => &g.emitter,
            ActiveGesture::SwipePinch(g) => &g.emitter,
            ActiveGesture::Swipe(g) => &g.emitter,
        }
    }

    fn emitter_mut(&mut self) -> &mut GestureEmitter {
        match self {
            ActiveGesture::Move(g) => &mut g.emitter,
            ActiveGesture::SwipePinch(g) => &mut g.emitter,
            ActiveGesture::Swipe(g) => &mut g.emitter,
        }
    }

    pub fn kind(&self) -> GestureKind {
        self.emitter().kind()
    }

    pub fn is_pending(&self) -> bool {
        self.emitter().is_pending()
    }

    pub fn terminate(&mut self) {
        self.emitter_mut().terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TouchPoint;
    use crate::gestures::GesturePhase;

    fn config() -> GesturesConfig {
        GesturesConfig::default()
    }

    fn snap(at: Instant, count: usize, touches: &[(i32, f64, f64)]) -> TouchSnapshot {
        TouchSnapshot::new(
            at,
            count,
            touches.iter().map(|&(id, x, y)| TouchPoint::new(id, x, y, 1.0)),
        )
    }

    #[test]
    fn test_classify_by_finger_count() {
        let now = Instant::now();
        let cfg = config();

        assert!(matches!(
            ActiveGesture::begin(&snap(now, 1, &[(1, 0.5, 0.5)]), &cfg),
            Some(ActiveGesture::Move(_))
        ));
        assert!(matches!(
            ActiveGesture::begin(&snap(now, 2, &[(1, 0.4, 0.5), (2, 0.6, 0.5)]), &cfg),
            Some(ActiveGesture::SwipePinch(_))
        ));
        let three = ActiveGesture::begin(&snap(now, 3, &[(1, 0.1, 0.1)]), &cfg);
        assert_eq!(three.map(|g| g.kind()), Some(GestureKind::Swipe(3)));

        // Одно касание без позиции не классифицируется
        assert!(ActiveGesture::begin(&snap(now, 1, &[]), &cfg).is_none());
        assert!(ActiveGesture::begin(&snap(now, 0, &[]), &cfg).is_none());
    }

    #[test]
    fn test_move_reports_offset_from_start() {
        let now = Instant::now();
        let mut gesture = ActiveGesture::begin(&snap(now, 1, &[(1, 0.5, 0.5)]), &config()).unwrap();
        let handle = gesture.emitter().subscribe();

        assert_eq!(gesture.process(&snap(now, 1, &[(1, 0.51, 0.5)])), Progress::Continue);
        assert!(gesture.is_pending());

        gesture.process(&snap(now, 1, &[(1, 0.55, 0.5)]));
        assert!(!gesture.is_pending());
        gesture.process(&snap(now, 1, &[(1, 0.60, 0.45)]));

        let values = handle.values().unwrap();
        assert!((values.delta_x() - 0.05).abs() < 1e-9);
        assert!((values.delta_y() + 0.05).abs() < 1e-9);

        assert_eq!(gesture.process(&snap(now, 2, &[])), Progress::Terminate);
    }

    #[test]
    fn test_move_ends_without_exactly_one_touch() {
        let now = Instant::now();
        let cfg = config();

        let mut gesture = ActiveGesture::begin(&snap(now, 1, &[(1, 0.5, 0.5)]), &cfg).unwrap();
        let frame = snap(now, 1, &[(1, 0.5, 0.5), (2, 0.9, 0.9)]);
        assert_eq!(gesture.process(&frame), Progress::Terminate);

        let mut gesture = ActiveGesture::begin(&snap(now, 1, &[(1, 0.5, 0.5)]), &cfg).unwrap();
        assert_eq!(gesture.process(&snap(now, 1, &[])), Progress::Terminate);
    }

    #[test]
    fn test_pinch_scale_and_min_distance() {
        let now = Instant::now();
        let cfg = config();
        // Пальцы почти в одной точке: расстояние поднимается до two_finger_min_dist
        let mut gesture =
            ActiveGesture::begin(&snap(now, 2, &[(1, 0.5, 0.5), (2, 0.52, 0.5)]), &cfg).unwrap();
        let handle = gesture.emitter().subscribe();

        gesture.process(&snap(now, 2, &[(1, 0.4, 0.5), (2, 0.6, 0.5)]));
        // scale = 0.2 / 0.1 = 2, после валидации отсчитывается от 1
        assert_eq!(handle.values().and_then(|v| v.scale()), Some(1.0));

        gesture.process(&snap(now, 2, &[(1, 0.35, 0.5), (2, 0.65, 0.5)]));
        let scale = handle.values().and_then(|v| v.scale()).unwrap();
        assert!((scale - 2.0).abs() < 1e-9);

        // Кадр с одним касанием не обновляет значения
        assert_eq!(gesture.process(&snap(now, 2, &[(1, 0.0, 0.0)])), Progress::Continue);
        assert!((handle.values().and_then(|v| v.scale()).unwrap() - 2.0).abs() < 1e-9);

        assert_eq!(gesture.process(&snap(now, 3, &[])), Progress::Terminate);
    }

    #[test]
    fn test_higher_swipe_averages_matched_touches() {
        let now = Instant::now();
        let start = [(1, 0.2, 0.5), (2, 0.4, 0.5), (3, 0.6, 0.5)];
        let mut gesture = ActiveGesture::begin(&snap(now, 3, &start), &config()).unwrap();
        let handle = gesture.emitter().subscribe();

        gesture.process(&snap(now, 3, &[(1, 0.23, 0.5), (2, 0.43, 0.5), (3, 0.63, 0.5)]));
        assert!(!gesture.is_pending());
        // Неизвестный id 9 не учитывается
        gesture.process(&snap(now, 3, &[(1, 0.26, 0.5), (2, 0.46, 0.5), (9, 0.9, 0.9)]));

        let values = handle.values().unwrap();
        // Второй кадр: (0.03 + 0.03) / 3
        assert!((values.delta_x() - 0.02).abs() < 1e-9);
        assert_eq!(values.delta_y(), 0.0);

        assert_eq!(gesture.process(&snap(now, 0, &[])), Progress::Terminate);
    }

    #[test]
    fn test_higher_swipe_upgrade_waits_for_delay() {
        let t0 = Instant::now();
        let cfg = config();
        let mut gesture = ActiveGesture::begin(&snap(t0, 3, &[(1, 0.2, 0.5)]), &cfg).unwrap();

        gesture.process(&snap(t0 + Duration::from_millis(50), 4, &[(1, 0.2, 0.5)]));
        assert_eq!(gesture.kind(), GestureKind::Swipe(3));

        gesture.process(&snap(t0 + Duration::from_millis(250), 4, &[(1, 0.2, 0.5)]));
        assert_eq!(gesture.kind(), GestureKind::Swipe(4));

        // Уменьшение числа пальцев не понижает вид
        gesture.process(&snap(t0 + Duration::from_millis(300), 3, &[(1, 0.2, 0.5)]));
        assert_eq!(gesture.kind(), GestureKind::Swipe(4));
    }

    #[test]
    fn test_higher_swipe_caps_fingers() {
        let now = Instant::now();
        let gesture = ActiveGesture::begin(&snap(now, 7, &[]), &config()).unwrap();
        assert_eq!(gesture.kind(), GestureKind::Swipe(5));
    }

    #[test]
    fn test_terminate_notifies_subscribers() {
        let now = Instant::now();
        let mut gesture = ActiveGesture::begin(&snap(now, 1, &[(1, 0.5, 0.5)]), &config()).unwrap();
        let handle = gesture.emitter().subscribe();
        gesture.terminate();
        assert_eq!(handle.state().phase, GesturePhase::Terminated);
    }
}
