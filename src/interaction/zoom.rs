use std::time::Instant;

use crate::config::Config;
use crate::events::GestureValues;
use crate::grid::{Hysteresis, SnapGrid, Throw};

/// Кадр масштабирования: отображаемый размер и устойчивая точка отсчёта
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomFrame {
    pub size: f64,
    pub size_origin: i64,
}

/// Масштабирование рабочей области вертикальным свайпом
pub struct ZoomSession {
    grid: SnapGrid,
    hysteresis: Hysteresis,
    gesture_factor: f64,
    initial_size: i64,
    displayed: f64,
}

impl ZoomSession {
    /// `min_size` - размер, меньше которого не сжимать (например, по фокусному окну)
    pub fn new(size: f64, min_size: i64, config: &Config) -> Self {
        let initial_size = size.round() as i64;
        let min_size = min_size.clamp(1, initial_size.max(1));

        Self {
            grid: SnapGrid::new(
                "size",
                min_size,
                initial_size + 1,
                initial_size,
                config.grid.zoom,
                config.throw_params(),
            ),
            hysteresis: Hysteresis::new(config.grid.hysteresis, size),
            gesture_factor: config.interaction.gesture_factor,
            initial_size,
            displayed: size,
        }
    }

    pub fn initial_size(&self) -> i64 {
        self.initial_size
    }

    pub fn update(&mut self, values: &GestureValues) -> ZoomFrame {
        self.update_at(values, Instant::now())
    }

    pub fn update_at(&mut self, values: &GestureValues, now: Instant) -> ZoomFrame {
        let size = self.initial_size as f64 - self.gesture_factor * values.delta_y();
        // Точка отсчёта следует за предыдущим отображаемым размером
        let size_origin = self.hysteresis.apply(self.displayed);
        self.displayed = self.grid.at_instant(size, now);

        ZoomFrame {
            size: self.displayed,
            size_origin,
        }
    }

    pub fn finish(self) -> Throw {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(self, now: Instant) -> Throw {
        self.grid.finalize_at(f64::INFINITY, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn swipe(delta_y: f64) -> GestureValues {
        GestureValues::Swipe {
            delta_x: 0.0,
            delta_y,
            delta2_s: delta_y * delta_y,
        }
    }

    #[test]
    fn test_zoom_in_with_hysteresis() {
        let t0 = Instant::now();
        let mut session = ZoomSession::new(2.0, 1, &Config::default());

        let frame = session.update_at(&swipe(0.1), t0);
        // size = 2 - 0.4 = 1.6 -> 1 + 0.6^2
        assert!((frame.size - 1.36).abs() < 1e-9);
        assert_eq!(frame.size_origin, 2);

        let frame = session.update_at(&swipe(0.2), t0 + Duration::from_millis(10));
        assert!((frame.size - 1.04).abs() < 1e-9);
        assert_eq!(frame.size_origin, 1);

        let throw = session.finish_at(t0 + Duration::from_millis(20));
        assert_eq!(throw.target, 1);
        assert!(throw.duration < Duration::from_millis(10));
    }

    #[test]
    fn test_zoom_out_limited_to_one_step() {
        let t0 = Instant::now();
        let mut session = ZoomSession::new(2.0, 1, &Config::default());
        session.update_at(&swipe(-0.5), t0);
        let throw = session.finish_at(t0 + Duration::from_secs(1));
        assert_eq!(throw.target, 3);
    }

    #[test]
    fn test_untouched_session_keeps_size() {
        let session = ZoomSession::new(3.0, 5, &Config::default());
        assert_eq!(session.initial_size(), 3);
        let throw = session.finish();
        assert_eq!(throw.target, 3);
        assert_eq!(throw.duration, Duration::ZERO);
    }
}
