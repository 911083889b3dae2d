use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::events::GestureValues;
use crate::grid::SnapGrid;

/// Положение рабочей области: левый верхний угол (i, j), размер в клетках
/// и занятая окнами область
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceView {
    pub i: f64,
    pub j: f64,
    pub size: f64,
    pub min_i: f64,
    pub min_j: f64,
    pub max_i: f64,
    pub max_j: f64,
}

/// Отображаемое положение во время свайпа
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeFrame {
    pub i: f64,
    pub j: f64,
}

/// Итог свайпа: новая клетка и длительность анимации (если ось была выбрана)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeOutcome {
    pub i: i64,
    pub j: i64,
    pub duration: Option<Duration>,
}

/// Перелистывание рабочей области по сетке (i, j)
pub struct SwipeSession {
    size: f64,
    gesture_factor: f64,
    lock_dist: f64,
    min_dist: f64,
    // None, если область не помещается вдоль оси
    i_grid: Option<SnapGrid>,
    j_grid: Option<SnapGrid>,
    initial_x: f64,
    initial_y: f64,
    i: f64,
    j: f64,
    locked_x: Option<bool>,
}

impl SwipeSession {
    pub fn new(view: WorkspaceView, config: &Config) -> Self {
        let cells = view.size.round() as i64;
        let min_i = view.min_i.round() as i64;
        let min_j = view.min_j.round() as i64;
        let max_i = view.max_i.round() as i64 - (cells - 1);
        let max_j = view.max_j.round() as i64 - (cells - 1);

        let grid = |name: &str, lower: i64, upper: i64, initial: f64| {
            (upper >= lower).then(|| {
                SnapGrid::new(
                    name,
                    lower,
                    upper,
                    initial.round() as i64,
                    config.grid.swipe,
                    config.throw_params(),
                )
            })
        };

        Self {
            size: view.size,
            gesture_factor: config.interaction.gesture_factor,
            lock_dist: config.interaction.lock_dist,
            min_dist: config.grid.min_dist,
            i_grid: grid("i", min_i, max_i, view.i),
            j_grid: grid("j", min_j, max_j, view.j),
            initial_x: view.i,
            initial_y: view.j,
            i: view.i,
            j: view.j,
            locked_x: None,
        }
    }

    /// Ось выбрана: `Some(true)` - горизонталь
    pub fn locked_x(&self) -> Option<bool> {
        self.locked_x
    }

    pub fn update(&mut self, values: &GestureValues) -> SwipeFrame {
        self.update_at(values, Instant::now())
    }

    pub fn update_at(&mut self, values: &GestureValues, now: Instant) -> SwipeFrame {
        let (dx, dy) = (values.delta_x(), values.delta_y());
        let factor = self.gesture_factor * self.size;

        if self.locked_x.is_none() && dx * dx + dy * dy > self.lock_dist * self.lock_dist {
            let locked_x = dx.abs() > dy.abs();
            // Отсчёт от точки блокировки, без скачка
            if locked_x {
                self.initial_x += factor * dx;
            } else {
                self.initial_y += factor * dy;
            }
            debug!("Свайп: ось {} выбрана", if locked_x { "i" } else { "j" });
            self.locked_x = Some(locked_x);
        }

        match self.locked_x {
            Some(true) => self.i = self.initial_x - factor * dx,
            Some(false) => self.j = self.initial_y - factor * dy,
            None => {}
        }

        SwipeFrame {
            i: match self.i_grid.as_mut() {
                Some(grid) => grid.at_instant(self.i, now),
                None => self.i,
            },
            j: match self.j_grid.as_mut() {
                Some(grid) => grid.at_instant(self.j, now),
                None => self.j,
            },
        }
    }

    pub fn finish(self) -> SwipeOutcome {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(self, now: Instant) -> SwipeOutcome {
        let throw_dist_max = self.size - self.min_dist;
        let ti = self.i_grid.map(|g| g.finalize_at(throw_dist_max, now));
        let tj = self.j_grid.map(|g| g.finalize_at(throw_dist_max, now));

        let mut i = ti.map_or(self.initial_x.round() as i64, |t| t.target);
        let mut j = tj.map_or(self.initial_y.round() as i64, |t| t.target);

        let duration = match self.locked_x {
            Some(true) => {
                j = self.initial_y.round() as i64;
                ti.map(|t| t.duration)
            }
            Some(false) => {
                i = self.initial_x.round() as i64;
                tj.map(|t| t.duration)
            }
            None => None,
        };

        SwipeOutcome { i, j, duration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(size: f64, max: f64) -> WorkspaceView {
        WorkspaceView {
            i: 0.0,
            j: 0.0,
            size,
            min_i: 0.0,
            min_j: 0.0,
            max_i: max,
            max_j: max,
        }
    }

    fn moved(delta_x: f64, delta_y: f64) -> GestureValues {
        GestureValues::Move { delta_x, delta_y }
    }

    #[test]
    fn test_small_motion_does_not_lock() {
        let mut session = SwipeSession::new(view(1.0, 3.0), &Config::default());
        let frame = session.update(&moved(-0.005, 0.0));
        assert_eq!(session.locked_x(), None);
        assert_eq!(frame, SwipeFrame { i: 0.0, j: 0.0 });
    }

    #[test]
    fn test_locked_axis_moves_without_jump() {
        let t0 = Instant::now();
        let mut session = SwipeSession::new(view(1.0, 3.0), &Config::default());

        let frame = session.update_at(&moved(-0.1, 0.01), t0);
        assert_eq!(session.locked_x(), Some(true));
        assert!(frame.i.abs() < 1e-9);

        // i = 4 * 0.1, при m = 1 отображается y^2
        let frame = session.update_at(&moved(-0.2, 0.05), t0 + Duration::from_millis(20));
        assert!((frame.i - 0.16).abs() < 1e-9);
        assert_eq!(frame.j, 0.0);

        let outcome = session.finish_at(t0 + Duration::from_millis(30));
        assert_eq!(outcome.i, 1);
        assert_eq!(outcome.j, 0);
        assert!(outcome.duration.is_some());
    }

    #[test]
    fn test_vertical_lock_keeps_i() {
        let t0 = Instant::now();
        let mut session = SwipeSession::new(view(1.0, 3.0), &Config::default());
        session.update_at(&moved(0.0, -0.05), t0);
        session.update_at(&moved(0.01, -0.3), t0 + Duration::from_millis(400));
        assert_eq!(session.locked_x(), Some(false));

        // Палец остановился: броска нет, ближайшая клетка
        let outcome = session.finish_at(t0 + Duration::from_secs(2));
        assert_eq!(outcome.i, 0);
        assert_eq!(outcome.j, 1);
    }

    #[test]
    fn test_oversized_workspace_has_no_grid() {
        let mut session = SwipeSession::new(view(4.0, 2.0), &Config::default());
        let frame = session.update(&moved(-0.1, 0.0));
        assert_eq!(session.locked_x(), Some(true));
        // Ось без сетки: координата без примагничивания
        assert!(frame.i.abs() < 1e-9);

        let outcome = session.finish();
        assert_eq!(outcome.i, 0);
    }
}
