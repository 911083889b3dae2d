use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::events::GestureValues;
use crate::grid::{Hysteresis, SnapGrid, Throw};

/// На сколько клеток окно можно сдвинуть за один жест
const MOVE_REACH: f64 = 3.0;

/// Положение и размер окна на сетке рабочих областей, в клетках
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileView {
    pub i: f64,
    pub j: f64,
    pub w: f64,
    pub h: f64,
}

/// Отображаемое окно во время жеста
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFrame {
    pub view: TileView,
    /// Устойчивая точка отсчёта масштаба; только при изменении размера
    pub scale_origin: Option<(i64, i64)>,
}

/// Итоговое положение окна и длительность анимации к нему
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileOutcome {
    pub i: i64,
    pub j: i64,
    pub w: i64,
    pub h: i64,
    pub duration: Duration,
}

fn position_grid(name: &str, value: f64, config: &Config) -> SnapGrid {
    SnapGrid::new(
        name,
        (value - MOVE_REACH).round() as i64,
        (value + MOVE_REACH).round() as i64,
        value.round() as i64,
        config.grid.move_grid,
        config.throw_params(),
    )
}

fn size_grid(name: &str, value: f64, config: &Config) -> SnapGrid {
    SnapGrid::new(
        name,
        1,
        (value + MOVE_REACH).round() as i64,
        value.round() as i64,
        config.grid.resize,
        config.throw_params(),
    )
}

fn longest(throws: &[Throw]) -> Duration {
    throws
        .iter()
        .map(|t| t.duration)
        .max()
        .unwrap_or(Duration::ZERO)
}

/// Сжатие меньше одной клетки переворачивается в рост в обратную сторону
fn grow(origin: f64, size: f64, delta: f64) -> (f64, f64) {
    let size = size + delta;
    if size < 1.0 {
        let d = 1.0 - size;
        (origin - d, 1.0 + d)
    } else {
        (origin, size)
    }
}

/// Перемещение окна по сетке
pub struct MoveSession {
    initial: TileView,
    gesture_factor: f64,
    i_grid: SnapGrid,
    j_grid: SnapGrid,
    frame: TileView,
}

impl MoveSession {
    pub fn new(tile: TileView, config: &Config) -> Self {
        Self {
            initial: tile,
            gesture_factor: config.interaction.gesture_factor,
            i_grid: position_grid("i", tile.i, config),
            j_grid: position_grid("j", tile.j, config),
            frame: tile,
        }
    }

    pub fn update(&mut self, values: &GestureValues) -> TileFrame {
        self.update_at(values, Instant::now())
    }

    pub fn update_at(&mut self, values: &GestureValues, now: Instant) -> TileFrame {
        let i = self.initial.i + self.gesture_factor * values.delta_x();
        let j = self.initial.j + self.gesture_factor * values.delta_y();
        self.frame.i = self.i_grid.at_instant(i, now);
        self.frame.j = self.j_grid.at_instant(j, now);

        TileFrame {
            view: self.frame,
            scale_origin: None,
        }
    }

    pub fn finish(self) -> TileOutcome {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(self, now: Instant) -> TileOutcome {
        let ti = self.i_grid.finalize_at(f64::INFINITY, now);
        let tj = self.j_grid.finalize_at(f64::INFINITY, now);
        debug!("Перемещение: клетка ({}, {})", ti.target, tj.target);

        TileOutcome {
            i: ti.target,
            j: tj.target,
            w: self.initial.w.round() as i64,
            h: self.initial.h.round() as i64,
            duration: longest(&[ti, tj]),
        }
    }
}

/// Изменение размера окна; левый верхний угол сдвигается,
/// когда окно сжимают меньше одной клетки
pub struct ResizeSession {
    initial: TileView,
    gesture_factor: f64,
    i_grid: SnapGrid,
    j_grid: SnapGrid,
    w_grid: SnapGrid,
    h_grid: SnapGrid,
    hyst_w: Hysteresis,
    hyst_h: Hysteresis,
    frame: TileView,
}

impl ResizeSession {
    pub fn new(tile: TileView, config: &Config) -> Self {
        Self {
            initial: tile,
            gesture_factor: config.interaction.gesture_factor,
            i_grid: position_grid("i", tile.i, config),
            j_grid: position_grid("j", tile.j, config),
            w_grid: size_grid("w", tile.w, config),
            h_grid: size_grid("h", tile.h, config),
            hyst_w: Hysteresis::new(config.grid.hysteresis, tile.w),
            hyst_h: Hysteresis::new(config.grid.hysteresis, tile.h),
            frame: tile,
        }
    }

    pub fn update(&mut self, values: &GestureValues) -> TileFrame {
        self.update_at(values, Instant::now())
    }

    pub fn update_at(&mut self, values: &GestureValues, now: Instant) -> TileFrame {
        let (i, w) = grow(
            self.initial.i,
            self.initial.w,
            self.gesture_factor * values.delta_x(),
        );
        let (j, h) = grow(
            self.initial.j,
            self.initial.h,
            self.gesture_factor * values.delta_y(),
        );

        self.frame = TileView {
            i: self.i_grid.at_instant(i, now),
            j: self.j_grid.at_instant(j, now),
            w: self.w_grid.at_instant(w, now),
            h: self.h_grid.at_instant(h, now),
        };

        TileFrame {
            view: self.frame,
            scale_origin: Some((self.hyst_w.apply(self.frame.w), self.hyst_h.apply(self.frame.h))),
        }
    }

    pub fn finish(self) -> TileOutcome {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(self, now: Instant) -> TileOutcome {
        let throws = [
            self.i_grid.finalize_at(f64::INFINITY, now),
            self.j_grid.finalize_at(f64::INFINITY, now),
            self.w_grid.finalize_at(f64::INFINITY, now),
            self.h_grid.finalize_at(f64::INFINITY, now),
        ];
        debug!(
            "Изменение размера: ({}, {}) {}x{}",
            throws[0].target, throws[1].target, throws[2].target, throws[3].target
        );

        TileOutcome {
            i: throws[0].target,
            j: throws[1].target,
            w: throws[2].target,
            h: throws[3].target,
            duration: longest(&throws),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn tile(i: f64, j: f64, w: f64, h: f64) -> TileView {
        TileView { i, j, w, h }
    }

    fn moved(delta_x: f64, delta_y: f64) -> GestureValues {
        GestureValues::Move { delta_x, delta_y }
    }

    fn pinched(delta_x: f64, delta_y: f64) -> GestureValues {
        GestureValues::SwipePinch { delta_x, delta_y, scale: 1.0 }
    }

    #[test]
    fn test_move_snaps_with_move_grid() {
        let t0 = Instant::now();
        let mut session = MoveSession::new(tile(1.0, 1.0, 1.0, 1.0), &Config::default());

        // i = 1 + 4 * 0.1, move-сетка m = 2
        let frame = session.update_at(&moved(0.1, 0.0), t0);
        assert!((frame.view.i - (1.0 + 0.4 / 3.25)).abs() < EPS);
        assert_eq!(frame.view.j, 1.0);
        assert_eq!(frame.scale_origin, None);
    }

    #[test]
    fn test_move_throw_and_stop() {
        let t0 = Instant::now();
        let mut session = MoveSession::new(tile(1.0, 1.0, 2.0, 1.0), &Config::default());
        session.update_at(&moved(0.1, 0.0), t0);
        session.update_at(&moved(0.15, 0.0), t0 + Duration::from_millis(20));

        // Скорость 10 клеток/с: бросок на клетку дальше ближайшей
        let outcome = session.finish_at(t0 + Duration::from_millis(30));
        assert_eq!((outcome.i, outcome.j, outcome.w, outcome.h), (3, 1, 2, 1));
        assert!(outcome.duration > Duration::ZERO);

        let mut session = MoveSession::new(tile(1.0, 1.0, 1.0, 1.0), &Config::default());
        session.update_at(&moved(0.1, 0.0), t0);
        let outcome = session.finish_at(t0 + Duration::from_secs(1));
        assert_eq!((outcome.i, outcome.j), (1, 1));
    }

    #[test]
    fn test_grow_flips_below_one_cell() {
        assert_eq!(grow(1.0, 2.0, 0.5), (1.0, 2.5));
        assert_eq!(grow(1.0, 2.0, -1.5), (0.5, 1.5));
    }

    #[test]
    fn test_resize_shrink_past_one_cell() {
        let t0 = Instant::now();
        let mut session = ResizeSession::new(tile(1.0, 1.0, 2.0, 1.0), &Config::default());

        // w: 2 - 1.2 = 0.8 -> i = 0.8, w = 1.2
        let frame = session.update_at(&pinched(-0.3, -0.1), t0);
        assert!((frame.view.i - 0.8 / 1.0625).abs() < EPS);
        // resize-сетка m = 3
        assert!((frame.view.w - (1.0 + 0.2 / 65.0)).abs() < EPS);
        assert_eq!(frame.scale_origin, Some((1, 1)));

        let outcome = session.finish_at(t0 + Duration::from_secs(1));
        assert_eq!((outcome.i, outcome.j, outcome.w, outcome.h), (1, 1, 1, 1));
    }

    #[test]
    fn test_resize_grow_keeps_origin() {
        let t0 = Instant::now();
        let mut session = ResizeSession::new(tile(0.0, 0.0, 2.0, 2.0), &Config::default());

        let frame = session.update_at(&pinched(0.25, 0.0), t0);
        assert_eq!(frame.view, tile(0.0, 0.0, 3.0, 2.0));

        let outcome = session.finish_at(t0 + Duration::from_secs(1));
        assert_eq!((outcome.i, outcome.j, outcome.w, outcome.h), (0, 0, 3, 2));
        assert_eq!(outcome.duration, Duration::ZERO);
    }
}
