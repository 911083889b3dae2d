use smallvec::SmallVec;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::GridParams;
use crate::trace_if_enabled;

/// Параметры предсказания броска, общие для всех сеток
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowParams {
    /// Пороги скорости по возрастанию; число превышенных порогов - номер корзины
    pub speed_buckets: Vec<f64>,
    pub time_scale: f64,
    pub min_velocity: f64,
}

impl Default for ThrowParams {
    fn default() -> Self {
        Self {
            speed_buckets: vec![1.0, 5.0, 15.0],
            time_scale: 0.3,
            min_velocity: 0.1,
        }
    }
}

/// Итог взаимодействия: целевая клетка и длительность анимации к ней
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throw {
    pub target: i64,
    pub duration: Duration,
}

impl fmt::Display for Throw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} за {:.3}с", self.target, self.duration.as_secs_f64())
    }
}

/// Упругая сетка: непрерывная координата -> отображаемая координата,
/// примагниченная к целым, с упругим выходом за границы и броском по инерции.
///
/// Одна сетка принадлежит одной оси одного взаимодействия и не разделяется между потоками.
#[derive(Debug, Clone)]
pub struct SnapGrid {
    name: String,
    lower: i64,
    upper: i64,
    initial: i64,
    overshoot: f64,
    sharpness: f64,
    // Пока значение ни разу не попало в границы, они расширяются до него
    allow_out_of_bounds: bool,
    throw: ThrowParams,
    last_position: Option<f64>,
    last_timestamp: Option<Instant>,
    last_velocity: f64,
}

impl SnapGrid {
    pub fn new(
        name: impl Into<String>,
        lower: i64,
        upper: i64,
        initial: i64,
        params: GridParams,
        throw: ThrowParams,
    ) -> Self {
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        Self {
            name: name.into(),
            lower,
            upper,
            initial,
            overshoot: params.overshoot.max(0.0),
            sharpness: params.snap_sharpness.max(1.0),
            allow_out_of_bounds: true,
            throw,
            last_position: None,
            last_timestamp: None,
            last_velocity: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.lower, self.upper)
    }

    pub fn allows_out_of_bounds(&self) -> bool {
        self.allow_out_of_bounds
    }

    pub fn last_velocity(&self) -> f64 {
        self.last_velocity
    }

    /// Отображаемая координата для `x` с учётом импульса
    pub fn at(&mut self, x: f64) -> f64 {
        self.at_instant(x, Instant::now())
    }

    /// Отображаемая координата без обновления импульса
    pub fn preview(&mut self, x: f64) -> f64 {
        let (lower, upper) = self.effective_bounds(x);
        self.magnetize(x, lower, upper)
    }

    pub fn at_instant(&mut self, x: f64, now: Instant) -> f64 {
        let (lower, upper) = self.effective_bounds(x);

        if let (Some(last_x), Some(last_t)) = (self.last_position, self.last_timestamp) {
            let dt = now.saturating_duration_since(last_t).as_secs_f64();
            if dt > 0.0 {
                self.last_velocity = (x - last_x) / dt;
            }
        }
        self.last_position = Some(x);
        self.last_timestamp = Some(now);

        let xp = self.magnetize(x, lower, upper);
        trace_if_enabled!(
            "GRID[{}]: x={:.4} xp={:.4} v={:.4}",
            self.name,
            x,
            xp,
            self.last_velocity
        );
        xp
    }

    fn effective_bounds(&mut self, x: f64) -> (f64, f64) {
        let (lower, upper) = (self.lower as f64, self.upper as f64);
        if lower <= x && x <= upper {
            self.allow_out_of_bounds = false;
        }

        if !self.allow_out_of_bounds {
            return (lower, upper);
        }
        (lower.min(x.floor()), upper.max(x.ceil()))
    }

    fn magnetize(&self, x: f64, lower: f64, upper: f64) -> f64 {
        if x < lower {
            if self.overshoot > 0.0 {
                let y = x - lower;
                lower + self.overshoot * (1.0 / (1.0 - y / self.overshoot) - 1.0)
            } else {
                lower
            }
        } else if x > upper {
            if self.overshoot > 0.0 {
                let y = x - upper;
                upper + self.overshoot * (1.0 - 1.0 / (1.0 + y / self.overshoot))
            } else {
                upper
            }
        } else {
            let base = x.floor();
            let y = x - base;
            if y == 0.0 {
                base
            } else {
                base + y / (1.0 + ((1.0 - y) / y).powf(self.sharpness))
            }
        }
    }

    /// Итоговая клетка и длительность анимации; сетка после этого не нужна
    pub fn finalize(self, throw_dist_max: f64) -> Throw {
        self.finalize_at(throw_dist_max, Instant::now())
    }

    pub fn finalize_at(self, throw_dist_max: f64, now: Instant) -> Throw {
        let Some(position) = self.last_position else {
            return Throw {
                target: self.initial.clamp(self.lower, self.upper),
                duration: Duration::ZERO,
            };
        };

        // Палец остановился до отпускания - броска нет
        let stale = self
            .last_timestamp
            .map(|t| now.saturating_duration_since(t).as_secs_f64() > self.throw.time_scale)
            .unwrap_or(true);
        let velocity = if stale { 0.0 } else { self.last_velocity };

        let direction = if velocity > 0.0 {
            1.0
        } else if velocity < 0.0 {
            -1.0
        } else {
            0.0
        };

        let (lower, upper) = (self.lower as f64, self.upper as f64);
        let start = position.round().clamp(lower, upper);
        let mut candidates: SmallVec<[f64; 8]> = SmallVec::new();
        candidates.push(start);

        // Корзин не больше, чем порогов скорости, поэтому дальние клетки не нужны
        if direction != 0.0 {
            let max_steps = self
                .upper
                .abs_diff(self.lower)
                .min(self.throw.speed_buckets.len() as u64);
            let mut last = start;
            for _ in 0..max_steps {
                let next = last + direction;
                if next == last
                    || next < lower
                    || next > upper
                    || (next - position).abs() > throw_dist_max
                {
                    break;
                }
                candidates.push(next);
                last = next;
            }
        }

        let speed = velocity.abs();
        let mut bucket = self
            .throw
            .speed_buckets
            .iter()
            .filter(|&&threshold| speed > threshold)
            .count();

        // Округление уже унесло кандидата вперёд по ходу движения
        let harder = (direction > 0.0 && start > position) || (direction < 0.0 && start < position);
        if harder {
            bucket = bucket.saturating_sub(1);
        }

        let chosen = candidates[bucket.min(candidates.len() - 1)];
        let target = (chosen.round() as i64).clamp(self.lower, self.upper);

        let distance = (target as f64 - position).abs();
        let by_scale = distance * self.throw.time_scale;
        let by_velocity = distance / speed.max(self.throw.min_velocity);
        let seconds = by_scale.min(by_velocity);
        let duration = if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        };

        trace_if_enabled!(
            "GRID[{}]: бросок p={:.4} v={:.4} кандидаты={:?} корзина={} -> {}",
            self.name,
            position,
            velocity,
            candidates,
            bucket,
            target
        );

        Throw { target, duration }
    }
}
