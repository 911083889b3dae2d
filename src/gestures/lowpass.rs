use smallvec::SmallVec;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::gesture::{Gesture, GesturePhase, GestureState};
use crate::config::LowpassConfig;
use crate::events::GestureValues;

/// Экспоненциальное сглаживание одного канала
#[derive(Debug, Clone)]
pub struct Lowpass {
    inertia: f64,
    last: Option<f64>,
}

impl Lowpass {
    pub fn new(inertia: f64) -> Self {
        Self { inertia, last: None }
    }

    pub fn next(&mut self, value: f64) -> f64 {
        let filtered = match self.last {
            None => value,
            Some(last) => self.inertia * last + (1.0 - self.inertia) * value,
        };
        self.last = Some(filtered);
        filtered
    }
}

/// Сглаживание всех каналов жеста
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    inertia: f64,
    channels: SmallVec<[Lowpass; 3]>,
}

impl LowpassFilter {
    pub fn new(inertia: f64) -> Self {
        Self {
            inertia,
            channels: SmallVec::new(),
        }
    }

    pub fn apply(&mut self, values: GestureValues) -> GestureValues {
        let raw = values.channels();
        while self.channels.len() < raw.len() {
            self.channels.push(Lowpass::new(self.inertia));
        }

        let filtered: SmallVec<[f64; 3]> = raw
            .iter()
            .zip(self.channels.iter_mut())
            .map(|(&value, lowpass)| lowpass.next(value))
            .collect();
        values.with_channels(&filtered)
    }
}

/// Сглаженный жест-обёртка. Фильтр пересчитывается с фиксированной частотой
/// по последнему значению исходного жеста, поэтому продолжает сходиться,
/// даже когда палец остановился.
pub struct LowpassGesture {
    gesture: Gesture,
    handle: JoinHandle<()>,
}

impl LowpassGesture {
    pub fn spawn(source: Gesture, config: LowpassConfig) -> Self {
        let initial = source.state();
        let (tx, rx) = watch::channel(GestureState {
            kind: initial.kind,
            phase: GesturePhase::Pending,
            values: None,
        });
        let gesture = Gesture::from_receiver(source.id(), rx);
        let handle = tokio::spawn(run_filter(source, tx, config.inertia, config.period()));

        Self { gesture, handle }
    }

    /// Handle на сглаженные значения
    pub fn gesture(&self) -> Gesture {
        self.gesture.clone()
    }

    /// Дождаться остановки фильтра (после завершения исходного жеста)
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

async fn run_filter(
    source: Gesture,
    tx: watch::Sender<GestureState>,
    inertia: f64,
    period: Duration,
) {
    let mut filter = LowpassFilter::new(inertia);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if source.is_terminated() || tx.is_closed() {
            break;
        }

        let state = source.state();
        if let Some(values) = state.values {
            let filtered = filter.apply(values);
            tx.send_modify(|s| {
                s.kind = state.kind;
                s.phase = GesturePhase::Validated;
                s.values = Some(filtered);
            });
        }
    }

    // Завершение публикуется ровно один раз, после последнего значения
    tx.send_modify(|s| s.phase = GesturePhase::Terminated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GestureKind;
    use crate::gestures::GestureEmitter;

    #[test]
    fn test_zero_inertia_is_identity() {
        let mut lp = Lowpass::new(0.0);
        for v in [0.3, -1.0, 5.5] {
            assert_eq!(lp.next(v), v);
        }
    }

    #[test]
    fn test_first_value_passes_through() {
        let mut lp = Lowpass::new(0.8);
        assert_eq!(lp.next(2.0), 2.0);
        assert!((lp.next(0.0) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_high_inertia_approaches_step_slowly() {
        let mut lp = Lowpass::new(0.99);
        lp.next(0.0);
        let mut last = 0.0;
        for _ in 0..100 {
            let v = lp.next(1.0);
            assert!(v > last && v < 1.0);
            last = v;
        }
    }

    #[test]
    fn test_filter_keeps_value_kind() {
        let mut filter = LowpassFilter::new(0.5);
        filter.apply(GestureValues::SwipePinch { delta_x: 0.0, delta_y: 0.0, scale: 1.0 });
        let out = filter.apply(GestureValues::SwipePinch { delta_x: 1.0, delta_y: -1.0, scale: 2.0 });
        assert_eq!(
            out,
            GestureValues::SwipePinch { delta_x: 0.5, delta_y: -0.5, scale: 1.5 }
        );
    }

    #[tokio::test]
    async fn test_filtered_gesture_follows_source() {
        let mut emitter = GestureEmitter::new(GestureKind::Swipe(3), 0.02);
        let wrapped = LowpassGesture::spawn(
            emitter.subscribe(),
            LowpassConfig { inertia: 0.5, frequency: 200.0 },
        );
        let mut filtered = wrapped.gesture();

        emitter.update(GestureValues::Swipe { delta_x: 0.0, delta_y: 0.0, delta2_s: 0.001 });
        emitter.update(GestureValues::Swipe { delta_x: 0.5, delta_y: 0.0, delta2_s: 0.001 });

        let converged = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(state) = filtered.changed().await {
                if let Some(values) = state.values {
                    if values.delta_x() > 0.49 {
                        return true;
                    }
                }
            }
            false
        })
        .await;
        assert_eq!(converged.ok(), Some(true));

        emitter.terminate();
        wrapped.join().await;
        assert!(filtered.is_terminated());
        assert_eq!(filtered.state().phase, GesturePhase::Terminated);
    }
}
