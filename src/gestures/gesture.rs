use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::debug_if_enabled;
use crate::events::{GestureKind, GestureValues};

static NEXT_GESTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Фаза жизненного цикла жеста
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    /// Движение ещё не превысило порог, подписчики ничего не получают
    Pending,
    Validated,
    Terminated,
}

/// Последнее опубликованное состояние жеста
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    pub kind: GestureKind,
    pub phase: GesturePhase,
    pub values: Option<GestureValues>,
}

/// Handle подписчика на один жест.
///
/// Значения доставляются по принципу "побеждает последнее": промежуточные
/// обновления между двумя чтениями теряются. Состояние `Terminated` финальное
/// и не может быть пропущено.
#[derive(Debug, Clone)]
pub struct Gesture {
    id: u64,
    rx: watch::Receiver<GestureState>,
}

impl Gesture {
    pub(crate) fn from_receiver(id: u64, rx: watch::Receiver<GestureState>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> GestureKind {
        self.rx.borrow().kind
    }

    pub fn state(&self) -> GestureState {
        self.rx.borrow().clone()
    }

    pub fn values(&self) -> Option<GestureValues> {
        self.rx.borrow().values
    }

    /// Жест завершён явно или его источник исчез
    pub fn is_terminated(&self) -> bool {
        self.rx.borrow().phase == GesturePhase::Terminated || self.rx.has_changed().is_err()
    }

    /// Ждать следующего изменения; `None` когда источник закрыт
    pub async fn changed(&mut self) -> Option<GestureState> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Ждать завершения жеста
    pub async fn terminated(&mut self) {
        let _ = self
            .rx
            .wait_for(|state| state.phase == GesturePhase::Terminated)
            .await;
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gesture#{}({})", self.id, self.kind())
    }
}

/// Сторона источника жеста: валидация (debounce) и публикация значений.
pub struct GestureEmitter {
    id: u64,
    tx: watch::Sender<GestureState>,
    validate_threshold: f64,
    // Фиксируется один раз при переходе pending -> validated
    offset: Option<GestureValues>,
}

impl GestureEmitter {
    pub fn new(kind: GestureKind, validate_threshold: f64) -> Self {
        let id = NEXT_GESTURE_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, _) = watch::channel(GestureState {
            kind,
            phase: GesturePhase::Pending,
            values: None,
        });
        Self {
            id,
            tx,
            validate_threshold,
            offset: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> GestureKind {
        self.tx.borrow().kind
    }

    pub fn subscribe(&self) -> Gesture {
        Gesture::from_receiver(self.id, self.tx.subscribe())
    }

    pub fn is_pending(&self) -> bool {
        self.offset.is_none()
    }

    pub fn is_terminated(&self) -> bool {
        self.tx.borrow().phase == GesturePhase::Terminated
    }

    pub fn set_kind(&mut self, kind: GestureKind) {
        self.tx.send_modify(|state| state.kind = kind);
    }

    /// Принять сырые значения. Возвращает `true`, если именно это обновление
    /// перевело жест в состояние validated.
    pub fn update(&mut self, raw: GestureValues) -> bool {
        if self.is_terminated() {
            return false;
        }

        let mut just_validated = false;
        if self.offset.is_none() {
            let channels = raw.channels();
            let exceeded = raw
                .channel_kinds()
                .iter()
                .zip(channels.iter())
                .any(|(channel, value)| {
                    (value - channel.center()).abs() > channel.threshold(self.validate_threshold)
                });

            if exceeded {
                let offset: SmallVec<[f64; 3]> = raw
                    .channel_kinds()
                    .iter()
                    .zip(channels.iter())
                    .map(|(channel, value)| value - channel.center())
                    .collect();
                self.offset = Some(raw.with_channels(&offset));
                just_validated = true;
                debug_if_enabled!("Жест #{} ({}) прошёл валидацию: {}", self.id, self.kind(), raw);
            }
        }

        if let Some(offset) = &self.offset {
            let reported: SmallVec<[f64; 3]> = raw
                .channels()
                .iter()
                .zip(offset.channels().iter())
                .map(|(value, offset)| value - offset)
                .collect();
            let values = raw.with_channels(&reported);

            self.tx.send_modify(|state| {
                state.phase = GesturePhase::Validated;
                state.values = Some(values);
            });
        }

        just_validated
    }

    /// Завершить жест; повторные вызовы ничего не делают
    pub fn terminate(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.tx.send_modify(|state| state.phase = GesturePhase::Terminated);
        debug_if_enabled!("Жест #{} ({}) завершён", self.id, self.kind());
    }
}

impl Drop for GestureEmitter {
    fn drop(&mut self) {
        self.terminate();
    }
}
