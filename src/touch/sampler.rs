use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode, SynchronizationCode};
use std::time::Instant;
use tracing::warn;

use super::slot::TouchSlot;
use crate::events::{TouchPoint, TouchSnapshot};
use crate::trace_if_enabled;

/// Верхняя граница числа слотов; защищает от мусорных ABS_MT_SLOT
const MAX_SLOTS: usize = 64;

/// Диапазон значений оси из absinfo устройства
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub const UNIT: AxisRange = AxisRange { min: 0, max: 1 };

    /// Вырожденный диапазон заменяется единичным
    pub fn new(min: i32, max: i32) -> Self {
        if max > min {
            Self { min, max }
        } else {
            Self::UNIT
        }
    }

    pub fn normalize(&self, value: i32) -> f64 {
        (value as f64 - self.min as f64) / (self.max as f64 - self.min as f64)
    }
}

/// Калибровка тачпада, считывается один раз при открытии устройства
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub x: AxisRange,
    pub y: AxisRange,
    /// `None` если устройство не сообщает давление
    pub pressure: Option<AxisRange>,
    /// Число слотов, одновременно сообщаемых устройством
    pub slots: usize,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            x: AxisRange::UNIT,
            y: AxisRange::UNIT,
            pressure: None,
            slots: 2,
        }
    }
}

/// Событие evdev, значимое для тачпада
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTouchEvent {
    Sync,
    /// BTN_TOOL_FINGER..BTN_TOOL_QUINTTAP нажата
    ToolFingers(usize),
    Slot(i32),
    TrackingId(i32),
    PositionX(i32),
    PositionY(i32),
    Pressure(i32),
}

impl RawTouchEvent {
    pub fn from_input_event(event: &InputEvent) -> Option<Self> {
        let (code, value) = (event.code(), event.value());
        match event.event_type() {
            EventType::SYNCHRONIZATION => {
                (SynchronizationCode(code) == SynchronizationCode::SYN_REPORT).then_some(Self::Sync)
            }
            EventType::KEY if value == 1 => match KeyCode::new(code) {
                KeyCode::BTN_TOOL_FINGER => Some(Self::ToolFingers(1)),
                KeyCode::BTN_TOOL_DOUBLETAP => Some(Self::ToolFingers(2)),
                KeyCode::BTN_TOOL_TRIPLETAP => Some(Self::ToolFingers(3)),
                KeyCode::BTN_TOOL_QUADTAP => Some(Self::ToolFingers(4)),
                KeyCode::BTN_TOOL_QUINTTAP => Some(Self::ToolFingers(5)),
                _ => None,
            },
            EventType::ABSOLUTE => match AbsoluteAxisCode(code) {
                AbsoluteAxisCode::ABS_MT_SLOT => Some(Self::Slot(value)),
                AbsoluteAxisCode::ABS_MT_TRACKING_ID => Some(Self::TrackingId(value)),
                AbsoluteAxisCode::ABS_MT_POSITION_X => Some(Self::PositionX(value)),
                AbsoluteAxisCode::ABS_MT_POSITION_Y => Some(Self::PositionY(value)),
                AbsoluteAxisCode::ABS_MT_PRESSURE => Some(Self::Pressure(value)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Собирает поток событий evdev в снимки касаний на каждом SYN_REPORT.
pub struct TouchSampler {
    calibration: Calibration,
    slots: Vec<TouchSlot>,
    current_slot: Option<usize>,
    touch_count: usize,
}

impl TouchSampler {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            slots: Vec::new(),
            current_slot: Some(0),
            touch_count: 0,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Обработать одно событие; на синхронизации может вернуть снимок
    pub fn process(&mut self, event: RawTouchEvent, timestamp: Instant) -> Option<TouchSnapshot> {
        match event {
            RawTouchEvent::Sync => return self.synchronize(timestamp),
            RawTouchEvent::ToolFingers(n) => self.touch_count = n,
            RawTouchEvent::Slot(n) => {
                self.current_slot = usize::try_from(n).ok().filter(|&n| n < MAX_SLOTS);
                if self.current_slot.is_none() {
                    warn!("Некорректный номер слота {}, события слота игнорируются", n);
                }
            }
            RawTouchEvent::TrackingId(id) => {
                if let Some(slot) = self.slot_mut() {
                    slot.set_tracking_id(id);
                }
            }
            RawTouchEvent::PositionX(x) => {
                if let Some(slot) = self.slot_mut() {
                    slot.x = x;
                }
            }
            RawTouchEvent::PositionY(y) => {
                if let Some(slot) = self.slot_mut() {
                    slot.y = y;
                }
            }
            RawTouchEvent::Pressure(z) => {
                if let Some(slot) = self.slot_mut() {
                    slot.z = z;
                }
            }
        }
        None
    }

    /// Слоты создаются по требованию
    fn slot_mut(&mut self) -> Option<&mut TouchSlot> {
        let n = self.current_slot?;
        if n >= self.slots.len() {
            self.slots.resize(n + 1, TouchSlot::default());
        }
        self.slots.get_mut(n)
    }

    fn synchronize(&mut self, timestamp: Instant) -> Option<TouchSnapshot> {
        let active = self.slots.iter().filter(|s| s.is_active()).count();
        if active == 0 {
            self.touch_count = 0;
        }

        // Ранний SYN: устройство объявило больше пальцев, чем успело заполнить слотов
        if self.touch_count >= self.calibration.slots && active < self.calibration.slots {
            trace_if_enabled!(
                "Пропуск ранней синхронизации: {} пальцев, {} активных слотов",
                self.touch_count,
                active
            );
            return None;
        }

        let calibration = self.calibration;
        let touches = self.slots.iter().filter(|s| s.is_active()).map(|s| {
            TouchPoint::new(
                s.tracking_id,
                calibration.x.normalize(s.x),
                calibration.y.normalize(s.y),
                calibration.pressure.map_or(1.0, |range| range.normalize(s.z)),
            )
        });

        Some(TouchSnapshot::new(timestamp, self.touch_count, touches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration() -> Calibration {
        Calibration {
            x: AxisRange::new(0, 1000),
            y: AxisRange::new(0, 500),
            pressure: Some(AxisRange::new(0, 255)),
            slots: 2,
        }
    }

    fn feed(sampler: &mut TouchSampler, events: &[RawTouchEvent]) -> Vec<TouchSnapshot> {
        let now = Instant::now();
        events
            .iter()
            .filter_map(|&e| sampler.process(e, now))
            .collect()
    }

    #[test]
    fn test_single_touch_normalized() {
        let mut sampler = TouchSampler::new(calibration());
        let snapshots = feed(
            &mut sampler,
            &[
                RawTouchEvent::Slot(0),
                RawTouchEvent::TrackingId(42),
                RawTouchEvent::PositionX(250),
                RawTouchEvent::PositionY(250),
                RawTouchEvent::Pressure(255),
                RawTouchEvent::ToolFingers(1),
                RawTouchEvent::Sync,
            ],
        );

        assert_eq!(snapshots.len(), 1);
        let snapshot = &snapshots[0];
        assert_eq!(snapshot.touch_count, 1);
        assert_eq!(snapshot.touches.as_slice(), &[TouchPoint::new(42, 0.25, 0.5, 1.0)]);
    }

    #[test]
    fn test_release_reports_zero_fingers() {
        let mut sampler = TouchSampler::new(calibration());
        feed(
            &mut sampler,
            &[
                RawTouchEvent::TrackingId(1),
                RawTouchEvent::PositionX(10),
                RawTouchEvent::PositionY(10),
                RawTouchEvent::ToolFingers(1),
                RawTouchEvent::Sync,
            ],
        );

        let snapshots = feed(&mut sampler, &[RawTouchEvent::TrackingId(-1), RawTouchEvent::Sync]);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].touch_count, 0);
        assert!(snapshots[0].touches.is_empty());
    }

    #[test]
    fn test_early_sync_suppressed() {
        let mut sampler = TouchSampler::new(calibration());
        // Три пальца объявлены, заполнен только один из двух слотов
        let early = feed(
            &mut sampler,
            &[
                RawTouchEvent::Slot(0),
                RawTouchEvent::TrackingId(1),
                RawTouchEvent::ToolFingers(3),
                RawTouchEvent::Sync,
            ],
        );
        assert!(early.is_empty());

        let full = feed(
            &mut sampler,
            &[RawTouchEvent::Slot(1), RawTouchEvent::TrackingId(2), RawTouchEvent::Sync],
        );
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].touch_count, 3);
        assert_eq!(full[0].touches.len(), 2);
    }

    #[test]
    fn test_slots_created_on_demand() {
        let mut sampler = TouchSampler::new(calibration());
        let snapshots = feed(
            &mut sampler,
            &[
                RawTouchEvent::Slot(4),
                RawTouchEvent::TrackingId(9),
                RawTouchEvent::PositionX(1000),
                RawTouchEvent::PositionY(0),
                RawTouchEvent::ToolFingers(1),
                RawTouchEvent::Sync,
            ],
        );
        assert_eq!(snapshots[0].find(9).map(|t| (t.x, t.y)), Some((1.0, 0.0)));
    }

    #[test]
    fn test_invalid_slot_ignored() {
        let mut sampler = TouchSampler::new(calibration());
        let snapshots = feed(
            &mut sampler,
            &[
                RawTouchEvent::Slot(-3),
                RawTouchEvent::TrackingId(5),
                RawTouchEvent::ToolFingers(1),
                RawTouchEvent::Sync,
            ],
        );
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].touch_count, 0);
    }

    #[test]
    fn test_no_pressure_axis_reports_full_pressure() {
        let mut sampler = TouchSampler::new(Calibration {
            pressure: None,
            ..calibration()
        });
        let snapshots = feed(
            &mut sampler,
            &[RawTouchEvent::TrackingId(1), RawTouchEvent::ToolFingers(1), RawTouchEvent::Sync],
        );
        assert_eq!(snapshots[0].touches[0].z, 1.0);
    }

    #[test]
    fn test_degenerate_range_falls_back_to_unit() {
        assert_eq!(AxisRange::new(5, 5), AxisRange::UNIT);
        assert_eq!(AxisRange::new(10, 0), AxisRange::UNIT);
        assert_eq!(AxisRange::new(0, 200).normalize(50), 0.25);
    }

    #[test]
    fn test_from_input_event() {
        let sync = InputEvent::new(EventType::SYNCHRONIZATION.0, SynchronizationCode::SYN_REPORT.0, 0);
        assert_eq!(RawTouchEvent::from_input_event(&sync), Some(RawTouchEvent::Sync));

        let tool = InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOOL_TRIPLETAP.code(), 1);
        assert_eq!(RawTouchEvent::from_input_event(&tool), Some(RawTouchEvent::ToolFingers(3)));

        let release = InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOOL_TRIPLETAP.code(), 0);
        assert_eq!(RawTouchEvent::from_input_event(&release), None);

        let x = InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_POSITION_X.0, 321);
        assert_eq!(RawTouchEvent::from_input_event(&x), Some(RawTouchEvent::PositionX(321)));

        let dropped = InputEvent::new(EventType::SYNCHRONIZATION.0, SynchronizationCode::SYN_DROPPED.0, 0);
        assert_eq!(RawTouchEvent::from_input_event(&dropped), None);
    }
}
