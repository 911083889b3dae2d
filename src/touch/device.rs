use evdev::{AbsoluteAxisCode, Device, EventStream};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sampler::{AxisRange, Calibration, RawTouchEvent, TouchSampler};
use crate::error::{GestureError, Result};
use crate::gesture_error;
use crate::gestures::{GestureClassifier, GestureSink};

/// Имя владельца захвата для жестов тачпада
pub const TOUCHPAD_OWNER: &str = "touchpad";

/// Рабочий цикл одного тачпада: evdev -> TouchSampler -> GestureClassifier -> арбитр
pub struct TouchDevice {
    path: PathBuf,
    name: String,
    stream: EventStream,
    sampler: TouchSampler,
    classifier: Arc<Mutex<GestureClassifier>>,
    sink: Arc<dyn GestureSink>,
    poll_timeout: Duration,
}

impl TouchDevice {
    pub fn open(
        path: &Path,
        classifier: Arc<Mutex<GestureClassifier>>,
        sink: Arc<dyn GestureSink>,
        poll_timeout: Duration,
    ) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            gesture_error!(device_not_found, "Не удалось открыть устройство {:?}: {}", path, e)
        })?;

        let name = device.name().unwrap_or("Unknown").to_string();
        let calibration = read_calibration(&device);
        debug!("Калибровка {}: {:?}", name, calibration);

        let stream = device.into_event_stream()?;

        Ok(Self {
            path: path.to_path_buf(),
            name,
            stream,
            sampler: TouchSampler::new(calibration),
            classifier,
            sink,
            poll_timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Читать события до отмены или ошибки устройства.
    /// Ошибка устройства завершает только этот цикл.
    pub async fn run(mut self, token: CancellationToken) {
        info!("Тачпад {} ({}) запущен", self.name, self.path.display());

        while !token.is_cancelled() {
            if let Err(e) = self.poll().await {
                warn!("Тачпад {} потерян: {}", self.name, e);
                break;
            }
        }

        self.classifier.lock().shutdown();
        info!("Тачпад {} остановлен", self.name);
    }

    /// Одно ожидание события с таймаутом, чтобы вовремя заметить отмену
    async fn poll(&mut self) -> Result<()> {
        let event = match timeout(self.poll_timeout, self.stream.next_event()).await {
            Err(_) => return Ok(()),
            Ok(result) => {
                result.map_err(|e| GestureError::DeviceLost(self.path.clone(), e.to_string()))?
            }
        };

        let Some(raw) = RawTouchEvent::from_input_event(&event) else {
            return Ok(());
        };

        if let Some(snapshot) = self.sampler.process(raw, Instant::now()) {
            // Лок не удерживается во время передачи жеста арбитру
            let validated = self.classifier.lock().on_snapshot(&snapshot);
            if let Some(gesture) = validated {
                debug!("{}: предлагаем жест {}", self.name, gesture);
                self.sink.offer(TOUCHPAD_OWNER, gesture);
            }
        }

        Ok(())
    }
}

fn read_calibration(device: &Device) -> Calibration {
    let mut calibration = Calibration::default();

    match device.get_absinfo() {
        Ok(axes) => {
            for (code, info) in axes {
                match code {
                    AbsoluteAxisCode::ABS_MT_POSITION_X => {
                        calibration.x = AxisRange::new(info.minimum(), info.maximum());
                    }
                    AbsoluteAxisCode::ABS_MT_POSITION_Y => {
                        calibration.y = AxisRange::new(info.minimum(), info.maximum());
                    }
                    AbsoluteAxisCode::ABS_MT_PRESSURE => {
                        calibration.pressure = Some(AxisRange::new(info.minimum(), info.maximum()));
                    }
                    AbsoluteAxisCode::ABS_MT_SLOT => {
                        let slots = info.maximum() as i64 - info.minimum() as i64 + 1;
                        calibration.slots = slots.max(1) as usize;
                    }
                    _ => {}
                }
            }
        }
        Err(e) => {
            warn!("Не удалось прочитать absinfo, используется единичный диапазон: {}", e);
        }
    }

    calibration
}
