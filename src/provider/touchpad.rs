use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::capture::CaptureArbiter;
use super::r#trait::{AxisOrientation, GestureProvider};
use crate::config::Config;
use crate::error::Result;
use crate::events::Handled;
use crate::touch::{DeviceRegistry, DeviceScanner, DeviceWatcher, EvdevScanner, TOUCHPAD_OWNER};

struct WatcherTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Провайдер жестов тачпадов, прочитанных напрямую через evdev
pub struct TouchpadGestureProvider {
    config: Arc<Config>,
    arbiter: Arc<CaptureArbiter>,
    registry: Arc<DeviceRegistry>,
    watcher: Mutex<Option<WatcherTask>>,
}

impl TouchpadGestureProvider {
    pub fn new(config: Arc<Config>, arbiter: Arc<CaptureArbiter>) -> Self {
        Self {
            config,
            arbiter,
            registry: Arc::new(DeviceRegistry::new()),
            watcher: Mutex::new(None),
        }
    }

    /// Запустить с произвольным источником устройств
    pub fn start_with(&self, scanner: Box<dyn DeviceScanner>) {
        let mut watcher = self.watcher.lock();
        if watcher.is_some() {
            debug!("DeviceWatcher уже запущен");
            return;
        }

        let device_watcher = DeviceWatcher::new(
            scanner,
            Arc::clone(&self.registry),
            self.arbiter.clone(),
            self.config.gestures,
            self.config.scan_interval(),
            self.config.poll_timeout(),
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(device_watcher.run(token.clone()));
        *watcher = Some(WatcherTask { token, handle });
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    fn captured(&self) -> Handled {
        if self.arbiter.is_captured_by(TOUCHPAD_OWNER) {
            Handled::HandledExclusive
        } else {
            Handled::NotHandled
        }
    }
}

#[async_trait::async_trait]
impl GestureProvider for TouchpadGestureProvider {
    fn name(&self) -> &'static str {
        TOUCHPAD_OWNER
    }

    fn on_native_gesture(&self, kind: &str, _time_msec: u32, _args: &[f64]) -> Handled {
        // Пока тачпад читается напрямую, нативные жесты композитора дублируют наши
        if self.registry.is_empty() {
            Handled::NotHandled
        } else {
            debug!("Нативный жест {} подавлен", kind);
            Handled::HandledShared
        }
    }

    fn on_motion(&self, _time_msec: u32, _delta_x: f64, _delta_y: f64) -> Handled {
        self.captured()
    }

    fn on_axis(
        &self,
        _time_msec: u32,
        _orientation: AxisOrientation,
        _delta: f64,
        _delta_discrete: i32,
    ) -> Handled {
        self.captured()
    }

    fn reset(&self) {
        for entry in self.registry.iter() {
            entry.value().lock().reset();
        }
    }

    async fn start(&self) -> Result<()> {
        info!("Запуск провайдера тачпада ({})", self.config.devices.device_path);
        self.start_with(Box::new(EvdevScanner::new(self.config.devices.device_path.clone())));
        Ok(())
    }

    async fn stop(&self) {
        let task = self.watcher.lock().take();
        if let Some(task) = task {
            task.token.cancel();
            if let Err(e) = task.handle.await {
                warn!("DeviceWatcher завершился с ошибкой: {}", e);
            }
            info!("Провайдер тачпада остановлен");
        }
    }
}
