use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::device::TouchDevice;
use crate::config::GesturesConfig;
use crate::error::Result;
use crate::gestures::{GestureClassifier, GestureSink};
use crate::utils::{DeviceFinder, TouchDeviceInfo};

/// Классификаторы запущенных тачпадов по пути устройства
pub type DeviceRegistry = DashMap<PathBuf, Arc<Mutex<GestureClassifier>>>;

/// Источник списка подключённых сенсорных устройств
pub trait DeviceScanner: Send + Sync {
    fn scan(&self) -> Result<Vec<TouchDeviceInfo>>;
}

/// Сканирование /dev/input через evdev
pub struct EvdevScanner {
    device_path: String,
}

impl EvdevScanner {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
        }
    }
}

impl DeviceScanner for EvdevScanner {
    fn scan(&self) -> Result<Vec<TouchDeviceInfo>> {
        DeviceFinder::find_touch_devices(&self.device_path)
    }
}

/// Какие устройства запустить и какие остановить
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DevicePlan {
    pub started: Vec<TouchDeviceInfo>,
    pub stopped: Vec<PathBuf>,
}

/// Сравнить запущенные устройства с найденными при сканировании
pub fn plan_changes<'a>(
    tracked: impl IntoIterator<Item = &'a PathBuf>,
    found: &[TouchDeviceInfo],
) -> DevicePlan {
    let tracked: HashSet<&PathBuf> = tracked.into_iter().collect();
    let found_paths: HashSet<&PathBuf> = found.iter().map(|d| &d.path).collect();

    let started = found
        .iter()
        .filter(|d| !tracked.contains(&d.path))
        .cloned()
        .collect();
    let mut stopped: Vec<PathBuf> = tracked
        .into_iter()
        .filter(|p| !found_paths.contains(p))
        .cloned()
        .collect();
    stopped.sort();

    DevicePlan { started, stopped }
}

struct DeviceWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Следит за подключением и отключением тачпадов; на каждое устройство
/// запускается свой `TouchDevice`.
pub struct DeviceWatcher {
    scanner: Box<dyn DeviceScanner>,
    registry: Arc<DeviceRegistry>,
    sink: Arc<dyn GestureSink>,
    gestures: GesturesConfig,
    scan_interval: Duration,
    poll_timeout: Duration,
    workers: HashMap<PathBuf, DeviceWorker>,
}

impl DeviceWatcher {
    pub fn new(
        scanner: Box<dyn DeviceScanner>,
        registry: Arc<DeviceRegistry>,
        sink: Arc<dyn GestureSink>,
        gestures: GesturesConfig,
        scan_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            scanner,
            registry,
            sink,
            gestures,
            scan_interval,
            poll_timeout,
            workers: HashMap::new(),
        }
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn run(mut self, token: CancellationToken) {
        info!("DeviceWatcher запущен, интервал сканирования {:?}", self.scan_interval);

        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.update().await,
            }
        }

        self.stop_all().await;
        info!("DeviceWatcher остановлен");
    }

    /// Один проход сканирования
    pub async fn update(&mut self) {
        self.reap_finished();

        let found = match self.scanner.scan() {
            Ok(found) => found,
            Err(e) => {
                warn!("Ошибка сканирования устройств: {}", e);
                return;
            }
        };

        let plan = plan_changes(self.workers.keys(), &found);
        for path in plan.stopped {
            info!("Тачпад {} отключён", path.display());
            self.stop(&path).await;
        }
        for device in plan.started {
            self.start(device);
        }
    }

    fn start(&mut self, info: TouchDeviceInfo) {
        let classifier = Arc::new(Mutex::new(GestureClassifier::new(
            info.name.clone(),
            self.gestures,
        )));

        let device = match TouchDevice::open(
            &info.path,
            Arc::clone(&classifier),
            Arc::clone(&self.sink),
            self.poll_timeout,
        ) {
            Ok(device) => device,
            Err(e) => {
                warn!("Не удалось запустить тачпад {}: {}", info.path.display(), e);
                return;
            }
        };

        info!("Найден тачпад {} в {}", info.name, info.path.display());
        let token = CancellationToken::new();
        let handle = tokio::spawn(device.run(token.clone()));

        self.registry.insert(info.path.clone(), classifier);
        self.workers.insert(info.path, DeviceWorker { token, handle });
    }

    async fn stop(&mut self, path: &Path) {
        self.registry.remove(path);
        if let Some(worker) = self.workers.remove(path) {
            worker.token.cancel();
            if let Err(e) = worker.handle.await {
                warn!("Цикл тачпада {} завершился с ошибкой: {}", path.display(), e);
            }
        }
    }

    /// Убрать циклы, завершившиеся сами (ошибка устройства)
    fn reap_finished(&mut self) {
        let finished: Vec<PathBuf> = self
            .workers
            .iter()
            .filter(|(_, w)| w.handle.is_finished())
            .map(|(p, _)| p.clone())
            .collect();

        for path in finished {
            debug!("Убираем завершившийся цикл {}", path.display());
            self.workers.remove(&path);
            self.registry.remove(&path);
        }
    }

    async fn stop_all(&mut self) {
        let paths: Vec<PathBuf> = self.workers.keys().cloned().collect();
        for path in &paths {
            if let Some(worker) = self.workers.get(path) {
                worker.token.cancel();
            }
        }
        for path in paths {
            self.stop(&path).await;
        }
    }

    pub fn device_count(&self) -> usize {
        self.workers.len()
    }
}
