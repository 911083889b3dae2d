use crate::error::{GestureError, Result};
use evdev::AbsoluteAxisCode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Найденное сенсорное устройство
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchDeviceInfo {
    pub name: String,
    pub path: PathBuf,
}

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти сенсорные устройства: все ("auto") или одно указанное
    pub fn find_touch_devices(device_path: &str) -> Result<Vec<TouchDeviceInfo>> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            if !path.exists() {
                // Устройство может появиться позже
                debug!("Указанное устройство пока не найдено: {:?}", path);
                return Ok(Vec::new());
            }
            return Ok(Self::probe(&path).into_iter().collect());
        }

        Self::find_by_event_devices()
    }

    fn find_by_event_devices() -> Result<Vec<TouchDeviceInfo>> {
        let input_dir = Path::new("/dev/input");

        let entries = fs::read_dir(input_dir).map_err(|e| {
            GestureError::Permission(format!("Нет доступа к /dev/input: {}", e))
        })?;

        let mut event_devices = Vec::new();

        for entry in entries {
            let entry = entry.map_err(GestureError::Io)?;
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            if name.starts_with("event") {
                event_devices.push(path);
            }
        }

        // Сортируем устройства по номеру
        event_devices.sort();

        Ok(event_devices
            .iter()
            .filter_map(|path| Self::probe(path))
            .collect())
    }

    fn probe(device_path: &Path) -> Option<TouchDeviceInfo> {
        match evdev::Device::open(device_path) {
            Ok(device) => {
                let name = device.name().unwrap_or("Unknown").to_string();
                if Self::is_touch_device(&device) {
                    debug!("Сенсорное устройство {:?} ({})", device_path, name);
                    Some(TouchDeviceInfo {
                        name,
                        path: device_path.to_path_buf(),
                    })
                } else {
                    None
                }
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                None
            }
        }
    }

    /// Устройство сообщает многопальцевые абсолютные координаты
    pub fn is_touch_device(device: &evdev::Device) -> bool {
        device.supported_absolute_axes().map_or(false, |axes| {
            axes.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
                && axes.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
        })
    }

    /// Вывести список сенсорных устройств (для --list-devices)
    pub fn log_touch_devices(device_path: &str) -> Result<usize> {
        let devices = Self::find_touch_devices(device_path)?;
        if devices.is_empty() {
            info!("Сенсорные устройства не найдены");
        }
        for device in &devices {
            info!("Найдено {} в {}", device.name, device.path.display());
        }
        Ok(devices.len())
    }
}
