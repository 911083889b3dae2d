use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::events::GestureKind;
use crate::grid::ThrowParams;

const DEFAULT_LOWPASS_FREQUENCY: f64 = 60.0;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub devices: DevicesConfig,
    pub gestures: GesturesConfig,
    pub lowpass: LowpassConfig,
    pub pointer: PointerConfig,
    pub grid: GridConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevicesConfig {
    /// "auto" - все сенсорные устройства, иначе путь к конкретному event-узлу
    pub device_path: String,
    pub scan_interval_ms: u64,
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GesturesConfig {
    pub two_finger_min_dist: f64,
    pub validate_threshold: f64,
    pub upgrade_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LowpassConfig {
    pub inertia: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PointerConfig {
    pub motion_scale: f64,
    pub axis_scale: f64,
    pub idle_timeout_ms: u64,
}

/// Параметры одной сетки: упругий выход за границы и резкость примагничивания
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GridParams {
    pub overshoot: f64,
    pub snap_sharpness: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    pub time_scale: f64,
    pub min_dist: f64,
    pub min_velocity: f64,
    pub throw_speed_buckets: Vec<f64>,
    pub hysteresis: f64,
    #[serde(rename = "move")]
    pub move_grid: GridParams,
    pub resize: GridParams,
    pub swipe: GridParams,
    pub zoom: GridParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionConfig {
    pub gesture_factor: f64,
    pub lock_dist: f64,
    pub bindings: BindingsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindingsConfig {
    pub swipe: String,
    pub zoom: String,
    /// Перемещение окна; действует только при зажатом модификаторе
    pub move_tile: String,
    /// Изменение размера окна; действует только при зажатом модификаторе
    pub resize_tile: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            device_path: "auto".to_string(),
            scan_interval_ms: 500,
            poll_timeout_ms: 100,
        }
    }
}

impl Default for GesturesConfig {
    fn default() -> Self {
        Self {
            two_finger_min_dist: 0.1,
            validate_threshold: 0.02,
            upgrade_delay_ms: 200,
        }
    }
}

impl Default for LowpassConfig {
    fn default() -> Self {
        Self {
            inertia: 0.8,
            frequency: DEFAULT_LOWPASS_FREQUENCY,
        }
    }
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            motion_scale: 1000.0,
            axis_scale: 200.0,
            idle_timeout_ms: 300,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            time_scale: 0.3,
            min_dist: 0.05,
            min_velocity: 0.1,
            throw_speed_buckets: vec![1.0, 5.0, 15.0],
            hysteresis: 0.2,
            move_grid: GridParams { overshoot: 0.2, snap_sharpness: 2.0 },
            resize: GridParams { overshoot: 0.1, snap_sharpness: 3.0 },
            swipe: GridParams { overshoot: 0.2, snap_sharpness: 1.0 },
            zoom: GridParams { overshoot: 0.2, snap_sharpness: 1.0 },
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            gesture_factor: 4.0,
            lock_dist: 0.01,
            bindings: BindingsConfig {
                swipe: "swipe-3".to_string(),
                zoom: "swipe-4".to_string(),
                move_tile: "move-1".to_string(),
                resize_tile: "swipe-2".to_string(),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            devices: DevicesConfig::default(),
            gestures: GesturesConfig::default(),
            lowpass: LowpassConfig::default(),
            pointer: PointerConfig::default(),
            grid: GridConfig::default(),
            interaction: InteractionConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("GRIDTOUCH_").split("__"));

        Self::from_figment(figment)
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .extract()
            .context("Не удалось разобрать конфигурацию")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация настроек устройств
        if self.devices.scan_interval_ms < 100 {
            anyhow::bail!("scan_interval_ms должно быть минимум 100");
        }
        if self.devices.poll_timeout_ms == 0 {
            anyhow::bail!("poll_timeout_ms должно быть больше 0");
        }

        // Валидация распознавания жестов
        if self.gestures.two_finger_min_dist <= 0.0 {
            anyhow::bail!("two_finger_min_dist должно быть больше 0");
        }
        if self.gestures.validate_threshold < 0.0 {
            anyhow::bail!("validate_threshold не может быть отрицательным");
        }

        if !(0.0..1.0).contains(&self.lowpass.inertia) {
            anyhow::bail!("lowpass.inertia должно лежать в [0, 1): {}", self.lowpass.inertia);
        }
        if !self.lowpass.frequency.is_finite() || self.lowpass.frequency <= 0.0 {
            anyhow::bail!("lowpass.frequency должно быть конечным и больше 0");
        }
        if self.lowpass.checked_period().is_none() {
            anyhow::bail!(
                "lowpass.frequency {} не даёт ненулевого периода",
                self.lowpass.frequency
            );
        }

        if self.pointer.motion_scale <= 0.0 || self.pointer.axis_scale <= 0.0 {
            anyhow::bail!("Масштабы указателя должны быть больше 0");
        }

        // Валидация сеток
        if self.grid.time_scale <= 0.0 {
            anyhow::bail!("grid.time_scale должно быть больше 0");
        }
        if self.grid.min_velocity <= 0.0 {
            anyhow::bail!("grid.min_velocity должно быть больше 0");
        }
        if self
            .grid
            .throw_speed_buckets
            .windows(2)
            .any(|pair| pair[0] > pair[1])
        {
            anyhow::bail!(
                "throw_speed_buckets должны идти по возрастанию: {:?}",
                self.grid.throw_speed_buckets
            );
        }

        for (name, params) in [
            ("move", &self.grid.move_grid),
            ("resize", &self.grid.resize),
            ("swipe", &self.grid.swipe),
            ("zoom", &self.grid.zoom),
        ] {
            if params.overshoot < 0.0 {
                anyhow::bail!("grid.{}.overshoot не может быть отрицательным", name);
            }
            if params.snap_sharpness < 1.0 {
                anyhow::bail!("grid.{}.snap_sharpness должно быть не меньше 1", name);
            }
        }

        // Валидация привязок жестов
        let bindings = &self.interaction.bindings;
        for binding in [
            &bindings.swipe,
            &bindings.zoom,
            &bindings.move_tile,
            &bindings.resize_tile,
        ] {
            if binding.parse::<GestureKind>().is_err() {
                anyhow::bail!("Неизвестный вид жеста в привязке: '{}'", binding);
            }
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.devices.scan_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.devices.poll_timeout_ms)
    }

    /// Параметры броска, общие для всех сеток
    pub fn throw_params(&self) -> ThrowParams {
        ThrowParams {
            speed_buckets: self.grid.throw_speed_buckets.clone(),
            time_scale: self.grid.time_scale,
            min_velocity: self.grid.min_velocity,
        }
    }
}

impl GesturesConfig {
    pub fn upgrade_delay(&self) -> Duration {
        Duration::from_millis(self.upgrade_delay_ms)
    }
}

impl LowpassConfig {
    /// Период пересчёта фильтра; для недопустимой частоты - период 60 Гц
    pub fn period(&self) -> Duration {
        self.checked_period()
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_LOWPASS_FREQUENCY))
    }

    fn checked_period(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(1.0 / self.frequency)
            .ok()
            .filter(|period| !period.is_zero())
    }
}

impl PointerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl BindingsConfig {
    /// Вид жеста, запускающий перелистывание рабочих областей
    pub fn swipe_kind(&self) -> Option<GestureKind> {
        self.swipe.parse().ok()
    }

    /// Вид жеста, запускающий масштабирование рабочей области
    pub fn zoom_kind(&self) -> Option<GestureKind> {
        self.zoom.parse().ok()
    }

    pub fn move_tile_kind(&self) -> Option<GestureKind> {
        self.move_tile.parse().ok()
    }

    pub fn resize_tile_kind(&self) -> Option<GestureKind> {
        self.resize_tile.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let figment = Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [lowpass]
                inertia = 0.5
                frequency = 120.0

                [grid.swipe]
                overshoot = 0.3
                snap_sharpness = 2.0
                "#,
            ));

        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.lowpass.inertia, 0.5);
        assert_eq!(config.lowpass.frequency, 120.0);
        assert_eq!(config.grid.swipe.overshoot, 0.3);
        // Не указанные значения остаются по умолчанию
        assert_eq!(config.grid.move_grid, GridParams { overshoot: 0.2, snap_sharpness: 2.0 });
        assert_eq!(config.gestures.validate_threshold, 0.02);
    }

    #[test]
    fn test_invalid_inertia_rejected() {
        let mut config = Config::default();
        config.lowpass.inertia = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_lowpass_frequency_rejected() {
        for frequency in [f64::NAN, f64::INFINITY, 0.0, -5.0, 1e12, 1e-300] {
            let mut config = Config::default();
            config.lowpass.frequency = frequency;
            assert!(config.validate().is_err(), "частота {} принята", frequency);
            assert!(!config.lowpass.period().is_zero());
        }
        assert_eq!(
            Config::default().lowpass.period(),
            Duration::from_secs_f64(1.0 / 60.0)
        );
    }

    #[test]
    fn test_unsorted_buckets_rejected() {
        let mut config = Config::default();
        config.grid.throw_speed_buckets = vec![5.0, 1.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let mut config = Config::default();
        config.interaction.bindings.swipe = "swipe-9".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.interaction.bindings.resize_tile = "pinch-2".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tile_bindings_default() {
        let bindings = Config::default().interaction.bindings;
        assert_eq!(bindings.move_tile_kind(), Some(GestureKind::Move));
        assert_eq!(bindings.resize_tile_kind(), Some(GestureKind::Swipe(2)));
    }

    #[test]
    fn test_throw_params_from_config() {
        let params = Config::default().throw_params();
        assert_eq!(params.speed_buckets, vec![1.0, 5.0, 15.0]);
        assert_eq!(params.time_scale, 0.3);
    }
}
