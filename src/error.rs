use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Устройство {0:?} отключено: {1}")]
    DeviceLost(PathBuf, String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),
}

pub type Result<T> = std::result::Result<T, GestureError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! gesture_error {
    (device_not_found, $($arg:tt)*) => {
        $crate::error::GestureError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::GestureError::Permission(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_macro() {
        let result: Result<()> = Err(gesture_error!(device_not_found, "event{}", 7));
        match result {
            Err(GestureError::DeviceNotFound(msg)) => assert_eq!(msg, "event7"),
            other => panic!("неожиданный результат: {:?}", other),
        }
    }

    #[test]
    fn test_error_macro() {
        let err = gesture_error!(permission, "нет доступа к {}", "/dev/input");
        assert!(err.to_string().contains("/dev/input"));
    }
}
