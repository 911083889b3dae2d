use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Вид жеста: перемещение одним пальцем или свайп 2..=5 пальцами
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Move,
    Swipe(u8),
}

impl GestureKind {
    pub const MAX_FINGERS: u8 = 5;

    pub fn fingers(&self) -> u8 {
        match self {
            GestureKind::Move => 1,
            GestureKind::Swipe(n) => *n,
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureKind::Move => write!(f, "move-1"),
            GestureKind::Swipe(n) => write!(f, "swipe-{}", n),
        }
    }
}

impl FromStr for GestureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some(("move", "1")) => Ok(GestureKind::Move),
            Some(("swipe", n)) => match n.parse::<u8>() {
                Ok(n) if (2..=Self::MAX_FINGERS).contains(&n) => Ok(GestureKind::Swipe(n)),
                _ => Err(format!("неверное число пальцев в '{}'", s)),
            },
            _ => Err(format!("неизвестный вид жеста '{}'", s)),
        }
    }
}

/// Канал значений жеста
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    DeltaX,
    DeltaY,
    Scale,
    Delta2S,
}

impl Channel {
    /// Значение канала в состоянии покоя
    pub fn center(&self) -> f64 {
        match self {
            Channel::Scale => 1.0,
            _ => 0.0,
        }
    }

    /// Порог валидации; delta2_s - сумма квадратов, поэтому порог тоже в квадрате
    pub fn threshold(&self, validate_threshold: f64) -> f64 {
        match self {
            Channel::Delta2S => validate_threshold * validate_threshold,
            _ => validate_threshold,
        }
    }
}

const MOVE_CHANNELS: &[Channel] = &[Channel::DeltaX, Channel::DeltaY];
const PINCH_CHANNELS: &[Channel] = &[Channel::DeltaX, Channel::DeltaY, Channel::Scale];
const SWIPE_CHANNELS: &[Channel] = &[Channel::DeltaX, Channel::DeltaY, Channel::Delta2S];

/// Значения каналов жеста. Набор каналов фиксирован для каждого вида жеста.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureValues {
    Move { delta_x: f64, delta_y: f64 },
    SwipePinch { delta_x: f64, delta_y: f64, scale: f64 },
    Swipe { delta_x: f64, delta_y: f64, delta2_s: f64 },
}

impl GestureValues {
    pub fn delta_x(&self) -> f64 {
        match *self {
            GestureValues::Move { delta_x, .. }
            | GestureValues::SwipePinch { delta_x, .. }
            | GestureValues::Swipe { delta_x, .. } => delta_x,
        }
    }

    pub fn delta_y(&self) -> f64 {
        match *self {
            GestureValues::Move { delta_y, .. }
            | GestureValues::SwipePinch { delta_y, .. }
            | GestureValues::Swipe { delta_y, .. } => delta_y,
        }
    }

    pub fn scale(&self) -> Option<f64> {
        match *self {
            GestureValues::SwipePinch { scale, .. } => Some(scale),
            _ => None,
        }
    }

    pub fn channel_kinds(&self) -> &'static [Channel] {
        match self {
            GestureValues::Move { .. } => MOVE_CHANNELS,
            GestureValues::SwipePinch { .. } => PINCH_CHANNELS,
            GestureValues::Swipe { .. } => SWIPE_CHANNELS,
        }
    }

    /// Значения каналов в порядке `channel_kinds()`
    pub fn channels(&self) -> SmallVec<[f64; 3]> {
        match *self {
            GestureValues::Move { delta_x, delta_y } => SmallVec::from_slice(&[delta_x, delta_y]),
            GestureValues::SwipePinch { delta_x, delta_y, scale } => {
                SmallVec::from_slice(&[delta_x, delta_y, scale])
            }
            GestureValues::Swipe { delta_x, delta_y, delta2_s } => {
                SmallVec::from_slice(&[delta_x, delta_y, delta2_s])
            }
        }
    }

    /// Тот же вид значений с новыми каналами; недостающие каналы сохраняют текущее значение
    pub fn with_channels(&self, values: &[f64]) -> Self {
        let current = self.channels();
        let at = |i: usize| values.get(i).copied().unwrap_or(current[i]);
        match self {
            GestureValues::Move { .. } => GestureValues::Move {
                delta_x: at(0),
                delta_y: at(1),
            },
            GestureValues::SwipePinch { .. } => GestureValues::SwipePinch {
                delta_x: at(0),
                delta_y: at(1),
                scale: at(2),
            },
            GestureValues::Swipe { .. } => GestureValues::Swipe {
                delta_x: at(0),
                delta_y: at(1),
                delta2_s: at(2),
            },
        }
    }
}

impl fmt::Display for GestureValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureValues::Move { delta_x, delta_y } => {
                write!(f, "dx={:.4} dy={:.4}", delta_x, delta_y)
            }
            GestureValues::SwipePinch { delta_x, delta_y, scale } => {
                write!(f, "dx={:.4} dy={:.4} scale={:.4}", delta_x, delta_y, scale)
            }
            GestureValues::Swipe { delta_x, delta_y, delta2_s } => {
                write!(f, "dx={:.4} dy={:.4} d2s={:.6}", delta_x, delta_y, delta2_s)
            }
        }
    }
}

/// Результат обработки сырого события провайдером жестов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Событие не обработано, передаётся следующему провайдеру
    NotHandled,
    /// Обработано, но клиент тоже получает событие
    HandledShared,
    /// Обработано эксклюзивно, дальше не передаётся
    HandledExclusive,
}

impl Handled {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Handled::NotHandled)
    }
}
