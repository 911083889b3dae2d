/// Слот протокола multitouch type B. tracking_id < 0 означает свободный слот.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSlot {
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Default for TouchSlot {
    fn default() -> Self {
        Self {
            tracking_id: -1,
            x: -1,
            y: -1,
            z: -1,
        }
    }
}

impl TouchSlot {
    pub fn is_active(&self) -> bool {
        self.tracking_id >= 0
    }

    /// Освобождение слота сбрасывает координаты
    pub fn set_tracking_id(&mut self, tracking_id: i32) {
        self.tracking_id = tracking_id;
        if tracking_id < 0 {
            *self = Self::default();
        }
    }
}
