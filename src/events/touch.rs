use smallvec::SmallVec;
use std::fmt;
use std::time::Instant;

/// Одно касание в нормализованных координатах тачпада
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub tracking_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TouchPoint {
    pub fn new(tracking_id: i32, x: f64, y: f64, z: f64) -> Self {
        Self { tracking_id, x, y, z }
    }
}

/// Снимок состояния тачпада на границе синхронизации (SYN_REPORT)
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSnapshot {
    pub timestamp: Instant,
    /// Количество пальцев по BTN_TOOL_*, может не совпадать с числом касаний ниже
    pub touch_count: usize,
    pub touches: SmallVec<[TouchPoint; 5]>,
}

impl TouchSnapshot {
    pub fn new(timestamp: Instant, touch_count: usize, touches: impl IntoIterator<Item = TouchPoint>) -> Self {
        Self {
            timestamp,
            touch_count,
            touches: touches.into_iter().collect(),
        }
    }

    pub fn find(&self, tracking_id: i32) -> Option<&TouchPoint> {
        self.touches.iter().find(|t| t.tracking_id == tracking_id)
    }
}

impl fmt::Display for TouchSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} пальцев [", self.touch_count)?;
        for (i, t) in self.touches.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ({:.3}, {:.3}, {:.2})", t.tracking_id, t.x, t.y, t.z)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_tracking_id() {
        let snapshot = TouchSnapshot::new(
            Instant::now(),
            2,
            [TouchPoint::new(7, 0.1, 0.2, 1.0), TouchPoint::new(9, 0.5, 0.5, 1.0)],
        );

        assert_eq!(snapshot.find(9).map(|t| t.x), Some(0.5));
        assert!(snapshot.find(3).is_none());
    }

    #[test]
    fn test_display() {
        let snapshot = TouchSnapshot::new(Instant::now(), 1, [TouchPoint::new(1, 0.25, 0.5, 1.0)]);
        assert_eq!(snapshot.to_string(), "1 пальцев [1: (0.250, 0.500, 1.00)]");
    }
}
