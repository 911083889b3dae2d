/// Удерживает целое значение, пока управляющая величина колеблется около x.5
#[derive(Debug, Clone)]
pub struct Hysteresis {
    amount: f64,
    at: i64,
}

impl Hysteresis {
    pub fn new(amount: f64, initial: f64) -> Self {
        Self {
            amount,
            at: initial.round() as i64,
        }
    }

    pub fn value(&self) -> i64 {
        self.at
    }

    pub fn apply(&mut self, value: f64) -> i64 {
        let (lower, upper) = (value.floor() as i64, value.ceil() as i64);
        if self.at != lower && self.at != upper {
            self.at = value.round() as i64;
        }

        let to_lower = (value - lower as f64).abs();
        let to_upper = (value - upper as f64).abs();

        if to_lower + self.amount < to_upper && self.at == upper {
            self.at = lower;
        }
        if to_upper + self.amount < to_lower && self.at == lower {
            self.at = upper;
        }

        self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hysteresis_sequence() {
        let mut h = Hysteresis::new(0.2, 0.0);
        let outputs: Vec<i64> = [0.5, 0.7, 1.0, 1.2, 1.5, 1.3, 1.5, 1.7, 1.5]
            .iter()
            .map(|&v| h.apply(v))
            .collect();

        assert_eq!(outputs, vec![0, 1, 1, 1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_jump_far_away_rounds() {
        let mut h = Hysteresis::new(0.2, 1.0);
        assert_eq!(h.apply(4.4), 4);
        assert_eq!(h.value(), 4);
    }

    #[test]
    fn test_no_flicker_near_half() {
        let mut h = Hysteresis::new(0.2, 2.0);
        for v in [2.45, 2.55, 2.48, 2.58, 2.52] {
            assert_eq!(h.apply(v), 2);
        }
        assert_eq!(h.apply(2.65), 3);
        assert_eq!(h.apply(2.45), 3);
    }
}
