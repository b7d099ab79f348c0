//! Day-over-day price change for the ticker header.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    pub change: f64,
    pub change_percent: f64,
    pub direction: Direction,
}

/// A missing previous close is taken to be the current price, which reports
/// no change. A zero previous close reports a zero percentage.
pub fn compute_price_change(current: f64, previous_close: Option<f64>) -> PriceChange {
    let previous_close = previous_close.unwrap_or(current);
    let change = current - previous_close;
    let change_percent = if previous_close != 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };
    let direction = if change >= 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };

    PriceChange {
        change,
        change_percent,
        direction,
    }
}
