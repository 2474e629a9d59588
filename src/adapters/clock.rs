use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_is_date_of_now() {
        let clock = SystemClock;
        let before = Utc::now().date_naive();
        let today = clock.today();
        let after = Utc::now().date_naive();
        assert!(today == before || today == after);
    }
}
