use chrono::Utc;

/// Current wall-clock time in epoch seconds, rounded to the nearest second.
pub fn now_epoch_seconds() -> i64 {
    let millis = Utc::now().timestamp_millis();
    (millis + 500).div_euclid(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_close_to_chrono() {
        let chrono_now = Utc::now().timestamp();
        let now = now_epoch_seconds();
        assert!((now - chrono_now).abs() <= 1);
    }
}
