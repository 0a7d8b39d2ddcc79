use std::{future::Future, time::Duration};

use tokio::time::sleep;

/// Retry an async operation on a fixed interval, e.g. waiting for a freshly
/// forged block to reach the wallet.
pub async fn retry<T, E, F, Fut>(retry_fn: F, max_retries: u32, delay: u64) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>> + Send,
    F: Fn() -> Fut,
    E: std::fmt::Debug, {
    let mut retries = 0;
    let d = Duration::from_millis(delay);
    loop {
        match retry_fn().await {
            Ok(value) => return Ok(value),
            Err(_) if retries < max_retries => {
                retries += 1;
                sleep(d).await;
            }
            Err(err) => {
                return Err(err);
            }
        }
    }
}

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

pub fn format_capacity(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

pub fn format_deadline(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = seconds % 86400 / 3600;
    let minutes = seconds % 3600 / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_units() {
        assert_eq!(format_capacity(512), "512.00 B");
        assert_eq!(format_capacity(262144), "256.00 KiB");
        assert_eq!(format_capacity(1024 * 1024 * 1024), "1.00 GiB");
        assert_eq!(format_capacity(5 * 1024u64.pow(4)), "5.00 TiB");
    }

    #[test]
    fn deadline_rendering() {
        assert_eq!(format_deadline(59), "00:00:59");
        assert_eq!(format_deadline(3661), "01:01:01");
        assert_eq!(format_deadline(90061), "1d 01:01:01");
    }
}
