pub mod errors;
pub mod interaction;
pub mod log;
pub mod plot;
pub mod types;
pub mod utils;

pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
