//! The error-delay smear: every asynchronous failure is scheduled behind a
//! uniform random delay in `[200ms, 1000ms)` before it's delivered, to raise
//! the cost of timing-based brute-force probing. Construction-time
//! (synchronous) errors bypass this deliberately — see `KeychainConfig::new`.

use rand::Rng;
use std::time::Duration;

const MIN_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 1000;

pub async fn error_delay() {
    let millis = rand::thread_rng().gen_range(MIN_DELAY_MS..MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
