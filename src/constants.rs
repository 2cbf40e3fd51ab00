/// Application constants

pub const API_VERSION: &str = "v1";

// Safe transaction service
pub const SAFE_TX_SERVICE_BASE_URL: &str = "https://api.safe.global/tx-service";
pub const SAFE_APP_BASE_URL: &str = "https://app.safe.global";

// Retry policy (fixed interval, no backoff)
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_FETCH_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 12;
pub const FETCH_CONNECT_TIMEOUT_SECS: u64 = 4;

// Upper bound on `next` links followed for one owner on one network
pub const MAX_OWNER_SAFE_PAGES: usize = 20;
