pub static STABILIZE_SLEEP_MILLIS: u64 = 7_000;
pub static FIX_FINGERS_SLEEP_MILLIS: u64 = 3_000;
pub static CHECK_PREDECESSOR_SLEEP_MILLIS: u64 = 5_000;

pub static RPC_TIMEOUT_SECS: u64 = 10;
pub static STORAGE_FORWARD_TIMEOUT_SECS: u64 = 8;
