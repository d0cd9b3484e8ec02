pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];
pub const DEFAULT_LOCAL_DIR: &str = "static/generated_images";
pub const DEFAULT_PUBLIC_PREFIX: &str = "/generated_images";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_RESULT_BYTES: u64 = 50 * 1024 * 1024;
