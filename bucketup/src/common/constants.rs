// migration constants
pub const MIGRATIONS_BUCKET: &[u8] = b"migrations";
pub const VERSION_KEY: &[u8] = b"version";
pub const VERSION_WIDTH: usize = 8;

// store limits
pub const MAX_KEY_SIZE: usize = 32_768;
pub const MAX_BUCKET_NAME_SIZE: usize = 16_384;
pub const MAX_VALUE_SIZE: usize = (1 << 31) - 2;

// error prefix for everything the migration runner reports
pub const ERROR_PREFIX: &str = "bucketup: ";
