mod settings;

pub use settings::{DrainTaskConfig, RedisConfig, Settings, SpoolConfig};
