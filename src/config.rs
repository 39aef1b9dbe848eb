use crate::error::{ExportError, Result};
use crate::resolver::ResolutionPolicy;

#[derive(Debug, Clone)]
pub struct StewardConfig {
    pub database_url: String,
    pub bind_address: String,
    pub export_batch_size: usize,
    pub resolution_policy: ResolutionPolicy,
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/steward_development".to_string(),
            bind_address: "127.0.0.1:8743".to_string(),
            export_batch_size: crate::emitter::DEFAULT_BATCH_SIZE,
            resolution_policy: ResolutionPolicy::Lenient,
        }
    }
}

impl StewardConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(bind) = std::env::var("STEWARD_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(batch_size) = std::env::var("STEWARD_EXPORT_BATCH_SIZE") {
            config.export_batch_size = batch_size.parse().map_err(|e| {
                ExportError::Configuration(format!("Invalid export_batch_size: {e}"))
            })?;
        }

        if let Ok(policy) = std::env::var("STEWARD_RESOLUTION_POLICY") {
            config.resolution_policy = match policy.as_str() {
                "strict" => ResolutionPolicy::Strict,
                "lenient" => ResolutionPolicy::Lenient,
                other => {
                    return Err(ExportError::Configuration(format!(
                        "Invalid resolution_policy: {other} (expected strict or lenient)"
                    )))
                }
            };
        }

        Ok(config)
    }
}
