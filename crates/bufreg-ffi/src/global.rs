//! The process-wide registry behind the C entry points
//!
//! Built once, either explicitly by `bufreg_init` or lazily from defaults and
//! `BUFREG_*` environment variables on the first call that needs it.

use std::sync::OnceLock;

use bufreg_core::{Error, HandleRegistry, RegistryConfig, Result};

static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();

/// The registry, created from defaults if nothing initialized it yet
pub fn registry() -> &'static HandleRegistry {
    REGISTRY.get_or_init(|| {
        let config = RegistryConfig::load(None).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid environment configuration");
            RegistryConfig::default()
        });
        HandleRegistry::new(&config)
    })
}

/// Build the registry from `config`.
///
/// Fails if the registry already exists, including when an earlier call
/// created it lazily.
pub fn init(config: &RegistryConfig) -> Result<&'static HandleRegistry> {
    config.validate()?;

    let mut created = false;
    let registry = REGISTRY.get_or_init(|| {
        created = true;
        HandleRegistry::new(config)
    });

    if created {
        tracing::info!(
            shards = config.shard_count,
            max_buffer_capacity = config.max_buffer_capacity,
            max_total_bytes = config.max_total_bytes,
            "Buffer registry initialized"
        );
        Ok(registry)
    } else {
        Err(Error::config("buffer registry is already initialized"))
    }
}

pub fn is_initialized() -> bool {
    REGISTRY.get().is_some()
}
