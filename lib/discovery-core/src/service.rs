//! Service definitions compiled for matching

use crate::{CoreError, Result};
use discovery_api::ServiceDefinition;
use regex::Regex;

/// Strip the leading separators docker puts in front of container names.
///
/// The runtime reports names as `/app-1`; patterns and server keys use the
/// bare `app-1`.
pub fn instance_name(raw: &str) -> &str {
    raw.trim_start_matches('/')
}

/// A service definition plus its compiled name pattern
#[derive(Clone, Debug)]
pub struct Service {
    key: String,
    definition: ServiceDefinition,
    container_port: u16,
    matcher: Regex,
}

impl Service {
    /// Validate and compile a definition
    pub fn new(key: &str, definition: ServiceDefinition) -> Result<Self> {
        if key.is_empty() {
            return Err(CoreError::invalid_definition(key, "empty service key"));
        }

        let container_port = u16::try_from(definition.container_port)
            .ok()
            .filter(|port| *port > 0)
            .ok_or_else(|| {
                CoreError::invalid_definition(
                    key,
                    format!("container port {} out of range", definition.container_port),
                )
            })?;

        let matcher = Regex::new(&definition.name_pattern)
            .map_err(|e| CoreError::invalid_definition(key, e))?;

        Ok(Self {
            key: key.to_string(),
            definition,
            container_port,
            matcher,
        })
    }

    /// Parse a raw store value into a service
    pub fn from_entry(key: &str, raw: &str) -> Result<Self> {
        let definition: ServiceDefinition =
            serde_json::from_str(raw).map_err(|e| CoreError::invalid_definition(key, e))?;
        Self::new(key, definition)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    pub fn container_port(&self) -> u16 {
        self.container_port
    }

    /// Check a container name, already stripped with [`instance_name`]
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}
