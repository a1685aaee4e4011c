use super::StateMachineConfig;
use crate::error::ConfigError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use std::fs;

impl StateMachineConfig {
    /// Encodes the config in the binary artifact format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        encode_to_vec(self, standard())
            .map_err(|e| ConfigError::Artifact(format!("Serialization failed: {}", e)))
    }

    /// Writes the binary artifact to `path`.
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        fs::write(path, self.to_bytes()?)
            .map_err(|e| ConfigError::Artifact(format!("Could not write '{}': {}", path, e)))
    }

    /// Reads and validates an artifact written by [`save`](Self::save).
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::Artifact(format!("Could not read '{}': {}", path, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decodes an artifact. The machine is validated before it is returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let (config, _): (Self, usize) = decode_from_slice(bytes, standard())
            .map_err(|e| ConfigError::Artifact(format!("Deserialization failed: {}", e)))?;
        crate::compiler::validate(&config)?;
        Ok(config)
    }
}
