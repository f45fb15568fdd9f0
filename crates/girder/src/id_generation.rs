//! Hash-based edge ID generation.
//!
//! Edge IDs are short, collision-resistant, human-pasteable keys of the
//! form `{prefix}-{hash}` (e.g. "dep-a3f8"), derived from the edge's
//! endpoint pair via SHA256 and base36 encoding.
//!
//! # Features
//!
//! - **Adaptive length**: ID length grows with store size (4-6 characters)
//! - **Collision resistant**: nonce retry on hash collisions
//!
//! # Example
//!
//! ```
//! use girder::id_generation::{EdgeIdGenerator, EdgeIdGeneratorConfig};
//!
//! let config = EdgeIdGeneratorConfig {
//!     prefix: "dep".to_string(),
//!     store_size: 100,
//! };
//!
//! let mut generator = EdgeIdGenerator::new(config);
//! let id = generator.generate("design-done", "kickoff", None).unwrap();
//! assert!(id.starts_with("dep-"));
//! ```

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;

/// Errors that can occur during edge ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and length increases
    #[error("Unable to generate unique edge ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonce attempts made before giving up.
        attempts: u32,
    },

    /// Base36 encoding failed
    #[error("Base36 encoding failed: {0}")]
    EncodingFailed(String),

    /// Invalid length parameter
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Configuration for edge ID generation
#[derive(Debug, Clone)]
pub struct EdgeIdGeneratorConfig {
    /// Prefix for all IDs (e.g. "dep")
    pub prefix: String,

    /// Current number of stored edges (affects adaptive length)
    pub store_size: usize,
}

/// Hash-based edge ID generator with collision detection.
///
/// The generator tracks every ID it has handed out (or been told about via
/// [`register_id`](Self::register_id)) so repeated generation for the same
/// endpoint pair in the same second still yields distinct IDs.
pub struct EdgeIdGenerator {
    config: EdgeIdGeneratorConfig,
    existing_ids: HashSet<String>,
}

impl EdgeIdGenerator {
    /// Create a new ID generator with the given configuration
    pub fn new(config: EdgeIdGeneratorConfig) -> Self {
        Self {
            config,
            existing_ids: HashSet::new(),
        }
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: String) {
        self.existing_ids.insert(id);
    }

    /// The store size this generator was configured with
    pub fn store_size(&self) -> usize {
        self.config.store_size
    }

    /// Generate a new unique edge ID.
    ///
    /// # Arguments
    ///
    /// * `milestone_id` - The dependent milestone key
    /// * `depends_on_id` - The prerequisite milestone key
    /// * `created_by` - Optional creator attribution
    ///
    /// # Errors
    ///
    /// Returns an error if unable to generate a unique ID after trying all
    /// nonces at the maximum length.
    pub fn generate(
        &mut self,
        milestone_id: &str,
        depends_on_id: &str,
        created_by: Option<&str>,
    ) -> Result<String, IdGenerationError> {
        let id_length = self.adaptive_length();

        // Try generating with different nonces
        for nonce in 0..MAX_NONCE {
            let id =
                self.generate_hash_id(milestone_id, depends_on_id, created_by, nonce, id_length)?;

            if !self.existing_ids.contains(&id) {
                if nonce > 0 {
                    debug!(
                        nonce,
                        id_length, "Generated unique edge ID after {} collision retries", nonce
                    );
                }
                self.existing_ids.insert(id.clone());
                return Ok(id);
            }
        }

        // If all nonces collide, try with increased length
        if id_length < 6 {
            warn!(
                id_length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing edge ID length to {}",
                id_length + 1
            );
            let longer_id =
                self.generate_hash_id(milestone_id, depends_on_id, created_by, 0, id_length + 1)?;
            self.existing_ids.insert(longer_id.clone());
            return Ok(longer_id);
        }

        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_NONCE,
        })
    }

    /// Generate a hash-based ID with the given parameters
    fn generate_hash_id(
        &self,
        milestone_id: &str,
        depends_on_id: &str,
        created_by: Option<&str>,
        nonce: u32,
        length: usize,
    ) -> Result<String, IdGenerationError> {
        // Combine inputs for hashing
        let timestamp = Utc::now().timestamp();
        let content = format!(
            "{}|{}|{}|{}|{}",
            milestone_id,
            depends_on_id,
            created_by.unwrap_or(""),
            timestamp,
            nonce
        );

        // SHA256 hash
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        // Base36 encode to desired length
        let hash_str = encode_base36(&hash_bytes[..8], length)?;

        // Format: {prefix}-{hash}
        Ok(format!("{}-{}", self.config.prefix, hash_str))
    }

    /// Determine ID length based on store size
    ///
    /// - 0-500 edges: 4 chars
    /// - 500-1,500: 5 chars
    /// - 1,500+: 6 chars
    fn adaptive_length(&self) -> usize {
        match self.config.store_size {
            0..=500 => 4,
            501..=1500 => 5,
            _ => 6,
        }
    }
}

/// Encode bytes as a base36 string of the requested length.
///
/// The input is limited to the first 8 bytes of the SHA256 hash so the
/// accumulator fits a u64; wrapping arithmetic keeps the output
/// deterministic if that assumption is ever violated.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut num: u64 = 0;
    for &byte in bytes {
        num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut chars = Vec::with_capacity(length);
    for _ in 0..length {
        let digit = (num % 36) as usize;
        chars.push(BASE36_CHARS[digit]);
        num /= 36;
    }
    chars.reverse();

    String::from_utf8(chars).map_err(|e| IdGenerationError::EncodingFailed(e.to_string()))
}
