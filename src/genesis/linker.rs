//! Bytecode loading and library linking.
//!
//! Compilers leave a 40-character placeholder wherever deployed bytecode
//! calls an external library:
//!
//! ```text
//! __$<first 34 hex chars of keccak256(fully-qualified name)>$__
//! ```
//!
//! Linking replaces each placeholder with the library address (40 hex
//! chars, no prefix). Bytecode is kept as hex text until linked, since
//! placeholders are not valid hex.

use std::path::Path;

use alloy_primitives::{keccak256, Address};
use serde_json::Value;

use super::GenesisError;
use crate::storage::raw_files::read_file;

const PLACEHOLDER_MARKER: &str = "__$";

/// Placeholder for the library `fully_qualified_name` (`path.sol:Name`).
pub fn library_placeholder(fully_qualified_name: &str) -> String {
    let hash = hex::encode(keccak256(fully_qualified_name.as_bytes()));
    format!("__${}$__", &hash[..34])
}

/// A library to link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLink {
    pub name: String,
    pub address: Address,
}

/// A link that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSubstitution {
    pub name: String,
    pub address: Address,
    pub occurrences: usize,
}

/// Deployed bytecode as hex, possibly containing link placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkedBytecode {
    origin: String,
    hex: String,
}

impl UnlinkedBytecode {
    /// Wraps hex text (`0x` optional); `origin` names it in errors.
    pub fn from_hex(origin: impl Into<String>, text: &str) -> Self {
        let text = text.trim();
        Self {
            origin: origin.into(),
            hex: text.strip_prefix("0x").unwrap_or(text).to_string(),
        }
    }

    /// Loads a compiled-contract JSON or a plain hex file.
    ///
    /// JSON artifacts may carry `deployedBytecode.object` (Foundry) or a
    /// `deployedBytecode` string (Hardhat).
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let origin = path.display().to_string();
        let raw = read_file(path)?;
        let text = String::from_utf8(raw).map_err(|e| GenesisError::MalformedArtifact {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;

        if !text.trim_start().starts_with('{') {
            return Ok(Self::from_hex(origin, &text));
        }

        let json: Value =
            serde_json::from_str(&text).map_err(|e| GenesisError::MalformedArtifact {
                origin: origin.clone(),
                reason: e.to_string(),
            })?;
        let code = match &json["deployedBytecode"] {
            Value::String(s) => Some(s.as_str()),
            other => other["object"].as_str(),
        };
        match code {
            Some(code) => Ok(Self::from_hex(origin, code)),
            None => Err(GenesisError::MalformedArtifact {
                origin,
                reason: String::from("no deployedBytecode"),
            }),
        }
    }

    /// Applies `links` and decodes the result.
    ///
    /// # Errors
    /// - `MissingPlaceholder` if a link matches nothing.
    /// - `UnresolvedPlaceholder` if a placeholder survives linking.
    /// - `MalformedArtifact` if the linked text is not hex or is empty.
    pub fn link(
        &self,
        links: &[LibraryLink],
    ) -> Result<(Vec<u8>, Vec<LinkSubstitution>), GenesisError> {
        let mut hex_code = self.hex.clone();
        let mut applied = Vec::with_capacity(links.len());

        for link in links {
            let placeholder = library_placeholder(&link.name);
            let occurrences = hex_code.matches(&placeholder).count();
            if occurrences == 0 {
                return Err(GenesisError::MissingPlaceholder {
                    origin: self.origin.clone(),
                    library: link.name.clone(),
                });
            }
            hex_code = hex_code.replace(&placeholder, &hex::encode(link.address));
            log::debug!(
                "Linked {} at {} ({} occurrences) into {}",
                link.name,
                link.address,
                occurrences,
                self.origin
            );
            applied.push(LinkSubstitution {
                name: link.name.clone(),
                address: link.address,
                occurrences,
            });
        }

        if let Some(offset) = hex_code.find(PLACEHOLDER_MARKER) {
            return Err(GenesisError::UnresolvedPlaceholder {
                origin: self.origin.clone(),
                offset,
            });
        }
        if hex_code.is_empty() {
            return Err(GenesisError::MalformedArtifact {
                origin: self.origin.clone(),
                reason: String::from("empty bytecode"),
            });
        }
        let code = hex::decode(&hex_code).map_err(|e| GenesisError::MalformedArtifact {
            origin: self.origin.clone(),
            reason: e.to_string(),
        })?;
        Ok((code, applied))
    }

    /// Decodes bytecode that needs no links.
    pub fn code(&self) -> Result<Vec<u8>, GenesisError> {
        self.link(&[]).map(|(code, _)| code)
    }
}
