use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

/// Relying-party credentials for one provider.
///
/// Loaded from a `client_secrets.json` document: a JSON object with exactly
/// one entry keyed by provider kind (conventionally `"web"`), holding the
/// registered client identity and the issuer to discover endpoints from.
/// Extra fields inside the entry (`redirect_uris`, `auth_uri`, …) are
/// accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
}

impl ClientSecrets {
    /// Load secrets from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not valid
    /// JSON, or does not hold exactly one well-formed provider entry.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read client secrets file {}: {e}",
                path.display()
            ))
        })?;
        let document: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("client secrets file is not valid JSON: {e}")))?;
        Self::from_value(document)
    }

    /// Load secrets from an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless the document is an object with
    /// exactly one provider entry carrying `client_id`, `client_secret`
    /// and `issuer`.
    pub fn from_value(document: serde_json::Value) -> Result<Self, Error> {
        let entries = match document {
            serde_json::Value::Object(map) => map,
            _ => return Err(Error::Config("client secrets must be a JSON object".into())),
        };

        let mut entries = entries.into_iter();
        let entry = match entries.next() {
            Some((_, entry)) => entry,
            None => {
                return Err(Error::Config(
                    "client secrets document has no provider entry".into(),
                ));
            }
        };
        if entries.next().is_some() {
            return Err(Error::Config(
                "client secrets document must hold exactly one provider entry".into(),
            ));
        }

        serde_json::from_value(entry)
            .map_err(|e| Error::Config(format!("malformed client secrets entry: {e}")))
    }
}
