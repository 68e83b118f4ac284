//! Profile document codec.
//!
//! ```json
//! { "version": 1,
//!   "profiles": [ { "displayName": "...", "tileUri": "...",
//!                   "identifiers": [["provider", "value"], ...] } ] }
//! ```
//!
//! Parsing is lenient: a malformed entry is skipped on its own and a malformed
//! document yields no profiles. The internal identifier and the suggestion flag
//! are never written; both are recomputed on load.

use idflow_models::{Profile, ProfileIdentifier};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StorageError};

/// Highest document version this build reads and the version it writes.
/// Documents without a `version` field are treated as version 1.
pub const DOCUMENT_VERSION: u64 = 1;

#[derive(Serialize)]
struct Document<'a> {
    version: u64,
    profiles: Vec<StoredProfile<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile<'a> {
    display_name: &'a str,
    tile_uri: &'a str,
    identifiers: Vec<[&'a str; 2]>,
}

/// Serialize profiles, in the given order, into the document format.
pub fn serialize_document<'a, I>(profiles: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Profile>,
{
    let document = Document {
        version: DOCUMENT_VERSION,
        profiles: profiles
            .into_iter()
            .map(|profile| StoredProfile {
                display_name: profile.display_name(),
                tile_uri: profile.tile_uri(),
                identifiers: profile
                    .identifiers()
                    .iter()
                    .map(|id| [id.provider_key.as_str(), id.provider_value.as_str()])
                    .collect(),
            })
            .collect(),
    };

    Ok(serde_json::to_vec(&document)?)
}

/// Parse a decrypted document into profiles.
///
/// Only a document from a newer, unsupported version is an error; every other
/// defect degrades to skipping the affected entry or the whole document.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<Profile>> {
    let document: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "Profile document is not valid JSON");
            return Ok(Vec::new());
        }
    };

    let Some(object) = document.as_object() else {
        debug!("Profile document is not an object");
        return Ok(Vec::new());
    };

    if let Some(version) = object.get("version") {
        match version.as_u64() {
            Some(found) if found > DOCUMENT_VERSION => {
                return Err(StorageError::UnsupportedVersion {
                    found,
                    supported: DOCUMENT_VERSION,
                });
            }
            Some(_) => {}
            None => {
                debug!("Profile document version is not an integer");
                return Ok(Vec::new());
            }
        }
    }

    let Some(entries) = object.get("profiles").and_then(Value::as_array) else {
        debug!("Profile document has no profile list");
        return Ok(Vec::new());
    };

    let profiles: Vec<Profile> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let parsed = parse_profile(entry);
            if parsed.is_none() {
                debug!(index, "Skipping malformed profile entry");
            }
            parsed
        })
        .collect();

    Ok(profiles)
}

fn parse_profile(entry: &Value) -> Option<Profile> {
    let entry = entry.as_object()?;
    let display_name = entry.get("displayName")?.as_str()?;
    let tile_uri = entry.get("tileUri")?.as_str()?;
    let identifiers = entry
        .get("identifiers")?
        .as_array()?
        .iter()
        .map(parse_identifier)
        .collect::<Option<Vec<_>>>()?;

    Some(Profile::new(display_name, tile_uri, identifiers))
}

fn parse_identifier(pair: &Value) -> Option<ProfileIdentifier> {
    match pair.as_array()?.as_slice() {
        [key, value] => Some(ProfileIdentifier::new(key.as_str()?, value.as_str()?)),
        _ => None,
    }
}
