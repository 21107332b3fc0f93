//! Schema loading: versioned fetch with bundled fallback.

use super::Schema;
use crate::issues::{CoreError, CoreResult};
use serde_json::Value;

const BUNDLED_SCHEMA: &str = include_str!("bundled/schema.json");
const BUNDLED_SCHEMA_ORG: &str = include_str!("bundled/schemaorg.json");

#[cfg(feature = "remote-schema")]
const SCHEMA_BASE_URL: &str =
    "https://raw.githubusercontent.com/psych-ds/psych-DS/master/schema_model/versions/jsons";

/// Check a requested schema version string: `latest` or semver `X.Y.Z`.
pub fn validate_version(version: &str) -> CoreResult<()> {
    if version == "latest" {
        return Ok(());
    }
    semver::Version::parse(version).map_err(|_| CoreError::InvalidSchemaVersion {
        version: version.to_string(),
    })?;
    Ok(())
}

/// Load the combined schema for the requested version.
///
/// With the `remote-schema` feature the versioned document is fetched from
/// the Psych-DS repository; any fetch or parse failure falls back to the
/// bundled copy. The schema.org vocabulary is merged under `schemaOrg`.
pub fn load_schema(version: &str) -> CoreResult<Schema> {
    validate_version(version)?;

    #[cfg(feature = "remote-schema")]
    if let Some(schema) = fetch_remote(version) {
        return Ok(schema);
    }

    load_bundled()
}

/// The bundled schema, used as the offline fallback and in tests.
pub fn load_bundled() -> CoreResult<Schema> {
    let schema: Value =
        serde_json::from_str(BUNDLED_SCHEMA).map_err(|e| CoreError::SchemaLoad {
            message: format!("bundled schema.json is invalid: {}", e),
        })?;
    let schema_org: Value =
        serde_json::from_str(BUNDLED_SCHEMA_ORG).map_err(|e| CoreError::SchemaLoad {
            message: format!("bundled schemaorg.json is invalid: {}", e),
        })?;
    Ok(Schema::from_parts(schema, schema_org))
}

#[cfg(feature = "remote-schema")]
fn fetch_remote(version: &str) -> Option<Schema> {
    let fetch = |url: &str| -> Option<Value> {
        let response = reqwest::blocking::get(url).ok()?;
        if !response.status().is_success() {
            tracing::debug!(%url, status = %response.status(), "schema fetch failed");
            return None;
        }
        response.json().ok()
    };

    let schema = fetch(&format!("{}/{}/schema.json", SCHEMA_BASE_URL, version))?;
    let schema_org = fetch(&format!("{}/{}/schemaorg.json", SCHEMA_BASE_URL, version))?;
    tracing::debug!(%version, "loaded schema from remote");
    Some(Schema::from_parts(schema, schema_org))
}
