use semver::Version;

use super::ManifestError;

/// Parse a `v`-prefixed semantic version such as `v2.3.1`.
pub fn parse_version(version: &str) -> Result<Version, ManifestError> {
    let bare = version
        .strip_prefix('v')
        .ok_or_else(|| ManifestError::InvalidVersion {
            version: version.to_string(),
            reason: "missing 'v' prefix".to_string(),
        })?;

    Version::parse(bare).map_err(|e| ManifestError::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Next major version: `v2.3.1` becomes `v3.0.0`. Pre-release and build
/// metadata are dropped.
pub fn next_major(version: &str) -> Result<String, ManifestError> {
    let current = parse_version(version)?;
    let next = Version::new(current.major + 1, 0, 0);
    Ok(format!("v{next}"))
}
