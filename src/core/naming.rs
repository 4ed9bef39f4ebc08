//! Name and version grammar shared by the server and the CLI
//!
//! The server re-validates everything it receives; the CLI runs the same
//! functions as a pre-flight check before talking to the network.

use crate::core::service::{FieldErrors, ServiceError};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;

/// Packages shorter than this pass the server but draw a CLI warning
pub const RECOMMENDED_MIN_PACKAGE_LEN: usize = 3;

// Compile regexes once at startup
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z][a-z0-9-]*$").expect("Invalid name regex")
});
static SEMVER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("Invalid semver regex")
});
static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").expect("Invalid username regex")
});

fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len()) && NAME_REGEX.is_match(name)
}

pub fn is_valid_org_name(name: &str) -> bool {
    is_valid_name(name)
}

pub fn is_valid_package_name(name: &str) -> bool {
    is_valid_name(name)
}

/// Non-authoritative CLI hint
pub fn is_recommended_package_name(name: &str) -> bool {
    is_valid_package_name(name) && name.len() >= RECOMMENDED_MIN_PACKAGE_LEN
}

/// `MAJOR.MINOR.PATCH` only; no pre-release or build metadata
pub fn is_valid_semver(version: &str) -> bool {
    SEMVER_REGEX.is_match(version) && semver::Version::parse(version).is_ok()
}

pub fn is_valid_username(username: &str) -> bool {
    (MIN_NAME_LEN..=39).contains(&username.len()) && USERNAME_REGEX.is_match(username)
}

/// Parse a version for numeric ordering
pub fn parse_version(version: &str) -> Result<semver::Version, ServiceError> {
    if !is_valid_semver(version) {
        return Err(ServiceError::invalid("version", version_message(version)));
    }
    semver::Version::parse(version)
        .map_err(|e| ServiceError::invalid("version", format!("{}: {}", version_message(version), e)))
}

fn name_message(kind: &str, name: &str) -> String {
    format!(
        "Invalid {} name '{}': must be {}-{} characters, start with a lowercase letter, \
         and contain only lowercase letters, digits and hyphens",
        kind, name, MIN_NAME_LEN, MAX_NAME_LEN
    )
}

fn version_message(version: &str) -> String {
    format!(
        "Invalid version '{}': expected MAJOR.MINOR.PATCH (e.g. 1.0.0)",
        version
    )
}

/// Check every coordinate and report all violations together
pub fn validate_coordinates(org: &str, package: &str, version: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !is_valid_org_name(org) {
        errors.add("org", name_message("organization", org));
    }
    if !is_valid_package_name(package) {
        errors.add("package", name_message("package", package));
    }
    if !is_valid_semver(version) {
        errors.add("version", version_message(version));
    }
    errors
}

/// Organization + package only, for lookups
pub fn validate_package_ref(org: &str, package: &str) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    if !is_valid_org_name(org) {
        errors.add("org", name_message("organization", org));
    }
    if !is_valid_package_name(package) {
        errors.add("package", name_message("package", package));
    }
    errors.into_result()
}

pub fn validate_org_name(org: &str) -> Result<(), ServiceError> {
    if is_valid_org_name(org) {
        Ok(())
    } else {
        Err(ServiceError::invalid("org", name_message("organization", org)))
    }
}
