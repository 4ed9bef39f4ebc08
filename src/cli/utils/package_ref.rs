//! `org/package[@version]` references on the command line

use crate::cli::error::{CliError, CliResult};
use agentry::core::naming;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub org: String,
    pub package: String,
    pub version: Option<String>,
}

impl PackageRef {
    /// Parse and run the naming pre-flight on every part present
    pub fn parse(input: &str) -> CliResult<Self> {
        let input = input.trim();
        let (path, version) = match input.split_once('@') {
            Some((path, version)) => (path, Some(version.to_string())),
            None => (input, None),
        };

        let (org, package) = path.split_once('/').ok_or_else(|| {
            CliError::Validation(format!(
                "Invalid package reference '{}'\n  Expected format: org/package or org/package@1.2.3",
                input
            ))
        })?;

        match &version {
            Some(version) => naming::validate_coordinates(org, package, version).into_result()?,
            None => naming::validate_package_ref(org, package)?,
        }

        Ok(Self {
            org: org.to_string(),
            package: package.to_string(),
            version,
        })
    }

    /// Version is mandatory for publishing
    pub fn require_version(&self) -> CliResult<&str> {
        self.version.as_deref().ok_or_else(|| {
            CliError::Validation(format!(
                "A version is required: {}/{}@MAJOR.MINOR.PATCH",
                self.org, self.package
            ))
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{}@{}", self.org, self.package, version),
            None => write!(f, "{}/{}", self.org, self.package),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_version() {
        let reference = PackageRef::parse("acme/demo-agent@1.10.0").unwrap();
        assert_eq!(reference.org, "acme");
        assert_eq!(reference.package, "demo-agent");
        assert_eq!(reference.version.as_deref(), Some("1.10.0"));
        assert_eq!(reference.to_string(), "acme/demo-agent@1.10.0");

        let reference = PackageRef::parse("acme/demo-agent").unwrap();
        assert_eq!(reference.version, None);
        assert!(reference.require_version().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_parts() {
        assert!(matches!(
            PackageRef::parse("demo-agent"),
            Err(CliError::Validation(_))
        ));
        assert!(matches!(
            PackageRef::parse("Acme/demo-agent"),
            Err(CliError::Service(_))
        ));
        assert!(PackageRef::parse("acme/ab_cd").is_err());
        assert!(PackageRef::parse("acme/demo-agent@1.0").is_err());
        assert!(PackageRef::parse("acme/demo/agent").is_err());
    }
}
