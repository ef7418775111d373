//! Server version parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` server version.
///
/// Parsing ignores any suffix after the numeric part (`8.0.32-log`,
/// `5.7.44-48-log`, `8.4.0-commercial`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Error returned when a version string has no leading numeric component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server version '{0}'")]
pub struct ParseVersionError(pub String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric: &str = s
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or_default();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let mut next = || -> Option<u32> { parts.next().and_then(|p| p.parse().ok()) };

        let major = next().ok_or_else(|| ParseVersionError(s.to_string()))?;
        let minor = next().unwrap_or(0);
        let patch = next().unwrap_or(0);

        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        assert_eq!("8.0.32-log".parse::<Version>().unwrap(), Version::new(8, 0, 32));
        assert_eq!("5.7.44-48-log".parse::<Version>().unwrap(), Version::new(5, 7, 44));
        assert_eq!("9.1".parse::<Version>().unwrap(), Version::new(9, 1, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("MariaDB".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(8, 0, 3) > Version::new(8, 0, 2));
        assert!(Version::new(8, 0, 0) > Version::new(5, 7, 44));
    }
}
