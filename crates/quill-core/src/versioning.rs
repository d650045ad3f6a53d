//! Document version-number arithmetic.
//!
//! Cloud documents carry `major.minor` version numbers rendered as labels
//! like `v1.2`. Uploads increment the minor number; when the minor number
//! reaches the rollover threshold the next upload bumps the major number
//! instead.

use std::fmt;

/// Minor numbers past this value roll over into the next major version.
pub const MINOR_VERSION_ROLLOVER: i32 = 9;

/// A `major.minor` document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionNumber {
    pub major: i32,
    pub minor: i32,
}

impl VersionNumber {
    /// The first version assigned to a freshly created document.
    pub fn initial() -> Self {
        Self { major: 1, minor: 0 }
    }

    /// The version an upload after this one receives.
    pub fn next(self) -> Self {
        if self.minor >= MINOR_VERSION_ROLLOVER {
            Self {
                major: self.major + 1,
                minor: 0,
            }
        } else {
            Self {
                major: self.major,
                minor: self.minor + 1,
            }
        }
    }

    /// Render as a label, e.g. `"v1.2"`.
    pub fn label(self) -> String {
        format!("v{}.{}", self.major, self.minor)
    }

    /// Parse a label like `"v1.2"` (the leading `v` is optional).
    pub fn parse_label(label: &str) -> Option<Self> {
        let stripped = label.strip_prefix('v').unwrap_or(label);
        let (major, minor) = stripped.split_once('.')?;
        let major: i32 = major.parse().ok()?;
        let minor: i32 = minor.parse().ok()?;
        if major < 0 || minor < 0 {
            return None;
        }
        Some(Self { major, minor })
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_v1_0() {
        assert_eq!(VersionNumber::initial().label(), "v1.0");
    }

    #[test]
    fn next_increments_minor() {
        let v = VersionNumber { major: 1, minor: 0 }.next();
        assert_eq!(v, VersionNumber { major: 1, minor: 1 });
    }

    #[test]
    fn next_rolls_over_at_threshold() {
        let v = VersionNumber { major: 1, minor: 9 }.next();
        assert_eq!(v, VersionNumber { major: 2, minor: 0 });
    }

    #[test]
    fn ordering_follows_major_then_minor() {
        let a = VersionNumber { major: 1, minor: 9 };
        let b = VersionNumber { major: 2, minor: 0 };
        assert!(a < b);
    }

    #[test]
    fn parse_label_roundtrip() {
        let v = VersionNumber::parse_label("v3.4").unwrap();
        assert_eq!(v, VersionNumber { major: 3, minor: 4 });
        assert_eq!(v.label(), "v3.4");
    }

    #[test]
    fn parse_label_accepts_bare_numbers() {
        assert_eq!(
            VersionNumber::parse_label("1.0"),
            Some(VersionNumber { major: 1, minor: 0 })
        );
    }

    #[test]
    fn parse_label_rejects_garbage() {
        assert_eq!(VersionNumber::parse_label("v1"), None);
        assert_eq!(VersionNumber::parse_label("latest"), None);
        assert_eq!(VersionNumber::parse_label("v-1.0"), None);
        assert_eq!(VersionNumber::parse_label(""), None);
    }
}
