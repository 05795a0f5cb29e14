//! Engine version strings such as `2019.4.16f1`.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::Serialize;

use crate::error::{Error, Result};

/// A parsed engine version
///
/// Ordering compares the numeric parts only; the build type letter does not take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// `a`, `b`, `f`, `p` or `x`; `'\0'` when absent
    pub build_type: char,
    pub build: u32,
}

impl UnityVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build_type: '\0',
            build: 0,
        }
    }

    /// Stripped builds write `0.0.0` instead of the engine version
    pub fn is_stripped(&self) -> bool {
        self.major == 0
    }

    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    fn key(&self) -> (u32, u32, u32, u32) {
        (self.major, self.minor, self.patch, self.build)
    }
}

impl PartialOrd for UnityVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnityVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl FromStr for UnityVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidUnityVersion(s.to_owned());

        let mut parts = s.trim().splitn(3, '.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let rest = parts.next().unwrap_or("0");

        // "16f1": patch digits, build type letter, build digits
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let patch = rest[..digits].parse().map_err(|_| invalid())?;
        let mut tail = rest[digits..].chars();
        let build_type = tail.next().unwrap_or('\0');
        let build = tail
            .as_str()
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .filter(|b| !b.is_empty())
            .map(str::parse::<u32>)
            .transpose()
            .map_err(|_| invalid())?
            .unwrap_or(0);

        Ok(UnityVersion {
            major,
            minor,
            patch,
            build_type,
            build,
        })
    }
}

impl fmt::Display for UnityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.build_type != '\0' {
            write!(f, "{}{}", self.build_type, self.build)?;
        }
        Ok(())
    }
}

/// Pick the first usable version among candidates, skipping stripped and unparseable strings
pub fn resolve<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Result<UnityVersion> {
    let mut last = String::new();
    for candidate in candidates {
        match candidate.parse::<UnityVersion>() {
            Ok(version) if !version.is_stripped() => return Ok(version),
            _ => last = candidate.to_owned(),
        }
    }
    Err(Error::InvalidUnityVersion(last))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{resolve, UnityVersion};
    use crate::error::{Error, Result};

    #[test]
    fn parses_release_versions() -> Result<()> {
        let version: UnityVersion = "2019.4.16f1".parse()?;
        assert_eq!(
            version,
            UnityVersion {
                major: 2019,
                minor: 4,
                patch: 16,
                build_type: 'f',
                build: 1,
            }
        );
        assert_eq!(version.to_string(), "2019.4.16f1");

        let short: UnityVersion = "2022.1".parse()?;
        assert_eq!(short, UnityVersion::new(2022, 1, 0));

        Ok(())
    }

    #[test]
    fn orders_numerically() -> Result<()> {
        let a: UnityVersion = "2017.4.40f1".parse()?;
        let b: UnityVersion = "2018.2.0b3".parse()?;
        let c: UnityVersion = "2018.10.1f1".parse()?;
        assert!(a < b);
        assert!(b < c);
        assert!(c.at_least(2018, 3));
        assert!(!a.at_least(2018, 2));
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "5.x.x".parse::<UnityVersion>(),
            Err(Error::InvalidUnityVersion(s)) if s == "5.x.x"
        ));
        assert!("".parse::<UnityVersion>().is_err());
    }

    #[test]
    fn resolve_skips_stripped() -> Result<()> {
        let version = resolve(["0.0.0", "2020.3.1f1"])?;
        assert_eq!((version.major, version.minor, version.patch), (2020, 3, 1));
        assert!(resolve(["0.0.0", "5.x.x"]).is_err());
        Ok(())
    }
}
