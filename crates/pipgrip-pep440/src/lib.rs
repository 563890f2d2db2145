//! Python version numbers and version specifiers, following
//! [PEP 440](https://peps.python.org/pep-0440).
//!
//! ```text
//! let version = Version::from_str("1.19")?;
//! let specifiers = VersionSpecifiers::from_str(">=1.16, <2.0")?;
//! assert!(specifiers.contains(&version));
//! ```
//!
//! Only the parts needed to evaluate dependency metadata are implemented: parsing and
//! normalization of versions, the total order between versions, and specifier matching. Note that
//! ordering and matching disagree in places, e.g. `1.0+local > 1.0` when sorting but `==1.0`
//! matches `1.0+local`.

pub use version::{
    LocalSegment, Operator, OperatorParseError, Prerelease, PrereleaseKind, Version,
    VersionParseError,
};
pub use version_specifier::{
    VersionSpecifier, VersionSpecifierParseError, VersionSpecifiers,
    VersionSpecifiersParseError,
};

mod version;
mod version_specifier;
