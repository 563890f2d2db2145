use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::version::{Operator, OperatorParseError, Version, VersionParseError, compare_release};

/// A list of version specifiers, e.g. `>=1.21.1,<1.26`.
///
/// The specifiers keep the order in which they were written, so that displaying a parsed
/// requirement reproduces what the package author wrote (modulo whitespace).
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct VersionSpecifiers(Vec<VersionSpecifier>);

impl Deref for VersionSpecifiers {
    type Target = [VersionSpecifier];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl VersionSpecifiers {
    /// Matches all versions.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether all specifiers match the given version.
    pub fn contains(&self, version: &Version) -> bool {
        self.iter().all(|specifier| specifier.contains(version))
    }

    /// Returns the pinned version if this is a single `==` (or `===`) specifier.
    pub fn exact_version(&self) -> Option<&Version> {
        match self.0.as_slice() {
            [specifier]
                if matches!(specifier.operator, Operator::Equal | Operator::ExactEqual) =>
            {
                Some(&specifier.version)
            }
            _ => None,
        }
    }
}

impl FromIterator<VersionSpecifier> for VersionSpecifiers {
    fn from_iter<T: IntoIterator<Item = VersionSpecifier>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<VersionSpecifier> for VersionSpecifiers {
    fn from(specifier: VersionSpecifier) -> Self {
        Self(vec![specifier])
    }
}

impl FromStr for VersionSpecifiers {
    type Err = VersionSpecifiersParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version_specifiers(s).map(Self)
    }
}

impl Display for VersionSpecifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, version_specifier) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{version_specifier}")?;
        }
        Ok(())
    }
}

impl Serialize for VersionSpecifiers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSpecifiers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// A list of specifiers failed to parse; points at the offending specifier.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct VersionSpecifiersParseError {
    inner: Box<VersionSpecifiersParseErrorInner>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
struct VersionSpecifiersParseErrorInner {
    err: VersionSpecifierParseError,
    line: String,
    start: usize,
    end: usize,
}

impl Display for VersionSpecifiersParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use unicode_width::UnicodeWidthStr;

        let VersionSpecifiersParseErrorInner {
            ref err,
            ref line,
            start,
            end,
        } = *self.inner;
        writeln!(f, "Failed to parse version: {err}:")?;
        writeln!(f, "{line}")?;
        let indent = line[..start].width();
        let point = line[start..end].width().max(1);
        writeln!(f, "{}{}", " ".repeat(indent), "^".repeat(point))?;
        Ok(())
    }
}

impl std::error::Error for VersionSpecifiersParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner.err)
    }
}

impl VersionSpecifiersParseError {
    /// The string that failed to parse.
    pub fn line(&self) -> &str {
        &self.inner.line
    }

    /// The underlying error of the specifier that failed.
    pub fn error(&self) -> &VersionSpecifierParseError {
        &self.inner.err
    }
}

/// A version range such as `>1.2.3`, `<=4!5.6.7-a8.post9.dev0` or `== 4.1.*`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct VersionSpecifier {
    pub(crate) operator: Operator,
    pub(crate) version: Version,
}

/// A single specifier such as `>=1.0` that doesn't parse.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VersionSpecifierParseError {
    #[error("Unexpected end of version specifier, expected operator")]
    MissingOperator,
    #[error(transparent)]
    InvalidOperator(#[from] OperatorParseError),
    #[error("Unexpected end of version specifier, expected version")]
    MissingVersion,
    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),
    #[error("Operator {0} cannot be used with a wildcard version specifier")]
    OperatorWithStar(Operator),
    #[error("Operator {0} is incompatible with versions containing non-empty local segments (`+local`)")]
    OperatorLocalCombo(Operator),
    #[error("Only a release version may precede a wildcard, found `{0}.*`")]
    InvalidWildcard(String),
    #[error("The ~= operator requires at least two segments in the release version")]
    CompatibleRelease,
    #[error("Trailing `{0}` is not allowed")]
    InvalidTrailing(String),
}

impl VersionSpecifier {
    /// Build a specifier, checking the operator-version combinations PEP 440 forbids.
    pub fn from_version(
        operator: Operator,
        version: Version,
    ) -> Result<Self, VersionSpecifierParseError> {
        // "Local version identifiers are NOT permitted in this version specifier."
        let local_compatible = matches!(
            operator,
            Operator::Equal | Operator::NotEqual | Operator::ExactEqual
        );
        if version.is_local() && !local_compatible {
            return Err(VersionSpecifierParseError::OperatorLocalCombo(operator));
        }
        if operator == Operator::TildeEqual && version.release().len() < 2 {
            return Err(VersionSpecifierParseError::CompatibleRelease);
        }
        Ok(Self { operator, version })
    }

    /// `==<version>`
    pub fn equals_version(version: Version) -> Self {
        Self {
            operator: Operator::Equal,
            version,
        }
    }

    /// Get the operator, e.g. `>=` in `>= 2.0.0`
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Get the version, e.g. `2.0.0` in `<= 2.0.0`
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether the version marker includes a prerelease.
    pub fn any_prerelease(&self) -> bool {
        self.version.any_prerelease()
    }

    /// Whether the given version satisfies the version range.
    ///
    /// For example, `>=1.19,<2.0` contains `1.21`, but not `2.0`.
    pub fn contains(&self, version: &Version) -> bool {
        // "Except where specifically noted below, local version identifiers MUST NOT be permitted
        // in version specifiers, and local version labels MUST be ignored entirely when checking
        // if candidate versions match a given version specifier."
        let (this, other) = if self.version.is_local() {
            (self.version.clone(), version.clone())
        } else {
            (self.version.clone(), version.clone().without_local())
        };

        match self.operator {
            Operator::Equal => other == this,
            Operator::EqualStar => {
                this.epoch() == other.epoch() && release_prefix_matches(&this, &other)
            }
            Operator::ExactEqual => self.version.to_string() == version.to_string(),
            Operator::NotEqual => other != this,
            Operator::NotEqualStar => {
                this.epoch() != other.epoch() || !release_prefix_matches(&this, &other)
            }
            Operator::TildeEqual => {
                // "For a given release identifier V.N, the compatible release clause is
                // approximately equivalent to the pair of comparison clauses: `>= V.N, == V.*`"
                if this.epoch() != other.epoch() {
                    return false;
                }
                let prefix = &this.release()[..this.release().len().saturating_sub(1)];
                let padded = other.release().iter().chain(std::iter::repeat(&0));
                if !prefix.iter().zip(padded).all(|(this, other)| this == other) {
                    return false;
                }
                other >= this
            }
            Operator::GreaterThan => Self::greater_than(&this, &other),
            Operator::GreaterThanEqual => Self::greater_than(&this, &other) || other >= this,
            Operator::LessThan => {
                Self::less_than(&this, &other)
                    && !(compare_release(this.release(), other.release()) == Ordering::Equal
                        && other.any_prerelease())
            }
            Operator::LessThanEqual => Self::less_than(&this, &other) || other <= this,
        }
    }

    fn less_than(this: &Version, other: &Version) -> bool {
        if other.epoch() < this.epoch() {
            return true;
        }

        // Unless the specifier itself is a pre-release, `<3.1` must not match `3.1.dev0` or
        // `3.1a1`, but it matches `3.0.dev0`.
        if !this.any_prerelease()
            && other.pre().is_some()
            && compare_release(this.release(), other.release()) == Ordering::Equal
        {
            return false;
        }

        other < this
    }

    fn greater_than(this: &Version, other: &Version) -> bool {
        if other.epoch() > this.epoch() {
            return true;
        }

        if compare_release(this.release(), other.release()) == Ordering::Equal {
            // `>3.1` must not match `3.1.post0` unless the specifier is a post release itself.
            if !this.is_post() && other.is_post() {
                return false;
            }
            if other.is_local() {
                return false;
            }
        }

        other > this
    }
}

/// The release of `other` starts with the release of the wildcard specifier `this`.
fn release_prefix_matches(this: &Version, other: &Version) -> bool {
    let padded = other.release().iter().chain(std::iter::repeat(&0));
    this.release()
        .iter()
        .zip(padded)
        .all(|(this, other)| this == other)
}

impl FromStr for VersionSpecifier {
    type Err = VersionSpecifierParseError;

    /// Parses a specifier such as `>= 1.19`, `== 1.1.*`, `~=1.0+abc.5` or `<=1!2012.2`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut s = unscanny::Scanner::new(spec);
        s.eat_whitespace();
        // The operator, without knowing yet whether the version has a star.
        let operator = s.eat_while(['=', '!', '~', '<', '>']);
        if operator.is_empty() {
            return Err(VersionSpecifierParseError::MissingOperator);
        }
        let operator = Operator::from_str(operator)?;
        s.eat_whitespace();
        let version = s.eat_while(|c: char| !c.is_whitespace());
        if version.is_empty() {
            return Err(VersionSpecifierParseError::MissingVersion);
        }
        s.eat_whitespace();
        if !s.done() {
            return Err(VersionSpecifierParseError::InvalidTrailing(
                s.after().to_string(),
            ));
        }

        if let Some(prefix) = version.strip_suffix(".*") {
            let operator = match operator {
                Operator::Equal => Operator::EqualStar,
                Operator::NotEqual => Operator::NotEqualStar,
                other => return Err(VersionSpecifierParseError::OperatorWithStar(other)),
            };
            let version = Version::from_str(prefix)?;
            // Only the release may precede a wildcard.
            if version.any_prerelease() || version.is_post() || version.is_local() {
                return Err(VersionSpecifierParseError::InvalidWildcard(
                    prefix.to_string(),
                ));
            }
            return Ok(Self { operator, version });
        }

        Self::from_version(operator, Version::from_str(version)?)
    }
}

impl Display for VersionSpecifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if matches!(self.operator, Operator::EqualStar | Operator::NotEqualStar) {
            return write!(f, "{}{}.*", self.operator, self.version);
        }
        write!(f, "{}{}", self.operator, self.version)
    }
}

fn parse_version_specifiers(spec: &str) -> Result<Vec<VersionSpecifier>, VersionSpecifiersParseError> {
    let mut version_ranges = Vec::new();
    if spec.trim().is_empty() {
        return Ok(version_ranges);
    }
    let mut start: usize = 0;
    let separator = ",";
    for version_range_spec in spec.split(separator) {
        match VersionSpecifier::from_str(version_range_spec) {
            Err(err) => {
                return Err(VersionSpecifiersParseError {
                    inner: Box::new(VersionSpecifiersParseErrorInner {
                        err,
                        line: spec.to_string(),
                        start,
                        end: start + version_range_spec.len(),
                    }),
                });
            }
            Ok(version_range) => {
                version_ranges.push(version_range);
            }
        }
        start += version_range_spec.len();
        start += separator.len();
    }
    Ok(version_ranges)
}
