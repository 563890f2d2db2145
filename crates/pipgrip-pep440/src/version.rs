use std::cmp::{Ordering, max};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The PEP 440 parsing regex from
/// <https://peps.python.org/pep-0440/#appendix-b-parsing-version-strings-with-regular-expressions>.
const VERSION_RE_INNER: &str = r"
(?:
    (?:v?)                                            # <https://peps.python.org/pep-0440/#preceding-v-character>
    (?:(?P<epoch>[0-9]+)!)?                           # epoch
    (?P<release>[0-9]+(?:\.[0-9]+)*)                  # release segment
    (?P<pre_field>                                    # pre-release
        [-_\.]?
        (?P<pre_name>(alpha|a|beta|b|preview|pre|c|rc))
        [-_\.]?
        (?P<pre>[0-9]+)?
    )?
    (?P<post_field>                                   # post release
        (?:-(?P<post_old>[0-9]+))
        |
        (?:
            [-_\.]?
            (?P<post_l>post|rev|r)
            [-_\.]?
            (?P<post_new>[0-9]+)?
        )
    )?
    (?P<dev_field>                                    # dev release
        [-_\.]?
        (?P<dev_l>dev)
        [-_\.]?
        (?P<dev>[0-9]+)?
    )?
)
(?:\+(?P<local>[a-z0-9]+(?:[-_\.][a-z0-9]+)*))?       # local version
";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?xi)^(?:\s*){VERSION_RE_INNER}(?:\s*)$"))
        .expect("the PEP 440 version regex is valid")
});

/// One of `~=` `==` `!=` `<=` `>=` `<` `>` `===`
#[derive(Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub enum Operator {
    /// `== 1.2.3`
    Equal,
    /// `== 1.2.*`
    EqualStar,
    /// `===` (discouraged)
    ///
    /// <https://peps.python.org/pep-0440/#arbitrary-equality>
    ExactEqual,
    /// `!= 1.2.3`
    NotEqual,
    /// `!= 1.2.*`
    NotEqualStar,
    /// `~=`
    TildeEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
}

impl Operator {
    /// Returns the operator with the operands swapped, e.g. `<` for `>`.
    ///
    /// Used for marker expressions of the form `"3.8" < python_version`. Operators without a
    /// meaningful reversal are returned as-is.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanEqual => Self::GreaterThanEqual,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanEqual => Self::LessThanEqual,
            other => other,
        }
    }
}

/// An unknown comparison operator.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("No such comparison operator '{0}', must be one of ~= == != <= >= < > ===")]
pub struct OperatorParseError(String);

impl FromStr for Operator {
    type Err = OperatorParseError;

    /// Notably, this does not know about star versions, it just assumes the base operator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operator = match s {
            "==" => Self::Equal,
            "===" => Self::ExactEqual,
            "!=" => Self::NotEqual,
            "~=" => Self::TildeEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessThanEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterThanEqual,
            other => return Err(OperatorParseError(other.to_string())),
        };
        Ok(operator)
    }
}

impl Display for Operator {
    /// Note the `EqualStar` is also `==`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let operator = match self {
            Self::Equal | Self::EqualStar => "==",
            Self::ExactEqual => "===",
            Self::NotEqual | Self::NotEqualStar => "!=",
            Self::TildeEqual => "~=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        };
        f.write_str(operator)
    }
}

/// Optional pre-release modifier (alpha, beta or release candidate) appended to version.
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy, Ord, PartialOrd)]
pub enum PrereleaseKind {
    /// alpha prerelease
    Alpha,
    /// beta prerelease
    Beta,
    /// release candidate prerelease
    Rc,
}

impl FromStr for PrereleaseKind {
    type Err = String;

    fn from_str(prerelease: &str) -> Result<Self, Self::Err> {
        match prerelease.to_lowercase().as_str() {
            "a" | "alpha" => Ok(Self::Alpha),
            "b" | "beta" => Ok(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Ok(Self::Rc),
            _ => Err(format!(
                "'{prerelease}' isn't recognized as alpha, beta or release candidate",
            )),
        }
    }
}

impl Display for PrereleaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => write!(f, "a"),
            Self::Beta => write!(f, "b"),
            Self::Rc => write!(f, "rc"),
        }
    }
}

/// A pre-release marker with its number, e.g. `rc1`.
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy, Ord, PartialOrd)]
pub struct Prerelease {
    pub kind: PrereleaseKind,
    pub number: u64,
}

/// A part of the [local version identifier](<https://peps.python.org/pep-0440/#local-version-identifiers>).
///
/// Numeric segments compare greater than string segments, and a longer local version compares
/// greater than its prefix. The derived `Ord` of `Vec<LocalSegment>` (with `String` declared
/// before `Number`) matches these rules.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum LocalSegment {
    /// Not-parseable as integer segment of local version
    String(String),
    /// Inferred integer segment of local version
    Number(u64),
}

impl Display for LocalSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(string) => write!(f, "{string}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl FromStr for LocalSegment {
    type Err = ();

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        Ok(if let Ok(number) = segment.parse::<u64>() {
            Self::Number(number)
        } else {
            // "if a segment contains any ASCII letters then that segment is compared
            // lexicographically with case insensitivity"
            Self::String(segment.to_lowercase())
        })
    }
}

/// A version number such as `1.2.3` or `4!5.6.7-a8.post9.dev0`.
///
/// Beware that the sorting implemented with [`Ord`] is not consistent with the operators from
/// PEP 440; use [`crate::VersionSpecifier::contains`] for matching.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<Prerelease>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

/// A version that doesn't match the PEP 440 grammar.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("Version `{version}` doesn't match PEP 440 rules")]
pub struct VersionParseError {
    version: String,
}

impl Version {
    /// Create a final release version from its release segments, e.g. `[3, 12]`.
    pub fn new<I, R>(release: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: std::borrow::Borrow<u64>,
    {
        Self {
            epoch: 0,
            release: release.into_iter().map(|r| *r.borrow()).collect(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// The [versioning epoch](https://peps.python.org/pep-0440/#version-epochs).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The release segments, such as `1.2.3` in `4!1.2.3-a8.post9.dev1`.
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// The pre-release, if any.
    pub fn pre(&self) -> Option<Prerelease> {
        self.pre
    }

    /// The post-release number, if any.
    pub fn post(&self) -> Option<u64> {
        self.post
    }

    /// The development release number, if any.
    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// The local version segments, if any.
    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    /// Whether this is an alpha/beta/rc or dev version.
    pub fn any_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Whether this is a post release.
    pub fn is_post(&self) -> bool {
        self.post.is_some()
    }

    /// Whether this has a local part.
    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// Returns the version with the local part removed.
    #[must_use]
    pub fn without_local(mut self) -> Self {
        self.local.clear();
        self
    }

    /// Returns the version with everything but the epoch and release removed.
    #[must_use]
    pub fn only_release(&self) -> Self {
        Self {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    fn from_captures(captures: &Captures) -> Result<Self, String> {
        let number = |name: &str| -> Result<Option<u64>, String> {
            captures
                .name(name)
                .map(|value| {
                    value
                        .as_str()
                        .parse::<u64>()
                        .map_err(|err| format!("`{}` is not a valid number: {err}", value.as_str()))
                })
                .transpose()
        };

        let epoch = number("epoch")?.unwrap_or_default();
        let release = captures
            .name("release")
            .map(|release| {
                release
                    .as_str()
                    .split('.')
                    .map(|segment| {
                        segment
                            .parse::<u64>()
                            .map_err(|err| format!("`{segment}` is not a valid number: {err}"))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        let pre = match captures.name("pre_name") {
            Some(name) => Some(Prerelease {
                kind: PrereleaseKind::from_str(name.as_str())?,
                // "Pre-releases allow omitting the numeral in which case it is implicitly assumed
                // to be 0"
                number: number("pre")?.unwrap_or_default(),
            }),
            None => None,
        };
        let post = if captures.name("post_field").is_some() {
            Some(number("post_old")?.or(number("post_new")?).unwrap_or_default())
        } else {
            None
        };
        let dev = if captures.name("dev_field").is_some() {
            Some(number("dev")?.unwrap_or_default())
        } else {
            None
        };
        let local = captures
            .name("local")
            .map(|local| {
                local
                    .as_str()
                    .split(['-', '_', '.'])
                    .filter_map(|segment| LocalSegment::from_str(segment).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses a version such as `1.19`, `1.0a1`,`1.0+abc.5` or `1!2012.2`.
    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let error = || VersionParseError {
            version: version.to_string(),
        };
        let captures = VERSION_RE.captures(version).ok_or_else(error)?;
        Self::from_captures(&captures).map_err(|_| error())
    }
}

/// Shows normalized version
impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let mut release = self.release.iter();
        if let Some(first) = release.next() {
            write!(f, "{first}")?;
        }
        for segment in release {
            write!(f, ".{segment}")?;
        }
        if let Some(Prerelease { kind, number }) = self.pre {
            write!(f, "{kind}{number}")?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if !self.local.is_empty() {
            f.write_str("+")?;
            for (index, segment) in self.local.iter().enumerate() {
                if index > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{segment}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// Compare the release parts of two versions, e.g. `4.3.1` > `4.2`, `1.1.0` == `1.1` and
/// `1.16` < `1.19`.
pub(crate) fn compare_release(this: &[u64], other: &[u64]) -> Ordering {
    // "When comparing release segments with different numbers of components, the shorter segment
    // is padded out with additional zeros as necessary"
    this.iter()
        .chain(iter::repeat(&0))
        .zip(other.iter().chain(iter::repeat(&0)))
        .take(max(this.len(), other.len()))
        .map(|(this, other)| this.cmp(other))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// The position of the suffixes within the release: `.devN`, `aN`, `bN`, `rcN`, final, `.postN`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Suffix {
    /// A dev release of a final version, ordered before its pre-releases.
    DevOnly(u64),
    Pre(Prerelease, Option<u64>, DevKey),
    Final,
    Post(u64, DevKey),
}

/// A dev marker on a pre or post release; no dev marker sorts last.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

impl From<Option<u64>> for DevKey {
    fn from(dev: Option<u64>) -> Self {
        match dev {
            Some(dev) => Self::Dev(dev),
            None => Self::None,
        }
    }
}

fn suffix(version: &Version) -> Suffix {
    match (version.pre, version.post, version.dev) {
        (None, None, Some(dev)) => Suffix::DevOnly(dev),
        (Some(pre), post, dev) => Suffix::Pre(pre, post, DevKey::from(dev)),
        (None, None, None) => Suffix::Final,
        (None, Some(post), dev) => Suffix::Post(post, DevKey::from(dev)),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| suffix(self).cmp(&suffix(other)))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    /// Trailing zeros in the release don't change equality, so they don't change the hash.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        let significant = self
            .release
            .iter()
            .rposition(|segment| *segment != 0)
            .map_or(0, |position| position + 1);
        self.release[..significant].hash(state);
        self.pre.hash(state);
        self.post.hash(state);
        self.dev.hash(state);
        self.local.hash(state);
    }
}
