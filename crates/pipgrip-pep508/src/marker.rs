//! Environment markers, e.g. `python_version >= "3.8" and extra == "socks"`.
//!
//! Markers are evaluated against the environment pip reports for the target interpreter, so
//! evaluation never inspects the machine pipgrip itself runs on.

use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use tracing::warn;

use pipgrip_normalize::ExtraName;
use pipgrip_pep440::{Operator, Version, VersionSpecifier};

use crate::cursor::Cursor;
use crate::{Pep508Error, Pep508ErrorSource};

/// Environment markers with a PEP 440 version as value, such as `python_version`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum MarkerValueVersion {
    ImplementationVersion,
    PythonFullVersion,
    PythonVersion,
}

impl Display for MarkerValueVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImplementationVersion => f.write_str("implementation_version"),
            Self::PythonFullVersion => f.write_str("python_full_version"),
            Self::PythonVersion => f.write_str("python_version"),
        }
    }
}

/// Environment markers with an arbitrary string as value, such as `sys_platform`.
///
/// The dotted PEP 345 spellings (`os.name`, `sys.platform`, ...) still show up in old metadata and
/// are parsed into the same keys.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MarkerValueString {
    ImplementationName,
    OsName,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    SysPlatform,
}

impl Display for MarkerValueString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ImplementationName => "implementation_name",
            Self::OsName => "os_name",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::PlatformRelease => "platform_release",
            Self::PlatformSystem => "platform_system",
            Self::PlatformVersion => "platform_version",
            Self::SysPlatform => "sys_platform",
        })
    }
}

/// One side of a marker expression.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MarkerValue {
    MarkerEnvVersion(MarkerValueVersion),
    MarkerEnvString(MarkerValueString),
    /// `extra`, which is set per package rather than by the environment.
    Extra,
    /// A user given quoted string such as `'3.8'` or `"win32"`.
    QuotedString(String),
}

impl FromStr for MarkerValue {
    type Err = String;

    /// Parses the reserved (unquoted) marker names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s {
            "implementation_name" => Self::MarkerEnvString(MarkerValueString::ImplementationName),
            "implementation_version" => {
                Self::MarkerEnvVersion(MarkerValueVersion::ImplementationVersion)
            }
            "os_name" | "os.name" => Self::MarkerEnvString(MarkerValueString::OsName),
            "platform_machine" | "platform.machine" => {
                Self::MarkerEnvString(MarkerValueString::PlatformMachine)
            }
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => {
                Self::MarkerEnvString(MarkerValueString::PlatformPythonImplementation)
            }
            "platform_release" => Self::MarkerEnvString(MarkerValueString::PlatformRelease),
            "platform_system" => Self::MarkerEnvString(MarkerValueString::PlatformSystem),
            "platform_version" | "platform.version" => {
                Self::MarkerEnvString(MarkerValueString::PlatformVersion)
            }
            "python_full_version" => Self::MarkerEnvVersion(MarkerValueVersion::PythonFullVersion),
            "python_version" => Self::MarkerEnvVersion(MarkerValueVersion::PythonVersion),
            "sys_platform" | "sys.platform" => {
                Self::MarkerEnvString(MarkerValueString::SysPlatform)
            }
            "extra" => Self::Extra,
            _ => return Err(format!("Invalid key: {s}")),
        };
        Ok(value)
    }
}

impl Display for MarkerValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkerEnvVersion(key) => key.fmt(f),
            Self::MarkerEnvString(key) => key.fmt(f),
            Self::Extra => f.write_str("extra"),
            Self::QuotedString(value) => write!(f, "\"{value}\""),
        }
    }
}

/// How to compare the two sides of a marker expression, such as `==`, `>` or `not in`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MarkerOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    TildeEqual,
    ExactEqual,
    In,
    NotIn,
}

impl MarkerOperator {
    /// The PEP 440 operator for version comparisons; `None` for `in` and `not in`.
    fn to_pep440_operator(self) -> Option<Operator> {
        match self {
            Self::Equal => Some(Operator::Equal),
            Self::NotEqual => Some(Operator::NotEqual),
            Self::GreaterThan => Some(Operator::GreaterThan),
            Self::GreaterEqual => Some(Operator::GreaterThanEqual),
            Self::LessThan => Some(Operator::LessThan),
            Self::LessEqual => Some(Operator::LessThanEqual),
            Self::TildeEqual => Some(Operator::TildeEqual),
            Self::ExactEqual => Some(Operator::ExactEqual),
            Self::In | Self::NotIn => None,
        }
    }

    /// The operator to use once both sides of the expression are swapped.
    fn reversed(self) -> Self {
        match self {
            Self::GreaterThan => Self::LessThan,
            Self::GreaterEqual => Self::LessEqual,
            Self::LessThan => Self::GreaterThan,
            Self::LessEqual => Self::GreaterEqual,
            other => other,
        }
    }
}

impl FromStr for MarkerOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessEqual,
            "~=" => Self::TildeEqual,
            "===" => Self::ExactEqual,
            "in" => Self::In,
            other => return Err(format!("Invalid comparator: {other}")),
        };
        Ok(value)
    }
}

impl Display for MarkerOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::TildeEqual => "~=",
            Self::ExactEqual => "===",
            Self::In => "in",
            Self::NotIn => "not in",
        })
    }
}

/// A [`Version`] together with the text it was parsed from.
///
/// Marker values like `python_full_version` are compared as versions, except for `in` and
/// `not in`, which compare the original text.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StringVersion {
    pub string: String,
    pub version: Version,
}

impl FromStr for StringVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // CPython builds from a development checkout report e.g. `3.13.0+`.
        let version = Version::from_str(s.strip_suffix('+').unwrap_or(s))
            .map_err(|err| err.to_string())?;
        Ok(Self {
            string: s.to_string(),
            version,
        })
    }
}

impl Display for StringVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string)
    }
}

impl Serialize for StringVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.string)
    }
}

impl<'de> Deserialize<'de> for StringVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        Self::from_str(&string).map_err(de::Error::custom)
    }
}

impl Deref for StringVersion {
    type Target = Version;

    fn deref(&self) -> &Self::Target {
        &self.version
    }
}

/// The marker values of a Python interpreter, as found in the `environment` section of a pip
/// installation report.
///
/// <https://packaging.python.org/en/latest/specifications/dependency-specifiers/#environment-markers>
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MarkerEnvironment {
    pub implementation_name: String,
    pub implementation_version: StringVersion,
    pub os_name: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_full_version: StringVersion,
    pub python_version: StringVersion,
    pub sys_platform: String,
}

impl MarkerEnvironment {
    fn get_version(&self, key: MarkerValueVersion) -> &StringVersion {
        match key {
            MarkerValueVersion::ImplementationVersion => &self.implementation_version,
            MarkerValueVersion::PythonFullVersion => &self.python_full_version,
            MarkerValueVersion::PythonVersion => &self.python_version,
        }
    }

    fn get_string(&self, key: MarkerValueString) -> &str {
        match key {
            MarkerValueString::ImplementationName => &self.implementation_name,
            MarkerValueString::OsName => &self.os_name,
            MarkerValueString::PlatformMachine => &self.platform_machine,
            MarkerValueString::PlatformPythonImplementation => {
                &self.platform_python_implementation
            }
            MarkerValueString::PlatformRelease => &self.platform_release,
            MarkerValueString::PlatformSystem => &self.platform_system,
            MarkerValueString::PlatformVersion => &self.platform_version,
            MarkerValueString::SysPlatform => &self.sys_platform,
        }
    }
}

/// A `<marker_value> <marker_op> <marker_value>` expression, e.g. `python_version < "3.8"`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MarkerExpression {
    pub l_value: MarkerValue,
    pub operator: MarkerOperator,
    pub r_value: MarkerValue,
}

impl MarkerExpression {
    fn evaluate(&self, env: &MarkerEnvironment, extras: &[ExtraName]) -> bool {
        match (&self.l_value, &self.r_value) {
            (MarkerValue::MarkerEnvVersion(key), MarkerValue::QuotedString(value)) => {
                self.compare_versions(env.get_version(*key), value, self.operator)
            }
            // `"3.8" < python_version` is `python_version > "3.8"`.
            (MarkerValue::QuotedString(value), MarkerValue::MarkerEnvVersion(key)) => {
                match self.operator {
                    MarkerOperator::In | MarkerOperator::NotIn => {
                        self.compare_strings(value, &env.get_version(*key).string)
                    }
                    operator => {
                        self.compare_versions(env.get_version(*key), value, operator.reversed())
                    }
                }
            }
            (MarkerValue::MarkerEnvString(key), MarkerValue::QuotedString(value)) => {
                self.compare_strings(env.get_string(*key), value)
            }
            (MarkerValue::QuotedString(value), MarkerValue::MarkerEnvString(key)) => {
                self.compare_strings(value, env.get_string(*key))
            }
            (MarkerValue::Extra, MarkerValue::QuotedString(value))
            | (MarkerValue::QuotedString(value), MarkerValue::Extra) => {
                self.compare_extra(value, extras)
            }
            (MarkerValue::QuotedString(_), MarkerValue::QuotedString(_)) => {
                warn!(
                    "Comparing two quoted strings with each other doesn't make sense: {self}, evaluating to false"
                );
                false
            }
            _ => {
                warn!(
                    "Comparing two markers with each other doesn't make any sense: {self}, evaluating to false"
                );
                false
            }
        }
    }

    /// `<version key> <op> <quoted version>`, where the quoted version may end in `.*`.
    fn compare_versions(&self, env_value: &StringVersion, value: &str, operator: MarkerOperator) -> bool {
        let Some(operator) = operator.to_pep440_operator() else {
            // `python_version in "2.7 3.4"` is a substring test on the original text.
            return self.compare_strings(&env_value.string, value);
        };
        let specifier = format!("{operator}{value}");
        match VersionSpecifier::from_str(&specifier) {
            Ok(specifier) => specifier.contains(env_value),
            Err(err) => {
                warn!(
                    "Expected PEP 440 version to compare with {}, found {value:?}, evaluating to false: {err}",
                    self.l_value
                );
                false
            }
        }
    }

    fn compare_strings(&self, l_string: &str, r_string: &str) -> bool {
        match self.operator {
            MarkerOperator::Equal | MarkerOperator::ExactEqual => l_string == r_string,
            MarkerOperator::NotEqual => l_string != r_string,
            MarkerOperator::GreaterThan => l_string > r_string,
            MarkerOperator::GreaterEqual => l_string >= r_string,
            MarkerOperator::LessThan => l_string < r_string,
            MarkerOperator::LessEqual => l_string <= r_string,
            MarkerOperator::TildeEqual => {
                warn!("Can't compare {l_string} and {r_string} with `~=`, evaluating to false");
                false
            }
            MarkerOperator::In => r_string.contains(l_string),
            MarkerOperator::NotIn => !r_string.contains(l_string),
        }
    }

    fn compare_extra(&self, value: &str, extras: &[ExtraName]) -> bool {
        let Ok(extra) = ExtraName::from_str(value) else {
            warn!("Expected extra name, found {value:?}, evaluating to false");
            return false;
        };
        match self.operator {
            MarkerOperator::Equal => extras.contains(&extra),
            MarkerOperator::NotEqual => !extras.contains(&extra),
            _ => {
                warn!(
                    "Comparing extra with something other than `==` or `!=` is wrong: {self}, evaluating to false"
                );
                false
            }
        }
    }
}

impl Display for MarkerExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.l_value, self.operator, self.r_value)
    }
}

/// Nested marker expressions joined with `and`, `or` and parentheses.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MarkerTree {
    Expression(MarkerExpression),
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
}

impl FromStr for MarkerTree {
    type Err = Pep508Error;

    fn from_str(markers: &str) -> Result<Self, Self::Err> {
        parse_markers_impl(&mut Cursor::new(markers))
    }
}

impl MarkerTree {
    /// Does this marker apply in the given environment, with the given extras active?
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[ExtraName]) -> bool {
        match self {
            Self::Expression(expression) => expression.evaluate(env, extras),
            Self::And(trees) => trees.iter().all(|tree| tree.evaluate(env, extras)),
            Self::Or(trees) => trees.iter().any(|tree| tree.evaluate(env, extras)),
        }
    }
}

impl Display for MarkerTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let format_inner = |tree: &Self| match tree {
            Self::Expression(_) => tree.to_string(),
            _ => format!("({tree})"),
        };
        match self {
            Self::Expression(expression) => write!(f, "{expression}"),
            Self::And(trees) => f.write_str(
                &trees.iter().map(format_inner).collect::<Vec<_>>().join(" and "),
            ),
            Self::Or(trees) => f.write_str(
                &trees.iter().map(format_inner).collect::<Vec<_>>().join(" or "),
            ),
        }
    }
}

/// ```text
/// version_cmp   = wsp* <'<=' | '<' | '!=' | '==' | '>=' | '>' | '~=' | '==='>
/// marker_op     = version_cmp | (wsp* 'in') | (wsp* 'not' wsp+ 'in')
/// ```
fn parse_marker_operator(cursor: &mut Cursor) -> Result<MarkerOperator, Pep508Error> {
    let (start, len) =
        cursor.take_while(|char| !char.is_whitespace() && char != '\'' && char != '"');
    let operator = cursor.slice(start, len);
    if operator == "not" {
        // 'not' wsp+ 'in'
        match cursor.next() {
            Some((_, whitespace)) if whitespace.is_whitespace() => {}
            Some((pos, other)) => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(format!(
                        "Expected whitespace after 'not', found '{other}'"
                    )),
                    start: pos,
                    len: other.len_utf8(),
                    input: cursor.to_string(),
                });
            }
            None => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(
                        "Expected whitespace after 'not', found end of input".to_string(),
                    ),
                    start: cursor.pos(),
                    len: 1,
                    input: cursor.to_string(),
                });
            }
        }
        cursor.eat_whitespace();
        cursor.next_expect_char('i', cursor.pos())?;
        cursor.next_expect_char('n', cursor.pos())?;
        return Ok(MarkerOperator::NotIn);
    }
    MarkerOperator::from_str(operator).map_err(|_| Pep508Error {
        message: Pep508ErrorSource::String(format!(
            "Expected a valid marker operator (such as '>=' or 'not in'), found '{operator}'"
        )),
        start,
        len: len.max(1),
        input: cursor.to_string(),
    })
}

/// A single or double quoted string, or one of the marker names such as `python_version`.
fn parse_marker_value(cursor: &mut Cursor) -> Result<MarkerValue, Pep508Error> {
    match cursor.peek() {
        None => Err(Pep508Error {
            message: Pep508ErrorSource::String(
                "Expected marker value, found end of dependency specification".to_string(),
            ),
            start: cursor.pos(),
            len: 1,
            input: cursor.to_string(),
        }),
        Some((start_pos, quotation_mark @ ('"' | '\''))) => {
            cursor.next();
            let (start, len) = cursor.take_while(|c| c != quotation_mark);
            let value = cursor.slice(start, len).to_string();
            cursor.next_expect_char(quotation_mark, start_pos)?;
            Ok(MarkerValue::QuotedString(value))
        }
        Some(_) => {
            let (start, len) = cursor.take_while(|char| {
                !char.is_whitespace() && !['>', '=', '<', '!', '~', ')'].contains(&char)
            });
            let key = cursor.slice(start, len);
            MarkerValue::from_str(key).map_err(|_| Pep508Error {
                message: Pep508ErrorSource::String(format!(
                    "Expected a valid marker name, found '{key}'"
                )),
                start,
                len: len.max(1),
                input: cursor.to_string(),
            })
        }
    }
}

/// ```text
/// marker_var:l marker_op:o marker_var:r
/// ```
fn parse_marker_key_op_value(cursor: &mut Cursor) -> Result<MarkerExpression, Pep508Error> {
    cursor.eat_whitespace();
    let l_value = parse_marker_value(cursor)?;
    cursor.eat_whitespace();
    let operator = parse_marker_operator(cursor)?;
    cursor.eat_whitespace();
    let r_value = parse_marker_value(cursor)?;
    Ok(MarkerExpression {
        l_value,
        operator,
        r_value,
    })
}

/// ```text
/// marker_expr   = marker_var:l marker_op:o marker_var:r -> (o, l, r)
///               | wsp* '(' marker:m wsp* ')' -> m
/// ```
fn parse_marker_expr(cursor: &mut Cursor) -> Result<MarkerTree, Pep508Error> {
    cursor.eat_whitespace();
    if let Some(start_pos) = cursor.eat_char('(') {
        let marker = parse_marker_or(cursor)?;
        cursor.eat_whitespace();
        cursor.next_expect_char(')', start_pos)?;
        Ok(marker)
    } else {
        Ok(MarkerTree::Expression(parse_marker_key_op_value(cursor)?))
    }
}

/// ```text
/// marker_and    = marker_expr:l wsp* 'and' marker_expr:r -> ('and', l, r)
///               | marker_expr:m -> m
/// ```
fn parse_marker_and(cursor: &mut Cursor) -> Result<MarkerTree, Pep508Error> {
    parse_marker_op(cursor, "and", MarkerTree::And, parse_marker_expr)
}

/// ```text
/// marker_or     = marker_and:l wsp* 'or' marker_and:r -> ('or', l, r)
///               | marker_and:m -> m
/// ```
fn parse_marker_or(cursor: &mut Cursor) -> Result<MarkerTree, Pep508Error> {
    parse_marker_op(cursor, "or", MarkerTree::Or, parse_marker_and)
}

/// Parses both `marker_and` and `marker_or`.
fn parse_marker_op(
    cursor: &mut Cursor,
    op: &str,
    op_constructor: fn(Vec<MarkerTree>) -> MarkerTree,
    parse_inner: fn(&mut Cursor) -> Result<MarkerTree, Pep508Error>,
) -> Result<MarkerTree, Pep508Error> {
    let first_element = parse_inner(cursor)?;
    cursor.eat_whitespace();
    if matches!(cursor.peek_char(), None | Some(')')) {
        return Ok(first_element);
    }

    let mut expressions = vec![first_element];
    loop {
        cursor.eat_whitespace();
        let (start, len) = cursor.peek_while(|c| !c.is_whitespace() && c != '(');
        if cursor.slice(start, len) == op {
            cursor.take_while(|c| !c.is_whitespace() && c != '(');
            expressions.push(parse_inner(cursor)?);
        } else {
            return if expressions.len() == 1 {
                Ok(expressions.remove(0))
            } else {
                Ok(op_constructor(expressions))
            };
        }
    }
}

/// ```text
/// marker        = marker_or
/// ```
pub(crate) fn parse_markers_impl(cursor: &mut Cursor) -> Result<MarkerTree, Pep508Error> {
    let marker = parse_marker_or(cursor)?;
    cursor.eat_whitespace();
    if let Some((pos, unexpected)) = cursor.next() {
        // Neither `and` nor `or` followed the last expression.
        return Err(Pep508Error {
            message: Pep508ErrorSource::String(format!(
                "Unexpected character '{unexpected}', expected 'and', 'or' or end of input"
            )),
            start: pos,
            len: unexpected.len_utf8() + cursor.remaining(),
            input: cursor.to_string(),
        });
    }
    Ok(marker)
}
