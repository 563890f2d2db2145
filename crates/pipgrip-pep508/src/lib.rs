//! Python [dependency specifiers](https://packaging.python.org/en/latest/specifications/dependency-specifiers/),
//! better known as [PEP 508](https://peps.python.org/pep-0508/).
//!
//! ```text
//! let requirement = Requirement::from_str(r#"requests[security,socks] >= 2.8.1 ; python_version > "3.8""#)?;
//! assert_eq!(requirement.name.as_ref(), "requests");
//! assert_eq!(requirement.to_string(), r#"requests[security,socks]>=2.8.1; python_version > "3.8""#);
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use unicode_width::UnicodeWidthChar;
use url::Url;

pub use marker::{
    MarkerEnvironment, MarkerExpression, MarkerOperator, MarkerTree, MarkerValue,
    MarkerValueString, MarkerValueVersion, StringVersion,
};
use pipgrip_normalize::{ExtraName, PackageName};
use pipgrip_pep440::{Version, VersionSpecifier, VersionSpecifiers};

use crate::cursor::Cursor;

mod cursor;
mod marker;

/// A parse error, with the byte span of the offending input.
#[derive(Debug)]
pub struct Pep508Error {
    /// Either an error from the parser or an upstream error from `url`.
    pub message: Pep508ErrorSource,
    /// Span start byte.
    pub start: usize,
    /// Span length in bytes.
    pub len: usize,
    /// The input string, so we can print it underlined.
    pub input: String,
}

#[derive(Debug, Error)]
pub enum Pep508ErrorSource {
    #[error("{0}")]
    String(String),
    #[error(transparent)]
    UrlError(#[from] url::ParseError),
    #[error("{0}")]
    UnsupportedRequirement(String),
}

impl Display for Pep508Error {
    /// Pretty formatting with underline.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let start_offset = self.input[..self.start]
            .chars()
            .filter_map(UnicodeWidthChar::width)
            .sum::<usize>();
        let underline_len = if self.start >= self.input.len() {
            1
        } else {
            self.input[self.start..(self.start + self.len).min(self.input.len())]
                .chars()
                .filter_map(UnicodeWidthChar::width)
                .sum::<usize>()
                .max(1)
        };
        write!(
            f,
            "{}\n{}\n{}{}",
            self.message,
            self.input,
            " ".repeat(start_offset),
            "^".repeat(underline_len)
        )
    }
}

/// Needed for `anyhow`'s `.context()`.
impl std::error::Error for Pep508Error {}

/// A PEP 508 dependency specification, e.g.
/// `requests [security,socks] >= 2.8.1, == 2.8.* ; python_version > "3.8"`.
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct Requirement {
    /// The distribution name, such as `requests`.
    pub name: PackageName,
    /// The requested extras, such as `security` and `socks`.
    pub extras: Vec<ExtraName>,
    /// The version specifiers such as `>= 2.8.1, == 2.8.*`, or a direct URL.
    pub version_or_url: Option<VersionOrUrl>,
    /// The environment markers such as `python_version > "3.8"`.
    pub marker: Option<MarkerTree>,
}

/// Same formatting as `packaging.requirements.Requirement`: no spaces around the specifiers and
/// `; ` before the markers.
impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(ExtraName::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        match &self.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => write!(f, "{specifiers}")?,
            Some(VersionOrUrl::Url(url)) => {
                write!(f, " @ {url}")?;
                if self.marker.is_some() {
                    f.write_str(" ")?;
                }
            }
            None => {}
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Requirement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl Requirement {
    /// Returns whether the markers apply for the given environment and extras.
    pub fn evaluate_markers(&self, env: &MarkerEnvironment, extras: &[ExtraName]) -> bool {
        self.marker
            .as_ref()
            .is_none_or(|marker| marker.evaluate(env, extras))
    }

    /// The pinned version of a `name==version` requirement.
    pub fn exact_version(&self) -> Option<&Version> {
        match &self.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => specifiers.exact_version(),
            _ => None,
        }
    }

    /// The same requirement without its environment markers.
    #[must_use]
    pub fn without_markers(&self) -> Self {
        Self {
            marker: None,
            ..self.clone()
        }
    }
}

impl FromStr for Requirement {
    type Err = Pep508Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse(&mut Cursor::new(input))
    }
}

/// The version specifiers or the URL of a requirement.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub enum VersionOrUrl {
    /// A PEP 440 version specifier set.
    VersionSpecifier(VersionSpecifiers),
    /// A direct URL, e.g. `https://github.com/psf/requests/archive/main.zip`.
    Url(Url),
}

fn parse_name(cursor: &mut Cursor) -> Result<PackageName, Pep508Error> {
    // https://peps.python.org/pep-0508/#names
    // ^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$ with re.IGNORECASE
    let start = cursor.pos();
    match cursor.next() {
        Some((_, 'A'..='Z' | 'a'..='z' | '0'..='9')) => {}
        Some((index, char)) => {
            return Err(Pep508Error {
                message: Pep508ErrorSource::String(format!(
                    "Expected package name starting with an alphanumeric character, found '{char}'"
                )),
                start: index,
                len: char.len_utf8(),
                input: cursor.to_string(),
            });
        }
        None => {
            return Err(Pep508Error {
                message: Pep508ErrorSource::String(
                    "Empty field is not allowed for PEP508".to_string(),
                ),
                start: 0,
                len: 1,
                input: cursor.to_string(),
            });
        }
    }

    let (_, len) = cursor.take_while(|char| matches!(char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_'));
    let name = cursor.slice(start, len + 1);
    if let Some(last @ ('.' | '-' | '_')) = name.chars().last() {
        return Err(Pep508Error {
            message: Pep508ErrorSource::String(format!(
                "Package name must end with an alphanumeric character, not '{last}'"
            )),
            start: start + name.len() - 1,
            len: 1,
            input: cursor.to_string(),
        });
    }
    PackageName::from_str(name).map_err(|err| Pep508Error {
        message: Pep508ErrorSource::String(err.to_string()),
        start,
        len: name.len(),
        input: cursor.to_string(),
    })
}

/// Parses extras in the `[extra1,extra2]` format.
fn parse_extras(cursor: &mut Cursor) -> Result<Vec<ExtraName>, Pep508Error> {
    let Some(bracket_pos) = cursor.eat_char('[') else {
        return Ok(vec![]);
    };
    let early_eof_error = |cursor: &Cursor| Pep508Error {
        message: Pep508ErrorSource::String(
            "Missing closing bracket (expected ']', found end of dependency specification)"
                .to_string(),
        ),
        start: bracket_pos,
        len: 1,
        input: cursor.to_string(),
    };

    let mut extras = Vec::new();
    cursor.eat_whitespace();
    // `[]` is allowed.
    if cursor.eat_char(']').is_some() {
        return Ok(extras);
    }
    loop {
        cursor.eat_whitespace();
        // First char of the identifier.
        match cursor.peek() {
            Some((_, 'a'..='z' | 'A'..='Z' | '0'..='9')) => {}
            Some((pos, other)) => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(format!(
                        "Expected an alphanumeric character starting the extra name, found '{other}'"
                    )),
                    start: pos,
                    len: other.len_utf8(),
                    input: cursor.to_string(),
                });
            }
            None => return Err(early_eof_error(cursor)),
        }
        let (start, len) = cursor
            .take_while(|char| matches!(char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.'));
        let extra = cursor.slice(start, len);
        match cursor.peek() {
            Some((pos, char)) if char != ',' && char != ']' && !char.is_whitespace() => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(format!(
                        "Invalid character in extras name, expected an alphanumeric character, '-', '_', '.', ',' or ']', found '{char}'"
                    )),
                    start: pos,
                    len: char.len_utf8(),
                    input: cursor.to_string(),
                });
            }
            _ => {}
        }
        let extra = ExtraName::from_str(extra).map_err(|err| Pep508Error {
            message: Pep508ErrorSource::String(err.to_string()),
            start,
            len,
            input: cursor.to_string(),
        })?;
        extras.push(extra);
        cursor.eat_whitespace();
        match cursor.next() {
            Some((_, ',')) => {}
            Some((_, ']')) => break,
            Some((pos, other)) => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(format!(
                        "Expected either ',' (separating extras) or ']' (ending the extras section), found '{other}'"
                    )),
                    start: pos,
                    len: other.len_utf8(),
                    input: cursor.to_string(),
                });
            }
            None => return Err(early_eof_error(cursor)),
        }
    }

    Ok(extras)
}

/// Parses the URL after `@`, e.g. `https://github.com/psf/requests/archive/main.zip`.
fn parse_url(cursor: &mut Cursor) -> Result<Url, Pep508Error> {
    cursor.eat_whitespace();
    let (start, len) = cursor.take_while(|char| !char.is_whitespace());
    let url = cursor.slice(start, len);
    if url.is_empty() {
        return Err(Pep508Error {
            message: Pep508ErrorSource::String("Expected URL".to_string()),
            start,
            len: 1,
            input: cursor.to_string(),
        });
    }
    Url::parse(url).map_err(|err| Pep508Error {
        message: Pep508ErrorSource::UrlError(err),
        start,
        len,
        input: cursor.to_string(),
    })
}

fn parse_specifier(
    cursor: &Cursor,
    buffer: &str,
    start: usize,
    end: usize,
) -> Result<VersionSpecifier, Pep508Error> {
    VersionSpecifier::from_str(buffer).map_err(|err| Pep508Error {
        message: Pep508ErrorSource::String(err.to_string()),
        start,
        len: end - start,
        input: cursor.to_string(),
    })
}

/// Such as `>=1.19,<2.0`, delimited by the end of the input or a `;` for the marker part.
///
/// ```text
/// version_one (wsp* ',' version_one)*
/// ```
fn parse_version_specifier(cursor: &mut Cursor) -> Result<VersionSpecifiers, Pep508Error> {
    let mut start = cursor.pos();
    let mut specifiers = Vec::new();
    loop {
        let (_, len) = cursor.take_while(|char| char != ',' && char != ';');
        let end = start + len;
        specifiers.push(parse_specifier(cursor, cursor.slice(start, len), start, end)?);
        if cursor.eat_char(',').is_none() {
            break;
        }
        start = cursor.pos();
    }
    Ok(specifiers.into_iter().collect())
}

/// Such as `(>=1.19,<2.0)`
///
/// ```text
/// '(' version_one (wsp* ',' version_one)* ')'
/// ```
fn parse_version_specifier_parentheses(
    cursor: &mut Cursor,
) -> Result<VersionSpecifiers, Pep508Error> {
    let brace_pos = cursor.pos();
    cursor.next();
    cursor.eat_whitespace();
    let mut start = cursor.pos();
    let mut specifiers = Vec::new();
    loop {
        let (_, len) = cursor.take_while(|char| char != ',' && char != ')');
        let end = start + len;
        specifiers.push(parse_specifier(cursor, cursor.slice(start, len), start, end)?);
        match cursor.next() {
            Some((_, ',')) => start = cursor.pos(),
            Some((_, ')')) => break,
            _ => {
                return Err(Pep508Error {
                    message: Pep508ErrorSource::String(
                        "Missing closing parenthesis (expected ')', found end of dependency specification)"
                            .to_string(),
                    ),
                    start: brace_pos,
                    len: 1,
                    input: cursor.to_string(),
                });
            }
        }
    }
    Ok(specifiers.into_iter().collect())
}

/// ```text
/// specification = wsp* name wsp* extras? wsp* (('@' wsp* url_req) | ('(' versionspec ')') | (versionspec)) wsp* (';' wsp* marker)? wsp*
/// ```
fn parse(cursor: &mut Cursor) -> Result<Requirement, Pep508Error> {
    cursor.eat_whitespace();
    let start = cursor.pos();
    let name = parse_name(cursor)?;
    cursor.eat_whitespace();
    let extras = parse_extras(cursor)?;
    cursor.eat_whitespace();

    let version_or_url = match cursor.peek_char() {
        Some('@') => {
            cursor.next();
            Some(VersionOrUrl::Url(parse_url(cursor)?))
        }
        Some('(') => Some(VersionOrUrl::VersionSpecifier(
            parse_version_specifier_parentheses(cursor)?,
        )),
        Some('<' | '=' | '>' | '~' | '!') => Some(VersionOrUrl::VersionSpecifier(
            parse_version_specifier(cursor)?,
        )),
        Some(';') | None => None,
        Some(other) => {
            // pip accepts bare URLs in requirements files, PEP 508 doesn't.
            let rest = &cursor.to_string()[start..];
            let message = if rest.contains("://") {
                Pep508ErrorSource::UnsupportedRequirement(
                    "URL requirement must be preceded by a package name. Add the name of the package before the URL (e.g., `package_name @ https://...`).".to_string(),
                )
            } else {
                Pep508ErrorSource::String(format!(
                    "Expected one of `@`, `(`, `<`, `=`, `>`, `~`, `!`, `;`, found `{other}`"
                ))
            };
            return Err(Pep508Error {
                message,
                start: cursor.pos(),
                len: other.len_utf8(),
                input: cursor.to_string(),
            });
        }
    };

    cursor.eat_whitespace();
    let marker = if cursor.eat_char(';').is_some() {
        Some(marker::parse_markers_impl(cursor)?)
    } else {
        None
    };
    cursor.eat_whitespace();
    if let Some((pos, char)) = cursor.next() {
        return Err(Pep508Error {
            message: Pep508ErrorSource::String(if marker.is_none() {
                format!("Expected end of input or ';', found '{char}'")
            } else {
                format!("Expected end of input, found '{char}'")
            }),
            start: pos,
            len: char.len_utf8(),
            input: cursor.to_string(),
        });
    }

    Ok(Requirement {
        name,
        extras,
        version_or_url,
        marker,
    })
}
