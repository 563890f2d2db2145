//! Parses the subset of the requirements file format that matters for resolution.
//!
//! <https://pip.pypa.io/en/stable/reference/requirements-file-format/>
//!
//! Supported:
//!  * [PEP 508 requirements](https://packaging.python.org/en/latest/specifications/dependency-specifiers/)
//!  * `-r`/`--requirement` and `-c`/`--constraint`, relative to the including file
//!  * `--hash` (postfix)
//!  * `-i`/`--index-url`, `--extra-index-url` and `--pre`
//!
//! Editable requirements (`-e`) are rejected, pip can't report on them without building.
//!
//! Lines that look like a requirement but don't parse as PEP 508 are collected in
//! [`RequirementsTxt::invalid`] instead of failing the whole file, so that callers can decide
//! whether to skip them.
//!
//! Grammar as implemented:
//!
//! ```text
//! file = (statement | empty ('#' any*)? '\n')*
//! empty = whitespace*
//! statement = constraint_include | requirements_include | index_option | requirement
//! constraint_include = ('-c' | '--constraint') ('=' | wrappable_whitespaces) filepath
//! requirements_include = ('-r' | '--requirement') ('=' | wrappable_whitespaces) filepath
//! index_option = ('-i' | '--index-url' | '--extra-index-url') ('=' | wrappable_whitespaces) url
//!              | '--pre'
//! requirement = [a-zA-Z0-9] pep508_grammar_tail wrappable_whitespaces hashes
//! hashes = ('--hash' ('=' | wrappable_whitespaces) [a-zA-Z0-9-_]+ ':' [a-zA-Z0-9-_] wrappable_whitespaces+)*
//! # This should indicate a single backslash before a newline
//! wrappable_whitespaces = whitespace ('\\\n' | whitespace)*
//! ```

use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fs_err as fs;
use tracing::warn;
use unscanny::{Pattern, Scanner};
use url::Url;

use pipgrip_pep508::{Pep508Error, Requirement};

/// We emit one of those for each requirements.txt entry
enum RequirementsTxtStatement {
    /// `-r` inclusion filename
    Requirements {
        filename: String,
        start: usize,
        end: usize,
    },
    /// `-c` inclusion filename
    Constraint {
        filename: String,
        start: usize,
        end: usize,
    },
    /// `--index-url`
    IndexUrl(Url),
    /// `--extra-index-url`
    ExtraIndexUrl(Url),
    /// `--pre`
    Prerelease,
    /// PEP 508 requirement plus metadata
    RequirementEntry(RequirementEntry),
    /// A line that should have been a requirement
    InvalidRequirement(InvalidRequirement),
}

/// A [`Requirement`] with the hashes given for it in the requirements file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RequirementEntry {
    /// The actual PEP 508 requirement
    pub requirement: Requirement,
    /// Hashes of the downloadable packages
    pub hashes: Vec<String>,
}

impl Display for RequirementEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.requirement)?;
        for hash in &self.hashes {
            write!(f, " --hash {hash}")?;
        }
        Ok(())
    }
}

/// A requirement line that isn't valid PEP 508, e.g. `invalid::syntax`.
#[derive(Debug)]
pub struct InvalidRequirement {
    /// The requirement as written, without trailing comments or hashes.
    pub given: String,
    /// The file the line is in.
    pub file: PathBuf,
    pub error: Pep508Error,
}

/// Parsed and flattened requirements file with requirements and constraints.
#[derive(Debug, Default)]
pub struct RequirementsTxt {
    /// The actual requirements with the hashes, in file order.
    pub requirements: Vec<RequirementEntry>,
    /// Constraints included with `-c`.
    pub constraints: Vec<Requirement>,
    /// Lines that should have been requirements but failed to parse.
    pub invalid: Vec<InvalidRequirement>,
    /// The index given with `--index-url`, the last one wins.
    pub index_url: Option<Url>,
    /// Indexes given with `--extra-index-url`.
    pub extra_index_urls: Vec<Url>,
    /// Whether `--pre` was given.
    pub prerelease: bool,
}

impl RequirementsTxt {
    /// Parse a requirements file, following `-r` and `-c` includes relative to the file.
    pub fn parse(requirements_txt: impl AsRef<Path>) -> Result<Self, RequirementsTxtFileError> {
        let requirements_txt = requirements_txt.as_ref();
        let content =
            fs::read_to_string(requirements_txt).map_err(|err| RequirementsTxtFileError {
                file: requirements_txt.to_path_buf(),
                error: RequirementsTxtParserError::IO(err),
            })?;
        let working_dir = requirements_txt.parent().unwrap_or_else(|| Path::new(""));
        let data = Self::parse_inner(&content, requirements_txt, working_dir).map_err(|err| {
            RequirementsTxtFileError {
                file: requirements_txt.to_path_buf(),
                error: err,
            }
        })?;
        if data.is_empty() {
            warn!(
                "Requirements file {} does not contain any dependencies",
                requirements_txt.display()
            );
        }
        Ok(data)
    }

    /// Parse the content of a requirements file; includes are resolved against `working_dir`.
    pub fn parse_inner(
        content: &str,
        file: &Path,
        working_dir: &Path,
    ) -> Result<Self, RequirementsTxtParserError> {
        let mut s = Scanner::new(content);

        let mut data = Self::default();
        while let Some(statement) = parse_entry(&mut s, content, file)? {
            match statement {
                RequirementsTxtStatement::Requirements {
                    filename,
                    start,
                    end,
                } => {
                    let sub_requirements = Self::parse(working_dir.join(filename)).map_err(|err| {
                        RequirementsTxtParserError::Subfile {
                            source: Box::new(err),
                            start,
                            end,
                        }
                    })?;
                    data.update_from(sub_requirements);
                }
                RequirementsTxtStatement::Constraint {
                    filename,
                    start,
                    end,
                } => {
                    let sub_constraints = Self::parse(working_dir.join(filename)).map_err(|err| {
                        RequirementsTxtParserError::Subfile {
                            source: Box::new(err),
                            start,
                            end,
                        }
                    })?;
                    // Everything in a constraints file constrains, including its own `-r`
                    // includes.
                    data.constraints.extend(
                        sub_constraints
                            .requirements
                            .into_iter()
                            .map(|entry| entry.requirement),
                    );
                    data.constraints.extend(sub_constraints.constraints);
                    data.invalid.extend(sub_constraints.invalid);
                }
                RequirementsTxtStatement::IndexUrl(url) => {
                    data.index_url = Some(url);
                }
                RequirementsTxtStatement::ExtraIndexUrl(url) => {
                    data.extra_index_urls.push(url);
                }
                RequirementsTxtStatement::Prerelease => {
                    data.prerelease = true;
                }
                RequirementsTxtStatement::RequirementEntry(entry) => {
                    data.requirements.push(entry);
                }
                RequirementsTxtStatement::InvalidRequirement(invalid) => {
                    data.invalid.push(invalid);
                }
            }
        }
        Ok(data)
    }

    /// Merges other into self
    pub fn update_from(&mut self, other: Self) {
        self.requirements.extend(other.requirements);
        self.constraints.extend(other.constraints);
        self.invalid.extend(other.invalid);
        if other.index_url.is_some() {
            self.index_url = other.index_url;
        }
        self.extra_index_urls.extend(other.extra_index_urls);
        self.prerelease |= other.prerelease;
    }

    fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.constraints.is_empty() && self.invalid.is_empty()
    }
}

/// Parse a single entry, that is a requirement, an inclusion or an option line.
///
/// Consumes all preceding trivia (whitespace and comments). If it returns None, we've reached
/// the end of file
fn parse_entry(
    s: &mut Scanner,
    content: &str,
    file: &Path,
) -> Result<Option<RequirementsTxtStatement>, RequirementsTxtParserError> {
    // Eat all preceding whitespace, this may run us to the end of file
    eat_wrappable_whitespace(s);
    while s.at(['\n', '\r', '#']) {
        // skip comments
        eat_trailing_line(s)?;
        eat_wrappable_whitespace(s);
    }

    let start = s.cursor();
    Ok(Some(if s.eat_if("--requirement") || s.eat_if("-r") {
        let requirements_file = parse_value(s, |c: char| !['\n', '\r', '#'].contains(&c))?;
        let end = s.cursor();
        eat_trailing_line(s)?;
        RequirementsTxtStatement::Requirements {
            filename: requirements_file.to_string(),
            start,
            end,
        }
    } else if s.eat_if("--constraint") || s.eat_if("-c") {
        let constraints_file = parse_value(s, |c: char| !['\n', '\r', '#'].contains(&c))?;
        let end = s.cursor();
        eat_trailing_line(s)?;
        RequirementsTxtStatement::Constraint {
            filename: constraints_file.to_string(),
            start,
            end,
        }
    } else if s.eat_if("--index-url") || s.eat_if("-i") {
        let url = parse_url(s)?;
        eat_trailing_line(s)?;
        RequirementsTxtStatement::IndexUrl(url)
    } else if s.eat_if("--extra-index-url") {
        let url = parse_url(s)?;
        eat_trailing_line(s)?;
        RequirementsTxtStatement::ExtraIndexUrl(url)
    } else if s.after().strip_prefix("--pre").is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '#')
    }) {
        s.eat_if("--pre");
        eat_trailing_line(s)?;
        RequirementsTxtStatement::Prerelease
    } else if s.eat_if("--editable") || s.eat_if("-e") {
        return Err(RequirementsTxtParserError::Parser {
            message: "Editable requirements are not supported".to_string(),
            location: start,
        });
    } else if s.at(char::is_ascii_alphanumeric) {
        let (requirement, hashes) = parse_requirement_and_hashes(s, content)?;
        match requirement {
            Ok(requirement) => {
                RequirementsTxtStatement::RequirementEntry(RequirementEntry {
                    requirement,
                    hashes,
                })
            }
            Err((given, error)) => RequirementsTxtStatement::InvalidRequirement(InvalidRequirement {
                given,
                file: file.to_path_buf(),
                error,
            }),
        }
    } else if s.at('-') {
        let option = s.eat_while(|c: char| !c.is_whitespace() && c != '=');
        return Err(RequirementsTxtParserError::Parser {
            message: format!("Unsupported option '{option}'"),
            location: start,
        });
    } else if let Some(char) = s.peek() {
        return Err(RequirementsTxtParserError::Parser {
            message: format!(
                "Unexpected '{char}', expected '-c', '-r', '-i', '--extra-index-url', '--pre' or the start of a requirement"
            ),
            location: s.cursor(),
        });
    } else {
        // EOF
        return Ok(None);
    }))
}

/// Eat whitespace and ignore newlines escaped with a backslash
fn eat_wrappable_whitespace<'a>(s: &mut Scanner<'a>) -> &'a str {
    let start = s.cursor();
    s.eat_while([' ', '\t']);
    // Allow multiple escaped line breaks
    // With the order we support `\n`, `\r`, `\r\n` without accidentally eating a `\n\r`
    while s.eat_if("\\\n") || s.eat_if("\\\r\n") || s.eat_if("\\\r") {
        s.eat_while([' ', '\t']);
    }
    s.from(start)
}

/// Eats the end of line or a trailing comment
fn eat_trailing_line(s: &mut Scanner) -> Result<(), RequirementsTxtParserError> {
    s.eat_while([' ', '\t']);
    match s.eat() {
        None | Some('\n') => {} // End of file or end of line, nothing to do
        Some('\r') => {
            s.eat_if('\n'); // `\r\n`, but just `\r` is also accepted
        }
        Some('#') => {
            s.eat_until(['\r', '\n']);
            if s.at('\r') {
                s.eat_if('\n'); // `\r\n`, but just `\r` is also accepted
            }
        }
        Some(other) => {
            return Err(RequirementsTxtParserError::Parser {
                message: format!("Expected comment or end-of-line, found '{other}'"),
                location: s.cursor(),
            });
        }
    }
    Ok(())
}

type ParsedRequirement = Result<Requirement, (String, Pep508Error)>;

/// Parse a PEP 508 requirement with optional trailing hashes.
///
/// A requirement that doesn't parse is returned with its text instead of aborting, the rest of
/// the line is consumed either way.
fn parse_requirement_and_hashes(
    s: &mut Scanner,
    content: &str,
) -> Result<(ParsedRequirement, Vec<String>), RequirementsTxtParserError> {
    let start = s.cursor();
    // Termination: s.eat() eventually becomes None
    let (end, has_hashes) = loop {
        let end = s.cursor();

        //  We look for the end of the line ...
        if s.eat_if('\n') {
            break (end, false);
        }
        if s.eat_if('\r') {
            s.eat_if('\n'); // Support `\r\n` but also accept stray `\r`
            break (end, false);
        }
        // ... or `--hash`, an escaped newline or a comment separated by whitespace ...
        if !eat_wrappable_whitespace(s).is_empty() {
            if s.after().starts_with("--") {
                break (end, true);
            } else if s.eat_if('#') {
                s.eat_until(['\r', '\n']);
                if s.at('\r') {
                    s.eat_if('\n'); // `\r\n`, but just `\r` is also accepted
                }
                break (end, false);
            }
            continue;
        }
        // ... or the end of the file, which works like the end of line
        if s.eat().is_none() {
            break (end, false);
        }
    };
    let given = content[start..end].trim_end();
    let requirement =
        Requirement::from_str(given).map_err(|err| (given.to_string(), err));
    let hashes = if has_hashes {
        let hashes = parse_hashes(s)?;
        eat_trailing_line(s)?;
        hashes
    } else {
        Vec::new()
    };
    Ok((requirement, hashes))
}

/// Parse `--hash=... --hash ...` after a requirement
fn parse_hashes(s: &mut Scanner) -> Result<Vec<String>, RequirementsTxtParserError> {
    let mut hashes = Vec::new();
    if !s.eat_if("--hash") {
        return Err(RequirementsTxtParserError::Parser {
            message: format!(
                "Expected '--hash', found '{}'",
                s.eat_while(|c: char| !c.is_whitespace())
            ),
            location: s.cursor(),
        });
    }
    let hash = parse_value(s, |c: char| !c.is_whitespace())?;
    hashes.push(hash.to_string());
    loop {
        eat_wrappable_whitespace(s);
        if !s.eat_if("--hash") {
            break;
        }
        let hash = parse_value(s, |c: char| !c.is_whitespace())?;
        hashes.push(hash.to_string());
    }
    Ok(hashes)
}

fn parse_url(s: &mut Scanner) -> Result<Url, RequirementsTxtParserError> {
    let location = s.cursor();
    let url = parse_value(s, |c: char| !c.is_whitespace() && c != '#')?;
    Url::parse(url).map_err(|err| RequirementsTxtParserError::Url {
        source: err,
        url: url.to_string(),
        location,
    })
}

/// In `-<key>=<value>` or `-<key> value`, this parses the part after the key
fn parse_value<'a, T>(
    s: &mut Scanner<'a>,
    while_pattern: impl Pattern<T>,
) -> Result<&'a str, RequirementsTxtParserError> {
    if s.eat_if('=') {
        // Explicit equals sign
        Ok(s.eat_while(while_pattern).trim_end())
    } else if s.eat_if(char::is_whitespace) {
        // Key and value are separated by whitespace instead
        s.eat_whitespace();
        Ok(s.eat_while(while_pattern).trim_end())
    } else {
        Err(RequirementsTxtParserError::Parser {
            message: format!("Expected '=' or whitespace, found {:?}", s.peek()),
            location: s.cursor(),
        })
    }
}

/// Error parsing requirements.txt, wrapper with filename
#[derive(Debug)]
pub struct RequirementsTxtFileError {
    file: PathBuf,
    error: RequirementsTxtParserError,
}

impl RequirementsTxtFileError {
    /// The file that failed to parse.
    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Error parsing requirements.txt, error disambiguation
#[derive(Debug)]
pub enum RequirementsTxtParserError {
    IO(io::Error),
    Url {
        source: url::ParseError,
        url: String,
        location: usize,
    },
    Parser {
        message: String,
        location: usize,
    },
    Subfile {
        source: Box<RequirementsTxtFileError>,
        start: usize,
        end: usize,
    },
}

impl Display for RequirementsTxtFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            RequirementsTxtParserError::IO(err) => err.fmt(f),
            RequirementsTxtParserError::Url { url, location, .. } => {
                write!(
                    f,
                    "Invalid URL in `{}` at position {location}: `{url}`",
                    self.file.display(),
                )
            }
            RequirementsTxtParserError::Parser { message, location } => {
                write!(
                    f,
                    "{message} in `{}` at position {location}",
                    self.file.display(),
                )
            }
            RequirementsTxtParserError::Subfile { start, end, .. } => {
                write!(
                    f,
                    "Error parsing included file in `{}` at position {start}-{end}",
                    self.file.display(),
                )
            }
        }
    }
}

impl std::error::Error for RequirementsTxtFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.error {
            RequirementsTxtParserError::IO(err) => err.source(),
            RequirementsTxtParserError::Url { source, .. } => Some(source),
            RequirementsTxtParserError::Subfile { source, .. } => Some(source.as_ref()),
            RequirementsTxtParserError::Parser { .. } => None,
        }
    }
}

impl From<io::Error> for RequirementsTxtParserError {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}
