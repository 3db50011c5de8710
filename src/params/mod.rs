use std::collections::HashMap;
use std::hash::Hash;

use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while},
    character::complete::{char, multispace0},
    combinator::rest,
    sequence::{delimited, preceded},
    IResult,
};
use thiserror::Error;

use crate::config::Config;
use crate::media::{MediaType, Platform};

pub mod dic;
pub mod redumper;

/// Errors from the fail-closed serialization path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializeError {
    #[error("no command set")]
    CommandUnset,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("value out of bounds for {flag}: {value}")]
    OutOfBounds { flag: &'static str, value: i64 },
}

/// Errors from the parsing path. Only positional grammar violations (and
/// the documented fail-closed flag subset) produce these; unrecognized
/// trailing tokens are tolerated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("wrong token count for command {0}")]
    TokenCount(&'static str),
    #[error("invalid drive identifier: {0}")]
    InvalidDrive(String),
    #[error("expected a filename, found flag token: {0}")]
    FilenameIsFlag(String),
    #[error("invalid numeric field: {0}")]
    InvalidNumber(String),
    #[error("value out of bounds for {flag}: {value}")]
    FlagValue { flag: &'static str, value: String },
}

/// Tri-state flag assignment: absent means unset, which is distinct from
/// an explicit false
#[derive(Debug, Clone)]
pub struct FlagMap<F>(HashMap<F, bool>);

// Derived PartialEq would bound F: PartialEq, which is not enough for
// HashMap comparison; the map needs F: Eq + Hash.
impl<F: Eq + Hash> PartialEq for FlagMap<F> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<F: Eq + Hash> Eq for FlagMap<F> {}

impl<F: Eq + Hash + Copy> FlagMap<F> {
    pub fn new() -> Self {
        FlagMap(HashMap::new())
    }

    pub fn get(&self, flag: F) -> Option<bool> {
        self.0.get(&flag).copied()
    }

    /// True only for an explicit true assignment
    pub fn is_on(&self, flag: F) -> bool {
        self.get(flag) == Some(true)
    }

    pub fn set(&mut self, flag: F, value: bool) {
        self.0.insert(flag, value);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<F: Eq + Hash + Copy> Default for FlagMap<F> {
    fn default() -> Self {
        FlagMap::new()
    }
}

fn quoted_token(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn unterminated_quote(input: &str) -> IResult<&str, &str> {
    preceded(char('"'), rest)(input)
}

fn bare_token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

/// Split a command line into tokens, honoring double-quoted spans as
/// single tokens. No escape characters are recognized inside quotes.
///
/// An unmatched opening quote swallows the rest of the input as one
/// token; this matches the permissive behavior downstream tooling
/// depends on.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut remaining = input.trim();
    while !remaining.is_empty() {
        let parsed: IResult<&str, &str> = preceded(
            multispace0,
            alt((quoted_token, unterminated_quote, bare_token)),
        )(remaining);
        match parsed {
            Ok((next, token)) => {
                tokens.push(token.to_string());
                remaining = next.trim_start();
            }
            Err(_) => break,
        }
    }
    tokens
}

/// Drive identifiers are single letters with an optional colon and
/// trailing backslash (`D`, `D:`, `D:\`)
pub(crate) fn is_valid_drive_id(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    match chars.next() {
        None => true,
        Some(':') => matches!(chars.next(), None | Some('\\')) && chars.next().is_none(),
        Some(_) => false,
    }
}

/// Parse a token as i32 within optional bounds
pub(crate) fn parse_i32(token: &str, lower: Option<i32>, upper: Option<i32>) -> Option<i32> {
    let value: i32 = token.parse().ok()?;
    if let Some(lo) = lower {
        if value < lo {
            return None;
        }
    }
    if let Some(hi) = upper {
        if value > hi {
            return None;
        }
    }
    Some(value)
}

/// Contract shared by every tool grammar
pub trait ToolParams: Sized {
    /// Best-effort construction from discrete fields; an invalid
    /// platform/media combination leaves the command unset
    fn from_fields(
        platform: Platform,
        media: MediaType,
        drive_id: &str,
        filename: &str,
        speed: Option<i32>,
        config: &Config,
    ) -> Self;

    /// Reload a previously generated or hand-edited command line
    fn from_command_line(raw: &str) -> Result<Self, ParseError>;

    /// Render the state as a complete, grammar-valid command line
    fn to_command_line(&self) -> Result<String, SerializeError>;

    /// Whether the configured command produces a disc image
    fn is_dump_command(&self) -> bool;
}

/// Supported external dumping tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpTool {
    DiscImageCreator,
    Redumper,
}

impl DumpTool {
    pub fn long_name(&self) -> &'static str {
        match self {
            DumpTool::DiscImageCreator => "DiscImageCreator",
            DumpTool::Redumper => "Redumper",
        }
    }
}

/// Per-tool dispatch wrapper for callers that hold parameters for an
/// arbitrary tool
#[derive(Debug, Clone)]
pub enum AnyParams {
    Dic(dic::DicParams),
    Redumper(redumper::RedumperParams),
}

impl AnyParams {
    pub fn from_fields(
        tool: DumpTool,
        platform: Platform,
        media: MediaType,
        drive_id: &str,
        filename: &str,
        speed: Option<i32>,
        config: &Config,
    ) -> Self {
        match tool {
            DumpTool::DiscImageCreator => AnyParams::Dic(dic::DicParams::from_fields(
                platform, media, drive_id, filename, speed, config,
            )),
            DumpTool::Redumper => AnyParams::Redumper(redumper::RedumperParams::from_fields(
                platform, media, drive_id, filename, speed, config,
            )),
        }
    }

    pub fn tool(&self) -> DumpTool {
        match self {
            AnyParams::Dic(_) => DumpTool::DiscImageCreator,
            AnyParams::Redumper(_) => DumpTool::Redumper,
        }
    }

    pub fn to_command_line(&self) -> Result<String, SerializeError> {
        match self {
            AnyParams::Dic(p) => p.to_command_line(),
            AnyParams::Redumper(p) => p.to_command_line(),
        }
    }

    pub fn is_dump_command(&self) -> bool {
        match self {
            AnyParams::Dic(p) => p.is_dump_command(),
            AnyParams::Redumper(p) => p.is_dump_command(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_honors_quotes() {
        let tokens = tokenize("cd D: \"my image\" 24 /c2");
        assert_eq!(tokens, vec!["cd", "D:", "my image", "24", "/c2"]);
    }

    #[test]
    fn tokenize_unmatched_quote_takes_rest() {
        let tokens = tokenize("cd D: \"my image 24");
        assert_eq!(tokens, vec!["cd", "D:", "my image 24"]);
    }

    #[test]
    fn tokenize_empty_input() {
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn drive_id_forms() {
        assert!(is_valid_drive_id("D"));
        assert!(is_valid_drive_id("D:"));
        assert!(is_valid_drive_id("D:\\"));
        assert!(!is_valid_drive_id("DE"));
        assert!(!is_valid_drive_id("4"));
        assert!(!is_valid_drive_id(""));
        assert!(!is_valid_drive_id("D:\\x"));
    }

    #[test]
    fn flag_map_tri_state() {
        #[derive(PartialEq, Eq, Hash, Clone, Copy)]
        enum F {
            A,
        }
        let mut map = FlagMap::new();
        assert_eq!(map.get(F::A), None);
        assert!(!map.is_on(F::A));
        map.set(F::A, false);
        assert_eq!(map.get(F::A), Some(false));
        assert!(!map.is_on(F::A));
        map.set(F::A, true);
        assert!(map.is_on(F::A));
    }

    #[test]
    fn flag_map_comparison() {
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        enum F {
            A,
            B,
        }
        let mut left = FlagMap::new();
        let mut right = FlagMap::new();
        assert_eq!(left, right);
        left.set(F::A, true);
        assert_ne!(left, right);
        right.set(F::A, true);
        assert_eq!(left, right);
        // Explicit false is a distinct state from unset
        left.set(F::B, false);
        assert_ne!(left, right);
    }

    #[test]
    fn bounded_int_parse() {
        assert_eq!(parse_i32("24", Some(0), Some(72)), Some(24));
        assert_eq!(parse_i32("-1", Some(0), None), None);
        assert_eq!(parse_i32("100", Some(0), Some(72)), None);
        assert_eq!(parse_i32("abc", None, None), None);
    }
}
