//! # Environment Records
//!
//! An [`EnvRecord`] is one logical line of a dot-file, or one `KEY=VALUE`
//! entry taken from a compose service's `environment` list. Blank lines and
//! comment-only lines are records too, so that a dot-file can be written back
//! with its layout intact.
//!
//! ## Line grammar
//!
//! - `KEY=VALUE` or `KEY=VALUE # comment`
//! - `# comment`
//! - an empty line
//!
//! The key is everything before the first `=`, the value everything after it
//! up to the first `" #"`. There is no quoting or escaping.
//!
//! Two records are the *same declaration* when key and value match; comments,
//! line numbers and service sets never take part in that comparison. When two
//! records carry the same key, a manifest record outranks a dot-file record
//! (see [`rank_tiebreak`]).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

static PARAMETER_EXPANSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\$\{(?P<dollar>[^{}]*)\}|\{\{(?P<braces>[^{}]*)\}\})$")
        .expect("parameter expansion pattern is valid")
});

/// Where a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// An `environment` entry of a compose service.
    Manifest,
    /// A line of the dot-file baseline.
    #[serde(rename = "dotfile")]
    DotFile,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Manifest => write!(f, "manifest"),
            Source::DotFile => write!(f, "dotfile"),
        }
    }
}

/// Text wrapped around every declared key while parsing.
///
/// Placeholders (blank and comment-only lines) never receive the affix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyAffix {
    pub prefix: String,
    pub postfix: String,
}

impl KeyAffix {
    pub fn new(prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            postfix: postfix.into(),
        }
    }

    /// Affix that leaves keys untouched.
    pub fn none() -> Self {
        Self::default()
    }

    fn apply(&self, key: &str) -> String {
        format!("{}{}{}", self.prefix, key, self.postfix)
    }
}

/// A single environment variable entry, comment line or blank line.
#[derive(Debug, Clone, Serialize)]
pub struct EnvRecord {
    /// Variable name. Empty for blank and comment-only lines.
    pub key: String,
    /// Variable value, possibly empty.
    pub value: String,
    /// Comment text, always stored without the leading `#`.
    pub comment: String,
    /// 1-based line number in the file the record came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_line: Option<usize>,
    /// Services that declare or reference this key.
    pub services: BTreeSet<String>,
    pub source: Source,
    /// Original text of a dot-file comment line, written back unchanged.
    #[serde(skip)]
    verbatim: Option<String>,
}

impl EnvRecord {
    /// Create a declaration record without any services attached.
    pub fn new(key: impl Into<String>, value: impl Into<String>, source: Source) -> Self {
        Self {
            key: key.into().trim().to_string(),
            value: value.into().trim().to_string(),
            comment: String::new(),
            origin_line: None,
            services: BTreeSet::new(),
            source,
            verbatim: None,
        }
    }

    /// Create a comment-only (or, with an empty comment, blank) record.
    pub fn placeholder(comment: &str, source: Source) -> Self {
        Self {
            key: String::new(),
            value: String::new(),
            comment: normalize_comment(comment),
            origin_line: None,
            services: BTreeSet::new(),
            source,
            verbatim: None,
        }
    }

    /// Parse one raw line into a record.
    ///
    /// The affix is applied to the key of real declarations only.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedInput` for a line that carries a value but no
    /// key (`=value`), since it cannot be written back.
    pub fn parse(raw: &str, affix: &KeyAffix, source: Source) -> Result<Self> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(Self::placeholder(line, source));
        }
        if line.starts_with('#') {
            let mut record = Self::placeholder(line, source);
            if source == Source::DotFile {
                record.verbatim = Some(raw.to_string());
            }
            return Ok(record);
        }

        let (key, rest) = line.split_once('=').unwrap_or((line, ""));
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::MalformedInput {
                message: format!("entry '{}' has no variable name", line),
            });
        }

        let rest = rest.trim();
        // `KEY= # note` has no value; `KEY=#fff` keeps the hash.
        let (value, comment) = if rest == "#" || rest.starts_with("# ") {
            ("", rest)
        } else {
            rest.split_once(" #").unwrap_or((rest, ""))
        };

        let mut record = Self::new(affix.apply(key), value, source);
        record.set_comment(comment);
        Ok(record)
    }

    /// Attach the 1-based line number the record was read from.
    pub fn with_line(mut self, line: usize) -> Self {
        self.origin_line = Some(line);
        self
    }

    /// Attach a service that declares this record.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.insert(service.into());
        self
    }

    /// Replace the comment, normalizing away any `#` marker.
    pub fn set_comment(&mut self, comment: &str) {
        self.verbatim = None;
        self.comment = normalize_comment(comment);
    }

    /// Union `services` into this record's service set.
    pub fn add_services<I, S>(&mut self, services: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services.extend(services.into_iter().map(Into::into));
    }

    pub fn is_blank(&self) -> bool {
        self.key.is_empty() && self.value.is_empty() && self.comment.is_empty()
    }

    pub fn is_comment_only(&self) -> bool {
        self.key.is_empty() && self.value.is_empty() && !self.comment.is_empty()
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    /// True when both key and value are present.
    pub fn has_declaration(&self) -> bool {
        !self.key.is_empty() && !self.value.is_empty()
    }

    /// True when the value is a `${NAME}` or `{{NAME}}` reference.
    pub fn is_parameter_expansion(&self) -> bool {
        self.parameter_expansion_key().is_some()
    }

    /// Name referenced by a `${NAME}` / `{{NAME}}` value.
    pub fn parameter_expansion_key(&self) -> Option<&str> {
        let value = self
            .value
            .trim_matches(|c: char| c == '#' || c.is_whitespace());
        let captures = PARAMETER_EXPANSION.captures(value)?;
        captures
            .name("dollar")
            .or_else(|| captures.name("braces"))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
    }

    /// `${KEY}`, the form a manifest uses to point at this record.
    pub fn to_reference(&self) -> String {
        format!("${{{}}}", self.key)
    }

    /// Key and value equality, ignoring everything else.
    pub fn same_declaration(&self, other: &EnvRecord) -> bool {
        same_declaration(self, other)
    }
}

/// Renders the record as one dot-file line, without the newline.
impl fmt::Display for EnvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.verbatim.as_deref().filter(|_| !self.has_key()) {
            return f.write_str(text);
        }
        if self.has_key() {
            write!(f, "{}={}", self.key, self.value)?;
        }
        if !self.comment.is_empty() {
            let marker = if self.has_key() { " # " } else { "# " };
            write!(f, "{}{}", marker, self.comment)?;
        }
        Ok(())
    }
}

/// Strip surrounding whitespace and any leading `#` markers.
///
/// Idempotent: `normalize_comment(normalize_comment(s)) == normalize_comment(s)`.
pub fn normalize_comment(comment: &str) -> String {
    let trimmed = comment.trim();
    if trimmed.starts_with('#') {
        trimmed
            .trim_start_matches(|c: char| c == '#' || c.is_whitespace())
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether two records declare the same key with the same value.
pub fn same_declaration(a: &EnvRecord, b: &EnvRecord) -> bool {
    a.key == b.key && a.value == b.value
}

/// Precedence between two records sharing a key.
///
/// `Greater` means `a` outranks `b`. Records from the same source compare
/// `Equal`; callers keep the first one seen in that case.
pub fn rank_tiebreak(a: &EnvRecord, b: &EnvRecord) -> Ordering {
    match (a.source, b.source) {
        (Source::Manifest, Source::DotFile) => Ordering::Greater,
        (Source::DotFile, Source::Manifest) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
