//! # Compose Manifests
//!
//! Reading and rewriting of multi-service compose files. The reconciliation
//! core never looks at YAML; it consumes a manifest through the narrow
//! [`ManifestSource`] trait: service names in declaration order, each with
//! its list of raw `KEY=VALUE` strings, plus any trailing YAML comments.
//!
//! ## Reading
//!
//! The document is decoded with `serde_yaml`. Only the list form of
//! `environment` is understood; a mapping-style block is skipped with a
//! warning and left untouched on write-back.
//!
//! ## Writing
//!
//! `serde_yaml` does not keep comments or layout, so rewrites are applied to
//! the raw text instead. A line scanner locates every `- ENTRY` item of every
//! `environment` list and remembers its byte span, quoting style and trailing
//! comment. A service whose located items do not match the decoded document
//! exactly (flow sequences, multi-line scalars, anchors) is not trusted for
//! text edits; if such a service needs rewriting the whole document is
//! re-serialized instead.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::record::normalize_comment;

/// The `environment` list of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEnvironment {
    pub name: String,
    pub entries: Vec<String>,
}

/// Replace entry `index` of `service`'s environment list with `entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRewrite {
    pub service: String,
    pub index: usize,
    pub entry: String,
}

/// What the reconciliation core needs from a manifest.
pub trait ManifestSource {
    /// Where the manifest lives, for messages.
    fn path(&self) -> &Path;

    /// Services with an `environment` list, in declaration order.
    fn services(&self) -> &[ServiceEnvironment];

    /// Trailing comments of `service`'s environment entries, by entry index.
    fn comments_for(&self, service: &str) -> BTreeMap<usize, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(Debug, Clone)]
struct EntryLocation {
    line: usize,
    start: usize,
    end: usize,
    style: ScalarStyle,
    value: String,
    comment: Option<String>,
}

/// A compose file loaded for reconciliation.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    text: String,
    document: YamlValue,
    services: Vec<ServiceEnvironment>,
    locations: HashMap<String, Vec<EntryLocation>>,
}

impl Manifest {
    /// Read and decode a manifest from disk.
    ///
    /// # Errors
    ///
    /// `Error::MissingFile` if `path` does not exist, otherwise any read,
    /// YAML or shape error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile {
                path: path.display().to_string(),
            });
        }
        let text = fs::read_to_string(path)?;
        Self::parse(path, text)
    }

    /// Decode manifest text; `path` is only used in messages.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let text = text.into();
        let document: YamlValue = serde_yaml::from_str(&text)?;
        let services = service_environments(&path, &document)?;

        let mut locations = locate_entries(&text);
        locations.retain(|name, located| {
            let trusted = services
                .iter()
                .find(|s| &s.name == name)
                .is_some_and(|s| {
                    s.entries.len() == located.len()
                        && s.entries.iter().zip(located.iter()).all(|(e, l)| *e == l.value)
                });
            if !trusted {
                debug!("{}: layout of '{}' environment not located", path.display(), name);
            }
            trusted
        });

        Ok(Self {
            path,
            text,
            document,
            services,
            locations,
        })
    }

    /// The manifest text as read.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply `rewrites` and return the new manifest text.
    ///
    /// Untouched content is preserved byte for byte when every affected
    /// service could be located in the text.
    pub fn rewrite(&self, rewrites: &[ManifestRewrite]) -> Result<String> {
        if rewrites.is_empty() {
            return Ok(self.text.clone());
        }

        let mut expected = self.services.clone();
        for rewrite in rewrites {
            let slot = expected
                .iter_mut()
                .find(|s| s.name == rewrite.service)
                .and_then(|s| s.entries.get_mut(rewrite.index))
                .ok_or_else(|| Error::Manifest {
                    path: self.path.display().to_string(),
                    message: format!(
                        "service '{}' has no environment entry {}",
                        rewrite.service, rewrite.index
                    ),
                })?;
            *slot = rewrite.entry.clone();
        }

        if let Some(text) = self.rewrite_in_place(rewrites) {
            let reparsed: YamlValue = serde_yaml::from_str(&text)?;
            if service_environments(&self.path, &reparsed)? == expected {
                return Ok(text);
            }
        }

        warn!(
            "{}: environment layout could not be preserved, re-serializing (comments are lost)",
            self.path.display()
        );
        self.rewrite_document(rewrites)
    }

    fn rewrite_in_place(&self, rewrites: &[ManifestRewrite]) -> Option<String> {
        let mut lines: Vec<String> = self.text.split_inclusive('\n').map(str::to_string).collect();
        for rewrite in rewrites {
            let location = self.locations.get(&rewrite.service)?.get(rewrite.index)?;
            let line = lines.get_mut(location.line)?;
            let scalar = render_scalar(&rewrite.entry, location.style);
            line.replace_range(location.start..location.end, &scalar);
        }
        Some(lines.concat())
    }

    fn rewrite_document(&self, rewrites: &[ManifestRewrite]) -> Result<String> {
        let mut document = self.document.clone();
        for rewrite in rewrites {
            let slot = document
                .get_mut("services")
                .and_then(|s| s.get_mut(rewrite.service.as_str()))
                .and_then(|s| s.get_mut("environment"))
                .and_then(YamlValue::as_sequence_mut)
                .and_then(|seq| seq.get_mut(rewrite.index));
            if let Some(slot) = slot {
                *slot = YamlValue::String(rewrite.entry.clone());
            }
        }
        Ok(serde_yaml::to_string(&document)?)
    }
}

impl ManifestSource for Manifest {
    fn path(&self) -> &Path {
        &self.path
    }

    fn services(&self) -> &[ServiceEnvironment] {
        &self.services
    }

    fn comments_for(&self, service: &str) -> BTreeMap<usize, String> {
        self.locations
            .get(service)
            .map(|located| {
                located
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, l)| l.comment.clone().map(|c| (idx, c)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn service_environments(path: &Path, document: &YamlValue) -> Result<Vec<ServiceEnvironment>> {
    let shape_error = |message: String| Error::Manifest {
        path: path.display().to_string(),
        message,
    };

    let services = match document.get("services") {
        Some(YamlValue::Mapping(map)) => map,
        Some(YamlValue::Null) => return Ok(Vec::new()),
        Some(_) => return Err(shape_error("'services' is not a mapping".to_string())),
        None => return Err(shape_error("missing 'services' mapping".to_string())),
    };

    let mut environments = Vec::new();
    for (name, definition) in services {
        let name = name
            .as_str()
            .ok_or_else(|| shape_error(format!("service name {:?} is not a string", name)))?;
        match definition.get("environment") {
            None | Some(YamlValue::Null) => continue,
            Some(YamlValue::Sequence(items)) => {
                let entries = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| match item {
                        YamlValue::String(entry) => Ok(entry.clone()),
                        other => Err(Error::MalformedInput {
                            message: format!(
                                "{}: service '{}' environment entry {} is not a string: {:?}",
                                path.display(),
                                name,
                                idx,
                                other
                            ),
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                environments.push(ServiceEnvironment {
                    name: name.to_string(),
                    entries,
                });
            }
            Some(YamlValue::Mapping(_)) => {
                warn!(
                    "{}: service '{}' uses a mapping-style environment, skipping it",
                    path.display(),
                    name
                );
            }
            Some(_) => {
                return Err(shape_error(format!(
                    "service '{}' environment is neither a list nor a mapping",
                    name
                )))
            }
        }
    }
    Ok(environments)
}

/// Split `key: rest` on the first mapping colon, unquoting the key.
fn mapping_key(content: &str) -> Option<(&str, &str)> {
    let (key, rest) = if let Some(quote @ ('"' | '\'')) = content.chars().next() {
        let close = content[1..].find(quote)? + 1;
        let rest = content[close + 1..].strip_prefix(':')?;
        (&content[1..close], rest)
    } else {
        let colon = content
            .char_indices()
            .find(|&(idx, c)| {
                c == ':' && content[idx + 1..].chars().next().is_none_or(char::is_whitespace)
            })?
            .0;
        (content[..colon].trim_end(), &content[colon + 1..])
    };
    Some((key, rest.trim()))
}

fn opens_block(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with('#')
}

/// Find every `environment` list item under `services`, keyed by service.
///
/// Items that cannot be represented as a single-line scalar are recorded
/// with a value that will not match the decoded document.
fn locate_entries(text: &str) -> HashMap<String, Vec<EntryLocation>> {
    let mut found: HashMap<String, Vec<EntryLocation>> = HashMap::new();
    let mut in_services = false;
    let mut service_indent: Option<usize> = None;
    let mut service: Option<String> = None;
    let mut child_indent: Option<usize> = None;
    let mut env_indent: Option<usize> = None;
    let mut item_indent: Option<usize> = None;

    for (idx, line) in text.lines().enumerate() {
        let content = line.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = line.len() - content.len();

        if indent == 0 {
            in_services = matches!(mapping_key(content), Some(("services", rest)) if opens_block(rest));
            service_indent = None;
            service = None;
            env_indent = None;
            continue;
        }
        if !in_services {
            continue;
        }

        if let Some(env) = env_indent {
            let is_item = content == "-" || content.starts_with("- ");
            if is_item && indent >= env && item_indent.is_none_or(|i| i == indent) {
                item_indent = Some(indent);
                if let Some(name) = &service {
                    let location = locate_item(idx, line, indent).unwrap_or(EntryLocation {
                        line: idx,
                        start: 0,
                        end: 0,
                        style: ScalarStyle::Plain,
                        value: String::from("\u{0}"),
                        comment: None,
                    });
                    found.entry(name.clone()).or_default().push(location);
                }
                continue;
            }
            if indent > item_indent.unwrap_or(env) {
                continue;
            }
            env_indent = None;
            item_indent = None;
        }

        let svc_indent = *service_indent.get_or_insert(indent);
        if indent <= svc_indent {
            service = mapping_key(content).map(|(key, _)| key.to_string());
            child_indent = None;
            continue;
        }

        let child = *child_indent.get_or_insert(indent);
        if indent == child && service.is_some() {
            if let Some(("environment", rest)) = mapping_key(content) {
                if opens_block(rest) {
                    env_indent = Some(indent);
                }
            }
        }
    }

    found
}

fn locate_item(line_idx: usize, line: &str, indent: usize) -> Option<EntryLocation> {
    let after_dash = indent + 1;
    let body = &line[after_dash..];
    let start = after_dash + (body.len() - body.trim_start().len());
    let scalar = &line[start..];

    let (style, end, value) = match scalar.chars().next()? {
        '"' => {
            let (len, value) = scan_double_quoted(scalar)?;
            (ScalarStyle::DoubleQuoted, start + len, value)
        }
        '\'' => {
            let (len, value) = scan_single_quoted(scalar)?;
            (ScalarStyle::SingleQuoted, start + len, value)
        }
        '[' | '{' | '&' | '*' | '!' | '|' | '>' | '%' | '@' | '`' => return None,
        _ => {
            let len = scalar.find(" #").unwrap_or(scalar.len());
            let value = scalar[..len].trim_end();
            (ScalarStyle::Plain, start + value.len(), value.to_string())
        }
    };

    let rest = line[end..].trim();
    let comment = if rest.is_empty() {
        None
    } else if rest.starts_with('#') {
        Some(normalize_comment(rest)).filter(|c| !c.is_empty())
    } else {
        return None;
    };

    Some(EntryLocation {
        line: line_idx,
        start,
        end,
        style,
        value,
        comment,
    })
}

/// Length of a `"..."` scalar including quotes, and its decoded value.
fn scan_double_quoted(scalar: &str) -> Option<(usize, String)> {
    let mut value = String::new();
    let mut chars = scalar.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((idx + 1, value)),
            '\\' => match chars.next()?.1 {
                '"' => value.push('"'),
                '\\' => value.push('\\'),
                '/' => value.push('/'),
                't' => value.push('\t'),
                'n' => value.push('\n'),
                // other escapes are rare in env entries; refuse to guess
                _ => return None,
            },
            _ => value.push(c),
        }
    }
    None
}

/// Length of a `'...'` scalar including quotes, and its decoded value.
fn scan_single_quoted(scalar: &str) -> Option<(usize, String)> {
    let mut value = String::new();
    let mut chars = scalar.char_indices().skip(1).peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '\'' {
            if chars.peek().is_some_and(|&(_, next)| next == '\'') {
                chars.next();
                value.push('\'');
            } else {
                return Some((idx + 1, value));
            }
        } else {
            value.push(c);
        }
    }
    None
}

fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    !"-?:,[]{}#&*!|>'\"%@`".contains(first)
        && value.trim() == value
        && !value.contains(": ")
        && !value.contains(" #")
        && !value.ends_with(':')
}

fn render_scalar(value: &str, style: ScalarStyle) -> String {
    match style {
        ScalarStyle::Plain if is_plain_safe(value) => value.to_string(),
        ScalarStyle::SingleQuoted => format!("'{}'", value.replace('\'', "''")),
        ScalarStyle::Plain | ScalarStyle::DoubleQuoted => {
            format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
        }
    }
}
