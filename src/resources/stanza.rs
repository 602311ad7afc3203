//! Config stanza resource: one named block in a tool's shared config file.
//!
//! Edits are surgical. TOML goes through [`toml_edit`] so comments, ordering
//! and formatting of unrelated tables survive. JSON keeps key order
//! (`preserve_order`) and number text (`arbitrary_precision`), and is
//! re-emitted in the layout it was read in.
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use toml_edit::{DocumentMut, Item, Table};

use super::helpers::fs::write_atomic;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::adapters::{ConfigFormat, Stanza};
use crate::error::RegistrationError;

/// A parsed config file that can have stanzas inserted and removed.
#[derive(Debug, Clone)]
pub enum ConfigDocument {
    /// TOML document.
    Toml(DocumentMut),
    /// JSON object.
    Json {
        /// Top-level object.
        root: Map<String, Value>,
        /// Layout to render it back in.
        style: JsonStyle,
    },
}

/// How a JSON file was laid out when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonLayout {
    /// One member per line, nested with this indent.
    Pretty(String),
    /// Single line with `, ` and `: ` separators.
    Spaced,
    /// Single line without whitespace.
    Compact,
}

/// Layout plus trailing newline of a JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStyle {
    /// Member layout.
    pub layout: JsonLayout,
    /// The text ended with a newline.
    pub trailing_newline: bool,
}

impl Default for JsonStyle {
    fn default() -> Self {
        Self {
            layout: JsonLayout::Pretty("  ".to_string()),
            trailing_newline: true,
        }
    }
}

impl JsonStyle {
    /// Detect the layout of `text`. Blank text gets the default style.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let body = text.trim();
        if body.is_empty() {
            return Self::default();
        }
        let layout = if body.contains('\n') {
            let indent = body
                .lines()
                .skip(1)
                .filter_map(|line| line.strip_suffix(line.trim_start()))
                .find(|ws| !ws.is_empty())
                .unwrap_or("  ");
            JsonLayout::Pretty(indent.to_string())
        } else if body.contains("\": ") {
            JsonLayout::Spaced
        } else {
            JsonLayout::Compact
        };
        Self {
            layout,
            trailing_newline: text.ends_with('\n'),
        }
    }

    fn render(&self, root: &Map<String, Value>) -> String {
        let mut out = Vec::new();
        let written = match &self.layout {
            JsonLayout::Pretty(indent) => root.serialize(&mut Serializer::with_formatter(
                &mut out,
                PrettyFormatter::with_indent(indent.as_bytes()),
            )),
            JsonLayout::Spaced => {
                root.serialize(&mut Serializer::with_formatter(&mut out, SpacedFormatter))
            }
            JsonLayout::Compact => {
                root.serialize(&mut Serializer::with_formatter(&mut out, CompactFormatter))
            }
        };
        if written.is_err() {
            return String::new();
        }
        let mut text = String::from_utf8(out).unwrap_or_default();
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }
}

/// Single-line JSON with a space after each `,` and `:`.
#[derive(Debug)]
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn split_name(name: &str) -> Result<(&str, Vec<&str>), RegistrationError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(RegistrationError::InvalidName(name.to_string()));
    }
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| RegistrationError::InvalidName(name.to_string()))?;
    Ok((leaf, parents.to_vec()))
}

fn not_a_table(stanza: &str, segment: &str) -> RegistrationError {
    RegistrationError::NotATable {
        stanza: stanza.to_string(),
        segment: segment.to_string(),
    }
}

impl ConfigDocument {
    /// Parse `text` in `format`. Blank text yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Parse`] if the text is not valid.
    pub fn parse(format: ConfigFormat, text: &str) -> Result<Self, RegistrationError> {
        let parse_err = |reason: String| RegistrationError::Parse {
            format: format.name(),
            reason,
        };
        match format {
            ConfigFormat::Toml => text
                .parse::<DocumentMut>()
                .map(Self::Toml)
                .map_err(|e| parse_err(e.to_string())),
            ConfigFormat::Json => {
                let style = JsonStyle::detect(text);
                if text.trim().is_empty() {
                    return Ok(Self::Json {
                        root: Map::new(),
                        style,
                    });
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(root)) => Ok(Self::Json { root, style }),
                    Ok(_) => Err(parse_err("top-level value is not an object".to_string())),
                    Err(e) => Err(parse_err(e.to_string())),
                }
            }
        }
    }

    /// Read and parse `path`; a missing file yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path, format: ConfigFormat) -> Result<Self, RegistrationError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Self::parse(format, &text)
    }

    /// Insert `stanza`, replacing an existing stanza of the same name in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or a parent segment is not a
    /// table.
    pub fn upsert(&mut self, stanza: &Stanza) -> Result<(), RegistrationError> {
        let (leaf, parents) = split_name(&stanza.name)?;
        match self {
            Self::Toml(doc) => {
                let mut table = doc.as_table_mut();
                for seg in parents {
                    let mut implicit = Table::new();
                    implicit.set_implicit(true);
                    table = table
                        .entry(seg)
                        .or_insert(Item::Table(implicit))
                        .as_table_mut()
                        .ok_or_else(|| not_a_table(&stanza.name, seg))?;
                }
                if table.contains_key(leaf) {
                    let existing = table
                        .get_mut(leaf)
                        .and_then(Item::as_table_mut)
                        .ok_or_else(|| not_a_table(&stanza.name, leaf))?;
                    existing.clear();
                    fill_table(existing, stanza);
                } else {
                    let mut fresh = Table::new();
                    fill_table(&mut fresh, stanza);
                    table.insert(leaf, Item::Table(fresh));
                }
            }
            Self::Json { root, .. } => {
                let mut map = root;
                for seg in parents {
                    map = map
                        .entry(seg.to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                        .as_object_mut()
                        .ok_or_else(|| not_a_table(&stanza.name, seg))?;
                }
                let body: Map<String, Value> = stanza
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                map.insert(leaf.to_string(), Value::Object(body));
            }
        }
        Ok(())
    }

    /// Remove the stanza called `name`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid.
    pub fn remove(&mut self, name: &str) -> Result<bool, RegistrationError> {
        let (leaf, parents) = split_name(name)?;
        match self {
            Self::Toml(doc) => {
                let mut table = doc.as_table_mut();
                for seg in parents {
                    table = match table.get_mut(seg).and_then(Item::as_table_mut) {
                        Some(t) => t,
                        None => return Ok(false),
                    };
                }
                Ok(table.remove(leaf).is_some())
            }
            Self::Json { root, .. } => {
                let mut map = root;
                for seg in parents {
                    map = match map.get_mut(seg).and_then(Value::as_object_mut) {
                        Some(m) => m,
                        None => return Ok(false),
                    };
                }
                Ok(map.shift_remove(leaf).is_some())
            }
        }
    }

    /// Current entries of the stanza called `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<(String, String)>> {
        let (leaf, parents) = split_name(name).ok()?;
        match self {
            Self::Toml(doc) => {
                let mut table = doc.as_table();
                for seg in parents {
                    table = table.get(seg)?.as_table()?;
                }
                let stanza = table.get(leaf)?.as_table()?;
                Some(
                    stanza
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_str().unwrap_or_default().to_string()))
                        .collect(),
                )
            }
            Self::Json { root, .. } => {
                let mut map = root;
                for seg in parents {
                    map = map.get(seg)?.as_object()?;
                }
                let stanza = map.get(leaf)?.as_object()?;
                Some(
                    stanza
                        .iter()
                        .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                        .collect(),
                )
            }
        }
    }

    /// Render the document back to text.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Toml(doc) => doc.to_string(),
            Self::Json { root, style } => style.render(root),
        }
    }

    /// Whether the document holds no meaningful content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Toml(doc) => doc.to_string().trim().is_empty(),
            Self::Json { root, .. } => root.is_empty(),
        }
    }
}

fn fill_table(table: &mut Table, stanza: &Stanza) {
    for (key, value) in &stanza.entries {
        table.insert(key, toml_edit::value(value.as_str()));
    }
}

/// A registration stanza in a config file.
#[derive(Debug, Clone)]
pub struct StanzaResource {
    /// Path to the config file.
    pub path: PathBuf,
    /// File syntax.
    pub format: ConfigFormat,
    /// Desired stanza. Removal only uses its name.
    pub stanza: Stanza,
}

impl StanzaResource {
    /// Create a new stanza resource.
    #[must_use]
    pub const fn new(path: PathBuf, format: ConfigFormat, stanza: Stanza) -> Self {
        Self {
            path,
            format,
            stanza,
        }
    }

    fn save(&self, doc: &ConfigDocument) -> Result<(), RegistrationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&self.path, doc.render().as_bytes())?;
        Ok(())
    }
}

impl Applicable for StanzaResource {
    type Error = RegistrationError;

    fn description(&self) -> String {
        format!("{} [{}]", self.path.display(), self.stanza.name)
    }

    fn apply(&self) -> Result<ResourceChange, RegistrationError> {
        if !self.needs_change()? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let mut doc = ConfigDocument::load(&self.path, self.format)?;
        doc.upsert(&self.stanza)?;
        self.save(&doc)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange, RegistrationError> {
        if !self.path.exists() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let mut doc = ConfigDocument::load(&self.path, self.format)?;
        if !doc.remove(&self.stanza.name)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.save(&doc)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for StanzaResource {
    fn current_state(&self) -> Result<ResourceState, RegistrationError> {
        if !self.path.exists() {
            return Ok(ResourceState::Missing);
        }
        let doc = ConfigDocument::load(&self.path, self.format)?;
        Ok(match doc.get(&self.stanza.name) {
            None => ResourceState::Missing,
            Some(entries) if entries == self.stanza.entries => ResourceState::Correct,
            Some(entries) => ResourceState::Incorrect {
                current: format!("{} keys", entries.len()),
            },
        })
    }
}
