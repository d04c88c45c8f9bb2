use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::error::{BankError, Result};

/// Indentation used when encoding syncfiles.
const INDENT: &str = "    ";

/// Target descriptor recorded for one repository in the syncfile.
///
/// Only `path`, `sha` and `UnixTimeStamp` participate in resolution; the
/// remaining fields are descriptive and carried along for humans reading the
/// syncfile. Keys the tool does not recognize are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoTarget {
    /// Location of the repository, relative to the sync working directory.
    pub path: String,

    /// Full commit hash to check out, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,

    /// Author timestamp to check out, seconds since epoch. The syncfile
    /// format writes this as a string of digits but older files carry plain
    /// numbers; both decode.
    #[serde(
        rename = "UnixTimeStamp",
        default,
        with = "timestamp_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub unix_timestamp: Option<i64>,

    /// Human-readable date of the recorded commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Author of the recorded commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// First line(s) of the recorded commit message, flattened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// First-parent revision count of the recorded commit.
    #[serde(
        rename = "revisionNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub revision_number: Option<String>,

    /// URL the repository can be cloned from.
    #[serde(rename = "cloneURL", default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,

    /// Unrecognized keys, preserved across load/save but never consulted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Serialize the target timestamp the way the syncfile format spells it (a
/// quoted string of digits) while accepting bare integers on input.
mod timestamp_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Timestamp value as it may appear in a syncfile.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        /// Plain JSON integer.
        Number(i64),
        /// String of digits, as the decorated dialect writes it.
        Text(String),
    }

    /// Serialize a timestamp as a string of digits.
    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(timestamp) => serializer.serialize_str(&timestamp.to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Accept either a JSON number or a numeric string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(timestamp)) => Ok(Some(timestamp)),
            Some(Raw::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid Unix timestamp {text:?}"))),
        }
    }
}

/// Serialization dialect of a syncfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Diff-friendly dialect: `<|`/`|>` for object braces, `->` between keys
    /// and values, `{`/`}` for arrays.
    #[default]
    Decorated,
    /// Strict JSON.
    Json,
}

impl Dialect {
    /// Dialect to use for a syncfile that does not exist yet, chosen from its
    /// file extension.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Decorated,
        }
    }
}

/// Ordered mapping from repository name to [`RepoTarget`], decoded from a
/// syncfile. Order is preserved for deterministic output; it has no meaning
/// for resolution.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Entries in syncfile order.
    entries: Vec<(String, RepoTarget)>,
    /// Dialect the syncfile was written in, reused when saving.
    dialect: Dialect,
}

impl Manifest {
    /// Build a manifest from entries, to be written in the given dialect.
    pub fn new(entries: Vec<(String, RepoTarget)>, dialect: Dialect) -> Self {
        Self { entries, dialect }
    }

    /// Load and decode the syncfile at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| BankError::Syncfile {
            path: path.to_path_buf(),
            message: format!("could not read the sync file: {err}"),
        })?;
        Self::parse(&text, path)
    }

    /// Decode syncfile contents; `origin` is used for error reporting only.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let syncfile_error = |message: String| BankError::Syncfile {
            path: origin.to_path_buf(),
            message,
        };

        let dialect = if text.contains("<|") {
            Dialect::Decorated
        } else {
            Dialect::Json
        };
        let json_text = match dialect {
            Dialect::Decorated => decode_decorated(text),
            Dialect::Json => text.to_string(),
        };

        let map: Map<String, Value> = serde_json::from_str(&json_text)
            .map_err(|err| syncfile_error(format!("could not decode the sync file: {err}")))?;
        if map.is_empty() {
            return Err(syncfile_error(
                "no repos are specified in the sync file".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(map.len());
        for (name, value) in map {
            let target: RepoTarget = serde_json::from_value(value)
                .map_err(|err| syncfile_error(format!("invalid entry for repo '{name}': {err}")))?;
            entries.push((name, target));
        }
        Ok(Self { entries, dialect })
    }

    /// Entries in syncfile order.
    pub fn entries(&self) -> &[(String, RepoTarget)] {
        &self.entries
    }

    /// Number of repositories in the bank.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dialect the syncfile was written in.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Width of the longest repository name plus one, used to align report
    /// lines across the bank.
    pub fn name_width(&self) -> usize {
        self.entries
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Encode the manifest in its dialect.
    pub fn encode(&self) -> Result<String> {
        let mut root = Map::new();
        for (name, target) in &self.entries {
            let value = serde_json::to_value(target)
                .map_err(|err| BankError::Config(format!("could not encode sync state: {err}")))?;
            root.insert(name.clone(), value);
        }
        match self.dialect {
            Dialect::Decorated => Ok(encode_decorated(&root)),
            Dialect::Json => encode_json(&root),
        }
    }

    /// Encode the manifest and write it to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.encode()?;
        fs::write(path, text).map_err(|err| BankError::Syncfile {
            path: path.to_path_buf(),
            message: format!("could not write the sync file: {err}"),
        })?;
        Ok(())
    }
}

/// Rewrite decorated-dialect text into strict JSON. The decorated tokens are
/// all ASCII, so a simple character scan with one lookahead suffices.
fn decode_decorated(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '<' if chars.peek() == Some(&'|') => {
                chars.next();
                out.push('{');
            }
            '|' if chars.peek() == Some(&'>') => {
                chars.next();
                out.push('}');
            }
            '-' if chars.peek() == Some(&'>') => {
                chars.next();
                out.push(':');
            }
            '{' => out.push('['),
            '}' => out.push(']'),
            _ => out.push(ch),
        }
    }
    out
}

/// Encode a root object in the decorated dialect.
fn encode_decorated(root: &Map<String, Value>) -> String {
    let mut out = String::new();
    write_decorated_object(root, 0, &mut out);
    out.push('\n');
    out
}

/// Append one value in the decorated dialect at the given indent level.
fn write_decorated_value(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Object(map) => write_decorated_object(map, indent, out),
        Value::Array(items) => write_decorated_array(items, indent, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Append an object as `<| "key" -> value, ... |>`.
fn write_decorated_object(map: &Map<String, Value>, indent: usize, out: &mut String) {
    if map.is_empty() {
        out.push_str("<||>");
        return;
    }
    out.push_str("<|\n");
    let inner = indent + 1;
    for (position, (key, value)) in map.iter().enumerate() {
        out.push_str(&INDENT.repeat(inner));
        out.push_str(&Value::String(key.clone()).to_string());
        out.push_str(" -> ");
        write_decorated_value(value, inner, out);
        if position + 1 < map.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(indent));
    out.push_str("|>");
}

/// Append an array as `{ item, ... }`, the decorated spelling of a list.
fn write_decorated_array(items: &[Value], indent: usize, out: &mut String) {
    if items.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    let inner = indent + 1;
    for (position, item) in items.iter().enumerate() {
        out.push_str(&INDENT.repeat(inner));
        write_decorated_value(item, inner, out);
        if position + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(indent));
    out.push('}');
}

/// Encode a root object as strict JSON with four-space indentation.
fn encode_json(root: &Map<String, Value>) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    root.serialize(&mut serializer)
        .map_err(|err| BankError::Config(format!("could not encode sync state: {err}")))?;
    let mut text = String::from_utf8(buf)
        .map_err(|err| BankError::Config(format!("could not encode sync state: {err}")))?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const DECORATED: &str = r#"<|
    "libA" -> <|
        "path" -> "../libA",
        "sha" -> "4f7a04230e350efb4ee6e2ff1b1f0832b7f64d3d",
        "UnixTimeStamp" -> "1469526470"
    |>,
    "libB" -> <|
        "path" -> "../libB",
        "UnixTimeStamp" -> 1469526000,
        "favoriteColor" -> "teal"
    |>
|>
"#;

    fn origin() -> PathBuf {
        PathBuf::from("syncfile.wl")
    }

    #[test]
    fn parses_decorated_dialect() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        assert_eq!(manifest.dialect(), Dialect::Decorated);
        assert_eq!(manifest.len(), 2);

        let (name, target) = &manifest.entries()[0];
        assert_eq!(name, "libA");
        assert_eq!(target.path, "../libA");
        assert_eq!(
            target.sha.as_deref(),
            Some("4f7a04230e350efb4ee6e2ff1b1f0832b7f64d3d")
        );
        assert_eq!(target.unix_timestamp, Some(1_469_526_470));
    }

    #[test]
    fn parses_strict_json_dialect() {
        let text = r#"{"libA": {"path": "../libA", "sha": "abc"}}"#;
        let manifest = Manifest::parse(text, &origin()).unwrap();
        assert_eq!(manifest.dialect(), Dialect::Json);
        assert_eq!(manifest.entries()[0].1.sha.as_deref(), Some("abc"));
    }

    #[test]
    fn timestamp_accepts_number_and_string() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        assert_eq!(manifest.entries()[1].1.unix_timestamp, Some(1_469_526_000));
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        let target = &manifest.entries()[1].1;
        assert_eq!(
            target.extra.get("favoriteColor"),
            Some(&Value::String("teal".to_string()))
        );

        let encoded = manifest.encode().unwrap();
        assert!(encoded.contains("\"favoriteColor\" -> \"teal\""));
    }

    #[test]
    fn order_is_preserved_through_round_trip() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        let encoded = manifest.encode().unwrap();
        let reparsed = Manifest::parse(&encoded, &origin()).unwrap();

        let names: Vec<_> = reparsed.entries().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["libA", "libB"]);
    }

    #[test]
    fn decorated_round_trip_is_stable() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        let encoded = manifest.encode().unwrap();
        assert!(encoded.contains("\"path\" -> \"../libA\""));
        assert!(encoded.starts_with("<|"));

        let reparsed = Manifest::parse(&encoded, &origin()).unwrap();
        assert_eq!(reparsed.entries(), manifest.entries());
    }

    #[test]
    fn json_dialect_round_trips_as_json() {
        let text = r#"{"libA": {"path": "../libA", "UnixTimeStamp": 99}}"#;
        let manifest = Manifest::parse(text, &origin()).unwrap();
        let encoded = manifest.encode().unwrap();
        assert!(encoded.trim_start().starts_with('{'));
        // Timestamps are normalized to the string spelling on write.
        assert!(encoded.contains("\"UnixTimeStamp\": \"99\""));
    }

    #[test]
    fn empty_manifest_is_an_error() {
        assert!(Manifest::parse("<||>", &origin()).is_err());
        assert!(Manifest::parse("{}", &origin()).is_err());
    }

    #[test]
    fn missing_path_is_an_error() {
        let text = r#"{"libA": {"sha": "abc"}}"#;
        assert!(Manifest::parse(text, &origin()).is_err());
    }

    #[test]
    fn dialect_for_path_follows_extension() {
        assert_eq!(
            Dialect::for_path(Path::new("syncfile.wl")),
            Dialect::Decorated
        );
        assert_eq!(Dialect::for_path(Path::new("syncfile.json")), Dialect::Json);
        assert_eq!(Dialect::for_path(Path::new("syncfile")), Dialect::Decorated);
    }

    #[test]
    fn name_width_spans_longest_name() {
        let manifest = Manifest::parse(DECORATED, &origin()).unwrap();
        assert_eq!(manifest.name_width(), 5);
    }
}
