//! Order- and comment-preserving model of `dbinit.properties` style files
//!
//! Every source line maps to exactly one [`LineEntry`]. Contiguous comment
//! lines directly above a property are attached to that property, so moving
//! or inserting entries keeps their documentation with them.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Line separator used when rendering
pub const LINE_SEP: &str = if cfg!(windows) { "\r\n" } else { "\n" };

fn property_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*([^#\s][^=]*)=(.*)$").expect("valid regex"))
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)(?:\..*)?$").expect("valid regex"))
}

/// Namespace of a property key, derived from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupType {
    /// `pre.Class<N>` entries
    Pre,
    /// `Class<N>` entries
    Main,
    /// `post.Class<N>` entries
    Post,
    /// Keys matching none of the prefixes above
    Unknown,
}

impl GroupType {
    /// Groups in detection order
    pub const ALL: [GroupType; 4] = [
        GroupType::Pre,
        GroupType::Main,
        GroupType::Post,
        GroupType::Unknown,
    ];

    pub fn prefix(self) -> Option<&'static str> {
        match self {
            GroupType::Pre => Some("pre.Class"),
            GroupType::Main => Some("Class"),
            GroupType::Post => Some("post.Class"),
            GroupType::Unknown => None,
        }
    }

    /// Classify `key` by the first group whose prefix it starts with
    pub fn from_key(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|group| group.prefix().is_some_and(|prefix| key.starts_with(prefix)))
            .unwrap_or(GroupType::Unknown)
    }

    /// The group whose entries conventionally follow this one
    fn successor(self) -> Option<Self> {
        match self {
            GroupType::Pre => Some(GroupType::Main),
            GroupType::Main => Some(GroupType::Post),
            GroupType::Post | GroupType::Unknown => None,
        }
    }
}

/// A `key=value` line together with the comment block directly above it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    /// 1-based line number of the `key=value` line
    pub line_number: usize,
    pub group: GroupType,
    /// First integer group of the key (`pre.Class12.sub` → 12), 0 when absent
    pub id: u32,
    pub key: String,
    pub value: String,
    /// Preceding comment lines, trimmed
    pub comments: Vec<String>,
}

impl PropertyEntry {
    fn rendered_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.comments
            .iter()
            .cloned()
            .chain(std::iter::once(format!("{}={}", self.key, self.value)))
    }

    /// Rendered text: comments on their own lines, then `key=value`
    pub fn text(&self) -> String {
        self.rendered_lines().collect::<Vec<_>>().join(LINE_SEP)
    }
}

/// One classified line of a property file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEntry {
    Blank { line_number: usize },
    Comment { line_number: usize, text: String },
    Property(PropertyEntry),
}

impl LineEntry {
    pub fn line_number(&self) -> usize {
        match self {
            LineEntry::Blank { line_number } | LineEntry::Comment { line_number, .. } => {
                *line_number
            }
            LineEntry::Property(entry) => entry.line_number,
        }
    }

    pub fn text(&self) -> String {
        match self {
            LineEntry::Blank { .. } => String::new(),
            LineEntry::Comment { text, .. } => text.clone(),
            LineEntry::Property(entry) => entry.text(),
        }
    }

    pub fn as_property(&self) -> Option<&PropertyEntry> {
        match self {
            LineEntry::Property(entry) => Some(entry),
            _ => None,
        }
    }

    /// Number of physical lines this entry renders to
    fn line_span(&self) -> usize {
        match self {
            LineEntry::Property(entry) => entry.comments.len() + 1,
            _ => 1,
        }
    }
}

/// Parsed property file with per-group lookup projections
#[derive(Debug, Clone, Default)]
pub struct PropertyFile {
    entries: Vec<LineEntry>,
    first: BTreeMap<GroupType, usize>,
    highest: BTreeMap<GroupType, usize>,
}

impl PropertyFile {
    /// Parse `lines` into entries; never fails
    ///
    /// Lines that are neither blank, comments nor `key=value` pairs are kept as
    /// comments.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut entries = Vec::with_capacity(lines.len());
        let mut buffer: Vec<(usize, String)> = Vec::new();

        fn flush(buffer: &mut Vec<(usize, String)>, entries: &mut Vec<LineEntry>) {
            entries.extend(
                buffer
                    .drain(..)
                    .map(|(line_number, text)| LineEntry::Comment { line_number, text }),
            );
        }

        for (index, raw) in lines.iter().enumerate() {
            let line_number = index + 1;
            let line = raw.as_ref();
            let trimmed = line.trim();

            if trimmed.is_empty() {
                flush(&mut buffer, &mut entries);
                entries.push(LineEntry::Blank { line_number });
            } else if trimmed.starts_with('#') || trimmed.starts_with(';') {
                buffer.push((line_number, trimmed.to_string()));
            } else if let Some(captures) = property_pattern().captures(line) {
                let key = captures[1].trim().to_string();
                let value = captures[2].trim().to_string();
                let entry = PropertyEntry {
                    line_number,
                    group: GroupType::from_key(&key),
                    id: extract_id(&key),
                    key,
                    value,
                    comments: buffer.drain(..).map(|(_, text)| text).collect(),
                };
                entries.push(LineEntry::Property(entry));
            } else {
                debug!(line_number, "unrecognized property line kept as comment");
                flush(&mut buffer, &mut entries);
                entries.push(LineEntry::Comment {
                    line_number,
                    text: trimmed.to_string(),
                });
            }
        }
        flush(&mut buffer, &mut entries);

        let mut file = Self {
            entries,
            ..Self::default()
        };
        file.rebuild_projections();
        file
    }

    /// Parse file content, splitting on any line ending
    pub fn parse_str(content: &str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        Self::parse(&lines)
    }

    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyEntry> {
        self.entries.iter().filter_map(LineEntry::as_property)
    }

    /// First property entry seen for `group`
    pub fn first_entry(&self, group: GroupType) -> Option<&PropertyEntry> {
        self.first
            .get(&group)
            .and_then(|&index| self.entries[index].as_property())
    }

    /// Property entry with the highest id for `group`; the earliest wins on ties
    pub fn highest_id_entry(&self, group: GroupType) -> Option<&PropertyEntry> {
        self.highest
            .get(&group)
            .and_then(|&index| self.entries[index].as_property())
    }

    /// Whether any property value or key contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.properties()
            .any(|entry| entry.value.contains(needle) || entry.key.contains(needle))
    }

    /// Insert a new property into `group` at its conventional position
    ///
    /// The new id is the highest id of the group plus one, or 0 for an empty
    /// group. The entry goes right after the highest-id entry of the group;
    /// without one, right before the first entry of the following group
    /// (`pre` before `Class`, `Class` before `post`); otherwise at the end.
    /// Returns the inserted entry, or `None` for [`GroupType::Unknown`] which
    /// has no key prefix.
    pub fn insert_entry(
        &mut self,
        group: GroupType,
        value: &str,
        comments: Vec<String>,
    ) -> Option<&PropertyEntry> {
        let prefix = group.prefix()?;
        let highest = self.highest.get(&group).copied();
        let id = highest
            .and_then(|index| self.entries[index].as_property())
            .map_or(0, |entry| entry.id + 1);

        let index = match highest {
            Some(index) => index + 1,
            None => group
                .successor()
                .and_then(|next| self.first.get(&next).copied())
                .unwrap_or(self.entries.len()),
        };

        debug!(?group, id, index, "inserting property entry");
        self.entries.insert(
            index,
            LineEntry::Property(PropertyEntry {
                line_number: 0,
                group,
                id,
                key: format!("{}{}", prefix, id),
                value: value.to_string(),
                comments,
            }),
        );
        self.renumber();
        self.rebuild_projections();
        self.entries[index].as_property()
    }

    /// Rendered physical lines, in order
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                LineEntry::Property(property) => lines.extend(property.rendered_lines()),
                other => lines.push(other.text()),
            }
        }
        lines
    }

    /// File content with a trailing line separator
    pub fn render(&self) -> String {
        let mut content = self.to_lines().join(LINE_SEP);
        if !content.is_empty() {
            content.push_str(LINE_SEP);
        }
        content
    }

    fn renumber(&mut self) {
        let mut next = 1;
        for entry in &mut self.entries {
            let span = entry.line_span();
            let own_line = next + span - 1;
            match entry {
                LineEntry::Blank { line_number } | LineEntry::Comment { line_number, .. } => {
                    *line_number = own_line
                }
                LineEntry::Property(property) => property.line_number = own_line,
            }
            next += span;
        }
    }

    fn rebuild_projections(&mut self) {
        self.first.clear();
        self.highest.clear();
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(property) = entry.as_property() else {
                continue;
            };
            self.first.entry(property.group).or_insert(index);
            let replace = match self.highest.get(&property.group) {
                Some(&current) => self.entries[current]
                    .as_property()
                    .is_some_and(|existing| property.id > existing.id),
                None => true,
            };
            if replace {
                self.highest.insert(property.group, index);
            }
        }
    }
}

fn extract_id(key: &str) -> u32 {
    id_pattern()
        .captures(key)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}
