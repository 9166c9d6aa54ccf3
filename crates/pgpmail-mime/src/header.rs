//! Ordered header block with case-insensitive lookup.
//!
//! Header fields keep their original wire text (including folding and
//! `\r` line endings) so a parsed entity serializes back to the same
//! bytes. Values are unfolded only when read.

// ---------------------------------------------------------------------------
// Header fields
// ---------------------------------------------------------------------------

/// A single header field as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderField {
    /// Field name without the colon, as written.
    name: String,
    /// Full field text (`Name: value`), physical lines joined with `\n`.
    raw: String,
}

impl HeaderField {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            raw: format!("{name}: {value}"),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Unfolded, trimmed value.
    fn value(&self) -> String {
        let after_colon = self.raw.split_once(':').map_or("", |(_, rest)| rest);
        after_colon
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Ordered collection of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    /// Empty header block.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Value of the first field named `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.matches(name))
            .map(HeaderField::value)
    }

    /// Whether any field named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.matches(name))
    }

    /// Replace the first field named `name` in place and drop any later
    /// duplicates, or append a new field when none exists.
    pub fn set(&mut self, name: &str, value: &str) {
        let field = HeaderField::new(name, value);
        match self.fields.iter().position(|f| f.matches(name)) {
            Some(index) => {
                let mut seen = false;
                self.fields.retain(|f| {
                    if !f.matches(name) {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                self.fields[index] = field;
            }
            None => self.fields.push(field),
        }
    }

    /// Append a field, keeping existing fields with the same name.
    pub fn add(&mut self, name: &str, value: &str) {
        self.fields.push(HeaderField::new(name, value));
    }

    /// Remove every field named `name`.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|f| !f.matches(name));
    }

    /// Iterate `(name, unfolded value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.fields.iter().map(|f| (f.name.as_str(), f.value()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the block has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field parsed from a wire line (without its trailing `\n`).
    pub(crate) fn push_raw(&mut self, name: &str, raw: &str) {
        self.fields.push(HeaderField {
            name: name.to_string(),
            raw: raw.to_string(),
        });
    }

    /// Append a folded continuation line to the last field.
    ///
    /// Returns `false` when there is no field to continue.
    pub(crate) fn continue_raw(&mut self, line: &str) -> bool {
        match self.fields.last_mut() {
            Some(field) => {
                field.raw.push('\n');
                field.raw.push_str(line);
                true
            }
            None => false,
        }
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            out.extend_from_slice(field.raw.as_bytes());
            out.push(b'\n');
        }
    }
}

// ---------------------------------------------------------------------------
// Structured values
// ---------------------------------------------------------------------------

/// Split a structured header value on `;`, ignoring separators inside
/// quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&value[start..index]);
                start = index.saturating_add(1);
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut escaped = false;
            for ch in inner.chars() {
                if ch == '\\' && !escaped {
                    escaped = true;
                    continue;
                }
                escaped = false;
                out.push(ch);
            }
            out
        }
        None => trimmed.to_string(),
    }
}

/// Lowercased media type of a `Content-Type` value (the part before `;`).
#[must_use]
pub fn media_type(value: &str) -> String {
    split_params(value)
        .first()
        .map(|main| main.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Parameter `name` of a structured header value, unquoted.
#[must_use]
pub fn parameter(value: &str, name: &str) -> Option<String> {
    split_params(value).into_iter().skip(1).find_map(|segment| {
        let (key, val) = segment.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| unquote(val))
    })
}

// ── Tests ──────────────────────────────────────────────────────────
