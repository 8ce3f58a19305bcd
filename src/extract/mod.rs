//! Markup fragment extraction.
//!
//! Upstream embeds each logical result as an HTML fragment of repeated
//! label/value rows. This module turns one fragment into an ordered
//! [`FieldRecord`], keeping the parsing strategy isolated from the protocol
//! state machine so it can be swapped without touching the orchestrator.

pub mod sanitize;

pub use sanitize::{clean_text, normalize_key};

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::ser::{Serialize, SerializeMap, Serializer};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.row").unwrap());
static LABEL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.label").unwrap());
static VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.value").unwrap());

/// Ordered sequence of records, one per markup fragment, in response order.
pub type ResultSet = Vec<FieldRecord>;

/// Ordered field mapping extracted from one markup fragment.
///
/// Insertion order follows row order in the fragment. Upstream labels are
/// expected to be unique; if a duplicate key does appear, the later row
/// overwrites the earlier value in place, so the last occurrence wins while
/// the first occurrence keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    fields: Vec<(String, String)>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field.
    pub fn insert(&mut self, key: String, value: String) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FieldRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Parse one markup fragment into a record.
///
/// Each `div.row` contributes one field: the label and value texts are the
/// row's descendant text joined with single spaces, cleaned by
/// [`clean_text`], and the key is the label run through [`normalize_key`].
/// Rows whose key cleans down to empty are skipped. A row missing its value
/// element stores the empty string.
pub fn extract_fields(fragment_html: &str) -> FieldRecord {
    let document = Html::parse_fragment(fragment_html);
    let mut record = FieldRecord::new();

    for row in document.select(&ROW_SELECTOR) {
        let label = row
            .select(&LABEL_SELECTOR)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let value = row
            .select(&VALUE_SELECTOR)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let key = normalize_key(&clean_text(&label));
        if key.is_empty() {
            continue;
        }
        record.insert(key, clean_text(&value));
    }

    record
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}
