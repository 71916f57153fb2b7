/// Placeholder in a URL template that an image index is substituted for.
pub const INDEX_PLACEHOLDER: &str = "{}";

/// A webcam record as persisted in the store.
///
/// `last_index` is the highest image index confirmed for this webcam by a
/// direct fetch; a scrape overwrites it with whatever the index page
/// currently references, which may move backwards if the resort's own
/// counter resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webcam {
    /// Row id, `None` until the record has been persisted.
    pub id: Option<i64>,
    pub name: String,
    pub url_template: String,
    pub last_index: u64,
    /// Unix millis of the last scrape that wrote this record.
    pub scraped_at_ms: Option<i64>,
}

impl Webcam {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            url_template: url_template.into(),
            last_index: 0,
            scraped_at_ms: None,
        }
    }

    /// The image URL for a specific index.
    pub fn format_url(&self, index: u64) -> String {
        self.url_template
            .replacen(INDEX_PLACEHOLDER, &index.to_string(), 1)
    }

    /// The image URL for the newest index known for this webcam.
    pub fn current_image_url(&self) -> String {
        self.format_url(self.last_index)
    }

    /// Template text before the index placeholder, or `None` when the
    /// template carries no placeholder at all.
    pub fn url_prefix(&self) -> Option<&str> {
        self.url_template
            .find(INDEX_PLACEHOLDER)
            .map(|at| &self.url_template[..at])
    }

    /// Record a successful direct fetch at `index`. Never decreases
    /// `last_index`.
    pub fn note_fetched(&mut self, index: u64) {
        self.last_index = index.max(self.last_index);
    }
}
