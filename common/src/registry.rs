use serde::Deserialize;

use crate::webcam::INDEX_PLACEHOLDER;

/// One webcam as declared in the config file: a stable name and the URL
/// template its numbered images are served under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebcamEntry {
    pub name: String,
    pub url_template: String,
}

/// The set of webcams for a resort, in declaration order.
///
/// Names are unique and every template carries exactly one index
/// placeholder; both are enforced at construction so the scraper and the
/// store never see a malformed entry.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<WebcamEntry>,
}

impl Registry {
    pub fn from_entries(entries: Vec<WebcamEntry>) -> Result<Self, RegistryError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(RegistryError::DuplicateName {
                    webcam: entry.name.clone(),
                });
            }
            match entry.url_template.matches(INDEX_PLACEHOLDER).count() {
                1 => {}
                0 => {
                    return Err(RegistryError::MissingPlaceholder {
                        webcam: entry.name.clone(),
                    })
                }
                _ => {
                    return Err(RegistryError::ExtraPlaceholder {
                        webcam: entry.name.clone(),
                    })
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &WebcamEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&WebcamEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate webcam name in registry: {webcam}")]
    DuplicateName { webcam: String },
    #[error("url template for webcam {webcam} has no index placeholder")]
    MissingPlaceholder { webcam: String },
    #[error("url template for webcam {webcam} has more than one index placeholder")]
    ExtraPlaceholder { webcam: String },
}
