//! The table of media types a run accepts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::AllowListError;
use super::sniff::{MODERN_WORD, MediaType, PDF};
use crate::metadata::FormatKind;

/// Canonical extension and reader kind for an accepted media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedFormat {
    /// File extension without the leading dot.
    pub extension: String,
    /// Metadata reader family.
    pub kind: FormatKind,
}

impl AllowedFormat {
    /// Creates an allow-list entry value.
    #[must_use]
    pub fn new(extension: impl Into<String>, kind: FormatKind) -> Self {
        Self {
            extension: extension.into(),
            kind,
        }
    }
}

/// Immutable mapping from media type to [`AllowedFormat`].
///
/// The legacy binary format is never present: it is always converted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    entries: HashMap<MediaType, AllowedFormat>,
}

impl Default for AllowList {
    /// PDF and the modern word-processing package.
    fn default() -> Self {
        let entries = HashMap::from([
            (MediaType::new(PDF), AllowedFormat::new("pdf", FormatKind::Pdf)),
            (
                MediaType::new(MODERN_WORD),
                AllowedFormat::new("docx", FormatKind::ModernDoc),
            ),
        ]);
        Self { entries }
    }
}

impl AllowList {
    /// Builds an allow-list from entries, validating each one.
    ///
    /// A leading dot on an extension is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllowListError`] for an empty list, empty media types,
    /// empty or path-like extensions, duplicate media types, or the legacy
    /// format.
    pub fn from_entries<I>(entries: I) -> Result<Self, AllowListError>
    where
        I: IntoIterator<Item = (MediaType, AllowedFormat)>,
    {
        let mut map = HashMap::new();
        for (media_type, mut format) in entries {
            if media_type.as_str().trim().is_empty() {
                return Err(AllowListError::EmptyMediaType);
            }
            if media_type.is_legacy_word() {
                return Err(AllowListError::LegacyFormat {
                    media_type: media_type.to_string(),
                });
            }
            let extension = format.extension.trim().trim_start_matches('.').to_string();
            if extension.is_empty() || extension.contains(['/', '\\', '.']) {
                return Err(AllowListError::InvalidExtension {
                    media_type: media_type.to_string(),
                    extension: format.extension,
                });
            }
            format.extension = extension;
            if map.contains_key(&media_type) {
                return Err(AllowListError::DuplicateMediaType {
                    media_type: media_type.to_string(),
                });
            }
            map.insert(media_type, format);
        }
        if map.is_empty() {
            return Err(AllowListError::Empty);
        }
        Ok(Self { entries: map })
    }

    /// Looks up the accepted format for a media type.
    #[must_use]
    pub fn get(&self, media_type: &MediaType) -> Option<&AllowedFormat> {
        self.entries.get(media_type)
    }

    /// Returns true if the media type is accepted.
    #[must_use]
    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.entries.contains_key(media_type)
    }

    /// Number of accepted media types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
