//! Unique filename resolution against a registry of already-assigned names.

use std::collections::HashSet;

use crate::constants::LABEL_SEPARATOR;

/// Case-insensitive registry of filenames assigned so far.
///
/// Rebuilt fresh for every merge from the completed records, then updated as
/// each new name is resolved so later resolutions in the same merge see
/// earlier reservations.
#[derive(Debug, Default, Clone)]
pub struct UsedNames {
    lowered: HashSet<String>,
}

impl UsedNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut used = Self::default();
        for name in names {
            used.insert(name.as_ref());
        }
        used
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lowered.contains(&name.to_lowercase())
    }

    pub fn insert(&mut self, name: &str) -> bool {
        self.lowered.insert(name.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lowered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lowered.is_empty()
    }
}

/// Build `english--chinese--domain{extension}` and make it unique.
///
/// Collisions append an increasing `_N` suffix immediately before the
/// extension. The chosen name is registered before returning, so it is never
/// present (case-insensitively) in the registry handed to the next call.
pub fn resolve_unique_name(
    english: &str,
    chinese: &str,
    domain: &str,
    extension: &str,
    used: &mut UsedNames,
) -> String {
    let base = format!("{english}{LABEL_SEPARATOR}{chinese}{LABEL_SEPARATOR}{domain}");
    let candidate = format!("{base}{extension}");
    if !used.contains(&candidate) {
        used.insert(&candidate);
        return candidate;
    }

    let mut counter = 1usize;
    loop {
        let candidate = format!("{base}_{counter}{extension}");
        if !used.contains(&candidate) {
            used.insert(&candidate);
            return candidate;
        }
        counter += 1;
    }
}

/// Split a filename into `(stem, extension)`.
///
/// The extension keeps its leading dot and is empty when the name has none;
/// leading-dot files and names ending in a dot have no extension, matching
/// `Path::extension`.
#[must_use]
pub fn split_extension(original: &str) -> (&str, &str) {
    match original.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < original.len() => (&original[..idx], &original[idx..]),
        _ => (original, ""),
    }
}
