//! # Sectioned Catalog
//!
//! The pure merge that folds a page of characters into the accumulated
//! catalog: identity dedup (last write wins), first-letter grouping, and
//! collated section ordering.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::character::{Character, CharacterId};

/// Characters sharing a first-letter grouping key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub characters: Vec<Character>,
}

/// Ordered sections; every id appears at most once across the whole catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    sections: Vec<Section>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// All characters in section order
    pub fn flatten(&self) -> impl Iterator<Item = &Character> {
        self.sections.iter().flat_map(|s| s.characters.iter())
    }

    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.flatten().find(|c| c.id == id)
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.get(id).is_some()
    }

    /// Number of characters
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.characters.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Grouping key: the uppercase form of the first character of `name`
pub fn section_key(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

/// Base letter for the accented Latin-1 letters, so `É` sorts next to `E`
fn fold_accent(c: char) -> char {
    match c {
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

fn collation_key(s: &str) -> String {
    s.to_lowercase().chars().map(fold_accent).collect()
}

/// Locale-style title ordering: symbols, then digits, then letters. Letters
/// compare case- and accent-insensitively first, then by lowercase form, then
/// by raw code point.
pub fn collate(a: &str, b: &str) -> Ordering {
    let class = |s: &str| s.chars().next().map(char_class).unwrap_or(0);

    class(a)
        .cmp(&class(b))
        .then_with(|| collation_key(a).cmp(&collation_key(b)))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Fold `incoming` into `existing`.
///
/// With a `filter`, incoming characters whose name does not contain it
/// (case-insensitively) are dropped first. A duplicate id keeps the position
/// where it was first seen and takes the later value. Within a section,
/// characters follow that identity order; there is no secondary sort.
pub fn merge(existing: &Catalog, incoming: Vec<Character>, filter: Option<&str>) -> Catalog {
    let needle = filter.map(str::to_lowercase);

    let mut by_id: IndexMap<CharacterId, Character> = IndexMap::new();
    for character in existing.flatten() {
        by_id.insert(character.id, character.clone());
    }
    for character in incoming {
        if let Some(needle) = &needle {
            if !character.name.to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        by_id.insert(character.id, character);
    }

    let mut grouped: IndexMap<String, Vec<Character>> = IndexMap::new();
    for character in by_id.into_values() {
        grouped
            .entry(section_key(&character.name))
            .or_default()
            .push(character);
    }

    let mut sections: Vec<Section> = grouped
        .into_iter()
        .map(|(title, characters)| Section { title, characters })
        .collect();
    sections.sort_by(|a, b| collate(&a.title, &b.title));

    Catalog { sections }
}
