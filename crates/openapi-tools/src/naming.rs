//! Operation and tool naming.
//!
//! Operation ids are normalized to camelCase, tool names are derived from them in snake_case.
//! Duplicate detection is done on the normalized form, so `getPet` and `get_pet` collide.

use crate::error::{OpenApiToolsError, Result};
use crate::operation::HttpMethod;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Runs of anything outside `[A-Za-z0-9]`, non-ASCII letters included.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("NON_WORD pattern is valid"));

/// Synthesize an operation id for an operation without one, e.g. `get_pets_petId`.
#[must_use]
pub fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
    let raw = format!("{}_{}", method.as_str(), path);
    NON_WORD.replace_all(&raw, "_").trim_matches('_').to_string()
}

/// Split an identifier into ASCII words.
///
/// Boundaries are [`NON_WORD`] runs, a lowercase letter or digit followed by an uppercase
/// letter, and the last capital of an acronym followed by a lowercase letter
/// (`HTTPServer` -> `HTTP`, `Server`). Digits stay attached to the preceding word.
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in NON_WORD.split(input).filter(|c| !c.is_empty()) {
        let bytes = chunk.as_bytes();
        let mut start = 0;
        for i in 1..bytes.len() {
            let (prev, c) = (bytes[i - 1], bytes[i]);
            if !c.is_ascii_uppercase() {
                continue;
            }
            let next_is_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                words.push(chunk[start..i].to_string());
                start = i;
            }
        }
        words.push(chunk[start..].to_string());
    }
    words
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `get_pets_petId` -> `getPetsPetId`.
#[must_use]
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, word) in split_words(input).iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// `getPetsPetId` -> `get_pets_pet_id`.
#[must_use]
pub fn snake_case(input: &str) -> String {
    split_words(input)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Tool name for an operation name, optionally prefixed with the origin's own name.
///
/// The prefix is skipped when the name already starts with it.
#[must_use]
pub fn tool_name(operation_name: &str, prefix: Option<&str>) -> String {
    let name = snake_case(operation_name);
    let Some(prefix) = prefix.map(snake_case).filter(|p| !p.is_empty()) else {
        return name;
    };
    if name == prefix || name.starts_with(&format!("{prefix}_")) {
        name
    } else {
        format!("{prefix}_{name}")
    }
}

/// Operation names seen so far in one resolution.
#[derive(Debug, Default)]
pub struct OperationNames {
    /// Lowercased operation name -> label of the operation that claimed it.
    seen: HashMap<String, String>,
}

impl OperationNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for the operation at `label`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::DuplicateOperation`] if an operation with the same
    /// normalized name was already claimed.
    pub fn claim(&mut self, name: &str, label: &str) -> Result<()> {
        let key = name.to_lowercase();
        if let Some(previous) = self.seen.get(&key) {
            return Err(OpenApiToolsError::DuplicateOperation {
                label: label.to_string(),
                name: name.to_string(),
                previous: previous.clone(),
            });
        }
        self.seen.insert(key, label.to_string());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
