//! Identifier derivation
//!
//! All identifiers exposed to the renderer are derived here: PascalCase
//! conversion of XML names, package-name sanitization, and the deterministic
//! occurrence-counter scheme that keeps colliding identifiers apart.
//!
//! Determinism matters: given the same declarations in the same document
//! order, repeated compiles must assign exactly the same identifiers.

use std::collections::{HashMap, HashSet};

/// Convert an XML name to a PascalCase identifier.
///
/// Words are split on `-`, `_`, `.`, `:` and whitespace; the first letter of
/// each word is uppercased and the rest is preserved. Existing inner casing
/// is kept, so `fooBar` becomes `FooBar` and `OVAL` stays `OVAL`.
pub fn pascal_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut word_start = true;

    for c in name.chars() {
        if matches!(c, '-' | '_' | '.' | ':') || c.is_whitespace() {
            word_start = true;
        } else if word_start {
            result.extend(c.to_uppercase());
            word_start = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Sanitize a namespace prefix or file stem into a package name: `-` and `.`
/// are invalid in module identifiers and become `_`.
pub fn package_name(raw: &str) -> String {
    raw.replace(['-', '.'], "_")
}

/// Deterministic identifier deduplication within one scope.
///
/// Declarations are fed in document order. The first occurrence of an
/// identifier keeps its bare form; later occurrences get the occurrence
/// count appended, and the suffixed candidate is itself re-checked against
/// the already-taken set before being accepted.
#[derive(Debug, Default)]
pub struct IdentDeduper {
    counts: HashMap<String, u32>,
    taken: HashSet<String>,
}

impl IdentDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the final identifier for the next occurrence of `ident`,
    /// returning it together with its occurrence ordinal (1 for the first).
    pub fn assign(&mut self, ident: &str) -> (String, u32) {
        let count = self.counts.entry(ident.to_string()).or_insert(0);
        *count += 1;
        let mut ordinal = *count;

        if ordinal == 1 && !self.taken.contains(ident) {
            self.taken.insert(ident.to_string());
            return (ident.to_string(), ordinal);
        }

        // Suffixed identifiers can themselves collide with declared names;
        // bump the ordinal until the candidate is free.
        loop {
            let candidate = format!("{ident}{ordinal}");
            if self.taken.insert(candidate.clone()) {
                self.counts.insert(ident.to_string(), ordinal);
                return (candidate, ordinal);
            }
            ordinal += 1;
        }
    }
}
