//! Identifier validation and table-name suggestions

use std::collections::HashSet;

use indexmap::IndexMap;
use sqlparser::keywords::{
    ALL_KEYWORDS, ALL_KEYWORDS_INDEX, RESERVED_FOR_COLUMN_ALIAS, RESERVED_FOR_TABLE_ALIAS,
};

use crate::error::{Diagnostic, DiagnosticKind, Error, IdentifierKind, Result};
use crate::schema::Catalog;

/// Longest identifier accepted for any dialect
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Check that `value` is a plain SQL identifier and return it lower-cased.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to 63 characters that is not a
/// reserved keyword.
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let name = value.trim();
    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(invalid("must be at most 63 characters"));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid("must start with a letter or underscore"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and underscores"));
    }
    if is_reserved_keyword(name) {
        return Err(invalid("is a reserved SQL keyword"));
    }

    Ok(name.to_lowercase())
}

/// Whether a word cannot be used unquoted as a table or column name
pub fn is_reserved_keyword(word: &str) -> bool {
    let upper = word.to_uppercase();
    match ALL_KEYWORDS.binary_search(&upper.as_str()) {
        Ok(index) => {
            let keyword = ALL_KEYWORDS_INDEX[index];
            RESERVED_FOR_TABLE_ALIAS.contains(&keyword)
                || RESERVED_FOR_COLUMN_ALIAS.contains(&keyword)
        }
        Err(_) => false,
    }
}

/// Derive an identifier from arbitrary text such as a file name or header.
///
/// Runs of characters outside `[a-z0-9_]` become one underscore, a leading
/// digit gets a `t_` prefix, and the result is lower-case and never empty.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.trim().to_lowercase().chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }

    let mut name = name.trim_matches('_').to_string();
    if name.is_empty() {
        name = "unnamed".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "t_");
    }
    name.truncate(MAX_IDENTIFIER_LENGTH);
    name
}

/// Proposes table names for source files.
///
/// The result is positional: entry `i` names `file_names[i]`. Missing entries
/// keep the file-derived name. Suggestions are untrusted and get validated.
pub trait NamingSuggester {
    fn suggest_names(&self, file_names: &[String]) -> Result<Vec<String>>;
}

impl<F> NamingSuggester for F
where
    F: Fn(&[String]) -> Result<Vec<String>>,
{
    fn suggest_names(&self, file_names: &[String]) -> Result<Vec<String>> {
        self(file_names)
    }
}

/// Names taken from a fixed map of file name (or file stem) to table name
#[derive(Debug, Clone, Default)]
pub struct ConfiguredNames {
    names: IndexMap<String, String>,
}

impl ConfiguredNames {
    pub fn new(names: IndexMap<String, String>) -> Self {
        let names = names
            .into_iter()
            .map(|(file, table)| (file.to_lowercase(), table))
            .collect();
        Self { names }
    }

    fn lookup(&self, file_name: &str) -> Option<&String> {
        let file_name = file_name.to_lowercase();
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name.as_str(), |(stem, _)| stem);
        self.names
            .get(&file_name)
            .or_else(|| self.names.get(stem))
    }
}

impl NamingSuggester for ConfiguredNames {
    fn suggest_names(&self, file_names: &[String]) -> Result<Vec<String>> {
        Ok(file_names
            .iter()
            .map(|file| match self.lookup(file) {
                Some(name) => name.clone(),
                None => sanitize_identifier(
                    file.rsplit_once('.').map_or(file.as_str(), |(stem, _)| stem),
                ),
            })
            .collect())
    }
}

/// `base`, or `base` with the smallest `_N` suffix (N >= 2) that is not taken
pub fn unique_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2usize..)
        .map(|n| {
            let suffix = format!("_{n}");
            let mut stem = base.to_string();
            while stem.len() + suffix.len() > MAX_IDENTIFIER_LENGTH {
                stem.pop();
            }
            stem + &suffix
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Rename catalog tables from a suggester's proposals.
///
/// A suggestion that is missing, invalid or already taken falls back to the
/// file-derived name, suffixed when an earlier table already claimed it. If
/// the suggester fails, every table keeps its name.
pub fn apply_suggestions(catalog: &mut Catalog, suggester: &dyn NamingSuggester) -> Vec<Diagnostic> {
    let files: Vec<String> = catalog
        .tables
        .values()
        .map(|t| t.source_file.clone())
        .collect();

    let suggestions = match suggester.suggest_names(&files) {
        Ok(suggestions) => suggestions,
        Err(err) => {
            tracing::warn!("Naming suggester failed, keeping file names: {}", err);
            return vec![Diagnostic::warning(
                DiagnosticKind::NameFallback,
                format!("naming suggester failed, keeping file names: {err}"),
            )];
        }
    };

    let mut diagnostics = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();

    for (index, table) in catalog.tables.values_mut().enumerate() {
        let chosen = match suggestions.get(index) {
            Some(raw) => validate_identifier(IdentifierKind::Table, raw).map_err(|e| e.to_string()),
            None => Err(format!("no name suggested for '{}'", table.source_file)),
        }
        .and_then(|name| {
            if taken.contains(&name) {
                Err(format!("'{name}' is already used by another table"))
            } else {
                Ok(name)
            }
        });

        match chosen {
            Ok(name) => {
                table.rename(&name);
                taken.insert(name);
            }
            Err(reason) => {
                let fallback = unique_name(&table.original_name, |name| taken.contains(name));
                tracing::warn!(
                    "Keeping name {} for {}: {}",
                    fallback,
                    table.source_file,
                    reason
                );
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::NameFallback,
                        format!("kept name '{}' for '{}': {}", fallback, table.source_file, reason),
                    )
                    .with_table(&fallback),
                );
                table.rename(&fallback);
                taken.insert(fallback);
            }
        }
    }

    diagnostics
}
