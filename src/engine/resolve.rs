//! Incremental resolution support
//!
//! A re-index compares the file's symbols before and after extraction,
//! keyed by `(name, kind, parent-name)` so identity survives the rowid
//! reassignment of a delete-and-reinsert. The diff drives the blast
//! radius: which files' resolution rows a change may have invalidated.

use std::collections::{BTreeSet, HashMap};

use crate::store::records::{SymbolKind, SymbolRecord};

// =============================================================================
// SYMBOL DIFF
// =============================================================================

/// Identity of a symbol across re-index runs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolKey {
    pub name: String,
    pub kind: SymbolKind,
    pub parent: Option<String>,
}

/// Outcome of diffing a file's symbols across a re-index
#[derive(Debug, Default)]
pub struct SymbolDiff {
    /// Old IDs of symbols whose key disappeared
    pub removed: Vec<i64>,
    /// New IDs of symbols whose key appeared
    pub added: Vec<i64>,
    /// Old IDs of symbols present in both runs with a different signature hash
    pub changed: Vec<i64>,
}

impl SymbolDiff {
    /// Old symbol IDs whose resolution rows are unconditionally stale
    pub fn stale_ids(&self) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .removed
            .iter()
            .chain(self.changed.iter())
            .copied()
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Whether the file's exported surface grew or shrank, which widens
    /// the blast radius to every importer of the file's module.
    pub fn surface_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.changed.is_empty()
    }
}

/// Key every symbol in the slice by `(name, kind, parent-name)`.
///
/// Parent identity is by name: IDs are reassigned on every re-index, the
/// parent's name is what carries across runs.
fn key_by_identity(symbols: &[SymbolRecord]) -> HashMap<SymbolKey, &SymbolRecord> {
    let names: HashMap<i64, &str> = symbols.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut out = HashMap::with_capacity(symbols.len());
    for symbol in symbols {
        let parent = symbol
            .parent_symbol_id
            .and_then(|id| names.get(&id))
            .map(|n| n.to_string());
        out.insert(
            SymbolKey {
                name: symbol.name.clone(),
                kind: symbol.kind,
                parent,
            },
            symbol,
        );
    }
    out
}

/// Diff a file's symbols across a re-index: removed, added, changed
pub fn diff_symbols(old: &[SymbolRecord], new: &[SymbolRecord]) -> SymbolDiff {
    let old_keys = key_by_identity(old);
    let new_keys = key_by_identity(new);

    let mut diff = SymbolDiff::default();
    for (key, old_symbol) in &old_keys {
        match new_keys.get(key) {
            None => diff.removed.push(old_symbol.id),
            Some(new_symbol) if new_symbol.signature_hash != old_symbol.signature_hash => {
                diff.changed.push(old_symbol.id);
            }
            Some(_) => {}
        }
    }
    for (key, new_symbol) in &new_keys {
        if !old_keys.contains_key(key) {
            diff.added.push(new_symbol.id);
        }
    }
    diff.removed.sort_unstable();
    diff.added.sort_unstable();
    diff.changed.sort_unstable();
    diff
}

// =============================================================================
// BLAST RADIUS
// =============================================================================

/// The accumulating set of files whose resolution rows need recomputing
#[derive(Debug, Default)]
pub struct BlastRadius {
    files: BTreeSet<i64>,
}

impl BlastRadius {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file_id: i64) {
        self.files.insert(file_id);
    }

    pub fn extend(&mut self, file_ids: impl IntoIterator<Item = i64>) {
        self.files.extend(file_ids);
    }

    pub fn contains(&self, file_id: i64) -> bool {
        self.files.contains(&file_id)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_ids(&self) -> Vec<i64> {
        self.files.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::Span;

    fn symbol(id: i64, name: &str, kind: SymbolKind, parent: Option<i64>, hash: &str) -> SymbolRecord {
        SymbolRecord {
            id,
            file_id: Some(1),
            name: name.to_string(),
            kind,
            visibility: None,
            modifiers: Vec::new(),
            signature_hash: hash.to_string(),
            span: Span::new(0, 0, 1, 0),
            parent_symbol_id: parent,
        }
    }

    #[test]
    fn test_diff_no_changes() {
        let old = vec![symbol(1, "f", SymbolKind::Function, None, "aaaa")];
        let new = vec![symbol(9, "f", SymbolKind::Function, None, "aaaa")];
        let diff = diff_symbols(&old, &new);
        assert!(diff.is_empty());
        assert!(!diff.surface_changed());
    }

    #[test]
    fn test_diff_removed_and_added() {
        let old = vec![
            symbol(1, "gone", SymbolKind::Function, None, "aaaa"),
            symbol(2, "kept", SymbolKind::Function, None, "bbbb"),
        ];
        let new = vec![
            symbol(10, "kept", SymbolKind::Function, None, "bbbb"),
            symbol(11, "fresh", SymbolKind::Function, None, "cccc"),
        ];
        let diff = diff_symbols(&old, &new);
        assert_eq!(diff.removed, vec![1]);
        assert_eq!(diff.added, vec![11]);
        assert!(diff.changed.is_empty());
        assert!(diff.surface_changed());
        assert_eq!(diff.stale_ids(), vec![1]);
    }

    #[test]
    fn test_diff_changed_signature() {
        let old = vec![symbol(1, "f", SymbolKind::Function, None, "aaaa")];
        let new = vec![symbol(9, "f", SymbolKind::Function, None, "ffff")];
        let diff = diff_symbols(&old, &new);
        assert_eq!(diff.changed, vec![1]);
        assert!(diff.removed.is_empty() && diff.added.is_empty());
        // A signature change alone does not widen to importers.
        assert!(!diff.surface_changed());
    }

    #[test]
    fn test_diff_same_name_different_kind() {
        let old = vec![symbol(1, "thing", SymbolKind::Function, None, "aaaa")];
        let new = vec![symbol(9, "thing", SymbolKind::Struct, None, "aaaa")];
        let diff = diff_symbols(&old, &new);
        assert_eq!(diff.removed, vec![1]);
        assert_eq!(diff.added, vec![9]);
    }

    #[test]
    fn test_diff_parent_identity_by_name() {
        // A method keyed under its class survives the class's id change.
        let old = vec![
            symbol(1, "Widget", SymbolKind::Class, None, "aaaa"),
            symbol(2, "render", SymbolKind::Method, Some(1), "bbbb"),
        ];
        let new = vec![
            symbol(20, "Widget", SymbolKind::Class, None, "aaaa"),
            symbol(21, "render", SymbolKind::Method, Some(20), "bbbb"),
        ];
        assert!(diff_symbols(&old, &new).is_empty());

        // Same method name under a different parent is a new symbol.
        let moved = vec![
            symbol(30, "Panel", SymbolKind::Class, None, "dddd"),
            symbol(31, "render", SymbolKind::Method, Some(30), "bbbb"),
        ];
        let diff = diff_symbols(&old, &moved);
        assert!(diff.removed.contains(&2));
        assert!(diff.added.contains(&31));
    }

    #[test]
    fn test_blast_radius_dedup() {
        let mut blast = BlastRadius::new();
        blast.add(3);
        blast.add(1);
        blast.extend([3, 2]);
        assert_eq!(blast.file_ids(), vec![1, 2, 3]);
    }
}
