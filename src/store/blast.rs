//! Blast-radius primitives
//!
//! The incremental resolver needs to know which files' resolution rows a
//! change may have invalidated, and to delete rows that are unconditionally
//! stale. All four operations live on the store so they run as plain SQL
//! over the indexed columns.

use std::collections::BTreeSet;

use rusqlite::params;

use super::Store;
use crate::core::error::Result;

impl Store {
    /// Files whose resolved references point at any of the given symbols
    pub fn files_referencing_symbols(&self, symbol_ids: &[i64]) -> Result<Vec<i64>> {
        if symbol_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = BTreeSet::new();
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT r.file_id
             FROM resolved_references rr
             JOIN \"references\" r ON r.id = rr.reference_id
             WHERE rr.target_symbol_id = ?1",
        )?;
        for id in symbol_ids {
            let rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
            for row in rows {
                out.insert(row?);
            }
        }
        Ok(out.into_iter().collect())
    }

    /// Files importing the given source, by exact match or `%/source` suffix
    pub fn files_importing_source(&self, source: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT file_id FROM imports WHERE source = ?1 OR source LIKE ?2 ORDER BY file_id",
        )?;
        let rows = stmt.query_map(
            params![source, format!("%/{}", source)],
            |row| row.get::<_, i64>(0),
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Delete every resolution row that targets one of the given symbols.
    ///
    /// Used when a symbol is removed or its signature changed: any
    /// resolution row pointing at it is unconditionally stale.
    pub fn delete_resolution_data_for_symbols(&mut self, symbol_ids: &[i64]) -> Result<()> {
        if symbol_ids.is_empty() {
            return Ok(());
        }
        let deleted = {
            let tx = self.conn_mut().transaction()?;
            let mut n = 0u64;
            for id in symbol_ids {
                n += tx.execute(
                    "DELETE FROM resolved_references WHERE target_symbol_id = ?1",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM call_graph WHERE caller_symbol_id = ?1 OR callee_symbol_id = ?1",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM implementations WHERE type_symbol_id = ?1 OR interface_symbol_id = ?1",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM extension_bindings WHERE member_symbol_id = ?1 OR extended_type_symbol_id = ?1",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM reexports WHERE original_symbol_id = ?1",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM type_compositions WHERE composite_symbol_id = ?1 OR component_symbol_id = ?1",
                    params![id],
                )? as u64;
            }
            tx.commit()?;
            n
        };
        self.counters().add_deleted(deleted);
        Ok(())
    }

    /// Delete every resolution row originating from the given files.
    ///
    /// Run before resolution reruns so a re-resolved file starts clean.
    pub fn delete_resolution_data_for_files(&mut self, file_ids: &[i64]) -> Result<()> {
        if file_ids.is_empty() {
            return Ok(());
        }
        let deleted = {
            let tx = self.conn_mut().transaction()?;
            let mut n = 0u64;
            for id in file_ids {
                n += tx.execute(
                    "DELETE FROM resolved_references WHERE reference_id IN
                     (SELECT id FROM \"references\" WHERE file_id = ?1)",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM call_graph WHERE file_id = ?1 OR caller_symbol_id IN
                     (SELECT id FROM symbols WHERE file_id = ?1)",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM implementations WHERE type_symbol_id IN
                     (SELECT id FROM symbols WHERE file_id = ?1)",
                    params![id],
                )? as u64;
                n += tx.execute("DELETE FROM reexports WHERE file_id = ?1", params![id])? as u64;
                n += tx.execute(
                    "DELETE FROM extension_bindings WHERE member_symbol_id IN
                     (SELECT id FROM symbols WHERE file_id = ?1)",
                    params![id],
                )? as u64;
                n += tx.execute(
                    "DELETE FROM type_compositions WHERE composite_symbol_id IN
                     (SELECT id FROM symbols WHERE file_id = ?1)",
                    params![id],
                )? as u64;
            }
            tx.commit()?;
            n
        };
        self.counters().add_deleted(deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::*;
    use crate::store::test_support::*;

    #[test]
    fn test_files_referencing_symbols() {
        let store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");
        let fc = file(&store, "c.go", "go");

        let target = symbol(&store, fa, "Foo", SymbolKind::Function, (0, 2));
        let other = symbol(&store, fa, "Bar", SymbolKind::Function, (4, 6));

        // B references Foo, C references Bar.
        let rb = call_ref(&store, fb, "Foo", 1, 0);
        let rc = call_ref(&store, fc, "Bar", 1, 0);
        for (rid, sid) in [(rb, target), (rc, other)] {
            store
                .insert_resolved_reference(&NewResolvedReference {
                    reference_id: rid,
                    target_symbol_id: sid,
                    confidence: 1.0,
                    resolution_kind: ResolutionKind::Direct,
                })
                .unwrap();
        }

        assert_eq!(store.files_referencing_symbols(&[target]).unwrap(), vec![fb]);
        assert_eq!(
            store.files_referencing_symbols(&[target, other]).unwrap(),
            vec![fb, fc]
        );
        assert!(store.files_referencing_symbols(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_files_importing_source_suffix_rule() {
        let store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");
        let fc = file(&store, "c.go", "go");

        for (fid, source) in [
            (fa, "util"),
            (fb, "github.com/acme/util"),
            (fc, "github.com/acme/utilities"),
        ] {
            store
                .insert_import(&NewImport {
                    file_id: fid,
                    source: source.to_string(),
                    imported_name: None,
                    local_alias: None,
                    kind: ImportKind::Module,
                    scope: "file".to_string(),
                })
                .unwrap();
        }

        // Exact match and %/source suffix, but not a bare prefix.
        let hits = store.files_importing_source("util").unwrap();
        assert_eq!(hits, vec![fa, fb]);
    }

    #[test]
    fn test_delete_resolution_data_for_symbols() {
        let mut store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");

        let removed = symbol(&store, fa, "Gone", SymbolKind::Function, (0, 2));
        let kept = symbol(&store, fa, "Kept", SymbolKind::Function, (4, 6));
        let caller = symbol(&store, fb, "main", SymbolKind::Function, (0, 5));

        let r1 = call_ref(&store, fb, "Gone", 1, 0);
        let r2 = call_ref(&store, fb, "Kept", 2, 0);
        for (rid, sid) in [(r1, removed), (r2, kept)] {
            store
                .insert_resolved_reference(&NewResolvedReference {
                    reference_id: rid,
                    target_symbol_id: sid,
                    confidence: 1.0,
                    resolution_kind: ResolutionKind::Direct,
                })
                .unwrap();
        }
        store
            .insert_call_edge(&NewCallEdge {
                caller_symbol_id: caller,
                callee_symbol_id: removed,
                file_id: Some(fb),
                line: 1,
                col: 0,
            })
            .unwrap();

        store.delete_resolution_data_for_symbols(&[removed]).unwrap();

        assert!(store.resolutions_of_reference(r1).unwrap().is_empty());
        assert_eq!(store.resolutions_of_reference(r2).unwrap().len(), 1);
        assert!(store.callers_of(removed).unwrap().is_empty());
        assert!(store.counters().resolution_rows_deleted() >= 2);
    }

    #[test]
    fn test_delete_resolution_data_for_files() {
        let mut store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");

        let sa = symbol(&store, fa, "A", SymbolKind::Function, (0, 2));
        let sb = symbol(&store, fb, "B", SymbolKind::Function, (0, 2));

        // A resolution row originating from A and one from B, both targeting B.
        let ra = call_ref(&store, fa, "B", 1, 0);
        let rb = call_ref(&store, fb, "B", 1, 0);
        for rid in [ra, rb] {
            store
                .insert_resolved_reference(&NewResolvedReference {
                    reference_id: rid,
                    target_symbol_id: sb,
                    confidence: 1.0,
                    resolution_kind: ResolutionKind::Direct,
                })
                .unwrap();
        }
        store
            .insert_call_edge(&NewCallEdge {
                caller_symbol_id: sa,
                callee_symbol_id: sb,
                file_id: Some(fa),
                line: 1,
                col: 0,
            })
            .unwrap();

        store.delete_resolution_data_for_files(&[fa]).unwrap();

        // Rows originating from A are gone; B's own row survives.
        assert!(store.resolutions_of_reference(ra).unwrap().is_empty());
        assert_eq!(store.resolutions_of_reference(rb).unwrap().len(), 1);
        assert!(store.callees_of(sa).unwrap().is_empty());
    }
}
