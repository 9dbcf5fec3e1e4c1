//! Indexing engine
//!
//! Orchestrates the two-phase pipeline: enumerate files, detect change by
//! content hash, replace stale rows, run the per-language extraction
//! script, then run resolution restricted to the accumulated blast
//! radius. Supports a strictly serial path and a three-phase parallel
//! path (serial prepare, parallel extract into per-worker batches, serial
//! commit).

pub mod resolve;

pub use resolve::{diff_symbols, BlastRadius, SymbolDiff};

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ignore::WalkBuilder;
use parking_lot::Mutex;
use xxhash_rust::xxh3::xxh3_64;

use crate::core::error::{Error, Result};
use crate::core::CancelToken;
use crate::parse::{Language, ALL_LANGUAGES};
use crate::script::{ScriptAssets, ScriptHost};
use crate::store::records::NewFile;
use crate::store::{RowBatch, Store, SymbolRecord};

// =============================================================================
// OPTIONS AND REPORT
// =============================================================================

/// Engine configuration, set once per run from the CLI
#[derive(Debug, Default, Clone)]
pub struct EngineOptions {
    /// Restrict indexing to these languages; None means all supported
    pub languages: Option<HashSet<Language>>,
    /// Load scripts from disk instead of the embedded tree
    pub scripts_dir: Option<PathBuf>,
    /// Re-extract files even when the content hash is unchanged
    pub force: bool,
    /// Use the three-phase parallel pipeline
    pub parallel: bool,
    /// Worker count override for the parallel pipeline
    pub workers: Option<usize>,
}

/// Aggregate outcome of an indexing run.
///
/// Per-file errors are recorded, not propagated; the caller gets counts
/// plus the first error message.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub indexed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deleted: usize,
    pub resolved_files: usize,
    pub first_error: Option<String>,
}

impl IndexReport {
    fn record_failure(&mut self, err: &Error) {
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(err.to_string());
        }
    }
}

/// Per-file outcome inside a run
enum FileOutcome {
    Indexed,
    Unchanged,
    Skipped,
}

/// Phase A product: a file ready for parallel extraction
struct WorkItem {
    rel_path: String,
    language: Language,
    file_id: i64,
    old_symbols: Vec<SymbolRecord>,
}

enum Prepared {
    Item(WorkItem),
    Unchanged,
    Skipped,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The indexing engine. One instance per run; owns the store handle.
pub struct Engine {
    store: Rc<RefCell<Store>>,
    root: PathBuf,
    options: EngineOptions,
    assets: ScriptAssets,
    cancel: CancelToken,
}

impl Engine {
    pub fn new(store: Store, root: PathBuf, options: EngineOptions) -> Result<Self> {
        let assets = match &options.scripts_dir {
            Some(dir) => ScriptAssets::from_dir(dir)?,
            None => ScriptAssets::embedded(),
        };
        Ok(Self {
            store: Rc::new(RefCell::new(store)),
            root,
            options,
            assets,
            cancel: CancelToken::new(),
        })
    }

    /// Token shared with callers that want to cancel mid-run
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shared store handle (used by tests and the resolve phase)
    pub fn store(&self) -> Rc<RefCell<Store>> {
        Rc::clone(&self.store)
    }

    /// Walk the root, classify by extension, index everything that matches,
    /// and prune store entries whose files disappeared.
    pub fn index_directory(&self) -> Result<IndexReport> {
        let paths = self.collect_files()?;
        if self.options.parallel {
            self.index_paths_parallel(&paths, false)
        } else {
            self.index_paths(&paths, false)
        }
    }

    /// Serial pipeline over an explicit set of paths
    pub fn index_files(&self, paths: &[PathBuf]) -> Result<IndexReport> {
        self.index_paths(paths, true)
    }

    /// Three-phase parallel pipeline over an explicit set of paths
    pub fn index_files_parallel(&self, paths: &[PathBuf]) -> Result<IndexReport> {
        self.index_paths_parallel(paths, true)
    }

    // =========================================================================
    // SERIAL PIPELINE
    // =========================================================================

    fn index_paths(&self, paths: &[PathBuf], explicit: bool) -> Result<IndexReport> {
        let host = ScriptHost::new(self.assets.clone(), self.root.clone(), self.cancel.clone())?;
        let mut report = IndexReport::default();
        let mut blast = BlastRadius::new();

        for path in paths {
            self.cancel.check()?;
            match self.index_one(&host, path, &mut blast) {
                Ok(FileOutcome::Indexed) => report.indexed += 1,
                Ok(FileOutcome::Unchanged) => report.unchanged += 1,
                Ok(FileOutcome::Skipped) => report.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "indexing failed, skipping file");
                    report.record_failure(&e);
                }
            }
        }

        if !explicit {
            report.deleted = self.prune_missing(paths, &mut blast)?;
        }

        report.resolved_files = self.resolve_blast(&host, blast)?;
        Ok(report)
    }

    fn index_one(
        &self,
        host: &ScriptHost,
        path: &Path,
        blast: &mut BlastRadius,
    ) -> Result<FileOutcome> {
        let item = match self.prepare_one(path)? {
            Prepared::Item(item) => item,
            Prepared::Unchanged => return Ok(FileOutcome::Unchanged),
            Prepared::Skipped => return Ok(FileOutcome::Skipped),
        };

        let batch = Rc::new(RefCell::new(RowBatch::new()));
        let run = host.run_extract(
            item.language,
            &item.rel_path,
            item.file_id,
            Rc::clone(&batch),
        );
        if let Err(e) = run {
            // Drop the file row so the next run retries instead of seeing a
            // matching content hash over an empty extraction.
            self.store.borrow().delete_file_row(item.file_id)?;
            return Err(e);
        }

        let rows = std::mem::take(&mut *batch.borrow_mut());
        if let Err(e) = self.store.borrow_mut().commit_batch(rows) {
            self.store.borrow().delete_file_row(item.file_id)?;
            return Err(e);
        }

        self.finish_file(&item, blast)?;
        Ok(FileOutcome::Indexed)
    }

    // =========================================================================
    // PARALLEL PIPELINE
    // =========================================================================

    fn index_paths_parallel(&self, paths: &[PathBuf], explicit: bool) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        let mut blast = BlastRadius::new();

        // Phase A (serial): hash-check, delete stale rows, insert file rows,
        // capture old symbols.
        let mut items = Vec::new();
        for path in paths {
            self.cancel.check()?;
            match self.prepare_one(path) {
                Ok(Prepared::Item(item)) => items.push(item),
                Ok(Prepared::Unchanged) => report.unchanged += 1,
                Ok(Prepared::Skipped) => report.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "prepare failed, skipping file");
                    report.record_failure(&e);
                }
            }
        }

        // Phase B (parallel): workers drain the item list, each with its own
        // runtime and staging batch. No worker touches the real store.
        let results = self.run_extraction_workers(&items);

        // Phase C (serial): commit batches in the main thread, then diff and
        // accumulate the blast radius per file.
        for (item, result) in items.iter().zip(results.into_iter()) {
            if self.cancel.is_cancelled() {
                self.store.borrow().delete_file_row(item.file_id)?;
                continue;
            }
            match result {
                None => {
                    // Worker never reached this item (cancellation).
                    self.store.borrow().delete_file_row(item.file_id)?;
                }
                Some(Err(e)) => {
                    tracing::warn!(path = %item.rel_path, error = %e, "extraction failed, skipping file");
                    self.store.borrow().delete_file_row(item.file_id)?;
                    report.record_failure(&e);
                }
                Some(Ok(rows)) => {
                    let commit_result = self.store.borrow_mut().commit_batch(rows);
                    match commit_result {
                        Ok(_) => {
                            self.finish_file(item, &mut blast)?;
                            report.indexed += 1;
                        }
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            tracing::warn!(path = %item.rel_path, error = %e, "batch commit failed, skipping file");
                            self.store.borrow().delete_file_row(item.file_id)?;
                            report.record_failure(&e);
                        }
                    }
                }
            }
        }
        self.cancel.check()?;

        if !explicit {
            report.deleted = self.prune_missing(paths, &mut blast)?;
        }

        let host = ScriptHost::new(self.assets.clone(), self.root.clone(), self.cancel.clone())?;
        report.resolved_files = self.resolve_blast(&host, blast)?;
        Ok(report)
    }

    /// Fan extraction out over `min(cpu, items)` workers. Returns one slot
    /// per item, in item order; `None` means no worker reached it.
    fn run_extraction_workers(&self, items: &[WorkItem]) -> Vec<Option<Result<RowBatch>>> {
        let mut slots: Vec<Option<Result<RowBatch>>> = Vec::with_capacity(items.len());
        slots.resize_with(items.len(), || None);
        if items.is_empty() {
            return slots;
        }

        let workers = self
            .options
            .workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .min(items.len())
            .max(1);

        let results = Mutex::new(slots);
        let next = AtomicUsize::new(0);
        let assets = self.assets.clone();
        let root = self.root.clone();
        let cancel = self.cancel.clone();

        rayon::scope(|scope| {
            for _ in 0..workers {
                let assets = assets.clone();
                let root = root.clone();
                let cancel = cancel.clone();
                let results = &results;
                let next = &next;
                scope.spawn(move |_| {
                    let host = match ScriptHost::new(assets, root, cancel.clone()) {
                        Ok(host) => host,
                        Err(e) => {
                            tracing::error!(error = %e, "worker failed to build script host");
                            return;
                        }
                    };
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        if i >= items.len() {
                            break;
                        }
                        let item = &items[i];
                        let batch = Rc::new(RefCell::new(RowBatch::new()));
                        let outcome = host
                            .run_extract(
                                item.language,
                                &item.rel_path,
                                item.file_id,
                                Rc::clone(&batch),
                            )
                            .map(|_| std::mem::take(&mut *batch.borrow_mut()));
                        results.lock()[i] = Some(outcome);
                    }
                });
            }
        });

        results.into_inner()
    }

    // =========================================================================
    // SHARED PER-FILE STEPS
    // =========================================================================

    /// Steps 1-5 of the per-file pipeline: classify, hash-check, capture old
    /// symbols, delete stale rows, insert the new file row.
    fn prepare_one(&self, path: &Path) -> Result<Prepared> {
        let Some(language) = Language::from_path(path) else {
            return Ok(Prepared::Skipped);
        };
        if let Some(filter) = &self.options.languages {
            if !filter.contains(&language) {
                return Ok(Prepared::Skipped);
            }
        }

        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let rel_path = self.store_path(&abs);

        let bytes = std::fs::read(&abs)?;
        let content_hash = format!("{:016x}", xxh3_64(&bytes));

        let existing = self.store.borrow().file_by_path(&rel_path)?;
        let old_symbols = match &existing {
            Some(file) => {
                if file.content_hash == content_hash && !self.options.force {
                    return Ok(Prepared::Unchanged);
                }
                self.store.borrow().symbols_in_file(file.id)?
            }
            None => Vec::new(),
        };

        if let Some(file) = &existing {
            self.store.borrow_mut().delete_file_data(file.id)?;
        }

        let file_id = self.store.borrow().insert_file(&NewFile {
            path: rel_path.clone(),
            language: language.as_str().to_string(),
            content_hash,
        })?;

        Ok(Prepared::Item(WorkItem {
            rel_path,
            language,
            file_id,
            old_symbols,
        }))
    }

    /// Steps 8-10: diff old vs new symbols, accumulate the blast radius,
    /// and delete resolution rows whose targets are gone or changed.
    fn finish_file(&self, item: &WorkItem, blast: &mut BlastRadius) -> Result<()> {
        let new_symbols = self.store.borrow().symbols_in_file(item.file_id)?;
        let diff = diff_symbols(&item.old_symbols, &new_symbols);

        blast.add(item.file_id);

        let stale = diff.stale_ids();
        if !stale.is_empty() {
            let referencing = self.store.borrow().files_referencing_symbols(&stale)?;
            blast.extend(referencing);
        }

        if diff.surface_changed() {
            let source = self
                .store
                .borrow()
                .module_source_of_file(item.file_id)?
                .unwrap_or_else(|| item.rel_path.clone());
            let importers = self.store.borrow().files_importing_source(&source)?;
            blast.extend(importers);
        }

        if !stale.is_empty() {
            self.store
                .borrow_mut()
                .delete_resolution_data_for_symbols(&stale)?;
        }

        Ok(())
    }

    /// Remove store entries for files that no longer exist on disk, feeding
    /// their removed symbols into the blast radius.
    fn prune_missing(&self, walked: &[PathBuf], blast: &mut BlastRadius) -> Result<usize> {
        let walked: HashSet<String> = walked
            .iter()
            .map(|p| {
                let abs = if p.is_absolute() {
                    p.clone()
                } else {
                    self.root.join(p)
                };
                self.store_path(&abs)
            })
            .collect();

        let stored = self.store.borrow().all_files()?;
        let mut deleted = 0;
        for file in stored {
            if walked.contains(&file.path) {
                continue;
            }
            self.cancel.check()?;

            let old_symbols = self.store.borrow().symbols_in_file(file.id)?;
            let stale: Vec<i64> = old_symbols.iter().map(|s| s.id).collect();

            if !stale.is_empty() {
                let referencing = self.store.borrow().files_referencing_symbols(&stale)?;
                blast.extend(referencing);

                let source = self
                    .store
                    .borrow()
                    .module_source_of_file(file.id)?
                    .unwrap_or_else(|| file.path.clone());
                let importers = self.store.borrow().files_importing_source(&source)?;
                blast.extend(importers);
            }

            self.store.borrow_mut().delete_file_data(file.id)?;
            if !stale.is_empty() {
                self.store
                    .borrow_mut()
                    .delete_resolution_data_for_symbols(&stale)?;
            }
            deleted += 1;
            tracing::info!(path = %file.path, "pruned missing file");
        }
        Ok(deleted)
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Run each language's resolve script at most once, restricted to that
    /// language's share of the blast radius.
    pub fn resolve(&self) -> Result<usize> {
        let host = ScriptHost::new(self.assets.clone(), self.root.clone(), self.cancel.clone())?;
        let mut blast = BlastRadius::new();
        for file in self.store.borrow().all_files()? {
            blast.add(file.id);
        }
        self.resolve_blast(&host, blast)
    }

    fn resolve_blast(&self, host: &ScriptHost, blast: BlastRadius) -> Result<usize> {
        if blast.is_empty() {
            return Ok(0);
        }
        let file_ids = blast.file_ids();

        // Resolution rows originating from re-resolved files are cleared
        // unconditionally before the scripts rerun.
        self.store
            .borrow_mut()
            .delete_resolution_data_for_files(&file_ids)?;

        // Group the blast radius by language.
        let mut by_language: Vec<(Language, Vec<(i64, String)>)> = Vec::new();
        for language in ALL_LANGUAGES {
            if let Some(filter) = &self.options.languages {
                if !filter.contains(language) {
                    continue;
                }
            }
            let mut files = Vec::new();
            for id in &file_ids {
                if let Some(file) = self.store.borrow().file_by_id(*id)? {
                    if file.language == language.as_str() {
                        files.push((file.id, file.path));
                    }
                }
            }
            if !files.is_empty() {
                by_language.push((*language, files));
            }
        }

        let mut resolved = 0;
        for (language, files) in by_language {
            self.cancel.check()?;
            let count = files.len();
            let batch = Rc::new(RefCell::new(RowBatch::new()));
            let run = host.run_resolve(
                language,
                files,
                Rc::clone(&self.store),
                Rc::clone(&batch),
            );
            match run {
                Ok(()) => {
                    let rows = std::mem::take(&mut *batch.borrow_mut());
                    match self.store.borrow_mut().commit_batch(rows) {
                        Ok(_) => resolved += count,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            tracing::warn!(language = %language, error = %e, "resolve commit failed, skipping language");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(language = %language, error = %e, "resolve script failed, skipping language");
                }
            }
        }
        Ok(resolved)
    }

    // =========================================================================
    // FILE ENUMERATION
    // =========================================================================

    /// Path stored in the files table: relative to the root, forward slashes
    fn store_path(&self, abs: &Path) -> String {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        rel.to_string_lossy().replace('\\', "/")
    }

    /// Walk the root with gitignore semantics, collecting supported files
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        let mut paths = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if Language::from_path(path).is_some() {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

// =============================================================================
// TESTS
// =============================================================================
