//! Applying a changelist to the target store
//!
//! A [`ConfigImporter`] runs one import at a time:
//!
//! ```text
//! Idle -> Locked -> Applying -> Committed | Failed
//! ```
//!
//! The import lock is held from `Locked` until the run ends, and released
//! even if a step panics. Steps are applied in a fixed order, and the first
//! failing step ends the run. Nothing already applied is rolled back.

mod validate;

use std::fmt;

use cfgsync_extensions::{ExtensionChanges, ExtensionHandler, ExtensionKind};
use cfgsync_store::ConfigStore;
use serde::Serialize;

use crate::comparer::{ChangeList, ChangeSummary, StorageComparer};
use crate::lock::{IMPORT_LOCK, Lock};
use crate::{Error, Result};

use validate::in_collection;

/// Where an importer is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportState {
    Idle,
    Locked,
    Applying,
    Committed,
    Failed,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Locked => "locked",
            Self::Applying => "applying",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options for an import run
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Leave records missing from the source in place.
    pub partial: bool,
}

/// What a committed import did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Human readable actions, in the order they were applied
    pub actions: Vec<String>,
    #[serde(skip)]
    pub summary: ChangeSummary,
}

/// Result of [`ConfigImporter::import`].
#[derive(Debug)]
pub enum ImportOutcome {
    Committed(ImportReport),
    /// Another import was already running; nothing was touched.
    Skipped,
}

/// Releases the import lock when dropped.
struct LockGuard<'l> {
    lock: &'l dyn Lock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release(IMPORT_LOCK) {
            tracing::warn!(error = %e, "Failed to release import lock");
        }
    }
}

/// Outcome of one apply step; `Err` holds the reason the run stops.
type Step = std::result::Result<(), String>;

/// Applies the changes between a source and a target store to the target.
pub struct ConfigImporter<'a> {
    comparer: StorageComparer<'a>,
    lock: &'a dyn Lock,
    extensions: Option<&'a dyn ExtensionHandler>,
    options: ImportOptions,
    state: ImportState,
    errors: Vec<String>,
    changelist: ChangeList,
}

impl<'a> ConfigImporter<'a> {
    pub fn new(comparer: StorageComparer<'a>, lock: &'a dyn Lock) -> Self {
        Self {
            comparer,
            lock,
            extensions: None,
            options: ImportOptions::default(),
            state: ImportState::Idle,
            errors: Vec::new(),
            changelist: ChangeList::default(),
        }
    }

    /// Install and uninstall extensions through `handler`.
    ///
    /// Without a handler manifest changes are still written but no
    /// extension is installed or uninstalled.
    pub fn with_extensions(mut self, handler: &'a dyn ExtensionHandler) -> Self {
        self.extensions = Some(handler);
        self
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether some import currently holds the lock.
    pub fn already_importing(&self) -> bool {
        !self.lock.is_available(IMPORT_LOCK)
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Reasons the last run failed.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The changelist applied (or attempted) by the last run.
    pub fn changelist(&self) -> &ChangeList {
        &self.changelist
    }

    pub fn comparer(&self) -> &StorageComparer<'a> {
        &self.comparer
    }

    /// Recompute the changes and apply them to the target store.
    ///
    /// # Errors
    ///
    /// - [`Error::LockContention`] when the lock was taken between the
    ///   availability check and acquisition
    /// - [`Error::Comparison`] when the stores could not be diffed
    /// - [`Error::ImportFailed`] with every validation error, or the first
    ///   apply error
    pub fn import(&mut self) -> Result<ImportOutcome> {
        if self.already_importing() {
            tracing::warn!(lock = IMPORT_LOCK, "Another import is already running, skipping");
            return Ok(ImportOutcome::Skipped);
        }

        self.errors.clear();
        self.state = ImportState::Idle;

        let lock = self.lock;
        if !lock.try_acquire(IMPORT_LOCK)? {
            return Err(Error::LockContention {
                name: IMPORT_LOCK.to_string(),
            });
        }
        let guard = LockGuard { lock };
        self.transition(ImportState::Locked);

        let result = self.run();
        drop(guard);

        match result {
            Ok(report) => {
                self.transition(ImportState::Committed);
                tracing::info!(summary = %report.summary, "Import committed");
                Ok(ImportOutcome::Committed(report))
            }
            Err(e) => {
                if self.errors.is_empty() {
                    self.errors.push(e.to_string());
                }
                self.transition(ImportState::Failed);
                tracing::info!(errors = self.errors.len(), "Import failed");
                Err(e)
            }
        }
    }

    fn transition(&mut self, state: ImportState) {
        tracing::debug!(from = %self.state, to = %state, "Import state");
        self.state = state;
    }

    fn run(&mut self) -> Result<ImportReport> {
        let full = self.comparer.create_changelist()?.clone();
        self.changelist = if self.options.partial {
            full.without_deletes()
        } else {
            full
        };

        let source = self.comparer.source();
        let target = self.comparer.target();

        let validation = validate::validate(&self.changelist, source, target, self.options.partial);
        if !validation.errors.is_empty() {
            self.errors = validation.errors;
            return Err(Error::ImportFailed {
                errors: self.errors.clone(),
            });
        }

        self.transition(ImportState::Applying);
        let mut report = ImportReport {
            actions: Vec::new(),
            summary: self.changelist.summary(),
        };

        let applied = Applier {
            changelist: &self.changelist,
            source,
            target,
            handler: self.extensions,
            actions: &mut report.actions,
        }
        .apply(&validation.extensions);

        match applied {
            Ok(()) => Ok(report),
            Err(reason) => {
                tracing::debug!(applied = report.actions.len(), "Stopped after failed step");
                self.errors.push(reason);
                Err(Error::ImportFailed {
                    errors: self.errors.clone(),
                })
            }
        }
    }
}

/// Carries out the steps of one run, recording what it did.
struct Applier<'r> {
    changelist: &'r ChangeList,
    source: &'r dyn ConfigStore,
    target: &'r dyn ConfigStore,
    handler: Option<&'r dyn ExtensionHandler>,
    actions: &'r mut Vec<String>,
}

impl Applier<'_> {
    fn apply(mut self, extensions: &ExtensionChanges) -> Step {
        self.uninstall(extensions)?;
        self.deletes()?;
        self.renames()?;
        self.writes()?;
        self.install(extensions)
    }

    fn collections(
        &self,
        collection: &str,
    ) -> std::result::Result<(Box<dyn ConfigStore>, Box<dyn ConfigStore>), String> {
        let source = self
            .source
            .create_collection(collection)
            .map_err(|e| format!("Failed to open source collection '{collection}': {e}"))?;
        let target = self
            .target
            .create_collection(collection)
            .map_err(|e| format!("Failed to open target collection '{collection}': {e}"))?;
        Ok((source, target))
    }

    fn uninstall(&mut self, extensions: &ExtensionChanges) -> Step {
        self.run_extensions(extensions.uninstall(), "uninstall", |handler, kind, names| {
            handler.uninstall(kind, names)
        })
    }

    fn install(&mut self, extensions: &ExtensionChanges) -> Step {
        self.run_extensions(extensions.install(), "install", |handler, kind, names| {
            handler.install(kind, names)
        })
    }

    fn run_extensions<F>(
        &mut self,
        batches: &[(ExtensionKind, Vec<String>)],
        action: &str,
        call: F,
    ) -> Step
    where
        F: Fn(&dyn ExtensionHandler, ExtensionKind, &[String]) -> cfgsync_extensions::Result<()>,
    {
        if batches.is_empty() {
            return Ok(());
        }
        let Some(handler) = self.handler else {
            tracing::debug!(action, batches = batches.len(), "No extension handler, skipping");
            return Ok(());
        };

        for (kind, names) in batches {
            tracing::debug!(action, %kind, ?names, "Running extension handler");
            call(handler, *kind, names)
                .map_err(|e| format!("Failed to {action} {kind} {}: {e}", names.join(", ")))?;
            let verb = if action == "install" { "Installed" } else { "Uninstalled" };
            self.actions.push(format!("{verb} {kind}: {}", names.join(", ")));
        }
        Ok(())
    }

    fn deletes(&mut self) -> Step {
        for (collection, changes) in self.changelist.iter() {
            if changes.delete.is_empty() {
                continue;
            }
            let (_, target) = self.collections(collection)?;
            for name in &changes.delete {
                let deleted = target
                    .delete(name)
                    .map_err(|e| format!("Failed to delete {name}{}: {e}", in_collection(collection)))?;
                if deleted {
                    self.actions
                        .push(format!("Deleted {name}{}", in_collection(collection)));
                } else {
                    tracing::debug!(name = %name, collection, "Nothing deleted");
                }
            }
        }
        Ok(())
    }

    fn renames(&mut self) -> Step {
        for (collection, changes) in self.changelist.iter() {
            if changes.rename.is_empty() {
                continue;
            }
            let (source, target) = self.collections(collection)?;
            for (old, new) in &changes.rename {
                let where_ = in_collection(collection);
                let renamed = target
                    .rename(old, new)
                    .map_err(|e| format!("Failed to rename {old} to {new}{where_}: {e}"))?;
                if !renamed {
                    return Err(format!("Failed to rename {old} to {new}{where_}"));
                }
                // The renamed record may also have changed content.
                let data = source
                    .read(new)
                    .map_err(|e| format!("Failed to read {new}{where_}: {e}"))?
                    .ok_or_else(|| format!("{new} disappeared from the import source"))?;
                target
                    .write(new, &data)
                    .map_err(|e| format!("Failed to write {new}{where_}: {e}"))?;
                self.actions.push(format!("Renamed {old} to {new}{where_}"));
            }
        }
        Ok(())
    }

    fn writes(&mut self) -> Step {
        for (collection, changes) in self.changelist.iter() {
            if changes.create.is_empty() && changes.update.is_empty() {
                continue;
            }
            let (source, target) = self.collections(collection)?;
            for name in changes.writes() {
                let where_ = in_collection(collection);
                let data = source
                    .read(name)
                    .map_err(|e| format!("Failed to read {name}{where_}: {e}"))?
                    .ok_or_else(|| format!("{name} disappeared from the import source"))?;
                target
                    .write(name, &data)
                    .map_err(|e| format!("Failed to write {name}{where_}: {e}"))?;

                let verb = if changes.create.contains(name) {
                    "Created"
                } else {
                    "Updated"
                };
                tracing::debug!(name = %name, collection, verb, "Wrote record");
                self.actions.push(format!("{verb} {name}{where_}"));
            }
        }
        Ok(())
    }
}
