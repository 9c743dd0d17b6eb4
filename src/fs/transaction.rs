//! Staged manifest writes with rollback support.
//!
//! A bump touches a handful of files in a working copy (property lists, the
//! dependency list, pinned-revision scripts). They are staged here first and
//! written together, so a failure half way leaves the working copy as it was.
//!
//! ## Phases
//!
//! 1. **Build**: Stage writes via `update_file()`; unchanged content is skipped
//! 2. **Validate**: Check paths exist, are writable, no duplicates
//! 3. **Execute**: Write each file in staging order
//! 4. **Rollback** (on failure): Restore written files in LIFO order
//!
//! ## Example
//!
//! ```no_run
//! # use eng_bump::fs::Transaction;
//! # use std::path::PathBuf;
//! # fn example() -> eng_bump::error::Result<()> {
//! let mut txn = Transaction::new(false);
//!
//! txn.update_file(PathBuf::from("eng/Versions.props"), "<Project />".into())?;
//!
//! txn.commit()?;
//! # Ok(())
//! # }
//! ```

use crate::error::{BumpError, Result};

use colored::Colorize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A staged file write.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Replace file contents.
    ///
    /// Stores original content for rollback.
    UpdateFile {
        path: PathBuf,
        original: String,
        new: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    /// Staging operations.
    Building,
    /// All operations succeeded.
    Committed,
    /// Rolled back after commit or after a failed write.
    RolledBack,
    /// Validation failed; nothing executed.
    Failed,
}

/// Transaction coordinating the file writes of one bump.
///
/// Must be explicitly committed. If dropped without committing, logs a warning
/// but doesn't roll back (since operations weren't applied).
///
/// ## Dry-Run Mode
///
/// When `dry_run = true`, operations are staged and reported but never written.
#[must_use = "Transaction must be committed or rolled back"]
pub struct Transaction {
    operations: Vec<Operation>,
    dry_run: bool,
    state: TransactionState,
    executed_indices: Vec<usize>,
}

impl Transaction {
    pub fn new(dry_run: bool) -> Self {
        Self {
            operations: Vec::new(),
            dry_run,
            state: TransactionState::Building,
            executed_indices: Vec::new(),
        }
    }

    /// Checks for duplicate targets, missing files and read-only files.
    fn validate(&self) -> Result<()> {
        let mut file_paths = HashSet::new();

        for op in &self.operations {
            let Operation::UpdateFile { path, .. } = op;

            if !file_paths.insert(path.clone()) {
                return Err(BumpError::Other(anyhow::anyhow!(
                    "Duplicate file operation: {}",
                    path.display()
                )));
            }

            if !path.exists() {
                return Err(BumpError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File no longer exists: {}", path.display()),
                )));
            }

            if let Ok(metadata) = fs::metadata(path)
                && metadata.permissions().readonly()
            {
                return Err(BumpError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("File is read-only: {}", path.display()),
                )));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns true if successfully committed.
    pub fn is_committed(&self) -> bool {
        self.state == TransactionState::Committed
    }

    /// Paths of all staged writes, in staging order.
    pub fn paths(&self) -> Vec<&Path> {
        self.operations
            .iter()
            .map(|Operation::UpdateFile { path, .. }| path.as_path())
            .collect()
    }

    /// Prints a categorized summary to stdout.
    ///
    /// Groups:
    /// - Property manifests (`.props`)
    /// - Dependency manifests (`.xml`)
    /// - Pinned references (anything else, e.g. build scripts and pipeline files)
    ///
    /// Paths are relative to `root` with forward slashes.
    pub fn print_summary(&self, title: &str, root: &Path) {
        if self.operations.is_empty() {
            println!("\n{}", "No changes needed".yellow());
            return;
        }

        let display_path = |path: &Path| -> String {
            let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
            relative.to_string_lossy().replace('\\', "/")
        };

        let mut property_manifests = Vec::new();
        let mut dependency_manifests = Vec::new();
        let mut pinned_references = Vec::new();

        for Operation::UpdateFile { path, .. } in &self.operations {
            let display = display_path(path);
            match path.extension().and_then(|e| e.to_str()) {
                Some("props") => property_manifests.push(display),
                Some("xml") => dependency_manifests.push(display),
                _ => pinned_references.push(display),
            }
        }

        property_manifests.sort();
        dependency_manifests.sort();
        pinned_references.sort();

        if self.dry_run {
            println!(
                "\n{} {}",
                "DRY RUN - No changes will be made:".yellow().bold(),
                title
            );
        } else {
            println!("\n{} {}", "Changes applied:".green().bold(), title);
        }

        for (icon, label, paths) in [
            ("📦", "Property manifests", &property_manifests),
            ("🔗", "Dependency manifests", &dependency_manifests),
            ("📌", "Pinned references", &pinned_references),
        ] {
            if paths.is_empty() {
                continue;
            }
            println!("\n{} {}", icon.bold(), label);
            for path in paths {
                if self.dry_run {
                    println!("   • {}", path.dimmed());
                } else {
                    println!("   {} {}", "✓".green(), path.dimmed());
                }
            }
        }

        println!();
        let num_ops = self.operations.len();
        if self.dry_run {
            println!(
                "{} {} would be modified. Run without {} to apply.",
                num_ops.to_string().cyan().bold(),
                if num_ops > 1 { "files" } else { "file" },
                "--dry-run".cyan()
            );
        } else {
            println!(
                "{} Successfully updated {} file{}",
                "✓".green().bold(),
                num_ops,
                if num_ops == 1 { "" } else { "s" }
            );
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Building && !self.operations.is_empty() && !self.dry_run
        {
            log::warn!("Transaction dropped without commit");
        }
    }
}

impl Transaction {
    /// Stages a file update.
    ///
    /// Reads current content and compares to `new_content`. If identical,
    /// skips (idempotent). Otherwise stages for commit.
    pub fn update_file(&mut self, path: PathBuf, new_content: String) -> Result<()> {
        if self.state != TransactionState::Building {
            return Err(BumpError::Other(anyhow::anyhow!(
                "Cannot modify transaction after commit/rollback"
            )));
        }

        log::debug!("Staging update for: {}", path.display());

        let original = fs::read_to_string(&path).map_err(|e| {
            log::error!("Failed to read {}: {}", path.display(), e);
            BumpError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;

        if original == new_content {
            log::debug!("Content unchanged, skipping: {}", path.display());
            return Ok(());
        }

        if self.dry_run {
            log::info!("Would update: {}", path.display());
        }

        self.operations.push(Operation::UpdateFile {
            path,
            original,
            new: new_content,
        });

        Ok(())
    }

    /// Commits all staged writes.
    ///
    /// On a failed write, files already written are restored before the error is
    /// returned.
    pub fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::Building {
            return Err(BumpError::Other(anyhow::anyhow!(
                "Transaction already committed/rolled back"
            )));
        }

        if self.dry_run {
            self.state = TransactionState::Committed;
            return Ok(());
        }

        if let Err(e) = self.validate() {
            self.state = TransactionState::Failed;
            return Err(e);
        }

        for idx in 0..self.operations.len() {
            let Operation::UpdateFile { path, new, .. } = &self.operations[idx];

            if let Err(e) = fs::write(path, new) {
                let error = BumpError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write {}: {}", path.display(), e),
                ));
                self.rollback_partial()?;
                return Err(error);
            }

            self.executed_indices.push(idx);
            log::debug!("Updated: {}", path.display());
        }

        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Manually rolls back a committed transaction.
    ///
    /// Reverses operations in LIFO order. Only works on committed transactions.
    pub fn rollback(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Building => Ok(()),
            TransactionState::Committed if self.dry_run => Ok(()),
            TransactionState::Committed => {
                self.executed_indices = (0..self.operations.len()).collect();
                self.rollback_partial()
            }
            TransactionState::Failed => Err(BumpError::Other(anyhow::anyhow!(
                "Transaction failed; nothing to roll back"
            ))),
            TransactionState::RolledBack => Err(BumpError::Other(anyhow::anyhow!(
                "Transaction already rolled back"
            ))),
        }
    }

    /// Rolls back executed operations only.
    fn rollback_partial(&mut self) -> Result<()> {
        let mut errors = Vec::new();

        for &idx in self.executed_indices.iter().rev() {
            if let Some(Operation::UpdateFile { path, original, .. }) = self.operations.get(idx)
                && let Err(e) = fs::write(path, original)
            {
                errors.push(format!("Failed to restore {}: {}", path.display(), e));
            }
        }

        self.executed_indices.clear();
        if errors.is_empty() {
            self.state = TransactionState::RolledBack;
            log::info!("Rollback completed");
            Ok(())
        } else {
            self.state = TransactionState::Failed;
            Err(BumpError::RollbackFailed(errors.join("; ")))
        }
    }
}
