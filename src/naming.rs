//! File name generation and collision-free path allocation.
//!
//! Names are produced in two steps: [`expand_pattern`] turns the configured pattern into a
//! base name, then [`NamingPolicy::allocate`] picks a free path in the target directory by
//! appending a `(N)` suffix when needed (`shot.png`, `shot(2).png`, `shot(3).png`, ...).
//!
//! Allocation only reads the directory listing, so calling it twice without creating the
//! returned file yields the same path. Callers that write the file hold the directory lock
//! from [`NamingState::with_directory_lock`] across allocate-and-write, which keeps two jobs
//! from picking the same suffix.

use crate::config::NamingConfig;
use crate::util::PRODUCT_NAME;
use chrono::{DateTime, Local, format::Item, format::StrftimeItems};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised while allocating output paths.
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("Invalid output directory {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

/// Process-wide naming state: the `%i` counter and the per-directory allocation locks.
#[derive(Debug)]
pub struct NamingState {
    counter: AtomicU64,
    directory_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl NamingState {
    pub fn new(counter_start: u64) -> Self {
        Self {
            counter: AtomicU64::new(counter_start),
            directory_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current counter value and advances it.
    pub fn next_counter(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Runs `f` while holding the allocation lock for `directory`.
    ///
    /// Jobs writing into different directories do not contend.
    pub fn with_directory_lock<R>(&self, directory: &Path, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self
                .directory_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(directory.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}

impl Default for NamingState {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Naming rules for one process, built from the `[naming]` config section.
#[derive(Debug, Clone)]
pub struct NamingPolicy {
    pattern: String,
    max_name_length: usize,
    counter_width: usize,
    overwrite: bool,
    state: Arc<NamingState>,
}

impl NamingPolicy {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            pattern: config.pattern.clone(),
            max_name_length: config.max_name_length,
            counter_width: config.counter_width,
            overwrite: config.overwrite,
            state: Arc::new(NamingState::new(config.counter_start)),
        }
    }

    pub fn state(&self) -> &Arc<NamingState> {
        &self.state
    }

    /// Whether existing files are replaced instead of suffixed.
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Builds a file name (without directory) from the pattern for `timestamp`.
    ///
    /// The `%i` counter is only advanced when the pattern uses it.
    pub fn file_name(&self, timestamp: DateTime<Local>, extension: &str) -> String {
        let counter = self
            .pattern
            .contains("%i")
            .then(|| self.state.next_counter());
        let base = expand_pattern(&self.pattern, timestamp, counter, self.counter_width);
        if extension.is_empty() {
            base
        } else {
            format!("{}.{}", base, extension)
        }
    }

    /// Picks the final path for `desired_name` inside `directory`.
    ///
    /// With `overwrite` the desired name is returned unchanged. Otherwise the highest
    /// existing `name(N).ext` suffix is found and `N + 1` is used, so a directory holding
    /// `shot(2).png` hands out `shot(3).png` even when `shot.png` itself is free.
    /// The base name is cut to the configured maximum length first; the extension is kept.
    ///
    /// # Errors
    /// `NamingError::InvalidPath` when the directory cannot be created or is not a directory.
    pub fn allocate(
        &self,
        directory: &Path,
        desired_name: &str,
        overwrite: bool,
    ) -> Result<PathBuf, NamingError> {
        ensure_directory(directory)?;

        let (stem, extension) = split_extension(desired_name);
        let (base, requested) = parse_suffix(stem);
        let base = truncate_chars(base, self.max_name_length);

        let candidate = match requested {
            Some(n) => suffixed_name(base, n, extension),
            None => join_extension(base, extension),
        };

        if overwrite {
            return Ok(directory.join(candidate));
        }

        let floor = requested.unwrap_or(1);
        let highest = existing_suffixes(directory, base, extension)?
            .into_iter()
            .filter(|n| *n >= floor)
            .max();

        let Some(highest) = highest else {
            return Ok(directory.join(candidate));
        };

        let mut next = highest + 1;
        loop {
            let path = directory.join(suffixed_name(base, next, extension));
            if !path.exists() {
                log::debug!(
                    "Allocated {} (highest existing suffix {})",
                    path.display(),
                    highest
                );
                return Ok(path);
            }
            next += 1;
        }
    }
}

/// Expands a naming pattern into a file name.
///
/// Same as [`expand_tokens`], then characters that are not allowed in file names are
/// replaced with `_`.
pub fn expand_pattern(
    pattern: &str,
    timestamp: DateTime<Local>,
    counter: Option<u64>,
    counter_width: usize,
) -> String {
    sanitize_file_name(&expand_tokens(pattern, timestamp, counter, counter_width))
}

/// Expands chrono format specifiers plus `%pn` (product name) and `%i` (counter, zero
/// padded to `counter_width`). A pattern chrono cannot parse is used literally.
pub fn expand_tokens(
    pattern: &str,
    timestamp: DateTime<Local>,
    counter: Option<u64>,
    counter_width: usize,
) -> String {
    let mut expanded = pattern.replace("%pn", PRODUCT_NAME);
    if let Some(counter) = counter {
        expanded = expanded.replace("%i", &format!("{:0width$}", counter, width = counter_width));
    }

    let items: Vec<Item<'_>> = StrftimeItems::new(&expanded).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        log::warn!(
            "Pattern '{}' has invalid format specifiers, using it literally",
            pattern
        );
        return expanded.clone();
    }
    timestamp.format_with_items(items.into_iter()).to_string()
}

/// Replaces characters that are invalid in file names on common platforms.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        PRODUCT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn ensure_directory(directory: &Path) -> Result<(), NamingError> {
    if !directory.exists() {
        log::info!("Creating output directory: {}", directory.display());
        fs::create_dir_all(directory).map_err(|e| NamingError::InvalidPath {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    if !directory.is_dir() {
        return Err(NamingError::InvalidPath {
            path: directory.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    Ok(())
}

/// Splits `shot.png` into (`shot`, `png`). Dotfiles and names without a dot have no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

/// Splits `shot(4)` into (`shot`, Some(4)).
fn parse_suffix(stem: &str) -> (&str, Option<u64>) {
    if let Some(without_paren) = stem.strip_suffix(')')
        && let Some(open) = without_paren.rfind('(')
        && open > 0
    {
        let digits = &without_paren[open + 1..];
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && let Ok(n) = digits.parse::<u64>()
        {
            return (&stem[..open], Some(n));
        }
    }
    (stem, None)
}

fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

fn join_extension(base: &str, extension: &str) -> String {
    if extension.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, extension)
    }
}

fn suffixed_name(base: &str, n: u64, extension: &str) -> String {
    join_extension(&format!("{}({})", base, n), extension)
}

/// Collects the suffix numbers already used for `base` in `directory`.
/// A plain `base.ext` counts as suffix 1.
fn existing_suffixes(
    directory: &Path,
    base: &str,
    extension: &str,
) -> Result<Vec<u64>, NamingError> {
    let ext_pattern = if extension.is_empty() {
        String::new()
    } else {
        format!(r"\.{}", regex::escape(extension))
    };
    let pattern = format!(r"^{}\((\d+)\){}$", regex::escape(base), ext_pattern);
    let suffix_re = Regex::new(&pattern).map_err(|e| NamingError::InvalidPath {
        path: directory.to_path_buf(),
        reason: format!("cannot build name matcher: {}", e),
    })?;
    let plain = join_extension(base, extension);

    let entries = fs::read_dir(directory).map_err(|e| NamingError::InvalidPath {
        path: directory.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == plain {
            found.push(1);
        } else if let Some(captures) = suffix_re.captures(name)
            && let Ok(n) = captures[1].parse::<u64>()
        {
            found.push(n);
        }
    }

    Ok(found)
}
