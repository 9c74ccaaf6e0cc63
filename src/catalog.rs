//! Table allowlist catalog.
//!
//! The catalog owns the set of table names a generated statement may touch,
//! loaded from the database's own table listing. Validation reads an
//! immutable snapshot; reloads swap the whole snapshot atomically so
//! concurrent validations see either the old or the new set, never a
//! partially updated one.

use crate::db::DatabaseClient;
use crate::error::Result;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::info;

/// An immutable, case-normalized set of permitted table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedTableSet {
    names: HashSet<String>,
}

impl AllowedTableSet {
    /// Builds the set from raw catalog names, lowercasing each one.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the (already normalized) name is permitted.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of permitted tables.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no tables are permitted.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the subset of `referenced` that is not permitted, sorted for
    /// deterministic error messages.
    pub fn disallowed_among<'a, I>(&self, referenced: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut missing: Vec<String> = referenced
            .into_iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl fmt::Display for AllowedTableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&String> = self.names.iter().collect();
        sorted.sort();
        write!(f, "{{")?;
        for (i, name) in sorted.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

/// Shared, reload-capable owner of the allowlist.
///
/// The inner lock is held only for the instant of cloning or replacing the
/// `Arc`; validation itself runs against the snapshot it took.
#[derive(Debug)]
pub struct TableCatalog {
    tables: RwLock<Arc<AllowedTableSet>>,
}

impl TableCatalog {
    /// Loads the allowlist from the database's table listing.
    pub async fn load(db: &dyn DatabaseClient) -> Result<Self> {
        let set = fetch_allowed_tables(db).await?;
        Ok(Self {
            tables: RwLock::new(Arc::new(set)),
        })
    }

    /// Creates a catalog from an explicit set, bypassing the database.
    pub fn from_set(set: AllowedTableSet) -> Self {
        Self {
            tables: RwLock::new(Arc::new(set)),
        }
    }

    /// Re-reads the table listing and swaps the snapshot in one step.
    /// In-flight validations keep the snapshot they already hold.
    pub async fn reload(&self, db: &dyn DatabaseClient) -> Result<()> {
        let set = fetch_allowed_tables(db).await?;
        let mut guard = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(set);
        Ok(())
    }

    /// Returns the current allowlist snapshot.
    pub fn current(&self) -> Arc<AllowedTableSet> {
        self.tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

async fn fetch_allowed_tables(db: &dyn DatabaseClient) -> Result<AllowedTableSet> {
    let names = db.list_tables().await?;
    let set = AllowedTableSet::from_names(&names);
    info!("Loaded table allowlist: {} tables", set.len());
    Ok(set)
}
