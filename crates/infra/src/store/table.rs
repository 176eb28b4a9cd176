use std::collections::HashMap;
use std::hash::Hash;

use wareflow_core::{DomainError, DomainResult, Entity, ExpectedVersion, TenantId};

#[derive(Debug, Clone)]
pub(crate) struct Versioned<V> {
    pub version: u64,
    pub value: V,
}

/// Committed rows of one kind, each with a version bumped on every write.
#[derive(Debug)]
pub(crate) struct Table<K, V> {
    rows: HashMap<K, Versioned<V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Table<K, V> {
    fn version(&self, key: &K) -> Option<u64> {
        self.rows.get(key).map(|r| r.version)
    }
}

/// Per-transaction view of a [`Table`]: rows as first read, plus pending writes.
#[derive(Debug)]
pub(crate) struct TableTx<K, V> {
    seen: HashMap<K, Option<Versioned<V>>>,
    dirty: HashMap<K, V>,
}

impl<K, V> Default for TableTx<K, V> {
    fn default() -> Self {
        Self {
            seen: HashMap::new(),
            dirty: HashMap::new(),
        }
    }
}

impl<K, V> TableTx<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Read a row. The first read pins the committed version; later reads see
    /// the same value or this transaction's own write.
    pub fn get(&mut self, table: &Table<K, V>, key: &K) -> Option<V> {
        if let Some(value) = self.dirty.get(key) {
            return Some(value.clone());
        }
        self.seen
            .entry(key.clone())
            .or_insert_with(|| table.rows.get(key).cloned())
            .as_ref()
            .map(|row| row.value.clone())
    }

    /// Every visible row matching `filter`.
    pub fn scan(&mut self, table: &Table<K, V>, filter: impl Fn(&V) -> bool) -> Vec<V> {
        let keys: Vec<K> = table
            .rows
            .iter()
            .filter(|(_, row)| filter(&row.value))
            .map(|(key, _)| key.clone())
            .chain(
                self.dirty
                    .iter()
                    .filter(|(_, value)| filter(*value))
                    .map(|(key, _)| key.clone()),
            )
            .collect();

        let mut out = Vec::with_capacity(keys.len());
        let mut visited = std::collections::HashSet::with_capacity(keys.len());
        for key in keys {
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(value) = self.get(table, &key) {
                if filter(&value) {
                    out.push(value);
                }
            }
        }
        out
    }

    pub fn put(&mut self, key: K, value: V) {
        self.dirty.insert(key, value);
    }

    /// Fails with `Conflict` if any row read here changed since.
    pub fn validate(&self, table: &Table<K, V>, what: &str) -> DomainResult<()> {
        for (key, seen) in &self.seen {
            let expected = match seen {
                Some(row) => ExpectedVersion::Exact(row.version),
                None => ExpectedVersion::Absent,
            };
            expected.check(table.version(key)).map_err(|err| match err {
                DomainError::Conflict(msg) => {
                    DomainError::conflict(format!("{what} changed concurrently: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn apply(self, table: &mut Table<K, V>) -> usize {
        let written = self.dirty.len();
        for (key, value) in self.dirty {
            let version = table.version(&key).unwrap_or(0) + 1;
            table.rows.insert(key, Versioned { version, value });
        }
        written
    }
}

impl<E> TableTx<(TenantId, E::Id), E>
where
    E: Entity + Clone,
{
    /// Write a row under its own `(tenant, id)` key.
    pub fn put_entity(&mut self, entity: E) {
        let key = (entity.tenant_id(), *entity.id());
        self.put(key, entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(u32, &str)]) -> Table<u32, String> {
        let mut table = Table::default();
        let mut tx = TableTx::default();
        for (k, v) in rows {
            tx.put(*k, v.to_string());
        }
        tx.apply(&mut table);
        table
    }

    #[test]
    fn writes_bump_versions() {
        let mut table = table(&[(1, "a")]);
        assert_eq!(table.version(&1), Some(1));

        let mut tx = TableTx::default();
        tx.put(1, "b".to_string());
        tx.apply(&mut table);
        assert_eq!(table.version(&1), Some(2));
    }

    #[test]
    fn stale_read_is_a_conflict() {
        let mut table = table(&[(1, "a")]);

        let mut reader = TableTx::default();
        assert_eq!(reader.get(&table, &1).as_deref(), Some("a"));

        let mut writer = TableTx::default();
        writer.get(&table, &1);
        writer.put(1, "b".to_string());
        writer.validate(&table, "row").unwrap();
        writer.apply(&mut table);

        let err = reader.validate(&table, "row").unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn row_seen_absent_conflicts_once_created() {
        let mut table = table(&[]);
        let mut tx = TableTx::<u32, String>::default();
        assert!(tx.get(&table, &7).is_none());

        let mut other = TableTx::default();
        other.put(7, "x".to_string());
        other.apply(&mut table);

        assert!(tx.validate(&table, "row").is_err());
    }

    #[test]
    fn scan_merges_pending_writes() {
        let table = table(&[(1, "keep"), (2, "drop")]);
        let mut tx = TableTx::default();
        tx.put(2, "keep".to_string());
        tx.put(3, "keep".to_string());

        let mut rows = tx.scan(&table, |v| v == "keep");
        rows.sort();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn blind_writes_never_conflict() {
        let mut table = table(&[(1, "a")]);
        let mut tx = TableTx::default();
        tx.put(1, "b".to_string());

        let mut other = TableTx::default();
        other.put(1, "c".to_string());
        other.apply(&mut table);

        assert!(tx.validate(&table, "row").is_ok());
    }
}
