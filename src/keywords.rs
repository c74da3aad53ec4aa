//! # Keyword Sets
//!
//! A `KeywordSet` is the name -> typed-value metadata mapping attached to a
//! table or column. Keys are unique and case-sensitive. Insertion order is
//! irrelevant for lookup but preserved for iteration and serialization, so
//! a keyword set written and read back iterates identically.
//!
//! Values are full [`Value`]s, including arrays and nested records; nested
//! records are what the region registry persists regions into.
//!
//! Lookup is O(1) through a hash index over the ordered entry list.

use crate::types::Value;
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;

/// Ordered name -> typed value mapping.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl KeywordSet {
    pub fn new() -> Self {
        KeywordSet::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Inserts a keyword, replacing the value in place if the name already
    /// exists (the original entry keeps its position).
    pub fn define(&mut self, name: &str, value: Value) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), value));
            }
        }
    }

    pub fn try_get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        match self.try_get(name) {
            Some(v) => Ok(v),
            None => bail!("keyword '{}' not found", name),
        }
    }

    /// Removes a keyword and returns its value. Later entries shift down,
    /// preserving the relative order of the rest.
    pub fn remove(&mut self, name: &str) -> Result<Value> {
        let i = match self.index.remove(name) {
            Some(i) => i,
            None => bail!("keyword '{}' not found", name),
        };
        let (_, value) = self.entries.remove(i);
        for (_, idx) in self.index.iter_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Ok(value)
    }

    /// Renames a keyword in place; its position and value are unchanged.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        ensure!(
            !self.index.contains_key(new),
            "keyword '{}' already exists",
            new
        );
        let i = match self.index.remove(old) {
            Some(i) => i,
            None => bail!("keyword '{}' not found", old),
        };
        self.entries[i].0 = new.to_string();
        self.index.insert(new.to_string(), i);
        Ok(())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl PartialEq for KeywordSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_inserts_and_replaces_in_place() {
        let mut k = KeywordSet::new();
        k.define("TELESCOPE", Value::Str("WSRT".into()));
        k.define("NCHAN", Value::Int32(64));
        k.define("TELESCOPE", Value::Str("VLA".into()));

        assert_eq!(k.len(), 2);
        assert_eq!(k.get("TELESCOPE").unwrap(), &Value::Str("VLA".into()));
        let names: Vec<_> = k.names().collect();
        assert_eq!(names, vec!["TELESCOPE", "NCHAN"]);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let mut k = KeywordSet::new();
        k.define("unit", Value::Str("Jy".into()));
        assert!(k.contains("unit"));
        assert!(!k.contains("UNIT"));
        assert!(k.get("UNIT").is_err());
    }

    #[test]
    fn remove_shifts_later_entries_and_keeps_lookup_consistent() {
        let mut k = KeywordSet::new();
        k.define("A", Value::Int32(1));
        k.define("B", Value::Int32(2));
        k.define("C", Value::Int32(3));

        assert_eq!(k.remove("B").unwrap(), Value::Int32(2));
        assert_eq!(k.len(), 2);
        assert_eq!(k.get("C").unwrap(), &Value::Int32(3));
        let names: Vec<_> = k.names().collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(k.remove("B").is_err());
    }

    #[test]
    fn rename_keeps_position_and_rejects_duplicates() {
        let mut k = KeywordSet::new();
        k.define("OLD", Value::Bool(true));
        k.define("OTHER", Value::Bool(false));

        k.rename("OLD", "NEW").unwrap();
        let names: Vec<_> = k.names().collect();
        assert_eq!(names, vec!["NEW", "OTHER"]);
        assert_eq!(k.get("NEW").unwrap(), &Value::Bool(true));

        assert!(k.rename("NEW", "OTHER").is_err());
        assert!(k.rename("GONE", "X").is_err());
    }

    #[test]
    fn equality_compares_entries_in_order() {
        let mut a = KeywordSet::new();
        a.define("X", Value::Int32(1));
        a.define("Y", Value::Int32(2));
        let mut b = KeywordSet::new();
        b.define("Y", Value::Int32(2));
        b.define("X", Value::Int32(1));
        assert_ne!(a, b);

        let mut c = KeywordSet::new();
        c.define("X", Value::Int32(1));
        c.define("Y", Value::Int32(2));
        assert_eq!(a, c);
    }
}
