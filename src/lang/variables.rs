use std::collections::BTreeMap;
use std::f64::consts;

/// Name of the variable holding the value of the last successful run
pub const RESULT: &str = "result";

/// Constants every session starts out with
pub const CONSTANTS: &[(&str, f64)] = &[("pi", consts::PI), ("e", consts::E)];

/// Session variable store
///
/// Names are case sensitive. Entries are only ever added or overwritten.
pub struct Variables {
    inner: BTreeMap<String, f64>,
}

impl Variables {
    pub fn new() -> Self {
        let mut inner = BTreeMap::default();

        for (name, value) in CONSTANTS {
            inner.insert(name.to_string(), *value);
        }

        Variables { inner }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.inner.get(name).copied()
    }

    pub fn insert(&mut self, name: &str, val: f64) {
        self.inner.insert(name.to_string(), val);
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_constants() {
    let vars = Variables::new();
    assert_eq!(vars.get("pi"), Some(consts::PI));
    assert_eq!(vars.get("e"), Some(consts::E));
    assert_eq!(vars.get("PI"), None);
    assert_eq!(vars.get(RESULT), None);
}

#[test]
fn test_overwrite() {
    let mut vars = Variables::new();
    vars.insert("a", 1.0);
    vars.insert("a", 2.0);
    vars.insert("pi", 3.0);
    assert_eq!(vars.get("a"), Some(2.0));
    assert_eq!(vars.get("pi"), Some(3.0));
}
