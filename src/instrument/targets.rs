use serde::{Deserialize, Serialize};

/// APIs instrumented when no configuration is given
pub const DEFAULT_TARGETS: &[&str] = &["strcpy"];

/// Ordered set of function names treated as risky
///
/// Matching is exact string comparison. Duplicates are dropped on
/// construction, keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TargetApiSet {
    names: Vec<String>,
}

impl TargetApiSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    /// Whether calls to `callee` should be instrumented
    pub fn contains(&self, callee: &str) -> bool {
        self.names.iter().any(|name| name == callee)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TargetApiSet {
    fn default() -> Self {
        Self::new(DEFAULT_TARGETS.iter().copied())
    }
}

impl From<Vec<String>> for TargetApiSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<TargetApiSet> for Vec<String> {
    fn from(set: TargetApiSet) -> Self {
        set.names
    }
}
