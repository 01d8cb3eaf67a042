use indexmap::IndexMap;
use std::collections::HashMap;

/// One column rename: at `version` the column called `from` became `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenameRecord {
    pub version: u32,
    pub from: String,
    pub to: String,
}

impl RenameRecord {
    pub fn new(version: u32, from: &str, to: &str) -> Self {
        RenameRecord {
            version,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Every rename of every field, keyed by the field's name in the latest shape.
///
/// Records for one field are kept sorted by version. A field renamed twice
/// holds two records; later declarations never replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenameHistory {
    by_field: IndexMap<String, Vec<RenameRecord>>,
}

impl RenameHistory {
    pub fn new() -> Self {
        RenameHistory::default()
    }

    pub(crate) fn append(&mut self, latest_name: &str, record: RenameRecord) {
        let records = self.by_field.entry(latest_name.to_string()).or_default();
        records.push(record);
        records.sort_by_key(|r| r.version);
    }

    pub fn records(&self, latest_name: &str) -> &[RenameRecord] {
        self.by_field
            .get(latest_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.by_field.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    /// Name the field `latest_name` had in the shape of `version`.
    ///
    /// Starting from the newest name, walks renames from newest to oldest
    /// and undoes every rename that took effect after `version`.
    pub fn name_at_version(&self, latest_name: &str, version: u32) -> String {
        let records = match self.by_field.get(latest_name) {
            Some(records) if !records.is_empty() => records,
            _ => return latest_name.to_string(),
        };

        let mut current = records
            .last()
            .map(|r| r.to.clone())
            .unwrap_or_else(|| latest_name.to_string());
        for record in records.iter().rev() {
            if record.version <= version {
                break;
            }
            if record.to == current {
                current = record.from.clone();
            }
        }
        current
    }

    /// Maps each field's name at `to_version` to its name at `from_version`,
    /// for the fields whose names differ between the two.
    pub fn rename_snapshot(&self, from_version: u32, to_version: u32) -> HashMap<String, String> {
        let mut snapshot = HashMap::new();
        for latest_name in self.by_field.keys() {
            let old_name = self.name_at_version(latest_name, from_version);
            let target_name = self.name_at_version(latest_name, to_version);
            if old_name != target_name {
                snapshot.insert(target_name, old_name);
            }
        }
        snapshot
    }
}
