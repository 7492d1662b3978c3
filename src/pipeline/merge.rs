//! Curriculum merging: fold per-grade JSON subtrees into one tree.
//!
//! Each per-grade structuring call returns (at best) a single-subject,
//! single-school, single-grade subtree. The merger trusts the inner *grade*
//! keys but not the inner school key (the oracle occasionally misspells the
//! school), so grades are re-rooted under the caller-supplied school name.
//!
//! Malformed elements (upstream call failed, model returned the wrong shape)
//! are skipped without affecting their siblings; surfacing those skips is the
//! caller's job, not the merger's.

use serde_json::{Map, Value};

/// The only subject this service extracts.
pub const SUBJECT: &str = "Mathematics";

/// Merge per-grade results into `{"Mathematics": {<school_name>: {...}}}`.
///
/// For every element shaped like
/// `{"curriculum": {<subject>: {<school>: {<grade>: subtree, ...}}}}`, each
/// grade subtree is copied under the merged school node keyed by its own
/// grade name. Elements missing any level of that shape contribute nothing.
/// Zero inputs yield the empty school node.
pub fn merge_curriculum(grade_results: &[Value], school_name: &str) -> Value {
    let mut grades = Map::new();

    for result in grade_results {
        let Some(curriculum) = result.get("curriculum").and_then(Value::as_object) else {
            continue;
        };
        // Single-key maps by contract; take the first entry of each level.
        let Some(schools) = curriculum.values().next().and_then(Value::as_object) else {
            continue;
        };
        let Some(grades_in_school) = schools.values().next().and_then(Value::as_object) else {
            continue;
        };
        for (grade_name, subtree) in grades_in_school {
            grades.insert(grade_name.clone(), subtree.clone());
        }
    }

    let mut school = Map::new();
    school.insert(school_name.to_string(), Value::Object(grades));
    let mut root = Map::new();
    root.insert(SUBJECT.to_string(), Value::Object(school));
    Value::Object(root)
}
