//! The skill taxonomy: the static Domain/Topic/Skill/Sub-skill reference
//! list used for matching.
//!
//! Loaded exactly once at process startup and injected behind an `Arc`,
//! never a lazily-populated global. Explicit loading means a bad taxonomy
//! file fails the boot with a real error instead of failing the first
//! request, and consumers can hold the data immutably with no hidden state.

use crate::error::CurriculumError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the taxonomy file. Field names match the CSV header and the
/// wire format verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRecord {
    #[serde(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Skill")]
    pub skill: String,
    #[serde(rename = "Sub-skill")]
    pub sub_skill: String,
}

impl SkillRecord {
    /// Render the record the way matching prompts inline it.
    pub fn prompt_line(&self) -> String {
        format!(
            "Domain: {}, Topic: {}, Skill: {}, Sub-skill: {}",
            self.domain, self.topic, self.skill, self.sub_skill
        )
    }
}

/// The immutable, process-wide skill reference list.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    records: Vec<SkillRecord>,
}

impl Taxonomy {
    /// Load the taxonomy from a CSV file with a
    /// `Domain, Topic, Skill, Sub-skill` header.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CurriculumError> {
        let path = path.as_ref();
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| CurriculumError::TaxonomyLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: SkillRecord = row.map_err(|e| CurriculumError::TaxonomyLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Build a taxonomy from already-parsed records (tests, fixtures).
    pub fn from_records(records: Vec<SkillRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SkillRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate the records in fixed-size batches for prompt construction.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[SkillRecord]> {
        self.records.chunks(batch_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
Domain,Topic,Skill,Sub-skill
Number Sense,Fractions,Equivalent Fractions,Simplify Fractions
Number Sense,Fractions,Equivalent Fractions,Compare Fractions
Statistics,Data Analysis,Central Tendency,Mean
";

    fn fixture() -> Taxonomy {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        Taxonomy::load(file.path()).unwrap()
    }

    #[test]
    fn loads_rows_with_renamed_headers() {
        let taxonomy = fixture();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.records()[0].sub_skill, "Simplify Fractions");
        assert_eq!(taxonomy.records()[2].domain, "Statistics");
    }

    #[test]
    fn batches_cover_all_records() {
        let taxonomy = fixture();
        let batches: Vec<&[SkillRecord]> = taxonomy.batches(2).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn prompt_line_includes_every_field() {
        let line = fixture().records()[0].prompt_line();
        assert_eq!(
            line,
            "Domain: Number Sense, Topic: Fractions, Skill: Equivalent Fractions, Sub-skill: Simplify Fractions"
        );
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = Taxonomy::load("/nonexistent/Skills.csv").unwrap_err();
        assert!(matches!(err, CurriculumError::TaxonomyLoad { .. }));
    }
}
