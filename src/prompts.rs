//! Prompts for every oracle call the service makes.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking the scoring rubric or the grade
//!    marker format requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect built prompts directly without
//!    a live model, so prompt regressions are caught like any other bug.
//!
//! Constants are whole prompts; functions interpolate request data. The grade
//! marker strings used by [`crate::pipeline::segment`] live here too so the
//! prompt that asks the model to emit them and the scanner that consumes them
//! can never drift apart.

/// Start-marker prefix the structuring prompt asks the model to emit and the
/// segmenter scans for.
pub const GRADE_START_PREFIX: &str = "=== GRADE:";

/// End marker delimiting a grade section.
pub const GRADE_END_MARKER: &str = "=== END GRADE ===";

// ── Page extraction (vision) ─────────────────────────────────────────────

/// User prompt sent with each page image.
pub const PAGE_EXTRACT_PROMPT: &str = "Extract all text verbatim from this image. \
Do not summarize, interpret, or add any information not present in the text. \
Focus solely on accurate text extraction.";

// ── Text cleanup ─────────────────────────────────────────────────────────

/// System message for the per-chunk cleanup pass.
pub const CHUNK_CLEAN_SYSTEM: &str = "You are a curriculum preprocessing assistant \
specialized in Mathematics curriculum. Your task is to clean text extracted from \
curriculum documents.";

/// Per-chunk cleanup prompt.
///
/// The chunk position is included so the model knows not to expect a complete
/// document; structure markers are explicitly deferred to the final pass.
pub fn chunk_clean_prompt(chunk: &str, index: usize, total: usize) -> String {
    format!(
        "Clean up the following CHUNK of text extracted from a Mathematics curriculum document.\n\
        \n\
        This is chunk {} of {}, so focus on:\n\
        1. Identifying any school information (name, state, website) if present\n\
        2. Identifying grade levels, units, and topics if present\n\
        3. Removing irrelevant information\n\
        \n\
        DO NOT add section markers or structure yet. Just clean the text in this chunk.\n\
        \n\
        Chunk text:\n\
        {}",
        index + 1,
        total,
        chunk
    )
}

/// System message for the final structuring pass.
pub const STRUCTURE_SYSTEM: &str = "You are a curriculum preprocessing assistant \
specialized in Mathematics curriculum. Your task is to organize and structure \
cleaned curriculum text.";

/// Final structuring prompt: produce the grade-delimited text format.
pub fn structure_text_prompt(cleaned: &str) -> String {
    format!(
        "Organize the following cleaned Mathematics curriculum text into a structured format.\n\
        \n\
        IMPORTANT GUIDELINES:\n\
        1. The subject is ALWAYS Mathematics\n\
        2. Consider \"Grade 6\", \"Grade 7\", \"Algebra\", \"Geometry\", etc. as GRADE LEVELS\n\
        3. Keep ONLY the following information:\n\
           - School name, state, and website (no other school info)\n\
           - Grade levels (including Algebra, Geometry, etc.)\n\
           - Units of study\n\
           - Topics within each unit\n\
        4. Remove all irrelevant information\n\
        \n\
        FORMAT REQUIREMENTS:\n\
        1. Start with school information as a separate section\n\
        2. For EACH grade level, create a clearly marked section with this EXACT format:\n\
           {GRADE_START_PREFIX} [Grade level name] ===\n\
           [Units and topics content for this grade]\n\
           {GRADE_END_MARKER}\n\
        3. Make sure each grade section stands alone with its complete units and topics\n\
        \n\
        Here's the text to organize:\n\
        {cleaned}"
    )
}

// ── Curriculum structuring ───────────────────────────────────────────────

/// System message for school metadata extraction.
pub const METADATA_SYSTEM: &str = "You are a curriculum assistant that extracts \
school metadata from curriculum documents.";

/// Metadata extraction prompt over the pre-grade header text.
pub fn metadata_prompt(school_info: &str) -> String {
    format!(
        "Extract ONLY the following metadata from the curriculum text:\n\
        1. School name\n\
        2. School state (full state name, not abbreviation)\n\
        3. A reasonable school website domain (for logo purposes)\n\
        \n\
        Format the response as a valid JSON object with these fields:\n\
        {{\n\
            \"schoolName\": \"Extracted school name or 'Unknown School' if not found\",\n\
            \"schoolState\": \"Extracted state name or 'Unknown' if not found\",\n\
            \"schoolLogo\": \"https://logo.clearbit.com/[school-website]\"\n\
        }}\n\
        \n\
        The curriculum text is:\n\
        {school_info}"
    )
}

/// System message for per-grade structuring.
pub const GRADE_SYSTEM: &str = "You are a curriculum structuring assistant \
specialized in Mathematics. Your task is to analyze curriculum documents and \
organize them into a specific tree structure.";

/// Per-grade structuring prompt: one grade section into one JSON subtree.
///
/// School and grade names are pre-filled so the model only has to discover
/// units and topics; topics are always empty leaves.
pub fn grade_structure_prompt(school_name: &str, grade_name: &str, grade_text: &str) -> String {
    format!(
        "Analyze the curriculum text and structure it EXACTLY in the following JSON format:\n\
        \n\
        {{\n\
          \"Mathematics\": {{\n\
            \"{school_name}\": {{\n\
              \"{grade_name}\": {{\n\
                \"unit1Name\": {{\n\
                    \"Topic1Name\": {{}},\n\
                    \"Topic2Name\": {{}}\n\
                }},\n\
                \"unit2Name\": {{\n\
                    \"Topic3Name\": {{}},\n\
                    \"Topic4Name\": {{}}\n\
                }}\n\
              }}\n\
            }}\n\
          }}\n\
        }}\n\
        \n\
        IMPORTANT GUIDELINES:\n\
        1. The subject is ALWAYS \"Mathematics\"\n\
        2. The school name is ALREADY PROVIDED as \"{school_name}\"\n\
        3. The grade name is ALREADY PROVIDED as \"{grade_name}\"\n\
        4. Replace \"unit1Name\", \"unit2Name\" with actual unit names (like \"Number Sense\", \"Fractions\")\n\
        5. Replace \"Topic1Name\", \"Topic2Name\", etc. with actual topic names (like \"Divisibility Factors\")\n\
        6. All topics should have empty objects as values {{}}\n\
        7. Make sure your JSON is valid\n\
        \n\
        The text for this grade is:\n\
        {grade_text}"
    )
}

// ── Skill matching ───────────────────────────────────────────────────────

/// System message for the batched skill matcher.
pub const MATCH_SYSTEM: &str = "You are a precise education curriculum matcher with \
expertise in identifying and scoring relevant skills for specific topics. You \
understand that if a topic has multiple components (like 'Mean, Median, and \
Range'), each component should be treated as equally core to the topic. You \
understand educational contexts and can accurately determine how directly a \
skill relates to teaching or learning a topic. Return your response as valid \
JSON with an array of skills that includes a RelevancyScore property (0-100) \
for each skill.";

/// One skill-matching batch prompt: the topic, the scoring rubric, and the
/// batch's records rendered one per line.
pub fn match_batch_prompt(
    topic: &str,
    skills_text: &str,
    batch_index: usize,
    batch_count: usize,
) -> String {
    format!(
        "Given the following middle/high school math topic: \"{topic}\"\n\
        \n\
        Find ALL skills from the below list that are related to this topic and assign \
        relevancy scores to them based on these principles:\n\
        \n\
        RELEVANCY SCORING GUIDELINES:\n\
        - Score 95-100: Core skills that are EXACTLY what the topic is about (direct match to the topic name or its primary components)\n\
        - Score 85-94: Skills that are very closely related and typically taught as part of this topic\n\
        - Score 70-84: Skills that are related but may be extensions or applications of the topic\n\
        - Score 50-69: Skills that have some connection but aren't central to the topic\n\
        - Score below 50: Skills with only tangential connections\n\
        \n\
        IMPORTANT:\n\
        1. If a sub-skill is specifically a core component mentioned in the topic name, it should get 95-100\n\
        2. ALL sub-skills that are clearly part of learning the topic should receive high scores (85+)\n\
        3. If a topic contains multiple components (like \"Mean, Median, and Range\"), treat EACH component as a core skill\n\
        4. Order results by relevance (most relevant first)\n\
        \n\
        Format the output as a JSON object with a \"skills\" array of objects with \
        Domain, Topic, Skill, Sub-skill, and RelevancyScore properties.\n\
        \n\
        Skills list (batch {}/{}):\n\
        {skills_text}",
        batch_index + 1,
        batch_count
    )
}

// ── Standards lookup ─────────────────────────────────────────────────────

/// System message for the standards finder.
pub const STANDARDS_SYSTEM: &str = "You are an educational standards expert with \
deep knowledge of Common Core State Standards and state-specific standards. \
Always return valid JSON with a 'standards' array. If no standards are found, \
return an empty array, never null. Each standard must have 'code', \
'description', and 'relevancyScore' properties.";

/// Standards lookup prompt for one topic/jurisdiction pair.
///
/// `jurisdiction` is the display name after the Common Core expansion has
/// been applied by the caller.
pub fn standards_prompt(topic: &str, jurisdiction: &str) -> String {
    format!(
        "Find the most relevant {jurisdiction} educational standards for the topic: \"{topic}\".\n\
        \n\
        For Common Core, look for standards like:\n\
        - CCSS.MATH.6.EE.A.2 (6th grade Expressions & Equations)\n\
        - CCSS.MATH.8.EE.C.7 (8th grade Linear equations)\n\
        - CCSS.MATH.HSA.REI.B.3 (High School Algebra)\n\
        \n\
        For state standards, look for the actual state standard codes and descriptions.\n\
        \n\
        Return results in this exact JSON format:\n\
        {{\n\
          \"standards\": [\n\
            {{\n\
              \"code\": \"CCSS.MATH.6.EE.A.2\",\n\
              \"description\": \"Write, read, and evaluate expressions in which letters stand for numbers\",\n\
              \"relevancyScore\": 95\n\
            }}\n\
          ]\n\
        }}\n\
        \n\
        If no relevant standards are found, return:\n\
        {{\n\
          \"standards\": []\n\
        }}\n\
        \n\
        Focus on standards that directly teach or assess the topic. The relevancyScore \
        should be 75-100 for highly relevant standards."
    )
}

// ── Core/Foundational categorization ─────────────────────────────────────

/// System message for the categorizer.
pub const CATEGORIZE_SYSTEM: &str = "You are a math curriculum expert. For \
standards, only classify as 'Foundational' if they are from a lower grade level \
than the target grade. For skills, categorize based on whether they are \
typically taught at the target grade level or are prerequisites from earlier \
grades. Always return valid JSON.";

/// What kind of items a categorization prompt covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorizeKind {
    Skills,
    Standards,
}

impl CategorizeKind {
    fn noun(self) -> &'static str {
        match self {
            CategorizeKind::Skills => "skills",
            CategorizeKind::Standards => "standards",
        }
    }
}

/// Categorization prompt over a numbered item list.
///
/// `items_text` is one item per line; the reply is keyed by 0-based position
/// into that list, which is why the grouped list must not be re-ordered
/// between prompt construction and reply mapping.
pub fn categorize_prompt(
    topic: &str,
    grade: &str,
    items_text: &str,
    kind: CategorizeKind,
) -> String {
    let rules = match kind {
        CategorizeKind::Standards => format!(
            "- For standards: Only classify as \"Foundational\" if the standard is from a LOWER grade than {grade}\n\
            - Standards from grade {grade} or HIGHER should be classified as \"Core\"\n\
            - Extract the grade level from the standard code (e.g., CCSS.MATH.6.EE.A.2 is grade 6, CCSS.MATH.HSA.REI.B.3 is high school)"
        ),
        CategorizeKind::Skills => format!(
            "- For skills: \"Core\" means the skill is directly taught at grade {grade} for this topic\n\
            - \"Foundational\" means the skill is a prerequisite typically taught in lower grades"
        ),
    };
    let noun_title = match kind {
        CategorizeKind::Skills => "Skills",
        CategorizeKind::Standards => "Standards",
    };
    format!(
        "You are given a topic, grade, and the suggested {noun} for it. As a math \
        Teacher and Curriculum Expert, I need you to categorize whether the given skill \
        or standard is a core skill that is going to be taught in this topic and in \
        this grade. Or is this a foundational or a pre-req skill or a standard that is \
        from a lower grade.\n\
        \n\
        Topic: {topic}\n\
        Grade: {grade}\n\
        {noun_title}:\n\
        {items_text}\n\
        \n\
        IMPORTANT RULES:\n\
        {rules}\n\
        \n\
        Example JSON format:\n\
        {{\n\
          \"categorized\": [\n\
            {{\n\
              \"index\": 0,\n\
              \"category\": \"Core\"\n\
            }},\n\
            {{\n\
              \"index\": 1,\n\
              \"category\": \"Foundational\"\n\
            }}\n\
          ]\n\
        }}\n\
        \n\
        Where \"index\" corresponds to the position in the original list (0-based)",
        noun = kind.noun(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_prompt_embeds_markers() {
        let p = structure_text_prompt("some text");
        assert!(p.contains(GRADE_START_PREFIX));
        assert!(p.contains(GRADE_END_MARKER));
        assert!(p.contains("some text"));
    }

    #[test]
    fn grade_prompt_prefills_names() {
        let p = grade_structure_prompt("Lincoln Middle", "Grade 7", "Unit 1: Ratios");
        assert!(p.contains("\"Lincoln Middle\""));
        assert!(p.contains("\"Grade 7\""));
        assert!(p.contains("Unit 1: Ratios"));
    }

    #[test]
    fn match_prompt_counts_batches() {
        let p = match_batch_prompt("Fractions", "Domain: NS, ...", 1, 3);
        assert!(p.contains("batch 2/3"));
        assert!(p.contains("RELEVANCY SCORING GUIDELINES"));
    }

    #[test]
    fn categorize_prompt_rules_differ_by_kind() {
        let s = categorize_prompt("Fractions", "6", "a", CategorizeKind::Skills);
        let t = categorize_prompt("Fractions", "6", "a", CategorizeKind::Standards);
        assert!(s.contains("prerequisite typically taught in lower grades"));
        assert!(t.contains("Extract the grade level from the standard code"));
    }
}
