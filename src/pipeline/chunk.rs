//! Text chunking: bound raw text into word-count chunks.
//!
//! Cleanup calls carry a fixed completion budget, so input has to be bounded
//! before fan-out. Words are the unit rather than bytes or characters because
//! the budget correlates with tokens, and whitespace-split words approximate
//! tokens closely enough at this scale.

/// Split text on whitespace runs into chunks of up to `words_per_chunk`
/// words, each reassembled with single spaces. The final chunk may be
/// shorter; chunks never overlap.
///
/// Pure and total: empty (or all-whitespace) input yields a single
/// empty-string chunk so downstream stages always have at least one unit to
/// process.
pub fn split_into_chunks(text: &str, words_per_chunk: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![String::new()];
    }
    words
        .chunks(words_per_chunk.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_one_empty_chunk() {
        assert_eq!(split_into_chunks("", 550), vec![String::new()]);
        assert_eq!(split_into_chunks("   \n\t ", 550), vec![String::new()]);
    }

    #[test]
    fn short_input_is_one_chunk() {
        let chunks = split_into_chunks("one two three", 550);
        assert_eq!(chunks, vec!["one two three"]);
    }

    #[test]
    fn chunk_count_is_ceil_of_word_count() {
        let text = (0..1101).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_into_chunks(&text, 550);
        assert_eq!(chunks.len(), 3); // ceil(1101 / 550)
        let last_words = chunks.last().unwrap().split_whitespace().count();
        assert_eq!(last_words, 1);
    }

    #[test]
    fn words_are_preserved_in_order() {
        let text = "a  b\tc\nd   e f g";
        let chunks = split_into_chunks(text, 3);
        let rejoined: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let text = "a b c d e f";
        let chunks = split_into_chunks(text, 3);
        assert_eq!(chunks, vec!["a b c", "d e f"]);
    }
}
