//! Boundary-aware overlapping text splitter.
//!
//! Splits page text into windows of at most `chunk_size` characters with
//! `chunk_overlap` characters of overlap between consecutive windows. Cuts
//! prefer a paragraph break, then a line break, then a space; a hard
//! character cut is the last resort when a window contains no separator.

/// Chunking constants for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Target chunk size in bytes (UTF-8 boundary snapped)
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in bytes
    pub chunk_overlap: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Separator preference order for window cuts.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split text into overlapping chunks. Returns `(chunk_text, byte_offset)`
/// pairs in document order; whitespace-only windows are dropped.
pub fn split_text(text: &str, config: &SplitConfig) -> Vec<(String, usize)> {
    debug_assert!(config.chunk_overlap < config.chunk_size);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let tentative = snap_down(text, (start + config.chunk_size).min(text.len()));

        if tentative >= text.len() {
            push_chunk(&mut chunks, &text[start..], start);
            break;
        }

        let window = &text[start..tentative];
        let cut = SEPARATORS
            .iter()
            .find_map(|sep| window.rfind(sep).filter(|pos| *pos > 0))
            .map(|pos| start + pos)
            .unwrap_or(tentative);

        // A window narrower than one character snaps down to nothing;
        // take the next whole character so the cursor always advances.
        let cut = if cut > start {
            cut
        } else {
            snap_up(text, start + 1)
        };

        push_chunk(&mut chunks, &text[start..cut], start);

        let next = snap_down(text, cut.saturating_sub(config.chunk_overlap));
        start = if next > start { next } else { cut };
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<(String, usize)>, window: &str, offset: usize) {
    let trimmed = window.trim();
    if !trimmed.is_empty() {
        chunks.push((trimmed.to_string(), offset));
    }
}

/// Snap a byte index down to the nearest UTF-8 character boundary.
fn snap_down(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Snap a byte index up to the nearest UTF-8 character boundary.
fn snap_up(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> SplitConfig {
        SplitConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("hello world", &SplitConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], ("hello world".to_string(), 0));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_text("", &SplitConfig::default()).is_empty());
        assert!(split_text("   \n\n  ", &SplitConfig::default()).is_empty());
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_text(&text, &config(40, 5));
        assert!(chunks.len() >= 2);
        // First cut lands on the paragraph break, not mid-run
        assert_eq!(chunks[0].0, "a".repeat(30));
    }

    #[test]
    fn falls_back_to_space_boundary() {
        let text = format!("{} {}", "a".repeat(30), "b".repeat(30));
        let chunks = split_text(&text, &config(40, 5));
        assert_eq!(chunks[0].0, "a".repeat(30));
    }

    #[test]
    fn hard_cut_without_separators() {
        let text = "x".repeat(2500);
        let chunks = split_text(&text, &config(1000, 200));
        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0].0.len(), 1000);
        // Windows advance by chunk_size - overlap
        assert_eq!(chunks[1].1, 800);
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let words: Vec<String> = (0..200).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let chunks = split_text(&text, &config(200, 50));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            // Second chunk starts before the first one ends
            assert!(second.1 < first.1 + first.0.len() + 1);
            assert!(second.1 > first.1);
        }
    }

    #[test]
    fn offsets_are_ascending() {
        let text = "para one.\n\npara two.\n\npara three.".repeat(50);
        let chunks = split_text(&text, &config(100, 20));
        for pair in chunks.windows(2) {
            assert!(pair[1].1 > pair[0].1);
        }
    }

    #[test]
    fn chunk_narrower_than_one_char_still_advances() {
        // Three-byte characters with a two-byte chunk size: every window
        // snaps down to nothing, so progress must come from the fallback.
        let text = "日本語のテキスト";
        let chunks = split_text(text, &config(2, 1));
        assert_eq!(chunks.len(), text.chars().count());
        assert_eq!(chunks[0], ("日".to_string(), 0));
        let joined: String = chunks.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn multibyte_text_respects_char_boundaries() {
        let text = "é".repeat(1500);
        let chunks = split_text(&text, &config(1000, 200));
        assert!(!chunks.is_empty());
        for (chunk, _) in &chunks {
            // Would panic during slicing if boundaries were wrong; also
            // verify the chunk is valid repetition of the same char.
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }
}
