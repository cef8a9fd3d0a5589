//! Text chunking for the retrieval index.
//!
//! Splits a document into overlapping chunks of at most `chunk_size`
//! characters, preferring to break at paragraph, line, and word boundaries
//! in that order. Consecutive chunks share `overlap` characters of context.

/// Split `text` into overlapping chunks.
///
/// Chunks are trimmed; empty chunks are dropped. Operates on characters,
/// never splitting inside a multi-byte codepoint.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    // An overlap as large as the chunk would stall the scan.
    let overlap = overlap.min(chunk_size / 2);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end < chars.len() {
            find_break(&chars, start, hard_end)
        } else {
            hard_end
        };

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }

        let mut next = end.saturating_sub(overlap);
        if next <= start {
            next = end;
        }
        start = next;
    }

    chunks
}

/// Pick a break point in `(start..end]`, scanning backward no further than
/// the midpoint so chunks never collapse below half the target size.
fn find_break(chars: &[char], start: usize, end: usize) -> usize {
    let min = start + (end - start) / 2;

    // Paragraph boundary
    for i in (min..end).rev() {
        if i > start && chars[i] == '\n' && chars[i - 1] == '\n' {
            return i + 1;
        }
    }
    // Line boundary
    for i in (min..end).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }
    // Word boundary
    for i in (min..end).rev() {
        if chars[i] == ' ' {
            return i + 1;
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_text("A short note.", 1000, 200);
        assert_eq!(chunks, vec!["A short note.".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_text("", 1000, 200).is_empty());
        assert!(split_text("   \n\n  ", 1000, 200).is_empty());
    }

    #[test]
    fn test_long_text_respects_chunk_size() {
        let text = "word ".repeat(500);
        let chunks = split_text(&text, 100, 20);
        assert!(chunks.len() > 1, "long text must be split");
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 100,
                "chunk exceeds size: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn test_chunks_cover_all_content() {
        let paragraphs: Vec<String> = (0..40).map(|i| format!("paragraph-{i} body text")).collect();
        let text = paragraphs.join("\n\n");
        let chunks = split_text(&text, 120, 30);
        let joined = chunks.join("\n");
        for p in &paragraphs {
            let marker = p.split(' ').next().unwrap();
            assert!(joined.contains(marker), "lost content: {marker}");
        }
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let first = "a".repeat(80);
        let second = "b".repeat(80);
        let text = format!("{first}\n\n{second}");
        let chunks = split_text(&text, 100, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], first, "split should land on the paragraph break");
        assert_eq!(chunks[1], second);
    }

    #[test]
    fn test_breaks_at_word_boundary_without_newlines() {
        let text = "alpha beta gamma delta ".repeat(20);
        let chunks = split_text(&text, 50, 10);
        for chunk in &chunks {
            assert!(
                !chunk.starts_with(char::is_whitespace) && !chunk.ends_with(char::is_whitespace),
                "chunks are trimmed: {chunk:?}"
            );
        }
    }

    #[test]
    fn test_unbreakable_text_hard_cuts() {
        let text = "x".repeat(250);
        let chunks = split_text(&text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "日本語のテキスト ".repeat(40);
        let chunks = split_text(&text, 30, 5);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
    }
}
