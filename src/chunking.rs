//! Sliding-window text splitting with natural break points.
//!
//! [`split_text`] walks a text in character windows of `chunk_size`, trims
//! each window back to the latest paragraph, sentence, or word boundary it
//! contains, and restarts the next window `chunk_overlap` characters before
//! the previous cut. Offsets are character offsets into the source text, so
//! chunks reassemble into the original exactly.

use unicode_segmentation::UnicodeSegmentation;

use crate::types::RagError;

/// A contiguous slice of a source text.
///
/// `start..end` are character offsets; `text` is exactly the characters in
/// that range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    /// Chunk length in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `text` into chunks of at most `chunk_size` characters, with
/// consecutive chunks sharing `chunk_overlap` characters where possible.
///
/// Cuts prefer, in order: the last paragraph break (`\n\n`) in the window,
/// the last sentence boundary, the last word boundary, and finally a hard
/// cut at the window edge. A candidate boundary is only taken when it keeps
/// at least half the window, so pathological inputs degrade to fixed-size
/// windows instead of slivers.
///
/// Empty input yields no chunks. Fails when `chunk_size` is zero or
/// `chunk_overlap >= chunk_size`, since the window could not advance.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, RagError> {
    if chunk_size == 0 {
        return Err(RagError::Chunking("chunk_size must be at least 1".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::Chunking(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let hard_end = (start + chunk_size).min(total);
        let end = if hard_end < total {
            pick_break(&chars, start, hard_end, chunk_size, chunk_overlap)
        } else {
            total
        };
        chunks.push(Chunk {
            text: chars[start..end].iter().collect(),
            start,
            end,
        });
        if end == total {
            break;
        }
        // Never step backwards past the previous start, even when the
        // overlap would reach there.
        start = end.saturating_sub(chunk_overlap).max(start + 1);
    }
    Ok(chunks)
}

/// Picks the cut for the window `chars[start..hard_end]`.
///
/// Any accepted boundary must keep `min_keep` characters, which also keeps
/// every cut ahead of the overlap so chunk ends strictly advance.
fn pick_break(
    chars: &[char],
    start: usize,
    hard_end: usize,
    chunk_size: usize,
    chunk_overlap: usize,
) -> usize {
    let window = &chars[start..hard_end];
    let min_keep = (chunk_size / 2).max(chunk_overlap + 1).max(1);

    if let Some(cut) = paragraph_cut(window, min_keep) {
        return start + cut;
    }
    let text: String = window.iter().collect();
    if let Some(cut) = boundary_cut(&text, window.len(), min_keep, BoundaryKind::Sentence) {
        return start + cut;
    }
    if let Some(cut) = boundary_cut(&text, window.len(), min_keep, BoundaryKind::Word) {
        return start + cut;
    }
    hard_end
}

/// Character offset just past the last `\n\n` in the window, if any
/// qualifies.
fn paragraph_cut(window: &[char], min_keep: usize) -> Option<usize> {
    let mut best = None;
    for i in 0..window.len().saturating_sub(1) {
        if window[i] == '\n' && window[i + 1] == '\n' {
            let cut = i + 2;
            if cut >= min_keep {
                best = Some(cut);
            }
        }
    }
    best
}

#[derive(Clone, Copy)]
enum BoundaryKind {
    Sentence,
    Word,
}

/// Character offset of the last qualifying segmentation boundary strictly
/// inside the window.
fn boundary_cut(
    text: &str,
    window_len: usize,
    min_keep: usize,
    kind: BoundaryKind,
) -> Option<usize> {
    let bounds: Vec<usize> = match kind {
        BoundaryKind::Sentence => text
            .split_sentence_bound_indices()
            .map(|(idx, seg)| idx + seg.len())
            .collect(),
        BoundaryKind::Word => text
            .split_word_bound_indices()
            .map(|(idx, seg)| idx + seg.len())
            .collect(),
    };

    let mut best = None;
    for byte_end in bounds {
        if byte_end >= text.len() {
            // The trailing boundary is the hard cut, not a natural one.
            continue;
        }
        let cut = text[..byte_end].chars().count();
        if cut >= min_keep && cut < window_len {
            best = Some(cut);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts_of(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("tiny", 10, 2).unwrap();
        assert_eq!(texts_of(&chunks), ["tiny"]);
        assert_eq!((chunks[0].start, chunks[0].end), (0, 4));
    }

    #[test]
    fn uniform_text_splits_at_window_edges() {
        let chunks = split_text("AAAA", 2, 0).unwrap();
        assert_eq!(texts_of(&chunks), ["AA", "AA"]);
    }

    #[test]
    fn cuts_fall_on_word_boundaries() {
        let chunks = split_text("alpha beta gamma delta", 12, 0).unwrap();
        assert_eq!(texts_of(&chunks), ["alpha beta ", "gamma delta"]);
    }

    #[test]
    fn cuts_prefer_sentence_boundaries() {
        let chunks = split_text("First sentence. Second sentence here.", 20, 0).unwrap();
        assert_eq!(
            texts_of(&chunks),
            ["First sentence. ", "Second sentence ", "here."]
        );
    }

    #[test]
    fn cuts_prefer_paragraph_breaks() {
        let chunks = split_text("Para one.\n\nPara two continues here.", 20, 0).unwrap();
        assert_eq!(
            texts_of(&chunks),
            ["Para one.\n\n", "Para two continues ", "here."]
        );
    }

    #[test]
    fn unbreakable_text_overlaps_exactly() {
        let text = "x".repeat(100);
        let chunks = split_text(&text, 40, 10).unwrap();
        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, [(0, 40), (30, 70), (60, 100)]);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(matches!(
            split_text("text", 0, 0),
            Err(RagError::Chunking(_))
        ));
    }

    #[test]
    fn rejects_overlap_at_or_above_chunk_size() {
        assert!(matches!(
            split_text("text", 4, 4),
            Err(RagError::Chunking(_))
        ));
        assert!(matches!(
            split_text("text", 4, 9),
            Err(RagError::Chunking(_))
        ));
    }

    proptest! {
        #[test]
        fn chunks_cover_the_text(
            text in "[ -~\\n]{0,300}",
            (chunk_size, chunk_overlap) in (2usize..40).prop_flat_map(|size| (Just(size), 0..size)),
        ) {
            let chunks = split_text(&text, chunk_size, chunk_overlap).unwrap();
            let chars: Vec<char> = text.chars().collect();

            prop_assert_eq!(chunks.is_empty(), chars.is_empty());
            if chunks.is_empty() {
                return Ok(());
            }

            prop_assert_eq!(chunks[0].start, 0);
            prop_assert_eq!(chunks.last().unwrap().end, chars.len());
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
                prop_assert!(pair[1].start <= pair[0].end);
                prop_assert!(pair[1].end > pair[0].end);
            }
            for chunk in &chunks {
                prop_assert!(chunk.len() <= chunk_size);
                let expected: String = chars[chunk.start..chunk.end].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
            }

            let mut rebuilt = String::new();
            let mut covered = 0usize;
            for chunk in &chunks {
                let skip = covered - chunk.start;
                rebuilt.extend(chunk.text.chars().skip(skip));
                covered = chunk.end;
            }
            prop_assert_eq!(rebuilt, text);
        }
    }
}
