//! Break point detection for chunking

use unicode_segmentation::UnicodeSegmentation;

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Sentence boundary
    Sentence = 2,
    /// Paragraph boundary (highest)
    Paragraph = 3,
}

/// A potential break point in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPoint {
    /// Character position where the next chunk would start
    pub position: usize,
    /// Priority of this break point
    pub priority: BreakPriority,
}

impl BreakPoint {
    pub fn new(position: usize, priority: BreakPriority) -> Self {
        Self { position, priority }
    }
}

/// Find break points in `text`, sorted by character position
///
/// When several kinds coincide at one position only the highest priority
/// is kept.
pub fn find_break_points(text: &str) -> Vec<BreakPoint> {
    let mut points = Vec::new();

    // Byte offset -> char position
    let mut char_pos_of_byte = vec![0usize; text.len() + 1];
    let mut prev: Option<char> = None;
    let mut char_count = 0;
    for (byte_idx, c) in text.char_indices() {
        char_pos_of_byte[byte_idx] = char_count;
        if let Some(p) = prev {
            if p == '\n' && c != '\n' && text[..byte_idx].ends_with("\n\n") {
                points.push(BreakPoint::new(char_count, BreakPriority::Paragraph));
            }
            if p.is_whitespace() && !c.is_whitespace() {
                points.push(BreakPoint::new(char_count, BreakPriority::Word));
            }
        }
        prev = Some(c);
        char_count += 1;
    }
    char_pos_of_byte[text.len()] = char_count;

    for (byte_idx, _) in text.split_sentence_bound_indices() {
        if byte_idx > 0 {
            points.push(BreakPoint::new(
                char_pos_of_byte[byte_idx],
                BreakPriority::Sentence,
            ));
        }
    }

    // Sort by position, highest priority first within a position
    points.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(b.priority.cmp(&a.priority))
    });
    points.dedup_by_key(|p| p.position);

    points
}

/// Pick the best break in `[min_pos, max_pos]`: highest priority, then latest
pub fn best_break(points: &[BreakPoint], min_pos: usize, max_pos: usize) -> Option<usize> {
    let lo = points.partition_point(|p| p.position < min_pos);
    let hi = points.partition_point(|p| p.position <= max_pos);

    points[lo..hi]
        .iter()
        .max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.position.cmp(&b.position))
        })
        .map(|p| p.position)
}
