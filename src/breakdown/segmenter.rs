/*!
 * Splitting a screenplay into bounded chunks.
 *
 * The text is first cut at scene headings so chunks stay coherent, then the
 * scene segments are packed greedily into chunks. A scene that does not fit on
 * its own is cut at line boundaries, and a single line that still does not fit
 * is cut at raw character offsets. All sizes are counted in characters.
 */

use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

use crate::errors::BreakdownError;

use super::model::Chunk;

/// Lines that typically open a new scene: Japanese scene marks (`○ 教室`),
/// numbered headings (`#12`, `S#12`, `シーン12`) and English sluglines.
static SCENE_HEADING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t\u{3000}]*(?:[○◯〇●■◎]|S?#\s*\d|シーン\s*\d|(?:INT|EXT|I/E)[./\s])")
        .expect("Invalid scene heading regex")
});

/// Segmenter for turning a document into chunks
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_chunk_chars: usize,
    overlap_chars: usize,
}

impl Segmenter {
    /// Create a segmenter.
    ///
    /// Chunk text never exceeds `max_chunk_chars`; the part of each chunk that
    /// is new (not repeated overlap) is therefore at most
    /// `max_chunk_chars - overlap_chars` characters.
    pub fn new(max_chunk_chars: usize, overlap_chars: usize) -> Result<Self, BreakdownError> {
        if max_chunk_chars == 0 {
            return Err(BreakdownError::InvalidConfig(
                "max chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap_chars >= max_chunk_chars {
            return Err(BreakdownError::InvalidConfig(format!(
                "overlap ({}) must be smaller than max chunk size ({})",
                overlap_chars, max_chunk_chars
            )));
        }

        Ok(Self {
            max_chunk_chars,
            overlap_chars,
        })
    }

    /// Maximum characters of new text per chunk
    fn body_budget(&self) -> usize {
        self.max_chunk_chars - self.overlap_chars
    }

    /// Split the text into ordered chunks
    pub fn split(&self, text: &str) -> Result<Vec<Chunk>, BreakdownError> {
        if text.is_empty() {
            return Err(BreakdownError::InputEmpty);
        }

        let budget = self.body_budget();
        let segments = scene_segments(text);
        debug!("Found {} scene segment(s) in {} chars", segments.len(), text.chars().count());

        let mut pieces: Vec<&str> = Vec::with_capacity(segments.len());
        for segment in segments {
            if segment.chars().count() <= budget {
                pieces.push(segment);
            } else {
                warn!(
                    "Scene segment of {} chars exceeds chunk budget {}, cutting by lines",
                    segment.chars().count(),
                    budget
                );
                pieces.extend(split_by_lines(segment, budget));
            }
        }

        let bodies = pack(&pieces, budget);

        let mut chunks: Vec<Chunk> = Vec::with_capacity(bodies.len());
        for (index, body) in bodies.into_iter().enumerate() {
            let (prefix, overlap) = match chunks.last() {
                Some(previous) if self.overlap_chars > 0 => tail_chars(&previous.text, self.overlap_chars),
                _ => ("", 0),
            };

            let mut chunk_text = String::with_capacity(prefix.len() + body.len());
            chunk_text.push_str(prefix);
            chunk_text.push_str(&body);
            chunks.push(Chunk::new(index, chunk_text, overlap));
        }

        debug!("Split document into {} chunk(s)", chunks.len());
        Ok(chunks)
    }
}

/// Reassemble the original text from chunks by dropping each overlap prefix
pub fn reconstruct(chunks: &[Chunk]) -> String {
    chunks.iter().map(|chunk| chunk.body()).collect()
}

/// Cut the text at every scene heading; the slices concatenate back to the text
fn scene_segments(text: &str) -> Vec<&str> {
    let mut boundaries: Vec<usize> = SCENE_HEADING_PATTERN
        .find_iter(text)
        .map(|m| m.start())
        .filter(|&start| start > 0)
        .collect();
    boundaries.dedup();

    let mut segments = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for boundary in boundaries {
        segments.push(&text[start..boundary]);
        start = boundary;
    }
    segments.push(&text[start..]);
    segments
}

/// Cut an oversized segment at line boundaries, falling back to character offsets
fn split_by_lines(segment: &str, budget: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut current_len = 0;
    let mut line_start = 0;

    for line in segment.split_inclusive('\n') {
        let line_len = line.chars().count();

        if line_len > budget {
            if current_len > 0 {
                pieces.push(&segment[start..line_start]);
            }
            pieces.extend(split_by_chars(line, budget));
            line_start += line.len();
            start = line_start;
            current_len = 0;
            continue;
        }

        if current_len + line_len > budget && current_len > 0 {
            pieces.push(&segment[start..line_start]);
            start = line_start;
            current_len = 0;
        }
        current_len += line_len;
        line_start += line.len();
    }

    if start < segment.len() {
        pieces.push(&segment[start..]);
    }
    pieces
}

/// Cut a string into pieces of at most `budget` characters
fn split_by_chars(text: &str, budget: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == budget {
            pieces.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Greedily pack pieces into bodies of at most `budget` characters
fn pack(pieces: &[&str], budget: usize) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = piece.chars().count();
        if current_len + piece_len > budget && current_len > 0 {
            bodies.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        bodies.push(current);
    }
    bodies
}

/// The last `count` characters of `text` (or all of it), with their length
fn tail_chars(text: &str, count: usize) -> (&str, usize) {
    let total = text.chars().count();
    if count >= total {
        return (text, total);
    }
    match text.char_indices().nth(total - count) {
        Some((offset, _)) => (&text[offset..], count),
        None => ("", 0),
    }
}
