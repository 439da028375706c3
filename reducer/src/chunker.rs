use crate::truncate::{byte_offset, char_len};

pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
const WORD_SEPARATOR: &str = " ";

/// Contiguous slice of one input text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the originating text in the request.
    pub source: usize,
    /// Position within that source's chunk sequence.
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits text into ordered pieces of at most `max_chunk_size` chars, breaking
/// on blank lines first and on whitespace inside paragraphs that are too long.
///
/// A single word longer than the limit is emitted whole unless
/// [`Chunker::slice_oversized_words`] is enabled, in which case it is cut into
/// raw fixed-size slices.
#[derive(Clone, Debug)]
pub struct Chunker {
    max_chunk_size: usize,
    slice_oversized_words: bool,
}

impl Chunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            slice_oversized_words: false,
        }
    }

    pub fn slice_oversized_words(mut self, enabled: bool) -> Self {
        self.slice_oversized_words = enabled;
        self
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.max_chunk_size {
            return vec![text.to_string()];
        }

        let parts = paragraphs(text);
        if parts.len() <= 1 {
            return self.split_words(text);
        }

        let mut chunks = Vec::new();
        let mut pending = Vec::new();
        for paragraph in &parts {
            if char_len(paragraph) <= self.max_chunk_size {
                pending.push(paragraph.as_str());
            } else {
                chunks.extend(self.accumulate(std::mem::take(&mut pending), PARAGRAPH_SEPARATOR));
                chunks.extend(self.split_words(paragraph));
            }
        }
        chunks.extend(self.accumulate(pending, PARAGRAPH_SEPARATOR));

        chunks
    }

    pub fn chunk_source(&self, source: usize, text: &str) -> Vec<Chunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                source,
                index,
                text,
            })
            .collect()
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        let mut words = Vec::new();
        for word in text.split_whitespace() {
            if char_len(word) <= self.max_chunk_size {
                words.push(word);
            } else if self.slice_oversized_words {
                words.extend(raw_slices(word, self.max_chunk_size));
            } else {
                tracing::debug!(
                    word_len = char_len(word),
                    max_chunk_size = self.max_chunk_size,
                    "unsplittable word exceeds chunk size, emitting oversized chunk"
                );
                words.push(word);
            }
        }

        self.accumulate(words, WORD_SEPARATOR)
    }

    /// Greedily packs units into buffers; a unit that alone exceeds the limit
    /// becomes its own chunk.
    fn accumulate(&self, units: Vec<&str>, sep: &str) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut chunks = Vec::new();
        let mut buf = String::new();
        let mut buf_len = 0;

        for unit in units {
            let unit_len = char_len(unit);

            if !buf.is_empty() && buf_len + sep_len + unit_len > self.max_chunk_size {
                chunks.push(std::mem::take(&mut buf));
                buf_len = 0;
            }

            if !buf.is_empty() {
                buf.push_str(sep);
                buf_len += sep_len;
            }
            buf.push_str(unit);
            buf_len += unit_len;
        }

        if !buf.is_empty() {
            chunks.push(buf);
        }

        chunks
    }
}

/// Paragraphs separated by lines that are blank after trimming. Lines inside a
/// paragraph are rejoined with `\n`, which also normalizes CRLF.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n").trim().to_string());
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n").trim().to_string());
    }

    paragraphs
}

fn raw_slices(word: &str, size: usize) -> Vec<&str> {
    let mut slices = Vec::new();
    let mut rest = word;
    while !rest.is_empty() {
        let cut = byte_offset(rest, size);
        slices.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    slices
}

/// Shorthand for `Chunker::new(max_chunk_size).chunk(text)`.
pub fn chunk(text: &str, max_chunk_size: usize) -> Vec<String> {
    Chunker::new(max_chunk_size).chunk(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_is_single_chunk() {
        assert_eq!(chunk("  one short text\n", 100), vec!["one short text"]);
        assert!(chunk("   \n\n  ", 100).is_empty());
    }

    #[test]
    fn test_packs_paragraphs_greedily() {
        let text = "aaaa\n\nbbbb\n\ncccc\n\ndddd";
        // "aaaa\n\nbbbb" is 10 chars, adding "cccc" would make 16
        assert_eq!(
            chunk(text, 12),
            vec!["aaaa\n\nbbbb".to_string(), "cccc\n\ndddd".to_string()]
        );
    }

    #[test]
    fn test_oversized_paragraph_is_split_on_words() {
        let big = "x ".repeat(30);
        let text = format!("small\n\n{}\n\ntail", big.trim());
        let chunks = chunk(&text, 20);
        let row = "x x x x x x x x x x";
        assert_eq!(chunks, vec!["small", row, row, row, "tail"]);
        assert!(chunks.iter().all(|c| char_len(c) <= 20));
    }

    #[test]
    fn test_long_paragraph_between_short_ones_respects_limit() {
        let text = format!("intro\n\n{}\n\ntail", "word ".repeat(1000));
        let chunks = chunk(&text, 100);
        assert_eq!(chunks.first().map(String::as_str), Some("intro"));
        assert_eq!(chunks.last().map(String::as_str), Some("tail"));
        assert!(chunks.len() > 50);
        assert!(chunks.iter().all(|c| char_len(c) <= 100));
    }

    #[test]
    fn test_crlf_and_whitespace_only_lines_break_paragraphs() {
        let text = "aaaa\r\nbbbb\r\n\r\ncccc\n  \t \ndddd";
        assert_eq!(
            chunk(text, 10),
            vec!["aaaa\nbbbb".to_string(), "cccc\n\ndddd".to_string()]
        );
    }

    #[test]
    fn test_falls_back_to_words_without_paragraphs() {
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = chunk(text, 11);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta", "epsilon", "zeta"]);
        assert!(chunks.iter().all(|c| char_len(c) <= 11));
    }

    #[test]
    fn test_single_huge_word_is_one_oversized_chunk() {
        let word = "z".repeat(50_000);
        let chunks = chunk(&word, 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(char_len(&chunks[0]), 50_000);
    }

    #[test]
    fn test_huge_word_between_words_stands_alone() {
        let text = format!("lead {} trail", "w".repeat(30));
        assert_eq!(
            chunk(&text, 10),
            vec!["lead".to_string(), "w".repeat(30), "trail".to_string()]
        );
    }

    #[test]
    fn test_raw_slicing_when_enabled() {
        let word = "é".repeat(25);
        let chunks = Chunker::new(10).slice_oversized_words(true).chunk(&word);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| char_len(c)).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn test_preserves_order_and_content() {
        let text = (0..40)
            .map(|i| format!("paragraph number {}", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk(&text, 100);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| char_len(c) <= 100));
        assert_eq!(chunks.join("\n\n"), text);
    }

    #[test]
    fn test_chunk_source_tags_provenance() {
        let chunks = Chunker::new(5).chunk_source(3, "one two three");
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.source == 3));
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(chunks[2].text, "three");
    }

    #[test]
    fn test_deterministic() {
        let text = "a b c d e f g h i j k l m n o p".repeat(20);
        assert_eq!(chunk(&text, 17), chunk(&text, 17));
    }
}
