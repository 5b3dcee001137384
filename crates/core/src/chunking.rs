//! Paragraph-aware text splitting for the document index.

use crate::domain::chunk::DocumentChunk;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSplitter {
    max_chars: usize,
    overlap_chars: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(800, 100)
    }
}

impl TextSplitter {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self { max_chars, overlap_chars: overlap_chars.min(max_chars - 1) }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Splits `text` into trimmed, non-empty chunks.
    ///
    /// Paragraphs (separated by blank lines) are packed together while they
    /// fit in `max_chars`. A paragraph that is longer on its own is cut into
    /// word windows, each starting with up to `overlap_chars` of the previous
    /// window's tail. Only a single word longer than `max_chars` can produce
    /// an oversized chunk.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in paragraphs(text) {
            let paragraph_len = char_len(&paragraph);

            if paragraph_len > self.max_chars {
                flush(&mut chunks, &mut current);
                chunks.extend(self.split_words(&paragraph));
                continue;
            }

            if current.is_empty() {
                current = paragraph;
            } else if char_len(&current) + 2 + paragraph_len <= self.max_chars {
                current.push_str("\n\n");
                current.push_str(&paragraph);
            } else {
                flush(&mut chunks, &mut current);
                current = paragraph;
            }
        }
        flush(&mut chunks, &mut current);

        chunks
    }

    /// Splits a whole document into positioned chunks for `source`.
    pub fn split_document(
        &self,
        source: &str,
        text: &str,
    ) -> Result<Vec<DocumentChunk>, DomainError> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(position, chunk)| {
                let position = u32::try_from(position).map_err(|_| {
                    DomainError::Validation(format!("document `{source}` has too many chunks"))
                })?;
                DocumentChunk::new(source, position, chunk)
            })
            .collect()
    }

    fn split_words(&self, paragraph: &str) -> Vec<String> {
        let mut windows = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut fresh_words = 0usize;

        for word in paragraph.split_whitespace() {
            let word_len = char_len(word);

            if fresh_words > 0 && joined_len(&window) + 1 + word_len > self.max_chars {
                windows.push(window.join(" "));
                let mut tail = self.overlap_tail(&window);
                while !tail.is_empty() && joined_len(&tail) + 1 + word_len > self.max_chars {
                    tail.remove(0);
                }
                window = tail;
                fresh_words = 0;
            }

            window.push(word);
            fresh_words += 1;
        }

        if fresh_words > 0 {
            windows.push(window.join(" "));
        }
        windows
    }

    fn overlap_tail<'a>(&self, window: &[&'a str]) -> Vec<&'a str> {
        let mut tail = Vec::new();
        let mut len = 0usize;

        for word in window.iter().rev() {
            let added = if tail.is_empty() { char_len(word) } else { char_len(word) + 1 };
            if len + added > self.overlap_chars {
                break;
            }
            len += added;
            tail.push(*word);
        }

        tail.reverse();
        tail
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line.trim_end());
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }

    paragraphs
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn joined_len(words: &[&str]) -> usize {
    if words.is_empty() {
        return 0;
    }
    words.iter().map(|word| char_len(word)).sum::<usize>() + words.len() - 1
}

#[cfg(test)]
mod tests {
    use super::TextSplitter;

    #[test]
    fn short_document_stays_in_one_chunk() {
        let splitter = TextSplitter::new(200, 20);
        let chunks = splitter.split("Leave Policy\n\nEmployees accrue 1.5 days per month.");

        assert_eq!(chunks, vec!["Leave Policy\n\nEmployees accrue 1.5 days per month."]);
    }

    #[test]
    fn paragraphs_are_packed_until_the_limit() {
        let splitter = TextSplitter::new(40, 5);
        let text = "First paragraph here.\n\nSecond one.\n\nThird paragraph is longer.";
        let chunks = splitter.split(text);

        assert_eq!(
            chunks,
            vec!["First paragraph here.\n\nSecond one.", "Third paragraph is longer."]
        );
    }

    #[test]
    fn long_paragraph_is_split_into_overlapping_windows() {
        let splitter = TextSplitter::new(30, 10);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunks = splitter.split(text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 30));
        for pair in chunks.windows(2) {
            let previous_last = pair[0].split_whitespace().last().expect("non-empty window");
            assert!(
                pair[1].split_whitespace().any(|word| word == previous_last),
                "window `{}` should carry over `{previous_last}`",
                pair[1]
            );
        }
        let rebuilt: Vec<&str> = chunks.iter().flat_map(|chunk| chunk.split_whitespace()).collect();
        for word in text.split_whitespace() {
            assert!(rebuilt.contains(&word), "`{word}` should survive splitting");
        }
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(TextSplitter::default().split(" \n\n \t").is_empty());
    }

    #[test]
    fn split_document_assigns_positions_and_ids() {
        let splitter = TextSplitter::new(30, 0);
        let chunks = splitter
            .split_document("hr.txt", "Section one text.\n\nSection two has more text.")
            .expect("chunks");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id.0, "hr.txt#0");
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].text, "Section two has more text.");
    }
}
