//! Splits document pages into overlapping sections

use super::models::{ContentPage, Section};
use crate::config::IngestionConfig;
use tracing::debug;

const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];
const WORD_BREAKS: [char; 12] = [',', ';', ':', ' ', '(', ')', '[', ']', '{', '}', '\t', '\n'];

fn is_sentence_ending(c: char) -> bool {
    SENTENCE_ENDINGS.contains(&c)
}

fn is_word_break(c: char) -> bool {
    WORD_BREAKS.contains(&c)
}

/// Sentence aware text splitter
///
/// Sections are at most `max_section_length` characters, extended by up to
/// `sentence_search_limit` characters to end on a sentence, and consecutive
/// sections share roughly `section_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_section_length: usize,
    sentence_search_limit: usize,
    section_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(&IngestionConfig::default())
    }
}

impl TextSplitter {
    pub fn new(config: &IngestionConfig) -> Self {
        Self {
            max_section_length: config.max_section_length,
            sentence_search_limit: config.sentence_search_limit,
            section_overlap: config.section_overlap,
        }
    }

    /// Split pages into sections, each attributed to the page it starts on
    pub fn split(&self, pages: &[ContentPage]) -> Vec<Section> {
        if pages.is_empty() {
            return Vec::new();
        }

        let text: Vec<char> = pages.iter().flat_map(|p| p.content.chars()).collect();
        let sections: Vec<Section> = self
            .section_bounds(&text)
            .into_iter()
            .map(|(start, end)| Section {
                content: text[start..end].iter().collect(),
                page: find_page(pages, start),
            })
            .collect();

        debug!(
            chars = text.len(),
            pages = pages.len(),
            sections = sections.len(),
            "Split document into sections"
        );
        sections
    }

    /// Character ranges of each section in `text`
    fn section_bounds(&self, text: &[char]) -> Vec<(usize, usize)> {
        let length = text.len();
        let max = self.max_section_length;
        let limit = self.sentence_search_limit;
        let overlap = self.section_overlap;

        let mut bounds = Vec::new();
        let mut start = 0;
        let mut end = length;

        while start + overlap < length {
            let section_start = start;
            end = start + max;

            if end > length {
                end = length;
            } else {
                let mut last_word = None;
                while end < length && end - start - max < limit && !is_sentence_ending(text[end]) {
                    if is_word_break(text[end]) {
                        last_word = Some(end);
                    }
                    end += 1;
                }
                if end < length && !is_sentence_ending(text[end]) {
                    if let Some(word) = last_word.filter(|w| *w > 0) {
                        end = word;
                    }
                }
                if end < length {
                    end += 1;
                }
            }

            // Move the start back to a sentence or at least a word boundary
            let mut last_word = None;
            let floor = end.saturating_sub(max + 2 * limit);
            while start > 0 && start > floor && !is_sentence_ending(text[start]) {
                if is_word_break(text[start]) {
                    last_word = Some(start);
                }
                start -= 1;
            }
            if !is_sentence_ending(text[start]) {
                if let Some(word) = last_word.filter(|w| *w > 0) {
                    start = word;
                }
            }
            if start > 0 {
                start += 1;
            }

            bounds.push((start, end));

            // An unclosed table restarts the next section at the table
            let section = &text[start..end];
            let next = match rfind(section, "<table") {
                Some(table) if table > 2 * limit && Some(table) > rfind(section, "</table") => {
                    debug!(offset = start, table_start = table, "Section ends inside a table");
                    (end - overlap).min(start + table)
                }
                _ => end.saturating_sub(overlap),
            };
            start = if next > section_start { next } else { section_start + 1 };
        }

        if bounds.is_empty() && start < end {
            bounds.push((start, end));
        }

        bounds
    }
}

/// Page on which the character at `offset` lies
fn find_page(pages: &[ContentPage], offset: usize) -> u32 {
    pages
        .windows(2)
        .find(|w| offset >= w[0].offset && offset < w[1].offset)
        .map(|w| w[0].page)
        .or_else(|| pages.last().map(|p| p.page))
        .unwrap_or_default()
}

/// Last character index at which `needle` occurs in `haystack`
fn rfind(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == needle[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_splitter() -> TextSplitter {
        TextSplitter::new(&IngestionConfig {
            max_section_length: 50,
            sentence_search_limit: 10,
            section_overlap: 10,
            category: None,
        })
    }

    fn single_page(text: &str) -> Vec<ContentPage> {
        vec![ContentPage { content: text.to_string(), offset: 0, page: 0 }]
    }

    #[test]
    fn test_short_text_is_one_section() {
        let sections = TextSplitter::default().split(&single_page("Rent is due on the first."));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "Rent is due on the first.");
        assert_eq!(sections[0].page, 0);
    }

    #[test]
    fn test_no_pages_no_sections() {
        assert!(TextSplitter::default().split(&[]).is_empty());
    }

    #[test]
    fn test_sections_end_on_sentences_and_overlap() {
        let splitter = small_splitter();
        let text: Vec<char> = "The tenant pays rent. ".repeat(10).chars().collect();
        let bounds = splitter.section_bounds(&text);

        assert_eq!(bounds[0], (0, 60));
        assert_eq!(bounds[1], (43, 109));
        assert_eq!(bounds.last().unwrap().1, text.len());

        for pair in bounds.windows(2) {
            let ((start, end), (next_start, _)) = (pair[0], pair[1]);
            assert!(next_start < end, "sections must overlap");
            assert!(next_start > start);
            let last = text[end - 1];
            assert!(is_sentence_ending(last) || is_word_break(last));
        }
        for (start, end) in &bounds {
            assert!(end - start <= 50 + 2 * 10 + 1);
        }
    }

    #[test]
    fn test_page_attribution() {
        let first = "Alpha beta gamma. ".repeat(9);
        let second = "Delta epsilon zeta. ".repeat(8);
        let pages = vec![
            ContentPage { content: first.clone(), offset: 0, page: 1 },
            ContentPage { content: second, offset: first.chars().count(), page: 2 },
        ];

        let sections = small_splitter().split(&pages);
        assert!(sections.len() > 2);
        assert_eq!(sections[0].page, 1);
        assert_eq!(sections.last().unwrap().page, 2);
        assert!(sections.windows(2).all(|w| w[0].page <= w[1].page));
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "Les loyers sont dûs à l'échéance, ou après préavis. ".repeat(60);
        let sections = TextSplitter::default().split(&single_page(&text));
        assert!(sections.len() > 1);
        for section in &sections {
            assert!(text.contains(&section.content));
        }
    }

    #[test]
    fn test_unclosed_table_starts_next_section() {
        let text = format!("Intro words here and there. <table>{}", "<tr><td>cell value</td></tr> ".repeat(6));
        let sections = small_splitter().split(&single_page(&text));
        assert!(sections.len() > 1);
        assert!(sections[1].content.trim_start().starts_with("<table"));
    }

    #[test]
    fn test_rfind_chars() {
        let hay: Vec<char> = "a<table>b<table>".chars().collect();
        assert_eq!(rfind(&hay, "<table"), Some(9));
        assert_eq!(rfind(&hay, "</table"), None);
    }
}
