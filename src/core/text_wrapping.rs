//! Word wrapping for transcript lines.
//!
//! The transcript is pre-wrapped here and rendered without ratatui's own
//! wrapping, so the line count used for scrolling always matches what is on
//! screen. Widths are display columns, so wide glyphs count double.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wrap `text` to `width` columns. Explicit newlines are kept; an empty
/// input still yields one (empty) line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|line| wrap_line(line, width))
        .collect()
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || UnicodeWidthStr::width(line) <= width {
        return vec![line.to_string()];
    }

    let mut builder = LineBuilder::new(width);
    for segment in segments(line) {
        if segment.starts_with(char::is_whitespace) {
            builder.push_spaces(segment);
        } else {
            builder.push_word(segment);
        }
    }
    builder.finish()
}

/// Split a line into alternating runs of whitespace and non-whitespace.
fn segments(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in line.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                out.push(&line[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < line.len() {
        out.push(&line[start..]);
    }
    out
}

struct LineBuilder {
    width: usize,
    lines: Vec<String>,
    current: String,
    current_width: usize,
}

impl LineBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: String::new(),
            current_width: 0,
        }
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        self.lines.push(line.trim_end().to_string());
        self.current_width = 0;
    }

    fn push_word(&mut self, word: &str) {
        let word_width = UnicodeWidthStr::width(word);
        if self.current_width + word_width <= self.width {
            self.current.push_str(word);
            self.current_width += word_width;
            return;
        }
        if self.current_width > 0 {
            self.break_line();
        }
        if word_width <= self.width {
            self.current.push_str(word);
            self.current_width = word_width;
            return;
        }
        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if self.current_width + ch_width > self.width && self.current_width > 0 {
                self.break_line();
            }
            self.current.push(ch);
            self.current_width += ch_width;
        }
    }

    fn push_spaces(&mut self, spaces: &str) {
        let spaces_width = UnicodeWidthStr::width(spaces);
        if self.current_width + spaces_width < self.width {
            self.current.push_str(spaces);
            self.current_width += spaces_width;
        } else if self.current_width > 0 {
            // Whitespace at a soft break is dropped.
            self.break_line();
        }
    }

    fn finish(mut self) -> Vec<String> {
        if self.current_width > 0 || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(wrap_text("hello  world", 20), vec!["hello  world"]);
        assert_eq!(wrap_text("", 20), vec![""]);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn keeps_explicit_newlines_and_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn breaks_words_longer_than_the_width() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wide_glyphs_count_double() {
        let lines = wrap_text("日本語テキスト", 6);
        assert_eq!(lines, vec!["日本語", "テキス", "ト"]);
        assert!(lines.iter().all(|line| UnicodeWidthStr::width(line.as_str()) <= 6));
    }

    #[test]
    fn interior_spacing_is_preserved() {
        assert_eq!(wrap_text("a  b   cccccc", 8), vec!["a  b", "cccccc"]);
    }

    #[test]
    fn zero_width_disables_wrapping() {
        assert_eq!(wrap_text("anything goes", 0), vec!["anything goes"]);
    }
}
