use super::aggregate::DOCUMENT_BOUNDARY;

pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 6000;

/// Picks a representative excerpt of a combined multi-document text that
/// fits a fixed character budget, giving every document a fair share of its
/// leading content. Lengths are counted in characters.
#[derive(Debug, Clone, Copy)]
pub struct TextBudgetAllocator {
    max_chars: usize,
}

impl Default for TextBudgetAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCERPT_CHARS)
    }
}

fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

impl TextBudgetAllocator {
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    #[must_use]
    pub fn allocate(&self, combined: &str) -> String {
        if combined.chars().count() <= self.max_chars {
            return combined.to_string();
        }

        let segments: Vec<&str> = combined
            .split(DOCUMENT_BOUNDARY)
            .filter(|segment| !segment.is_empty())
            .collect();

        let mut excerpt = String::with_capacity(self.max_chars);
        let mut remaining_budget = self.max_chars;
        let mut remaining_segments = segments.len();

        for segment in segments {
            if remaining_budget == 0 {
                break;
            }

            let share = remaining_budget / remaining_segments;
            let taken = char_prefix(segment, share);
            let consumed = taken.chars().count();

            tracing::debug!(share, consumed, "Allocated segment budget");

            excerpt.push_str(taken);
            remaining_budget -= consumed;
            remaining_segments -= 1;
        }

        excerpt
    }
}
