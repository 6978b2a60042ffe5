//! Session-wide list of labels the annotator has used so far.
//!
//! Labels are matched by exact text (case and whitespace kept). The list only
//! grows, keeps insertion order and never holds the same text twice.

use crate::models::Label;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    labels: Vec<Label>,
}

/// What one answer at the label prompt means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelChoice {
    /// A 1-based position in the list shown to the annotator
    Existing(usize),
    /// A number past the end of the list: ask for the new label's name
    CreateNew,
    /// Free text used as the label itself
    Literal(String),
    /// Empty answer
    Skip,
}

/// Outcome of resolving a choice against the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Reused(Label),
    Added(Label),
    NeedsName,
    Skipped,
}

impl Resolution {
    pub fn label(&self) -> Option<&Label> {
        match self {
            Resolution::Reused(label) | Resolution::Added(label) => Some(label),
            Resolution::NeedsName | Resolution::Skipped => None,
        }
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.as_str() == text)
    }

    /// Classify raw prompt input. The input is trimmed; a string of ASCII
    /// digits is an index, and an index in range always wins over treating
    /// the digits as a label name.
    pub fn parse_choice(&self, input: &str) -> LabelChoice {
        let input = input.trim();
        if input.is_empty() {
            return LabelChoice::Skip;
        }

        if input.bytes().all(|b| b.is_ascii_digit()) {
            return match input.parse::<usize>() {
                Ok(n) if (1..=self.labels.len()).contains(&n) => LabelChoice::Existing(n),
                _ => LabelChoice::CreateNew,
            };
        }

        LabelChoice::Literal(input.to_string())
    }

    /// Turn a prompt answer into a label, adding it when new.
    pub fn resolve(&mut self, input: &str) -> Resolution {
        match self.parse_choice(input) {
            LabelChoice::Existing(n) => Resolution::Reused(self.labels[n - 1].clone()),
            LabelChoice::CreateNew => Resolution::NeedsName,
            LabelChoice::Literal(text) => self.intern(&text),
            LabelChoice::Skip => Resolution::Skipped,
        }
    }

    /// Resolve the name typed after choosing "create new label".
    /// Digits are taken literally here; the index step is already over.
    pub fn resolve_new_name(&mut self, input: &str) -> Resolution {
        let name = input.trim();
        if name.is_empty() {
            return Resolution::Skipped;
        }
        self.intern(name)
    }

    /// Return the stored label with this text, appending it first if absent.
    pub fn intern(&mut self, text: &str) -> Resolution {
        if let Some(existing) = self.get(text) {
            return Resolution::Reused(existing.clone());
        }
        match Label::new(text) {
            Some(label) => {
                self.labels.push(label.clone());
                Resolution::Added(label)
            }
            None => Resolution::Skipped,
        }
    }
}
