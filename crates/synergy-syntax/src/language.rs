//! The keyword language model.
//!
//! A [`Language`] is an ordered list of [`Group`]s. Classifying a token
//! walks the groups top-down and the first group whose lexicon contains the
//! token keeps it, so declaration order is priority order: operator-like
//! `Special` groups should come before catch-all word groups.
//!
//! Matches accumulate in their group until [`Language::apply_styling`]
//! writes them to the surface in one batch and forgets them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use synergy_buffer::{Position, StyleProperty, TextSurface};

use crate::trie::Trie;

/// How a group's words take part in tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupKind {
    /// Ordinary words
    #[default]
    Normal,
    /// Single-character operators; they also split tokens
    Special,
    /// Comment markers
    Commentaries,
}

/// A token waiting to be styled.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub start: Position,
    pub end: Position,
    pub word: String,
}

/// A lexicon with the styles its words receive.
#[derive(Debug, Clone)]
pub struct Group {
    kind: GroupKind,
    keywords: Trie,
    /// ASCII punctuation used inside the group's words
    punctuation: HashSet<char>,
    styles: Vec<StyleProperty>,
    pending: Vec<Match>,
}

impl Group {
    pub fn new<S: AsRef<str>>(
        kind: GroupKind,
        keywords: impl IntoIterator<Item = S>,
        styles: Vec<StyleProperty>,
    ) -> Self {
        let mut punctuation = HashSet::new();
        let keywords = keywords
            .into_iter()
            .inspect(|word| {
                punctuation.extend(word.as_ref().chars().filter(|ch| ch.is_ascii_punctuation()))
            })
            .collect();
        Self {
            kind,
            keywords,
            punctuation,
            styles,
            pending: Vec::new(),
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn styles(&self) -> &[StyleProperty] {
        &self.styles
    }

    pub fn contains(&self, word: &str) -> bool {
        self.keywords.search(word)
    }

    /// Keeps the match iff the lexicon holds its exact word.
    pub fn try_put(&mut self, candidate: &Match) -> bool {
        if !self.keywords.search(&candidate.word) {
            return false;
        }
        self.pending.push(candidate.clone());
        true
    }

    pub fn pending(&self) -> &[Match] {
        &self.pending
    }

    /// Applies every style to every pending match, then forgets them.
    ///
    /// A span the surface refuses (usually because an edit made one of its
    /// positions stale) is skipped; the rest of the batch still goes
    /// through. Returns the number of styles written.
    pub fn apply_styling<S: TextSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let mut applied = 0;
        for pending in &self.pending {
            for style in &self.styles {
                match surface.apply_style(&pending.start, &pending.end, style) {
                    Ok(()) => applied += 1,
                    Err(e) => tracing::trace!("Skipping style for {:?}: {}", pending.word, e),
                }
            }
        }
        self.pending.clear();
        applied
    }
}

/// A named keyword language.
#[derive(Debug, Clone)]
pub struct Language {
    name: String,
    extensions: Vec<String>,
    groups: Vec<Group>,
}

impl Language {
    pub fn new(name: impl Into<String>, extensions: Vec<String>, groups: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            extensions,
            groups,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extensions, with the leading dot.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Offers a match to each group in order; the first taker wins.
    pub fn try_put(&mut self, candidate: &Match) -> bool {
        self.groups.iter_mut().any(|group| group.try_put(candidate))
    }

    /// True iff a `Special` group contains `ch` as a one-character word.
    pub fn is_special(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        let word = ch.encode_utf8(&mut buf);
        self.groups
            .iter()
            .filter(|group| group.kind == GroupKind::Special)
            .any(|group| group.contains(word))
    }

    /// True iff a `Normal` or `Commentaries` word contains the punctuation
    /// character `ch`, so it must not split tokens.
    pub fn is_word_punctuation(&self, ch: char) -> bool {
        self.groups
            .iter()
            .filter(|group| group.kind != GroupKind::Special)
            .any(|group| group.punctuation.contains(&ch))
    }

    /// Every match accepted since the last styling pass.
    pub fn pending_matches(&self) -> impl Iterator<Item = &Match> {
        self.groups.iter().flat_map(|group| group.pending.iter())
    }

    /// Writes all pending matches of all groups. Returns styles written.
    pub fn apply_styling<S: TextSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        self.groups
            .iter_mut()
            .map(|group| group.apply_styling(surface))
            .sum()
    }

    /// Drops pending matches without styling them.
    pub fn clear_pending(&mut self) {
        for group in &mut self.groups {
            group.pending.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synergy_buffer::{Brush, Color, FontWeight, RichDocument};

    fn blue() -> StyleProperty {
        StyleProperty::Foreground(Brush::Solid(Color::rgb(0, 0, 255)))
    }

    fn c_like() -> Language {
        Language::new(
            "C",
            vec![".c".to_string()],
            vec![
                Group::new(GroupKind::Special, ["=", ";"], vec![blue()]),
                Group::new(
                    GroupKind::Normal,
                    ["int", "return", "="],
                    vec![StyleProperty::FontWeight(FontWeight::BOLD)],
                ),
            ],
        )
    }

    fn match_at(doc: &RichDocument, from: usize, to: usize, word: &str) -> Match {
        Match {
            start: doc.position_at_offset(from).unwrap(),
            end: doc.position_at_offset(to).unwrap(),
            word: word.to_string(),
        }
    }

    #[test]
    fn test_first_group_wins() {
        let doc = RichDocument::from("x = 1");
        let mut language = c_like();

        assert!(language.try_put(&match_at(&doc, 2, 3, "=")));
        assert_eq!(language.groups()[0].pending().len(), 1);
        assert!(language.groups()[1].pending().is_empty());
    }

    #[test]
    fn test_unknown_words_rejected() {
        let doc = RichDocument::from("intx");
        let mut language = c_like();
        assert!(!language.try_put(&match_at(&doc, 0, 4, "intx")));
        assert!(!language.try_put(&match_at(&doc, 0, 2, "in")));
        assert_eq!(language.pending_matches().count(), 0);
    }

    #[test]
    fn test_is_special() {
        let language = c_like();
        assert!(language.is_special('='));
        assert!(language.is_special(';'));
        assert!(!language.is_special('i'));
        assert!(!language.is_special('{'));
    }

    #[test]
    fn test_apply_styling_clears_pending() {
        let mut doc = RichDocument::from("int x");
        let mut language = c_like();
        language.try_put(&match_at(&doc, 0, 3, "int"));

        let written = language.apply_styling(&mut doc);
        assert_eq!(written, 1);
        assert_eq!(language.pending_matches().count(), 0);
        assert_eq!(
            doc.styles_at(0),
            vec![StyleProperty::FontWeight(FontWeight::BOLD)]
        );
    }

    #[test]
    fn test_stale_match_is_skipped() {
        let mut doc = RichDocument::from("int\nreturn");
        let mut language = c_like();
        let stale = match_at(&doc, 4, 10, "return");
        let live = match_at(&doc, 0, 3, "int");
        language.try_put(&stale);
        language.try_put(&live);

        doc.delete(3..10).unwrap();
        let written = language.apply_styling(&mut doc);

        assert_eq!(written, 1);
        assert_eq!(language.pending_matches().count(), 0);
        assert!(!doc.styles_at(0).is_empty());
    }
}
