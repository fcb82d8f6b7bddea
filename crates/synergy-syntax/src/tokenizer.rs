//! Splitting token runs into candidate keywords.
//!
//! Tokens end at whitespace and at separators. A separator is either a
//! character of one of the language's `Special` groups or ASCII punctuation
//! other than `_`, and each separator is a token of its own, so
//! `int x=5;` splits into `int`, `x`, `=`, `5`, `;`.
//!
//! Punctuation that appears inside a word of a `Normal` or `Commentaries`
//! group stays part of tokens, so lexicons holding `#include` or `==`
//! still match. `Special` characters always split.

use synergy_buffer::TokenRun;

use crate::language::{Language, Match};

/// A token, as character offsets into the text it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Splits `text` on whitespace and on characters `is_separator` accepts.
pub fn tokenize(text: &str, is_separator: impl Fn(char) -> bool) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    // (char index, byte index) of the token being built
    let mut open: Option<(usize, usize)> = None;

    let mut close = |open: &mut Option<(usize, usize)>, end: usize, byte_end: usize| {
        if let Some((start, byte_start)) = open.take() {
            tokens.push(Token {
                start,
                end,
                text: &text[byte_start..byte_end],
            });
        }
    };

    let mut char_idx = 0;
    for (byte_idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            close(&mut open, char_idx, byte_idx);
        } else if is_separator(ch) {
            close(&mut open, char_idx, byte_idx);
            open = Some((char_idx, byte_idx));
            close(&mut open, char_idx + 1, byte_idx + ch.len_utf8());
        } else if open.is_none() {
            open = Some((char_idx, byte_idx));
        }
        char_idx += 1;
    }
    close(&mut open, char_idx, text.len());

    tokens
}

/// Default separator rule for a language.
pub fn is_separator(language: Option<&Language>, ch: char) -> bool {
    if language.is_some_and(|l| l.is_special(ch)) {
        return true;
    }
    ch.is_ascii_punctuation() && ch != '_' && !language.is_some_and(|l| l.is_word_punctuation(ch))
}

/// Tokenizes a run into matches positioned inside the run's block.
pub fn run_matches(run: &TokenRun, language: Option<&Language>) -> Vec<Match> {
    tokenize(&run.text, |ch| is_separator(language, ch))
        .into_iter()
        .map(|token| Match {
            start: run.position_at(token.start),
            end: run.position_at(token.end),
            word: token.text.to_string(),
        })
        .collect()
}
