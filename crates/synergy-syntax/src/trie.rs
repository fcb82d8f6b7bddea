//! Exact-word lexicon.
//!
//! ## Learning: Recursive Ownership
//!
//! Each node owns its children through a `HashMap<char, Node>`, so the
//! whole tree is freed by dropping the root and removing one map entry
//! drops the entire subtree under it. No `Rc`, no parent pointers.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<char, Node>,
    /// How many times the word ending here was inserted
    word_count: usize,
}

/// A character trie answering exact membership and prefix queries.
///
/// Words are counted: inserting a word twice means it has to be deleted
/// twice before [`Trie::search`] stops finding it.
#[derive(Debug, Clone, Default)]
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a word. Empty words are ignored.
    pub fn insert(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for ch in word.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.word_count += 1;
    }

    /// True iff `word` was inserted (and not deleted as often).
    pub fn search(&self, word: &str) -> bool {
        self.find(word).is_some_and(|node| node.word_count > 0)
    }

    /// True iff some inserted word starts with `prefix`.
    pub fn is_prefix(&self, prefix: &str) -> bool {
        self.find(prefix).is_some()
    }

    /// Removes one occurrence of `word`.
    ///
    /// When the last occurrence goes and the word's node has no children,
    /// the single link below the nearest branch point (a node with several
    /// children or a word ending) is cut. Returns `false` if the word
    /// wasn't present.
    pub fn delete(&mut self, word: &str) -> bool {
        if !self.search(word) {
            return false;
        }

        // Depth of the node the prune link hangs from, and the link's char.
        let mut cut: Option<(usize, char)> = None;
        let mut node = &self.root;
        for (depth, ch) in word.chars().enumerate() {
            if cut.is_none() || node.children.len() > 1 || node.word_count > 0 {
                cut = Some((depth, ch));
            }
            match node.children.get(&ch) {
                Some(next) => node = next,
                None => return false,
            }
        }

        let prunable = node.word_count == 1 && node.children.is_empty();

        let Some(end) = self.find_mut(word) else {
            return false;
        };
        end.word_count -= 1;

        if prunable {
            if let Some((depth, ch)) = cut {
                let prefix: String = word.chars().take(depth).collect();
                if let Some(branch) = self.find_mut(&prefix) {
                    branch.children.remove(&ch);
                }
            }
        }
        true
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.children.values().map(|child| 1 + count(child)).sum()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    fn find(&self, word: &str) -> Option<&Node> {
        let mut node = &self.root;
        for ch in word.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    fn find_mut(&mut self, word: &str) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for ch in word.chars() {
            node = node.children.get_mut(&ch)?;
        }
        Some(node)
    }
}

impl<S: AsRef<str>> FromIterator<S> for Trie {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut trie = Trie::new();
        trie.extend(iter);
        trie
    }
}

impl<S: AsRef<str>> Extend<S> for Trie {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for word in iter {
            self.insert(word.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_match_not_prefix() {
        let trie: Trie = ["int", "interface"].into_iter().collect();
        assert!(trie.search("int"));
        assert!(trie.search("interface"));
        assert!(!trie.search("inter"));
        assert!(trie.is_prefix("inter"));
        assert!(!trie.is_prefix("x"));
    }

    #[test]
    fn test_empty_word_ignored() {
        let mut trie = Trie::new();
        trie.insert("");
        assert!(trie.is_empty());
        assert!(!trie.search(""));
    }

    #[test]
    fn test_counted_deletion() {
        let mut trie = Trie::new();
        trie.insert("for");
        trie.insert("for");

        assert!(trie.delete("for"));
        assert!(trie.search("for"));
        assert!(trie.delete("for"));
        assert!(!trie.search("for"));
        assert!(!trie.delete("for"));
    }

    #[test]
    fn test_delete_keeps_prefix_words() {
        let mut trie: Trie = ["a", "ab", "abc"].into_iter().collect();
        assert!(trie.delete("abc"));
        assert!(trie.search("a"));
        assert!(trie.search("ab"));
        assert!(!trie.search("abc"));

        assert!(trie.delete("a"));
        assert!(trie.search("ab"));
    }

    #[test]
    fn test_delete_unknown_word() {
        let mut trie: Trie = ["while"].into_iter().collect();
        assert!(!trie.delete("whi"));
        assert!(!trie.delete("whilst"));
        assert!(trie.search("while"));
    }

    // Pruning cuts one link below the nearest branch point. Deleting a
    // word that still has descendants leaves its chain in place.
    #[test]
    fn test_delete_cuts_whole_dead_chain() {
        let mut trie: Trie = ["do", "double"].into_iter().collect();
        assert_eq!(trie.node_count(), 6);

        assert!(trie.delete("double"));
        assert_eq!(trie.node_count(), 2);

        let mut trie: Trie = ["do", "double"].into_iter().collect();
        assert!(trie.delete("do"));
        assert_eq!(trie.node_count(), 6);
        assert!(!trie.search("do"));
        assert!(trie.search("double"));

        let mut trie: Trie = ["a", "abc", "abd"].into_iter().collect();
        assert_eq!(trie.node_count(), 4);
        assert!(trie.delete("abd"));
        assert_eq!(trie.node_count(), 3);
        assert!(trie.is_prefix("ab"));
        assert!(!trie.is_prefix("abd"));
    }

    proptest! {
        #[test]
        fn prop_search_iff_inserted(
            words in prop::collection::hash_set("[a-z_]{1,8}", 0..40),
            lookups in prop::collection::vec("[a-z_]{1,8}", 0..40),
        ) {
            let trie: Trie = words.iter().collect();
            for word in &words {
                prop_assert!(trie.search(word));
            }
            for word in &lookups {
                prop_assert_eq!(trie.search(word), words.contains(word));
            }
        }

        #[test]
        fn prop_delete_removes_only_target(
            words in prop::collection::hash_set("[a-c]{1,5}", 1..20),
        ) {
            let mut trie: Trie = words.iter().collect();
            let mut remaining: HashSet<String> = words.clone();
            for word in &words {
                prop_assert!(trie.delete(word));
                remaining.remove(word);
                for other in &remaining {
                    prop_assert!(trie.search(other));
                }
            }
            prop_assert!(trie.is_empty());
        }
    }
}
