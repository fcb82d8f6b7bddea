//! Benchmarks for the highlighting hot paths.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use synergy_buffer::{RichDocument, TextSurface};
use synergy_syntax::tokenizer::{is_separator, tokenize};
use synergy_syntax::worker::bracket::{insert_ordered, Bracket, BracketKind};
use synergy_syntax::Trie;

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

/// Generates C-like text with one brace pair per few lines.
fn generate_source(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 4 {
            0 => format!("static int f{i}(int x) {{\n"),
            3 => "}\n".to_string(),
            _ => format!("    return x + {i};\n"),
        })
        .collect()
}

/// Benchmarks trie membership lookups.
fn bench_trie_lookup(c: &mut Criterion) {
    let trie: Trie = KEYWORDS.iter().collect();
    let source = generate_source(1000);
    let words: Vec<&str> = tokenize(&source, |ch| is_separator(None, ch))
        .into_iter()
        .map(|t| t.text)
        .collect();

    c.bench_function("trie_search_tokens", |b| {
        b.iter(|| {
            words
                .iter()
                .filter(|w| trie.search(black_box(w)))
                .count()
        })
    });
}

/// Benchmarks ordered bracket insertion as the list grows.
fn bench_bracket_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("bracket_insertion");

    for lines in [100, 1000, 4000].iter() {
        let doc = RichDocument::from(generate_source(*lines));
        let brackets: Vec<Bracket> = (0..doc.len_chars())
            .filter_map(|offset| {
                let position = doc.position_at_offset(offset)?;
                let kind = match doc.char_at(&position)? {
                    '{' => BracketKind::Open,
                    '}' => BracketKind::Close,
                    _ => return None,
                };
                Some(Bracket { position, kind })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("in_order", lines), &brackets, |b, brackets| {
            b.iter(|| {
                let mut list = Vec::with_capacity(brackets.len());
                for bracket in brackets {
                    insert_ordered(&doc, &mut list, *bracket);
                }
                black_box(list)
            })
        });

        group.bench_with_input(BenchmarkId::new("reversed", lines), &brackets, |b, brackets| {
            b.iter(|| {
                let mut list = Vec::with_capacity(brackets.len());
                for bracket in brackets.iter().rev() {
                    insert_ordered(&doc, &mut list, *bracket);
                }
                black_box(list)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_trie_lookup, bench_bracket_insertion);
criterion_main!(benches);
