use criterion::{criterion_group, criterion_main, Criterion};
use mnemo_core::tokenizer::tokenize;
use mnemo_core::FullTextIndex;

const WORDS: &[&str] = &[
    "index", "search", "ranking", "document", "posting", "term", "query", "score", "length", "average",
    "store", "record", "token", "frequency", "inverse", "title", "body", "content", "hello", "world",
];

fn synthetic_doc(seed: usize, len: usize) -> String {
    (0..len).map(|i| WORDS[(seed * 7 + i * 13) % WORDS.len()]).collect::<Vec<_>>().join(" ")
}

fn bench_tokenize(c: &mut Criterion) {
    let text = synthetic_doc(1, 2_000);
    c.bench_function("tokenize_2k_words", |b| b.iter(|| tokenize(&text)));
}

fn bench_search(c: &mut Criterion) {
    let idx = FullTextIndex::default();
    for id in 1..=5_000u64 {
        idx.index(id, "bench", &synthetic_doc(id as usize, 60)).expect("fresh id");
    }
    c.bench_function("search_two_terms_5k_docs", |b| b.iter(|| idx.search("posting frequency")));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
