use authority_search_core::{
    CandidateRecord, ResultOrderer, SearchResult, SortPolicy, SortableResult,
};
use criterion::{criterion_group, criterion_main, Criterion};

const RANK_PREDICATE: &str = "http://vivoweb.org/ontology/core#rank";
const LABEL_PREDICATE: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";

fn bench_orderer() -> ResultOrderer {
    match SortPolicy::new([RANK_PREDICATE, LABEL_PREDICATE]) {
        Ok(policy) => ResultOrderer::new(policy),
        Err(err) => panic!("benchmark sort policy is invalid: {err}"),
    }
}

fn mk_sortable(index: usize) -> SortableResult {
    let rank = if index % 7 == 0 { String::new() } else { ((index * 7_919) % 1_000).to_string() };
    let label = format!("Heading {:04}", (index * 31) % 1_000);
    SortableResult::new(
        SearchResult::new(label.clone())
            .with_attribute("uri", format!("http://id.example.org/authorities/{index}"))
            .with_attribute("id", index.to_string()),
        vec![rank, label],
    )
}

fn mk_candidate(index: usize) -> CandidateRecord {
    let candidate = CandidateRecord::new(SearchResult::new(format!("Heading {index}")))
        .with_value(LABEL_PREDICATE, format!("heading {:04}", (index * 31) % 1_000));
    if index % 5 == 0 {
        candidate
    } else {
        candidate
            .with_value(RANK_PREDICATE, ((index * 13) % 500).to_string())
            .with_value(RANK_PREDICATE, ((index * 17) % 500).to_string())
    }
}

fn bench_sortable(c: &mut Criterion) {
    let orderer = bench_orderer();
    let records = (0..1_000).map(mk_sortable).collect::<Vec<_>>();

    c.bench_function("order_1000_sortable_results", |b| {
        b.iter(|| {
            let ordered = orderer.order(records.clone());
            if ordered.len() != records.len() {
                panic!("ordering dropped results: {} of {}", ordered.len(), records.len());
            }
        });
    });
}

fn bench_candidates(c: &mut Criterion) {
    let orderer = bench_orderer();
    let candidates = (0..1_000).map(mk_candidate).collect::<Vec<_>>();

    c.bench_function("order_1000_candidate_records", |b| {
        b.iter(|| {
            let ordered = orderer.order_candidates(candidates.clone());
            if ordered.len() != candidates.len() {
                panic!("ordering dropped candidates: {} of {}", ordered.len(), candidates.len());
            }
        });
    });
}

criterion_group!(ordering_benches, bench_sortable, bench_candidates);
criterion_main!(ordering_benches);
