use searchcore::{Config, Engine, FieldText, Fields, Filter, NewDocument, RemoveMode, Scope, TokenizerConfig};

fn engine() -> Engine {
    let config = Config { tokenizer: TokenizerConfig::Simple { stem: false }, workers: 4, ..Default::default() };
    Engine::in_memory(&config).unwrap()
}

fn scope() -> Scope {
    Scope::new("LawyerOnline", "test").unwrap()
}

fn index_fruit(engine: &Engine, scope: &Scope) {
    engine.add(scope, "A", &[FieldText::new("apple apple banana", 1.0)], Fields::new()).unwrap();
    engine.add(scope, "B", &[FieldText::new("banana banana cherry", 1.0)], Fields::new()).unwrap();
}

fn terms(ts: &[&str]) -> Vec<String> {
    ts.iter().map(|t| t.to_string()).collect()
}

#[test]
fn fruit_corpus_idf_values() {
    let (engine, scope) = (engine(), scope());
    index_fruit(&engine, &scope);
    let idf = engine
        .idf_dictionary()
        .idf(engine.store(), &scope, &terms(&["apple", "banana", "cherry"]))
        .unwrap();
    assert!((idf["apple"] - 2f64.ln()).abs() < 1e-12);
    assert_eq!(idf["banana"], 0.0);
    assert!((idf["cherry"] - 0.693).abs() < 1e-3);
}

#[test]
fn fruit_corpus_full_text_and_similarity() {
    let (engine, scope) = (engine(), scope());
    index_fruit(&engine, &scope);

    let hits = engine.full_text_search(&scope, "banana", &Filter::new()).unwrap();
    assert_eq!(hits.ids, vec!["A", "B"]);

    for pass in 0..2 {
        let res = engine.similarity_search(&scope, "banana cherry", &Filter::new(), None).unwrap();
        assert_eq!(res.words, vec!["banana", "cherry"]);
        assert_eq!(res.ranked[0].id, "B", "pass {pass}");
        if let Some(a) = res.ranked.iter().find(|d| d.id == "A") {
            assert!(a.score < res.ranked[0].score);
        }
        engine.rebuild(&scope).unwrap();
    }
}

#[test]
fn removed_document_leaves_the_index() {
    let (engine, scope) = (engine(), scope());
    index_fruit(&engine, &scope);
    assert!(engine.remove(&scope, "A", RemoveMode::DeleteRecord).unwrap());
    assert!(engine.full_text_search(&scope, "apple", &Filter::new()).unwrap().ids.is_empty());
    assert!(!engine.word_index().entry(&scope, "apple").unwrap().contains("A"));
    assert!(!engine.word_index().entry(&scope, "banana").unwrap().contains("A"));
    assert!(engine.store().get(&scope, "A").unwrap().is_none());
}

#[test]
fn empty_similarity_query_is_not_an_error() {
    let (engine, scope) = (engine(), scope());
    index_fruit(&engine, &scope);
    let res = engine.similarity_search(&scope, "", &Filter::new(), None).unwrap();
    assert!(res.ranked.is_empty());
    assert!(res.words.is_empty());
}

#[test]
fn stored_vector_scores_one_against_itself() {
    let (engine, scope) = (engine(), scope());
    index_fruit(&engine, &scope);
    engine.add(&scope, "C", &[FieldText::new("apple apple banana", 1.0)], Fields::new()).unwrap();
    engine.rebuild(&scope).unwrap();
    let res = engine.related(&scope, "A", &Filter::new(), None).unwrap();
    let c = res.ranked.iter().find(|d| d.id == "C").unwrap();
    assert!((c.score - 1.0).abs() < 1e-9);
    assert_eq!(res.ranked[0].id, "C");
}

#[test]
fn batch_keeps_index_membership_consistent() {
    let (engine, scope) = (engine(), scope());
    let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];
    let docs: Vec<NewDocument> = (0..60)
        .map(|i| {
            let text = format!("{} {} {}", words[i % 6], words[(i / 6) % 6], words[(i * 7) % 6]);
            NewDocument { id: format!("doc-{i:03}"), texts: vec![FieldText::new(text, 1.0)], fields: Fields::new() }
        })
        .collect();
    let report = engine.add_batch(&scope, docs);
    assert_eq!(report.indexed, 60);
    assert!(report.failed.is_empty());

    for rec in engine.store().find(&scope, &Filter::new()).unwrap() {
        assert_eq!(rec.term_set(), rec.idx.iter().map(|e| e.term.clone()).collect());
        for term in rec.term_set() {
            assert!(engine.word_index().entry(&scope, &term).unwrap().contains(&rec.id));
        }
    }
    for w in words {
        let members = engine.word_index().entry(&scope, w).unwrap();
        for id in members {
            let rec = engine.store().get(&scope, &id).unwrap().unwrap();
            assert!(rec.term_set().contains(w));
        }
    }
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        tokenizer: TokenizerConfig::Simple { stem: true },
        ..Default::default()
    };
    let scope = scope();
    {
        let engine = Engine::open(&config).unwrap();
        engine.add(&scope, "A", &[FieldText::new("Indexing documents", 1.0)], Fields::new()).unwrap();
        engine.blacklist().extend(["noise".to_string()]).unwrap();
        engine.flush().unwrap();
    }
    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.full_text_search(&scope, "indexed document", &Filter::new()).unwrap().ids, vec!["A"]);
    assert!(engine.blacklist().contains("noise"));
}
