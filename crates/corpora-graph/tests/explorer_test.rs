//! Integration tests for the graph explorer against the in-memory API.
//!
//! Covers:
//! - merge never duplicates nodes or edges
//! - cursor advance and convergence per per-type page size
//! - the resprawl-on-empty heuristic and its bound
//! - extrude cascade
//! - collapse toggle around a reset, hidden types, content-view filters
//! - collapse normalization is idempotent, including same-type collapses
//! - concurrent expansions settle exactly once
//! - failures and timeouts never leave a pending operation behind

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use corpora_core::mock::MockCorporaApi;
use corpora_core::{defaults, CollapsedRelationship, Error};
use corpora_graph::{ExplorerConfig, GraphExplorer, LabelMode, SprawlOptions};

const BOOK: &str = "/corpus/42/Book/7";

// ============================================================================
// FIXTURES
// ============================================================================

fn book_with_chapters(count: usize) -> MockCorporaApi {
    let mut api = MockCorporaApi::new("42").with_record("Book", "7", "Emma");
    for i in 1..=count {
        let id = format!("c{:02}", i);
        api = api
            .with_record("Chapter", &id, &format!("Chapter {}", i))
            .with_link("Book", "7", "Chapter", &id, "chapters");
    }
    api
}

fn novels() -> MockCorporaApi {
    MockCorporaApi::new("42")
        .with_record("Novel", "n1", "Emma")
        .with_record("Chapter", "c1", "One")
        .with_record("Chapter", "c2", "Two")
        .with_record("Character", "h1", "Harriet")
        .with_record("Character", "h2", "Knightley")
        .with_link("Novel", "n1", "Chapter", "c1", "chapters")
        .with_link("Novel", "n1", "Chapter", "c2", "chapters")
        .with_link("Chapter", "c1", "Character", "h1", "characters")
        .with_link("Chapter", "c2", "Character", "h1", "characters")
        .with_link("Chapter", "c2", "Character", "h2", "characters")
}

fn hub(spokes: usize) -> MockCorporaApi {
    let mut api = MockCorporaApi::new("42").with_record("Hub", "a", "Hub");
    for i in 1..=spokes {
        let id = format!("b{:02}", i);
        api = api
            .with_record("Spoke", &id, &id)
            .with_link("Hub", "a", "Spoke", &id, "spokes");
    }
    api
}

fn uri(content_type: &str, id: &str) -> String {
    format!("/corpus/42/{}/{}", content_type, id)
}

fn explorer(api: &Arc<MockCorporaApi>, per_type_limit: u32) -> GraphExplorer<MockCorporaApi> {
    let config = ExplorerConfig::default()
        .with_per_type_limit(per_type_limit)
        .expect("valid per-type limit");
    GraphExplorer::new(api.clone(), config)
}

fn novel_collapse() -> CollapsedRelationship {
    CollapsedRelationship::new("Novel", "Chapter", "Character")
}

async fn edge_ids(explorer: &GraphExplorer<MockCorporaApi>) -> Vec<String> {
    let mut ids: Vec<String> = explorer
        .snapshot()
        .await
        .edges
        .into_iter()
        .map(|e| e.id)
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// SPRAWL AND CURSOR
// ============================================================================

#[tokio::test]
async fn test_seed_cursor_advances_without_resprawl() {
    let api = Arc::new(book_with_chapters(15));
    let explorer = explorer(&api, 20);

    let report = explorer.explore(&[BOOK.to_string()]).await.unwrap();
    assert_eq!(report.nodes, 16);
    assert_eq!(report.edges, 15);
    assert!(report.first_load);

    let book = explorer.node(BOOK).await.unwrap();
    assert_eq!(book.skip, 20);
    assert!(book.is_seed);
    assert!(book.pinned);
    assert_eq!(book.meta.unwrap().get("Chapter"), Some(&15));

    // One request for the seed plus one per new chapter.
    let before = api.call_count("network_json");
    assert_eq!(before, 16);

    let outcome = explorer.sprawl(BOOK, SprawlOptions::default()).await.unwrap();
    assert_eq!(outcome.nodes_added, 0);
    assert_eq!(outcome.resprawls, 0);
    assert_eq!(api.call_count("network_json"), before + 1);
    assert_eq!(explorer.node(BOOK).await.unwrap().skip, 40);
}

#[tokio::test]
async fn test_repeated_sprawls_converge() {
    let api = Arc::new(book_with_chapters(25));
    let explorer = explorer(&api, 10);

    let mut counts = Vec::new();
    for _ in 0..3 {
        explorer.sprawl(BOOK, SprawlOptions::default()).await.unwrap();
        counts.push(explorer.node_count().await);
    }
    assert_eq!(counts, vec![11, 21, 26]);
    assert_eq!(explorer.node(BOOK).await.unwrap().skip, 30);

    let skips: Vec<String> = api
        .calls()
        .iter()
        .filter(|c| c.operation == "network_json")
        .filter_map(|c| {
            c.params
                .iter()
                .find(|(k, _)| k == "per_type_skip")
                .map(|(_, v)| v.clone())
        })
        .collect();
    assert_eq!(skips, vec!["0", "10", "20"]);
}

#[tokio::test]
async fn test_meta_only_and_targeted_keep_cursor() {
    let api = Arc::new(book_with_chapters(3));
    let explorer = explorer(&api, 5);

    explorer.sprawl(BOOK, SprawlOptions::default()).await.unwrap();
    assert_eq!(explorer.node(BOOK).await.unwrap().skip, 5);

    explorer.sprawl(BOOK, SprawlOptions::meta_only()).await.unwrap();
    explorer
        .sprawl(BOOK, SprawlOptions::targeted("Chapter"))
        .await
        .unwrap();
    let book = explorer.node(BOOK).await.unwrap();
    assert_eq!(book.skip, 5);
    assert_eq!(book.meta.unwrap().get("Chapter"), Some(&3));
}

#[tokio::test]
async fn test_resprawl_fetches_next_page_when_page_already_plotted() {
    let api = Arc::new(hub(7));
    let explorer = explorer(&api, 5);
    let hub_uri = uri("Hub", "a");

    explorer.sprawl(&hub_uri, SprawlOptions::default()).await.unwrap();
    assert_eq!(explorer.node_count().await, 6);

    // Re-request the first page; metadata says 7 spokes but 5 are plotted.
    let outcome = explorer
        .sprawl(
            &hub_uri,
            SprawlOptions {
                is_seed: true,
                skip: Some(0),
                ..SprawlOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.resprawls, 1);
    assert_eq!(outcome.nodes_added, 2);
    assert_eq!(explorer.node_count().await, 8);
}

#[tokio::test]
async fn test_resprawl_is_bounded() {
    let api = Arc::new(hub(7));
    let explorer = explorer(&api, 5);
    let hub_uri = uri("Hub", "a");

    explorer.sprawl(&hub_uri, SprawlOptions::default()).await.unwrap();
    explorer.extrude(&uri("Spoke", "b06"), false).await;
    explorer.extrude(&uri("Spoke", "b07"), false).await;

    let outcome = explorer
        .sprawl(
            &hub_uri,
            SprawlOptions {
                is_seed: true,
                skip: Some(0),
                ..SprawlOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.nodes_added, 0);
    assert_eq!(outcome.resprawls, defaults::MAX_RESPRAWLS);
    assert_eq!(
        api.call_count("network_json"),
        2 + defaults::MAX_RESPRAWLS as usize
    );
    assert_eq!(explorer.pending(), 0);
}

#[tokio::test]
async fn test_no_duplicates_across_concurrent_sprawls() {
    let api = MockCorporaApi::new("42")
        .with_record("Book", "7", "Emma")
        .with_record("Novel", "n1", "Persuasion");
    for i in 1..=12 {
        let id = format!("c{:02}", i);
        api.insert_record("Chapter", &id, &id, Default::default());
        api.add_link("Book", "7", "Chapter", &id, "chapters");
        let other = format!("d{:02}", i);
        api.insert_record("Chapter", &other, &other, Default::default());
        api.add_link("Novel", "n1", "Chapter", &other, "chapters");
    }
    let api = Arc::new(api);
    let explorer = explorer(&api, 5);

    explorer
        .explore(&[BOOK.to_string(), uri("Novel", "n1")])
        .await
        .unwrap();
    let novel = uri("Novel", "n1");
    let (a, b, c) = tokio::join!(
        explorer.sprawl(BOOK, SprawlOptions::default()),
        explorer.sprawl(BOOK, SprawlOptions::default()),
        explorer.sprawl(&novel, SprawlOptions::default()),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let snapshot = explorer.snapshot().await;
    let uris: BTreeSet<&str> = snapshot.nodes.iter().map(|n| n.uri.as_str()).collect();
    assert_eq!(uris.len(), snapshot.nodes.len());
    let pairs: BTreeSet<(&str, &str)> = snapshot
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert_eq!(pairs.len(), snapshot.edges.len());
    assert!(snapshot
        .edges
        .iter()
        .all(|e| uris.contains(e.from.as_str()) && uris.contains(e.to.as_str())));
}

// ============================================================================
// EXTRUDE AND RESET
// ============================================================================

#[tokio::test]
async fn test_extrude_cascades_to_isolated_nodes() {
    let api = MockCorporaApi::new("42")
        .with_record("Author", "a", "Austen")
        .with_record("Book", "7", "Emma")
        .with_link("Author", "a", "Book", "7", "books");
    for id in ["c1", "c2", "c3"] {
        api.insert_record("Chapter", id, id, Default::default());
        api.add_link("Book", "7", "Chapter", id, "chapters");
    }
    let api = Arc::new(api);
    let explorer = explorer(&api, 20);
    let author = uri("Author", "a");

    explorer.explore(&[author.clone()]).await.unwrap();
    assert_eq!(explorer.node_count().await, 5);

    let mut removed = explorer.extrude(BOOK, true).await;
    removed.sort();
    assert_eq!(
        removed,
        vec![
            BOOK.to_string(),
            uri("Chapter", "c1"),
            uri("Chapter", "c2"),
            uri("Chapter", "c3"),
        ]
    );

    let snapshot = explorer.snapshot().await;
    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.nodes[0].uri, author);
    assert!(snapshot.excluded.contains(&BOOK.to_string()));

    // Excluded nodes never come back.
    explorer
        .sprawl(
            &author,
            SprawlOptions {
                skip: Some(0),
                ..SprawlOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(explorer.node_count().await, 1);
    explorer.reset_graph().await.unwrap();
    assert!(explorer.node(BOOK).await.is_none());
}

#[tokio::test]
async fn test_extrude_without_cascade_keeps_neighbors() {
    let api = Arc::new(book_with_chapters(3));
    let explorer = explorer(&api, 20);
    explorer.explore(&[BOOK.to_string()]).await.unwrap();

    let removed = explorer.extrude(&uri("Chapter", "c01"), false).await;
    assert_eq!(removed, vec![uri("Chapter", "c01")]);
    assert_eq!(explorer.node_count().await, 3);
    assert_eq!(explorer.edge_count().await, 2);
}

#[tokio::test]
async fn test_extrude_recomputes_mass() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();
    assert_eq!(explorer.node(&uri("Novel", "n1")).await.unwrap().mass, 2.0);

    explorer.extrude(&uri("Chapter", "c1"), false).await;
    assert_eq!(explorer.node(&uri("Novel", "n1")).await.unwrap().mass, 1.0);
}

#[tokio::test]
async fn test_fit_requested_on_first_load_only() {
    let api = Arc::new(book_with_chapters(2));
    let explorer = explorer(&api, 20);

    explorer.explore(&[BOOK.to_string()]).await.unwrap();
    assert!(explorer.take_fit_request().await);
    assert!(!explorer.take_fit_request().await);

    let report = explorer.reset_graph().await.unwrap();
    assert!(!report.first_load);
    assert!(!explorer.take_fit_request().await);
    assert!(explorer.node(BOOK).await.unwrap().pinned);
}

// ============================================================================
// COLLAPSE, HIDE, FILTER
// ============================================================================

#[tokio::test]
async fn test_collapse_produces_direct_edges() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();
    assert_eq!(explorer.node_count().await, 5);

    assert!(explorer.collapse(novel_collapse()).await.unwrap());
    explorer.reset_graph().await.unwrap();

    let snapshot = explorer.snapshot().await;
    assert!(snapshot.nodes.iter().all(|n| n.group != "Chapter"));
    assert_eq!(snapshot.collapses, vec!["Novel.Chapter.Character".to_string()]);

    let n1 = uri("Novel", "n1");
    let harriet = snapshot
        .edges
        .iter()
        .find(|e| e.from == n1 && e.to == uri("Character", "h1"))
        .expect("direct Novel-Character edge");
    let knightley = snapshot
        .edges
        .iter()
        .find(|e| e.from == n1 && e.to == uri("Character", "h2"))
        .expect("direct Novel-Character edge");
    assert!(snapshot.edges.iter().all(|e| e.to != n1));

    // Harriet appears in two chapters, Knightley in one.
    assert!(harriet.freq > knightley.freq);
    assert_eq!(harriet.thickness, defaults::MAX_LINK_THICKNESS);
    assert_eq!(knightley.thickness, defaults::MIN_LINK_THICKNESS);
    assert!(snapshot.edges.iter().all(|e| e.thickness.is_finite()));

    let novel = snapshot.nodes.iter().find(|n| n.uri == n1).unwrap();
    assert!(novel.mass > 1.0);
    assert!(novel.mass <= defaults::MAX_NODE_MASS);
}

#[tokio::test]
async fn test_collapse_toggle_restores_edges() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();
    let before = edge_ids(&explorer).await;

    assert!(explorer.collapse(novel_collapse()).await.unwrap());
    assert!(!explorer.collapse(novel_collapse()).await.unwrap());
    assert_ne!(edge_ids(&explorer).await, before);

    assert!(explorer.uncollapse(&novel_collapse()).await.unwrap());
    assert_eq!(edge_ids(&explorer).await, before);
    assert!(!explorer.uncollapse(&novel_collapse()).await.unwrap());
}

#[tokio::test]
async fn test_settle_is_stable_with_collapsed_edges() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.collapse(novel_collapse()).await.unwrap();
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();
    let settled = explorer.snapshot().await.edges;
    assert_eq!(settled.len(), 2);

    let again = explorer.settle().await;
    assert_eq!(again.normalized_edges, 0);
    assert_eq!(explorer.settle().await.edges, 2);
    assert_eq!(explorer.snapshot().await.edges, settled);
}

#[tokio::test]
async fn test_symmetric_collapse_keeps_one_edge_per_pair() {
    let api = Arc::new(
        MockCorporaApi::new("42")
            .with_record("Person", "p1", "Cassandra")
            .with_record("Person", "p2", "Jane")
            .with_record("Person", "p3", "Henry")
            .with_record("Document", "d1", "Letter 1")
            .with_record("Document", "d2", "Letter 2")
            .with_link("Document", "d1", "Person", "p1", "people")
            .with_link("Document", "d1", "Person", "p2", "people")
            .with_link("Document", "d2", "Person", "p1", "people")
            .with_link("Document", "d2", "Person", "p2", "people")
            .with_link("Document", "d2", "Person", "p3", "people"),
    );
    let explorer = explorer(&api, 20);
    explorer
        .collapse(CollapsedRelationship::new("Person", "Document", "Person"))
        .await
        .unwrap();
    explorer.explore(&[uri("Person", "p1")]).await.unwrap();

    let edges = explorer.snapshot().await.edges;
    assert_eq!(edges.len(), 3);
    assert!(edges.iter().all(|e| e.from < e.to));
    assert!(edges.iter().all(|e| e.title == "Person.Document.Person"));
    let jane = edges
        .iter()
        .find(|e| e.from == uri("Person", "p1") && e.to == uri("Person", "p2"))
        .expect("Cassandra-Jane edge");
    let henry = edges
        .iter()
        .find(|e| e.from == uri("Person", "p1") && e.to == uri("Person", "p3"))
        .expect("Cassandra-Henry edge");
    assert!(jane.freq > henry.freq);

    explorer.settle().await;
    assert_eq!(explorer.snapshot().await.edges, edges);
}

#[tokio::test]
async fn test_field_edge_between_collapse_endpoints_survives() {
    let api = Arc::new(novels().with_link("Character", "h1", "Novel", "n1", "favorite_novel"));
    let explorer = explorer(&api, 20);
    explorer.collapse(novel_collapse()).await.unwrap();
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();

    let snapshot = explorer.snapshot().await;
    let favorite = snapshot
        .edges
        .iter()
        .find(|e| e.from == uri("Character", "h1") && e.to == uri("Novel", "n1"))
        .expect("field edge kept in its own direction");
    assert_eq!(favorite.title, "favorite_novel");
    assert_eq!(favorite.thickness, defaults::DEFAULT_LINK_THICKNESS);
    assert!(snapshot
        .edges
        .iter()
        .any(|e| e.to == uri("Character", "h2") && e.title == "Novel.Chapter.Character"));
}

#[tokio::test(start_paused = true)]
async fn test_parallel_expansions_settle_once() {
    let api = Arc::new(book_with_chapters(3).with_network_delay(Duration::from_millis(50)));
    let explorer = explorer(&api, 20);

    let chapter_uri = uri("Chapter", "c01");
    let (book, chapter) = tokio::join!(
        explorer.expand(BOOK, SprawlOptions::default()),
        explorer.expand(&chapter_uri, SprawlOptions::default()),
    );
    let (book, chapter) = (book.unwrap(), chapter.unwrap());

    let settles: Vec<_> = [book.settled, chapter.settled].into_iter().flatten().collect();
    assert_eq!(settles.len(), 1);
    assert_eq!(settles[0].nodes, explorer.node_count().await);
    assert!(settles[0].first_load);
    assert!(explorer.take_fit_request().await);
    assert_eq!(explorer.pending(), 0);
    assert_eq!(book.outcome.nodes_added + chapter.outcome.nodes_added, 4);
    assert_eq!(explorer.node_count().await, 4);
}

#[tokio::test]
async fn test_failed_expansion_releases_batch() {
    let api = novels();
    api.fail_network_for(&api.uri("Chapter", "c2"));
    let api = Arc::new(api);
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();

    let result = explorer
        .expand(&uri("Chapter", "c2"), SprawlOptions::default())
        .await;
    assert!(result.is_err());
    assert_eq!(explorer.pending(), 0);
}

#[tokio::test]
async fn test_hide_type_resets_graph() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();

    assert!(explorer.hide_type("Chapter").await.unwrap());
    assert_eq!(explorer.node_count().await, 1);
    assert!(!explorer.hide_type("Chapter").await.unwrap());

    assert!(explorer.unhide_type("Chapter").await.unwrap());
    assert_eq!(explorer.node_count().await, 5);
}

#[tokio::test]
async fn test_filter_view_restricts_sprawled_nodes() {
    let api = Arc::new(novels().with_view("v1", "Character", &["h1"]));
    let explorer = explorer(&api, 20);
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();
    assert!(explorer.node(&uri("Character", "h2")).await.is_some());

    assert!(explorer.set_filter_view("Character", "v1").await.unwrap());
    assert!(explorer.node(&uri("Character", "h1")).await.is_some());
    assert!(explorer.node(&uri("Character", "h2")).await.is_none());

    let last = api.calls().pop().unwrap();
    assert!(last
        .params
        .contains(&("filters".to_string(), "Character:v1".to_string())));

    assert!(explorer.clear_filter_view("Character").await.unwrap());
    assert!(explorer.node(&uri("Character", "h2")).await.is_some());
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_failed_child_sprawl_does_not_stall() {
    let api = novels();
    api.fail_network_for(&api.uri("Chapter", "c2"));
    let api = Arc::new(api);
    let explorer = explorer(&api, 20);

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        explorer.explore(&[uri("Novel", "n1")]),
    )
    .await
    .expect("explore stalled")
    .unwrap();

    assert_eq!(explorer.pending(), 0);
    assert_eq!(report.nodes, 4);
    assert!(explorer.node(&uri("Character", "h2")).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_sprawl_timeout_releases_pending() {
    let api = Arc::new(book_with_chapters(2).with_network_delay(Duration::from_secs(600)));
    let config = ExplorerConfig::default().with_sprawl_timeout(Duration::from_millis(100));
    let explorer = GraphExplorer::new(api.clone(), config);

    let result = explorer.explore(&[BOOK.to_string()]).await;
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(explorer.pending(), 0);
    assert_eq!(explorer.node_count().await, 0);
}

#[tokio::test]
async fn test_invalid_uri_is_rejected_before_request() {
    let api = Arc::new(book_with_chapters(1));
    let explorer = explorer(&api, 20);
    let result = explorer.sprawl("/api/Book/7", SprawlOptions::default()).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(api.call_count("network_json"), 0);
    assert_eq!(explorer.pending(), 0);
}

// ============================================================================
// DISPLAY STATE
// ============================================================================

#[tokio::test]
async fn test_labels_decoded_and_reformatted() {
    let api = Arc::new(MockCorporaApi::new("42").with_record("Book", "7", "Pride &amp; Prejudice"));
    let explorer = explorer(&api, 20);
    explorer.sprawl(BOOK, SprawlOptions::default()).await.unwrap();

    let node = explorer.node(BOOK).await.unwrap();
    assert_eq!(node.raw_label, "Pride & Prejudice");

    explorer.set_label_mode(LabelMode::Truncated(5)).await;
    assert_eq!(explorer.node(BOOK).await.unwrap().label, "Pride…");
    explorer.set_label_mode(LabelMode::Hidden).await;
    assert_eq!(explorer.node(BOOK).await.unwrap().label, "");
    explorer.set_label_mode(LabelMode::Full).await;
    assert_eq!(explorer.node(BOOK).await.unwrap().label, "Pride & Prejudice");
}

#[tokio::test]
async fn test_per_type_limit_allowed_values() {
    let api = Arc::new(book_with_chapters(1));
    let explorer = explorer(&api, 20);

    assert!(matches!(
        explorer.set_per_type_limit(15).await,
        Err(Error::InvalidInput(_))
    ));
    explorer.set_per_type_limit(80).await.unwrap();
    assert_eq!(explorer.per_type_limit().await, 80);

    explorer.sprawl(BOOK, SprawlOptions::default()).await.unwrap();
    let call = api.calls().pop().unwrap();
    assert!(call
        .params
        .contains(&("per_type_limit".to_string(), "80".to_string())));
}

#[tokio::test]
async fn test_panes_pins_and_selection() {
    let api = Arc::new(book_with_chapters(15));
    let explorer = explorer(&api, 20);
    explorer.explore(&[BOOK.to_string()]).await.unwrap();

    let summary = explorer.open_pane(BOOK).await.unwrap();
    let chapters = summary.paths.iter().find(|p| p.path == "Chapter").unwrap();
    assert_eq!((chapters.plotted, chapters.total), (15, 15));
    assert!(!chapters.has_more());

    // A seed sprawl refreshes metadata and marks the open pane.
    explorer.sprawl(BOOK, SprawlOptions::seed()).await.unwrap();
    let dirty = explorer.take_dirty_panes().await;
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty[0].uri, BOOK);
    assert!(explorer.take_dirty_panes().await.is_empty());
    assert!(explorer.close_pane(BOOK).await);

    let chapter = uri("Chapter", "c01");
    explorer.pin(&chapter).await.unwrap();
    assert!(explorer.node(&chapter).await.unwrap().pinned);
    explorer.unpin(&chapter).await.unwrap();
    assert!(!explorer.node(&chapter).await.unwrap().pinned);

    explorer.select(&chapter).await.unwrap();
    explorer.select(BOOK).await.unwrap();
    assert!(!explorer.node(&chapter).await.unwrap().selected);
    assert!(explorer.node(BOOK).await.unwrap().selected);
    assert!(matches!(
        explorer.select("/corpus/42/Book/missing").await,
        Err(Error::NotFound(_))
    ));

    let legend = explorer.legend().await;
    let groups: Vec<&str> = legend.entries.iter().map(|e| e.group.as_str()).collect();
    assert_eq!(groups, vec!["Book", "Chapter"]);
}

#[tokio::test]
async fn test_snapshot_serializes_session_state() {
    let api = Arc::new(novels());
    let explorer = explorer(&api, 20);
    explorer.collapse(novel_collapse()).await.unwrap();
    explorer.hide_type("Place").await.unwrap();
    explorer.explore(&[uri("Novel", "n1")]).await.unwrap();

    let json = serde_json::to_value(explorer.snapshot().await).unwrap();
    assert_eq!(json["seeds"], serde_json::json!(["/corpus/42/Novel/n1"]));
    assert_eq!(json["collapses"], serde_json::json!(["Novel.Chapter.Character"]));
    assert_eq!(json["hidden_types"], serde_json::json!(["Place"]));
    assert_eq!(json["per_type_limit"], 20);
    assert_eq!(json["label_mode"]["mode"], "truncated");
    let nodes = json["nodes"].as_array().unwrap();
    assert!(nodes.iter().all(|n| n["uri"].is_string() && n["mass"].is_number()));
}
