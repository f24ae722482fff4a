use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use expect_test::expect;
use lintmark::lint::worker;
use lintmark::lint::{LintMessage, LintResult, WorkerEndpoint, WorkerMessage};
use lintmark::{
    apply, decorate, load_settings, resolve, resolve_end, to_diagnostics, Confidence,
    DecorateOptions, DecorationSet, DispatchState, DocumentHost, DocumentSnapshot, Finding,
    LineIndex, LintSession, MemoryHost, Node, OffsetEncoding, OverlapPolicy, PositionMap,
    SessionHandle, Settings, SnapshotVersion, TextSource,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a decoration set into a deterministic, human-readable string.
///
/// Each decoration becomes one line:
///   <node>:<offset>-<node>:<offset> <severity> <confidence> [<rule>] <flat>: <message>
fn format_decorations(set: &DecorationSet) -> String {
    if set.is_empty() {
        return "OK (no decorations)".to_string();
    }

    set.iter()
        .map(|d| {
            format!(
                "{}:{}-{}:{} {} {} [{}] {}..{}: {}",
                d.start.node.0,
                d.start.offset,
                d.end.node.0,
                d.end.offset,
                d.severity.as_str(),
                d.confidence.as_str(),
                d.rule_id,
                d.flat.start,
                d.flat.end,
                d.message,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn snapshot(paragraphs: &[&str]) -> DocumentSnapshot {
    DocumentSnapshot::paragraphs(SnapshotVersion(1), paragraphs)
}

fn plain(snapshot: &DocumentSnapshot, findings: &[Finding]) -> String {
    let map = PositionMap::build(snapshot, OffsetEncoding::Utf16);
    let set = decorate(
        snapshot,
        map.text(),
        TextSource::Plain,
        findings,
        DecorateOptions::default(),
    );
    format_decorations(&set)
}

fn message(rule: &str, text: &str, range: [i64; 2]) -> LintMessage {
    LintMessage {
        rule_id: rule.to_string(),
        message: text.to_string(),
        severity: 2,
        range: Some(range),
        ..Default::default()
    }
}

fn result(messages: Vec<LintMessage>) -> LintResult {
    LintResult {
        file_path: String::new(),
        messages,
    }
}

fn start(host: &Arc<MemoryHost>, settings: Settings) -> (SessionHandle, WorkerEndpoint) {
    let (channel, endpoint) = worker::channel();
    let session = LintSession::spawn(Arc::clone(host), channel, settings);
    (session, endpoint)
}

/// Let the session task run until it blocks.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// True if the worker receives no request within a generous window.
async fn no_request(endpoint: &mut WorkerEndpoint) -> bool {
    tokio::time::timeout(Duration::from_secs(10), endpoint.recv())
        .await
        .is_err()
}

// ---------------------------------------------------------------------------
// Offset mapping and decoration
// ---------------------------------------------------------------------------

#[test]
fn doubled_space_single_paragraph() {
    let findings = [Finding::new("no-doubled-space", "Doubled space", 5..7)];
    expect![[r#"2:5-2:7 error exact [no-doubled-space] 5..7: Doubled space"#]]
        .assert_eq(&plain(&snapshot(&["Hello  world."]), &findings));
}

#[test]
fn second_paragraph_range() {
    let doc = snapshot(&["Title", "Body text"]);
    assert_eq!(
        PositionMap::build(&doc, OffsetEncoding::Utf16).text(),
        "Title\nBody text"
    );
    let findings = [Finding::new("rule", "Body", 6..10)];
    expect![[r#"4:0-4:4 error exact [rule] 6..10: Body"#]].assert_eq(&plain(&doc, &findings));
}

#[test]
fn range_ending_at_block_boundary_stays_in_block() {
    let doc = snapshot(&["Title", "Body"]);
    let findings = [Finding::new("rule", "Title", 0..5)];
    expect![[r#"2:0-2:5 error exact [rule] 0..5: Title"#]].assert_eq(&plain(&doc, &findings));
}

#[test]
fn empty_paragraphs_occupy_one_newline() {
    let doc = snapshot(&["A", "", "B"]);
    let map = PositionMap::build(&doc, OffsetEncoding::Utf16);
    assert_eq!(map.text(), "A\n\nB");

    let findings = [Finding::new("no-empty", "Empty line", 2..3)];
    expect![[r#"3:0-3:0 error exact [no-empty] 2..3: Empty line"#]]
        .assert_eq(&plain(&doc, &findings));
}

#[test]
fn inline_markup_and_breaks() {
    let root = Node::inline(
        0,
        "doc",
        vec![Node::block(
            1,
            "p",
            vec![
                Node::text(2, "a "),
                Node::inline(3, "strong", vec![Node::text(4, "bold")]),
                Node::hard_break(5),
                Node::text(6, "next"),
            ],
        )],
    );
    let doc = DocumentSnapshot::new(SnapshotVersion(1), root);
    assert_eq!(
        PositionMap::build(&doc, OffsetEncoding::Utf16).text(),
        "a bold\nnext"
    );

    let findings = [
        Finding::new("spans-markup", "m", 0..6),
        Finding::new("after-break", "m", 7..11),
    ];
    expect![[r#"
        2:0-4:4 error exact [spans-markup] 0..6: m
        6:0-6:4 error exact [after-break] 7..11: m"#]]
    .assert_eq(&plain(&doc, &findings));
}

#[test]
fn astral_characters_interpolate() {
    let doc = snapshot(&["a😀b"]);
    // 1..2 splits the surrogate pair.
    let findings = [Finding::new("split", "m", 1..2)];
    expect![[r#"2:1-2:2 error interpolated [split] 1..2: m"#]]
        .assert_eq(&plain(&doc, &findings));
}

#[test]
fn boundary_clamping() {
    let doc = snapshot(&["Hello"]);
    let map = PositionMap::build(&doc, OffsetEncoding::Utf16);

    let before = resolve(&map, -1);
    assert_eq!(before.confidence, Confidence::Clamped);
    assert_eq!((before.position.node.0, before.position.offset), (2, 0));

    let after = resolve_end(&map, 5 + 5);
    assert_eq!(after.confidence, Confidence::Clamped);
    assert_eq!(after.position, map.end());
    assert_eq!((after.position.node.0, after.position.offset), (2, 5));
}

#[test]
fn exact_offsets_round_trip() {
    let doc = snapshot(&["One", "", "two 😀", "three"]);
    let map = PositionMap::build(&doc, OffsetEncoding::Utf16);

    let mut previous = None;
    for entry in map.entries() {
        if let Some(previous) = previous {
            assert!(entry.flat > previous, "flat positions must increase");
        }
        previous = Some(entry.flat);

        let resolved = resolve(&map, entry.flat as i64);
        assert_eq!(resolved.confidence, Confidence::Exact);
        assert_eq!(resolved.position, entry.pos);
    }
}

#[test]
fn serialized_text_aligns_through_normalized_prefixes() {
    let host = MemoryHost::with_paragraphs(&["Title", "Body  text"]);
    let doc = host.snapshot();
    let markdown = host.serialize(&doc).unwrap();
    assert_eq!(markdown, "Title\n\nBody  text");

    let findings = [
        Finding::new("no-doubled-space", "Doubled space", 11..13),
        Finding::new("whole-body", "m", 7..17),
    ];
    let set = decorate(
        &doc,
        &markdown,
        TextSource::Serialized,
        &findings,
        DecorateOptions::default(),
    );
    expect![[r#"
        4:4-4:6 error approximate [no-doubled-space] 10..12: Doubled space
        4:0-4:10 error approximate [whole-body] 6..16: m"#]]
    .assert_eq(&format_decorations(&set));
}

#[test]
fn serialized_markup_prefix_falls_back_to_clamping() {
    let root = Node::inline(
        0,
        "doc",
        vec![
            Node::block(1, "h1", vec![Node::text(2, "Title")]),
            Node::block(3, "p", vec![Node::text(4, "Body")]),
        ],
    );
    let host = MemoryHost::new(root);
    let doc = host.snapshot();
    let markdown = host.serialize(&doc).unwrap();
    assert_eq!(markdown, "# Title\n\nBody");

    let findings = [Finding::new("heading", "m", 2..7)];
    let set = decorate(
        &doc,
        &markdown,
        TextSource::Serialized,
        &findings,
        DecorateOptions::default(),
    );
    expect![[r#"2:2-4:1 error clamped [heading] 2..7: m"#]].assert_eq(&format_decorations(&set));
}

#[test]
fn later_finding_owns_overlap() {
    let doc = snapshot(&["abcdefghij"]);
    let findings = [
        Finding::new("first", "m", 0..6),
        Finding::new("second", "m", 3..8),
    ];
    let options = DecorateOptions {
        overlap: OverlapPolicy::LaterWins,
        ..Default::default()
    };
    let set = decorate(&doc, "abcdefghij", TextSource::Plain, &findings, options);
    expect![[r#"
        2:0-2:3 error exact [first] 0..3: m
        2:3-2:8 error exact [second] 3..8: m"#]]
    .assert_eq(&format_decorations(&set));
}

#[test]
fn zero_width_finding_leaves_earlier_marker_whole() {
    let doc = snapshot(&["abcdefghij"]);
    let findings = [Finding::new("a", "m", 0..6), Finding::new("point", "m", 3..3)];
    let set = decorate(
        &doc,
        "abcdefghij",
        TextSource::Plain,
        &findings,
        DecorateOptions {
            overlap: OverlapPolicy::LaterWins,
            ..Default::default()
        },
    );
    expect![[r#"
        2:0-2:6 error exact [a] 0..6: m
        2:3-2:3 error exact [point] 3..3: m"#]]
    .assert_eq(&format_decorations(&set));
}

#[test]
fn applying_twice_is_idempotent() {
    let host = MemoryHost::with_paragraphs(&["Hello  world."]);
    let findings = [Finding::new("no-doubled-space", "Doubled space", 5..7)];
    let set = decorate(
        &host.snapshot(),
        "Hello  world.",
        TextSource::Plain,
        &findings,
        DecorateOptions::default(),
    );

    apply(&host, set.clone()).unwrap();
    let once = host.decorations();
    apply(&host, set).unwrap();
    assert_eq!(host.decorations(), once);
    assert_eq!(host.commits(), 2);
}

#[test]
fn stale_set_is_rejected_by_host() {
    let host = MemoryHost::with_paragraphs(&["Hello"]);
    let stale = DecorationSet::empty(host.snapshot().version());
    host.edit_paragraphs(&["Hello!"]);
    assert!(apply(&host, stale).is_err());
    assert_eq!(host.commits(), 0);
}

#[test]
fn findings_to_lsp_diagnostics() {
    let text = "Title\nBody  text";
    let index = LineIndex::new(text.to_string(), OffsetEncoding::Utf16);
    let diagnostics = to_diagnostics(
        &[Finding::new("no-doubled-space", "Doubled space", 10..12)],
        &index,
    );
    let range = diagnostics[0].range;
    assert_eq!(
        (range.start.line, range.start.character, range.end.character),
        (1, 4, 6)
    );
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[test]
fn fixture_settings() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/basic")
        .join("lintmark.toml");
    let settings = load_settings(&path);

    assert_eq!(settings.quiet_period(), Duration::from_millis(300));
    assert_eq!(settings.lint.file_extension, ".txt");
    assert_eq!(settings.lint.source, TextSource::Serialized);
    assert_eq!(settings.lint.encoding, OffsetEncoding::CodePoint);
    assert!(settings.lint.skip_blank);
    assert!(!settings.lint.skip_unchanged);
    assert_eq!(settings.decorations.overlap, OverlapPolicy::LaterWins);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_one_request() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["H"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    for text in ["He", "Hel", "Hell", "Hello"] {
        tokio::time::sleep(Duration::from_millis(100)).await;
        host.edit_paragraphs(&[text]);
        session.notify_change();
    }

    let request = endpoint.recv().await.unwrap();
    assert_eq!(request.id, 1);
    assert_eq!(request.text, "Hello");
    assert!(no_request(&mut endpoint).await);
}

#[tokio::test(start_paused = true)]
async fn quiet_period_restarts_on_each_edit() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["a"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    tokio::time::sleep(Duration::from_millis(400)).await;
    host.edit_paragraphs(&["ab"]);
    session.notify_change();
    tokio::time::sleep(Duration::from_millis(400)).await;
    settle().await;
    assert_eq!(session.state(), DispatchState::PendingEdit);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let request = endpoint.recv().await.unwrap();
    assert_eq!(request.text, "ab");
}

#[tokio::test(start_paused = true)]
async fn composition_defers_linting() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["かな"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    host.set_composing(true);
    host.edit_paragraphs(&["かな漢"]);
    session.notify_change();
    assert!(no_request(&mut endpoint).await);
    assert_eq!(session.state(), DispatchState::PendingEdit);

    host.edit_paragraphs(&["かな漢字"]);
    host.set_composing(false);
    session.notify_composition_end();

    let request = endpoint.recv().await.unwrap();
    assert_eq!(request.text, "かな漢字");
}

#[tokio::test(start_paused = true)]
async fn result_is_applied_to_the_linted_snapshot() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["Title", "Body  text"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();
    assert_eq!(request.text, "Title\nBody  text");

    endpoint
        .reply(
            request.id,
            result(vec![message("no-doubled-space", "Doubled space", [10, 12])]),
        )
        .unwrap();
    settle().await;

    expect![[r#"4:4-4:6 error exact [no-doubled-space] 10..12: Doubled space"#]]
        .assert_eq(&format_decorations(&host.decorations()));
    assert_eq!(session.state(), DispatchState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stale_results_are_discarded() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["first"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let first = endpoint.recv().await.unwrap();
    host.edit_paragraphs(&["second draft"]);
    session.notify_change();
    let second = endpoint.recv().await.unwrap();
    assert_eq!((first.id, second.id), (1, 2));

    // The newer result arrives first; the older one must not overwrite it.
    endpoint
        .reply(second.id, result(vec![message("new", "m", [0, 6])]))
        .unwrap();
    endpoint
        .reply(first.id, result(vec![message("old", "m", [0, 5])]))
        .unwrap();
    settle().await;

    expect![[r#"2:0-2:6 error exact [new] 0..6: m"#]]
        .assert_eq(&format_decorations(&host.decorations()));
    assert_eq!(host.commits(), 1);
}

#[tokio::test(start_paused = true)]
async fn unissued_reply_tag_leaves_latest_request_pending() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["Hello  world."]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();
    endpoint
        .reply(99, result(vec![message("unknown", "m", [0, 5])]))
        .unwrap();
    settle().await;
    assert_eq!(host.commits(), 0);

    endpoint
        .reply(
            request.id,
            result(vec![message("no-doubled-space", "Doubled space", [5, 7])]),
        )
        .unwrap();
    settle().await;

    expect![[r#"2:5-2:7 error exact [no-doubled-space] 5..7: Doubled space"#]]
        .assert_eq(&format_decorations(&host.decorations()));
}

#[tokio::test(start_paused = true)]
async fn result_for_a_changed_document_is_dropped() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["before"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();

    host.edit_paragraphs(&["after edit"]);
    session.notify_change();
    endpoint
        .reply(request.id, result(vec![message("r", "m", [0, 6])]))
        .unwrap();
    settle().await;
    assert_eq!(host.commits(), 0);

    let next = endpoint.recv().await.unwrap();
    assert_eq!(next.text, "after edit");
}

#[tokio::test(start_paused = true)]
async fn worker_messages_decode_from_json() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["Hello  world."]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();

    let ack = r#"{"command":"lint","metadata":{"queued":true}}"#;
    endpoint.send(WorkerMessage::from_json(ack).unwrap()).unwrap();
    let json = format!(
        r#"{{"command":"lint:result","id":{},"result":{{"filePath":"<text>","messages":[
            {{"ruleId":"no-doubled-space","message":"Doubled space","severity":1,
              "line":1,"column":6,"range":[5,7]}}]}}}}"#,
        request.id
    );
    endpoint.send(WorkerMessage::from_json(&json).unwrap()).unwrap();
    settle().await;

    expect![[r#"2:5-2:7 warning exact [no-doubled-space] 5..7: Doubled space"#]]
        .assert_eq(&format_decorations(&host.decorations()));
}

#[tokio::test(start_paused = true)]
async fn serialized_source_sends_markdown() {
    let root = Node::inline(
        0,
        "doc",
        vec![
            Node::block(1, "h1", vec![Node::text(2, "Title")]),
            Node::block(3, "p", vec![Node::text(4, "Body")]),
        ],
    );
    let host = Arc::new(MemoryHost::new(root));
    let mut settings = Settings::default();
    settings.lint.source = TextSource::Serialized;
    let (session, mut endpoint) = start(&host, settings);

    session.notify_change();
    let request = endpoint.recv().await.unwrap();
    assert_eq!(request.text, "# Title\n\nBody");
}

#[tokio::test(start_paused = true)]
async fn blank_document_clears_without_linting() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["typo"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();
    endpoint
        .reply(request.id, result(vec![message("r", "m", [0, 4])]))
        .unwrap();
    settle().await;
    assert_eq!(host.decorations().len(), 1);

    host.edit_paragraphs(&["", " "]);
    session.notify_change();
    assert!(no_request(&mut endpoint).await);
    assert!(host.decorations().is_empty());
    assert_eq!(host.commits(), 2);
}

#[tokio::test(start_paused = true)]
async fn worker_loss_disables_linting() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["typo"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    let request = endpoint.recv().await.unwrap();
    endpoint
        .reply(request.id, result(vec![message("r", "m", [0, 4])]))
        .unwrap();
    settle().await;
    let applied = host.decorations();

    drop(endpoint);
    settle().await;
    assert_eq!(session.state(), DispatchState::Disabled);

    host.edit_paragraphs(&["typo two"]);
    session.notify_change();
    tokio::time::sleep(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(session.state(), DispatchState::Disabled);
    assert_eq!(host.decorations(), applied);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_session() {
    let host = Arc::new(MemoryHost::with_paragraphs(&["text"]));
    let (session, mut endpoint) = start(&host, Settings::default());

    session.notify_change();
    session.shutdown();
    session.stopped().await;
    assert!(session.is_stopped());

    // The pending timer died with the session.
    assert!(endpoint.recv().await.is_none());
    session.notify_change();
}
