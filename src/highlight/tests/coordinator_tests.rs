//! Scenario tests for full and incremental scanning
//!
//! Drives a `ScanCoordinator` over an in-memory `Document` the way a host
//! page would: initial scan, content arriving later, timer callbacks and
//! configuration changes from the store.

use instant::Instant;
use std::time::Duration;

use crate::highlight::config::{Configuration, EngineOptions};
use crate::highlight::coordinator::{CoordinatorState, ScanCoordinator};
use crate::highlight::error::StoreError;
use crate::highlight::types::{Group, PatternKind};
use crate::highlight::watcher::WatcherState;
use crate::tree::{Document, MutationSource, NodeId, NodeTree};

// ============================================================================
// Helpers
// ============================================================================

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn tech() -> Group {
    Group::new("tech", "Tech", "#a7f3d0", PatternKind::Literal, &["Java", "Python"])
}

fn email() -> Group {
    Group::new("email", "Emails", "#fde68a", PatternKind::Regex, &[r"[\w.]+@[\w.]+\.\w+"])
}

fn config(groups: Vec<Group>) -> Configuration {
    Configuration {
        groups,
        case_sensitive: false,
        process_dynamic_content: true,
    }
}

fn page(lines: &[&str]) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    for line in lines {
        let p = doc.append_element(root, "p").unwrap();
        doc.append_text(p, line).unwrap();
    }
    doc
}

fn marker_texts(doc: &Document) -> Vec<String> {
    doc.markers(doc.root())
        .into_iter()
        .map(|m| doc.text_content(m))
        .collect()
}

fn marker_attr(doc: &Document, attr: &str) -> Vec<String> {
    doc.markers(doc.root())
        .into_iter()
        .filter_map(|m| doc.attribute(m, attr).map(str::to_string))
        .collect()
}

fn started(doc: &mut Document, cfg: Configuration) -> ScanCoordinator<NodeId> {
    let mut coordinator = ScanCoordinator::new(EngineOptions::default());
    coordinator.start(doc, cfg);
    coordinator
}

// ============================================================================
// Full scans
// ============================================================================

#[test]
fn test_initial_scan_marks_every_group() {
    let mut doc = page(&["Senior Java developer", "Contact jane.doe@corp.com or python folks"]);
    let root = doc.root();
    let mut coordinator = ScanCoordinator::new(EngineOptions::default());

    let stats = coordinator.start(&mut doc, config(vec![tech(), email()]));

    assert_eq!(stats.leaves, 2);
    assert_eq!(stats.applied, 3);
    assert_eq!(marker_texts(&doc), vec!["Java", "jane.doe@corp.com", "python"]);
    assert_eq!(marker_attr(&doc, "data-group-id"), vec!["tech", "email", "tech"]);
    assert_eq!(
        doc.text_content(root),
        "Senior Java developerContact jane.doe@corp.com or python folks"
    );
    assert_eq!(coordinator.state(), CoordinatorState::Observing);
}

#[test]
fn test_cross_group_overlap_longest_wins() {
    let mut doc = page(&["superman returns"]);
    let short = Group::new("short", "Short", "#111111", PatternKind::Literal, &["super"]);
    let long = Group::new("long", "Long", "#222222", PatternKind::Wildcard, &["super*"]);

    started(&mut doc, config(vec![short, long]));

    assert_eq!(marker_texts(&doc), vec!["superman"]);
    assert_eq!(marker_attr(&doc, "data-group-id"), vec!["long"]);
}

#[test]
fn test_disabled_group_skipped() {
    let mut doc = page(&["Java and Python"]);
    let mut off = tech();
    off.enabled = false;

    let mut coordinator = ScanCoordinator::new(EngineOptions::default());
    let stats = coordinator.start(&mut doc, config(vec![off]));

    assert_eq!(stats.applied, 0);
    assert!(marker_texts(&doc).is_empty());
}

#[test]
fn test_case_sensitive_configuration() {
    let mut doc = page(&["Java and java and JAVA"]);
    let mut cfg = config(vec![tech()]);
    cfg.case_sensitive = true;

    started(&mut doc, cfg);

    assert_eq!(marker_texts(&doc), vec!["Java"]);
}

#[test]
fn test_bad_term_does_not_stop_scan() {
    let mut doc = page(&["ticket ABC-123 filed"]);
    let broken = Group::new("ids", "Ids", "#ccc", PatternKind::Regex, &["[", r"[A-Z]+-\d+"]);

    started(&mut doc, config(vec![broken]));

    assert_eq!(marker_texts(&doc), vec!["ABC-123"]);
}

#[test]
fn test_own_ui_never_scanned() {
    let mut doc = page(&["Java outside"]);
    let root = doc.root();
    let host = doc.append_element(root, "div").unwrap();
    doc.set_attribute(host, "id", "ink-shadow-host");
    doc.append_text(host, "Java inside sidebar").unwrap();

    started(&mut doc, config(vec![tech()]));

    assert_eq!(doc.markers(host).len(), 0);
    assert_eq!(marker_texts(&doc), vec!["Java"]);
}

#[test]
fn test_rescanning_same_root_does_not_double_mark() {
    let mut doc = page(&["Java Java"]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    assert_eq!(marker_texts(&doc).len(), 2);

    let again = coordinator.scan(&mut doc, root);

    assert_eq!(again.applied, 0);
    assert_eq!(marker_texts(&doc).len(), 2);
}

// ============================================================================
// Incremental scans
// ============================================================================

#[test]
fn test_own_markers_do_not_schedule_rescan() {
    let mut doc = page(&["Java everywhere", "Python too"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    assert_eq!(coordinator.on_mutations(&mut doc, t0), 0);
    assert!(coordinator.next_deadline().is_none());
    assert!(coordinator.poll(&mut doc, t0 + ms(1000)).is_none());
}

#[test]
fn test_new_content_scanned_after_quiet_window() {
    let mut doc = page(&["Java first"]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    let card = doc.append_element(root, "div").unwrap();
    doc.append_text(card, "Python later").unwrap();
    coordinator.on_mutations(&mut doc, t0);

    assert!(matches!(coordinator.watcher().state(), WatcherState::Scheduled { .. }));
    assert!(coordinator.poll(&mut doc, t0 + ms(100)).is_none());
    assert_eq!(marker_texts(&doc), vec!["Java"]);

    let stats = coordinator.poll(&mut doc, t0 + ms(300)).unwrap();

    assert_eq!(stats.leaves, 1);
    assert_eq!(stats.applied, 1);
    assert_eq!(marker_texts(&doc), vec!["Java", "Python"]);
    assert_eq!(coordinator.watcher().state(), WatcherState::Observing);
    assert!(coordinator.next_deadline().is_none());
}

#[test]
fn test_burst_produces_one_batch_scanning_ancestor_once() {
    let mut doc = page(&[]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    let feed = doc.append_element(root, "section").unwrap();
    doc.append_text(feed, "Java one").unwrap();
    coordinator.on_mutations(&mut doc, t0);

    let item = doc.append_element(feed, "article").unwrap();
    doc.append_text(item, "Java two").unwrap();
    coordinator.on_mutations(&mut doc, t0 + ms(150));

    let more = doc.append_element(item, "p").unwrap();
    doc.append_text(more, "Python three").unwrap();
    coordinator.on_mutations(&mut doc, t0 + ms(250));

    assert!(coordinator.poll(&mut doc, t0 + ms(400)).is_none());
    let stats = coordinator.poll(&mut doc, t0 + ms(550)).unwrap();

    assert_eq!(stats.leaves, 3);
    assert_eq!(stats.applied, 3);
    assert_eq!(marker_texts(&doc), vec!["Java", "Java", "Python"]);
    assert!(coordinator.poll(&mut doc, t0 + ms(5000)).is_none());
}

#[test]
fn test_content_removed_before_window_is_dropped() {
    let mut doc = page(&[]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    let toast = doc.append_element(root, "div").unwrap();
    doc.append_text(toast, "Java toast").unwrap();
    coordinator.on_mutations(&mut doc, t0);
    doc.remove_child(root, toast).unwrap();

    assert!(coordinator.poll(&mut doc, t0 + ms(300)).is_none());
    assert!(doc.markers(toast).is_empty());
}

#[test]
fn test_static_pages_ignore_later_content() {
    let mut doc = page(&["Java"]);
    let root = doc.root();
    let mut cfg = config(vec![tech()]);
    cfg.process_dynamic_content = false;
    let mut coordinator = started(&mut doc, cfg);
    let t0 = Instant::now();

    let late = doc.append_element(root, "p").unwrap();
    doc.append_text(late, "Python").unwrap();
    coordinator.on_mutations(&mut doc, t0);

    assert!(coordinator.poll(&mut doc, t0 + ms(1000)).is_none());
    assert_eq!(marker_texts(&doc), vec!["Java"]);
}

#[test]
fn test_stop_cancels_scheduled_batch() {
    let mut doc = page(&[]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    let p = doc.append_element(root, "p").unwrap();
    doc.append_text(p, "Java").unwrap();
    coordinator.on_mutations(&mut doc, t0);
    coordinator.stop(&mut doc);

    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    assert!(coordinator.poll(&mut doc, t0 + ms(1000)).is_none());
    assert!(marker_texts(&doc).is_empty());
}

#[test]
fn test_poll_output_does_not_feed_back() {
    let mut doc = page(&["Java first"]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let t0 = Instant::now();

    let card = doc.append_element(root, "div").unwrap();
    doc.append_text(card, "Python later").unwrap();
    coordinator.on_mutations(&mut doc, t0);
    coordinator.poll(&mut doc, t0 + ms(300)).unwrap();

    // the pass split "Python later" and left a plain tail text node behind
    assert_eq!(coordinator.on_mutations(&mut doc, t0 + ms(301)), 0);
    assert!(coordinator.next_deadline().is_none());
    assert!(coordinator.watcher().pending().is_empty());
}

#[test]
fn test_direct_scan_does_not_feed_back() {
    let mut doc = page(&[]);
    let root = doc.root();
    let boundary = Group::new("b", "Boundary", "#ccc", PatternKind::Regex, &["xx", r"\bfoo"]);
    let mut coordinator = started(&mut doc, config(vec![boundary]));
    let t0 = Instant::now();

    let p = doc.append_element(root, "p").unwrap();
    doc.append_text(p, "xxfoo").unwrap();
    coordinator.on_mutations(&mut doc, t0);

    let stats = coordinator.scan(&mut doc, p);
    assert_eq!(stats.applied, 1);

    // the tail "foo" must never be rescanned on its own
    assert_eq!(coordinator.on_mutations(&mut doc, t0 + ms(10)), 0);
    assert!(coordinator.next_deadline().is_none());
    assert!(coordinator.poll(&mut doc, t0 + ms(400)).is_none());
    assert_eq!(marker_texts(&doc), vec!["xx"]);
}

#[test]
fn test_direct_scan_forwards_queued_changes() {
    let mut doc = page(&["Java"]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));
    let first = doc.children(root)[0];

    let late = doc.append_element(root, "p").unwrap();
    doc.append_text(late, "Python").unwrap();
    coordinator.scan(&mut doc, first);

    assert!(coordinator.watcher().pending().contains(&late));
    let stats = coordinator.poll(&mut doc, Instant::now() + ms(1000)).unwrap();
    assert_eq!(stats.applied, 1);
    assert_eq!(marker_texts(&doc), vec!["Java", "Python"]);
}

// ============================================================================
// Configuration changes
// ============================================================================

#[test]
fn test_reset_retracts_disabled_group() {
    let mut doc = page(&["Java mail: a.b@c.io"]);
    let mut coordinator = started(&mut doc, config(vec![tech(), email()]));
    assert_eq!(marker_texts(&doc), vec!["Java", "a.b@c.io"]);

    let mut off = email();
    off.enabled = false;
    let stats = coordinator.reset(&mut doc, config(vec![tech(), off]));

    assert_eq!(stats.applied, 1);
    assert_eq!(marker_texts(&doc), vec!["Java"]);
    assert_eq!(coordinator.state(), CoordinatorState::Observing);
}

#[test]
fn test_reset_applies_new_color() {
    let mut doc = page(&["Python"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    let mut recolored = tech();
    recolored.color = "#ff0000".to_string();
    coordinator.reset(&mut doc, config(vec![recolored]));

    assert_eq!(marker_attr(&doc, "style"), vec!["background-color: #ff0000;"]);
    assert_eq!(doc.markers(doc.root()).len(), 1);
}

#[test]
fn test_reset_leaves_text_intact() {
    let mut doc = page(&["Java, Python and Java again"]);
    let root = doc.root();
    let before = doc.text_content(root);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    coordinator.reset(&mut doc, config(vec![]));

    assert!(marker_texts(&doc).is_empty());
    assert_eq!(doc.text_content(root), before);
    assert_eq!(doc.inner_html(root), "<p>Java, Python and Java again</p>");
}

#[test]
fn test_reset_restarts_watching() {
    let mut doc = page(&["Java"]);
    let root = doc.root();
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    coordinator.reset(&mut doc, config(vec![email()]));
    assert!(doc.is_observing());
    assert!(coordinator.next_deadline().is_none());

    let t0 = Instant::now();
    let p = doc.append_element(root, "p").unwrap();
    doc.append_text(p, "write to x@y.org").unwrap();
    coordinator.on_mutations(&mut doc, t0);
    coordinator.poll(&mut doc, t0 + ms(300)).unwrap();

    assert_eq!(marker_texts(&doc), vec!["x@y.org"]);
}

#[test]
fn test_reset_output_does_not_feed_back() {
    let mut doc = page(&["Java first", "and Python after"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    let mut recolored = tech();
    recolored.color = "#ff0000".to_string();
    let stats = coordinator.reset(&mut doc, config(vec![recolored]));
    assert_eq!(stats.applied, 2);

    assert_eq!(coordinator.on_mutations(&mut doc, Instant::now()), 0);
    assert!(coordinator.next_deadline().is_none());
    assert_eq!(coordinator.state(), CoordinatorState::Observing);
}

#[test]
fn test_reset_to_static_goes_idle() {
    let mut doc = page(&["Java"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    let mut cfg = config(vec![tech()]);
    cfg.process_dynamic_content = false;
    coordinator.reset(&mut doc, cfg);

    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    assert!(!doc.is_observing());
    assert_eq!(marker_texts(&doc), vec!["Java"]);
}

#[test]
fn test_reload_from_store() {
    let mut doc = page(&["Java and Python"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    let python_only = Group::new("py", "Py", "#00f", PatternKind::Literal, &["python"]);
    let store = move || -> Result<Configuration, StoreError> { Ok(config(vec![python_only.clone()])) };
    let stats = coordinator.reload(&mut doc, &store).unwrap();

    assert_eq!(stats.applied, 1);
    assert_eq!(marker_texts(&doc), vec!["Python"]);
    assert_eq!(coordinator.configuration().groups[0].id, "py");
}

#[test]
fn test_failed_reload_keeps_current_state() {
    let mut doc = page(&["Java and Python"]);
    let mut coordinator = started(&mut doc, config(vec![tech()]));

    let store = || -> Result<Configuration, StoreError> {
        Err(StoreError::Unavailable("storage offline".to_string()))
    };

    assert!(coordinator.reload(&mut doc, &store).is_none());
    assert_eq!(marker_texts(&doc), vec!["Java", "Python"]);
    assert_eq!(coordinator.configuration().groups[0].id, "tech");
    assert_eq!(coordinator.state(), CoordinatorState::Observing);
}
