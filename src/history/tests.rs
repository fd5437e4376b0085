use super::*;
use crate::error::HistoryError;
use crate::git::fake::FakeBackend;
use crate::models::EntityKind;

const FOO_V1: &str = "def foo():\n    x = 1\n    return x\n";
const FOO_V2: &str = "def foo():\n    x = 2\n    return x\n";
const FOO_V3: &str = "def foo():\n    x = 2\n    return x * 3\n";
const OTHER: &str = "def other():\n    pass\n";

fn timeline(history: &EntityHistory) -> Vec<(&str, ChangeKind)> {
    history
        .changes
        .iter()
        .map(|c| (c.commit.subject.as_str(), c.change))
        .collect()
}

fn history_of(fake: &FakeBackend, name: &str) -> Result<EntityHistory> {
    let locator = EntityLocator::default();
    HistoryReconstructor::new(fake, &locator).reconstruct_entity_history(
        "app.py",
        name,
        KindQuery::Auto,
    )
}

#[test]
fn test_created_then_modified() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2));

    let history = history_of(&fake, "foo")?;

    assert_eq!(
        timeline(&history),
        vec![("C2", ChangeKind::Modified), ("C1", ChangeKind::Created)]
    );
    assert_eq!(history.total_changes, 2);
    assert_eq!(history.first_appeared.as_ref().map(|c| c.subject.as_str()), Some("C1"));
    assert_eq!(history.last_modified.as_ref().map(|c| c.subject.as_str()), Some("C2"));
    assert_eq!(history.language.as_deref(), Some("python"));
    let current = history.current.expect("foo exists at HEAD");
    assert_eq!((current.start_line, current.end_line), (1, 3));
    Ok(())
}

#[test]
fn test_deleted_entry_has_no_span() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2))
        .commit("C3", Some(OTHER));

    let history = history_of(&fake, "foo")?;

    assert_eq!(
        timeline(&history),
        vec![
            ("C3", ChangeKind::Deleted),
            ("C2", ChangeKind::Modified),
            ("C1", ChangeKind::Created),
        ]
    );
    assert!(history.changes[0].span.is_none());
    assert!(history.current.is_none());
    // last_modified is the newest entry, deletion included
    assert_eq!(history.last_modified.as_ref().map(|c| c.subject.as_str()), Some("C3"));
    Ok(())
}

#[test]
fn test_missing_file_counts_as_deletion() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", None)
        .commit("C3", Some(FOO_V1));

    let history = history_of(&fake, "foo")?;

    assert_eq!(
        timeline(&history),
        vec![
            ("C3", ChangeKind::Created),
            ("C2", ChangeKind::Deleted),
            ("C1", ChangeKind::Created),
        ]
    );
    assert_eq!(history.first_appeared.as_ref().map(|c| c.subject.as_str()), Some("C1"));
    Ok(())
}

#[test]
fn test_unparsable_revision_is_absent_for_that_revision_only() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some("def foo(:\n    x = 1\n    return x\n"))
        .commit("C3", Some(FOO_V1));

    let history = history_of(&fake, "foo")?;

    assert_eq!(
        timeline(&history),
        vec![
            ("C3", ChangeKind::Created),
            ("C2", ChangeKind::Deleted),
            ("C1", ChangeKind::Created),
        ]
    );
    Ok(())
}

#[test]
fn test_never_present_is_empty() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2));

    let history = history_of(&fake, "nope")?;

    assert!(history.changes.is_empty());
    assert!(history.first_appeared.is_none());
    assert!(history.last_modified.is_none());
    assert!(history.current.is_none());
    assert_eq!(history.total_changes, 0);
    Ok(())
}

#[test]
fn test_present_at_head_without_touching_commits() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py").with_head(Some("def bar():\n    pass\n"));

    let history = history_of(&fake, "bar")?;

    assert!(history.changes.is_empty());
    let current = history.current.expect("bar exists at HEAD");
    assert_eq!(current.name, "bar");
    assert_eq!(current.signature, "def bar()");
    Ok(())
}

#[test]
fn test_untouched_commits_are_not_recorded() -> anyhow::Result<()> {
    let with_bar = format!("{}\ndef bar():\n    pass\n", FOO_V1);
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(&with_bar));

    let history = history_of(&fake, "foo")?;

    assert_eq!(timeline(&history), vec![("C1", ChangeKind::Created)]);
    let commits = fake.list_commits_touching("app.py")?;
    assert!(history.changes.len() <= commits.len());
    Ok(())
}

#[test]
fn test_each_presence_interval_starts_with_created() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2))
        .commit("C3", Some(OTHER))
        .commit("C4", Some(FOO_V1))
        .commit("C5", Some(FOO_V3));

    let history = history_of(&fake, "foo")?;
    let oldest_first: Vec<ChangeKind> = history.changes.iter().rev().map(|c| c.change).collect();

    assert_eq!(
        oldest_first,
        vec![
            ChangeKind::Created,
            ChangeKind::Modified,
            ChangeKind::Deleted,
            ChangeKind::Created,
            ChangeKind::Modified,
        ]
    );
    Ok(())
}

#[test]
fn test_reconstruction_is_idempotent() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2))
        .commit("C3", Some(FOO_V3));

    let first = history_of(&fake, "foo")?;
    let second = history_of(&fake, "foo")?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_max_commits_walks_only_newest() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(FOO_V2))
        .commit("C3", Some(FOO_V3));
    let locator = EntityLocator::default();

    let history = HistoryReconstructor::new(&fake, &locator)
        .with_max_commits(Some(2))
        .reconstruct_entity_history("app.py", "foo", KindQuery::Auto)?;

    assert_eq!(
        timeline(&history),
        vec![("C3", ChangeKind::Modified), ("C2", ChangeKind::Created)]
    );
    Ok(())
}

#[test]
fn test_auto_kind_is_pinned_from_head() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some("def Widget():\n    return 1\n"))
        .commit("C2", Some("class Widget:\n    size = 1\n"));

    let history = history_of(&fake, "Widget")?;

    assert_eq!(timeline(&history), vec![("C2", ChangeKind::Created)]);
    assert_eq!(history.current.map(|s| s.kind), Some(EntityKind::Class));
    Ok(())
}

#[test]
fn test_explicit_kind_is_respected() -> anyhow::Result<()> {
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some("def Widget():\n    return 1\n"))
        .commit("C2", Some("class Widget:\n    size = 1\n"));
    let locator = EntityLocator::default();

    let history = HistoryReconstructor::new(&fake, &locator).reconstruct_entity_history(
        "app.py",
        "Widget",
        KindQuery::Exact(EntityKind::Function),
    )?;

    assert_eq!(
        timeline(&history),
        vec![("C2", ChangeKind::Deleted), ("C1", ChangeKind::Created)]
    );
    Ok(())
}

#[test]
fn test_unknown_language_is_empty() -> anyhow::Result<()> {
    let fake = FakeBackend::new("notes.txt").commit("C1", Some("foo\n"));
    let locator = EntityLocator::default();

    let history = HistoryReconstructor::new(&fake, &locator).reconstruct_entity_history(
        "notes.txt",
        "foo",
        KindQuery::Auto,
    )?;

    assert!(history.changes.is_empty());
    assert!(history.language.is_none());
    Ok(())
}

#[test]
fn test_backend_failure_propagates() {
    let fake = FakeBackend::new("app.py").commit("C1", Some(FOO_V1)).failing();

    let result = history_of(&fake, "foo");

    assert!(matches!(result, Err(HistoryError::Backend(_))));
}

#[test]
fn test_evolution_snapshots() -> anyhow::Result<()> {
    let with_bar = format!("{}\ndef bar():\n    pass\n", FOO_V1);
    let fake = FakeBackend::new("app.py")
        .commit("C1", Some(FOO_V1))
        .commit("C2", Some(&with_bar))
        .commit("C3", Some(FOO_V2))
        .commit("C4", Some(OTHER));
    let locator = EntityLocator::default();

    let evolution = HistoryReconstructor::new(&fake, &locator).entity_evolution(
        "app.py",
        "foo",
        KindQuery::Auto,
    )?;

    let steps: Vec<(&str, ChangeKind)> = evolution
        .snapshots
        .iter()
        .map(|s| (s.commit.subject.as_str(), s.change))
        .collect();
    // C2 leaves foo's text untouched
    assert_eq!(
        steps,
        vec![
            ("C1", ChangeKind::Created),
            ("C3", ChangeKind::Modified),
            ("C4", ChangeKind::Deleted),
        ]
    );
    assert_eq!(evolution.kind, EntityKind::Function);
    assert_eq!(
        evolution.snapshots[1].source.as_deref(),
        Some(FOO_V2.trim_end())
    );
    assert!(evolution.snapshots[2].source.is_none());
    Ok(())
}

#[test]
fn test_evolution_without_history_is_an_error() {
    let fake = FakeBackend::new("app.py").commit("C1", Some(OTHER));
    let locator = EntityLocator::default();

    let result = HistoryReconstructor::new(&fake, &locator).entity_evolution(
        "app.py",
        "foo",
        KindQuery::Auto,
    );

    assert!(matches!(result, Err(HistoryError::NoHistory { .. })));
}

#[test]
fn test_evolution_rejects_unknown_language() {
    let fake = FakeBackend::new("notes.txt");
    let locator = EntityLocator::default();

    let result = HistoryReconstructor::new(&fake, &locator).entity_evolution(
        "notes.txt",
        "foo",
        KindQuery::Auto,
    );

    assert!(matches!(result, Err(HistoryError::UnsupportedLanguage(_))));
}
