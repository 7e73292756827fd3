//! End-to-end runs of the analytics pipeline against the in-memory store

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use cedmate_analytics::{
    AnalyticsConfig, AnalyticsEngine, AnalyticsError, ArtifactStore, Category, CategoryOutcome,
    Document, MemoryStore, PageKind, ReportExporter,
};

fn engine(store: Arc<MemoryStore>, root: &std::path::Path) -> AnalyticsEngine {
    engine_with(store, root, &AnalyticsConfig::default())
}

fn engine_with(
    store: Arc<MemoryStore>,
    root: &std::path::Path,
    config: &AnalyticsConfig,
) -> AnalyticsEngine {
    AnalyticsEngine::new(store, Arc::new(ArtifactStore::new(root)), config)
}

fn mood_docs() -> Vec<Document> {
    // deliberately out of order
    [4u32, 1, 5, 2, 3]
        .into_iter()
        .map(|day| {
            Document::new(format!("m{}", day))
                .field("zeit", Utc.with_ymd_and_hms(2024, 3, day, 20, 0, 0).unwrap())
                .field("wert", (day % 3) as i64 + 1)
        })
        .collect()
}

fn meal_docs() -> Vec<Document> {
    let dates = ["2024-03-01", "2024-03-02", "2024-03-03"];
    (0..40)
        .map(|i| {
            let date = dates[i % 3];
            Document::new(format!("meal{}", i))
                .field("mahlzeitZeitpunkt", format!("{} {:02}:00", date, 6 + i % 12))
                .field("gericht", "Haferbrei")
        })
        .collect()
}

#[tokio::test]
async fn test_user_without_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(engine(store, dir.path()));

    let result = engine.generate("u1").await.unwrap();
    let json = result.to_json();
    for category in Category::all() {
        assert!(matches!(result.outcome(category), CategoryOutcome::Absent));
        assert!(json[category.tag()].is_null());
    }

    let exporter = ReportExporter::new(engine, &AnalyticsConfig::default());
    let summary = exporter.export("u1").await.unwrap();

    assert_eq!(summary.chart_pages(), 0);
    assert_eq!(summary.pages.first(), Some(&PageKind::Title));
    assert_eq!(summary.pages.len(), 1 + 4);
    assert!(summary.path.exists());
}

#[tokio::test]
async fn test_mood_line_is_time_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().with_documents("u2", "stimmungen", mood_docs()));
    let engine = engine(store, dir.path());

    let result = engine.generate("u2").await.unwrap();

    let artifact = result.outcome(Category::Mood).artifact().unwrap();
    assert_eq!(artifact.path, dir.path().join("mood_line_u2.svg"));
    assert!(artifact.path.exists());

    let times: Vec<_> = artifact.chart.points().iter().map(|p| p.time).collect();
    assert_eq!(times.len(), 5);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));

    assert!(result.path(Category::Meal).is_none());
}

#[tokio::test]
async fn test_meals_counted_per_day() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().with_documents("u3", "mahlzeiten", meal_docs()));
    let engine = engine(store, dir.path());

    let result = engine.generate("u3").await.unwrap();

    let artifact = result.outcome(Category::Meal).artifact().unwrap();
    assert_eq!(artifact.path, dir.path().join("meal_bars_u3.svg"));

    let counts = artifact.chart.daily_counts();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 40);
    assert!(counts.windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_documents("u2", "stimmungen", mood_docs())
            .with_documents("u2", "mahlzeiten", meal_docs()),
    );
    let engine = engine(store, dir.path());

    let first = engine.generate("u2").await.unwrap();
    let mood_svg = std::fs::read(first.path(Category::Mood).unwrap()).unwrap();
    let meal_svg = std::fs::read(first.path(Category::Meal).unwrap()).unwrap();

    let second = engine.generate("u2").await.unwrap();
    assert_eq!(first.paths(), second.paths());
    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(
        std::fs::read(second.path(Category::Mood).unwrap()).unwrap(),
        mood_svg
    );
    assert_eq!(
        std::fs::read(second.path(Category::Meal).unwrap()).unwrap(),
        meal_svg
    );
}

#[tokio::test]
async fn test_broken_category_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().with_documents("u2", "stimmungen", mood_docs()));
    store.fail_subcollection("symptoms").await;
    let engine = engine(store, dir.path());

    let result = engine.generate("u2").await.unwrap();

    assert!(result.outcome(Category::Symptom).is_failed());
    assert!(result.path(Category::Mood).is_some());
    assert_eq!(result.failures().len(), 1);
}

#[tokio::test]
async fn test_all_or_nothing_mode() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().with_documents("u2", "stimmungen", mood_docs()));
    store.fail_subcollection("symptoms").await;
    let config = AnalyticsConfig {
        isolate_failures: false,
        ..Default::default()
    };
    let engine = engine_with(store, dir.path(), &config);

    let err = engine.generate("u2").await.unwrap_err();
    assert!(matches!(
        err,
        AnalyticsError::Fetch {
            category: Category::Symptom,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unreachable_store_aborts_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().with_documents("u2", "stimmungen", mood_docs()));
    store.set_unavailable(true);
    let engine = Arc::new(engine(store.clone(), dir.path()));

    let err = engine.generate("u2").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Connectivity(_)));
    assert_eq!(store.list_calls(), 0);

    let exporter = ReportExporter::new(engine, &AnalyticsConfig::default());
    assert!(exporter.export("u2").await.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_export_fetches_tables_again() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_documents("u3", "mahlzeiten", meal_docs())
            .with_documents("u3", "stimmungen", mood_docs()),
    );
    let engine = Arc::new(engine(store.clone(), dir.path()));
    let exporter = ReportExporter::new(engine, &AnalyticsConfig::default());

    let summary = exporter.export("u3").await.unwrap();

    assert_eq!(store.list_calls(), 8);
    assert_eq!(summary.chart_pages(), 2);
    assert_eq!(
        summary.pages,
        vec![
            PageKind::Title,
            PageKind::Chart(Category::Mood),
            PageKind::Chart(Category::Meal),
            PageKind::Table(Category::BowelMovement),
            PageKind::Table(Category::Mood),
            PageKind::Table(Category::Symptom),
            PageKind::Table(Category::Meal),
        ]
    );
    assert_eq!(summary.path, dir.path().join("export_u3.pdf"));
    let bytes = std::fs::read(&summary.path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_similar_user_ids_keep_separate_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_documents("a_b", "stimmungen", mood_docs())
            .with_documents("a.b", "stimmungen", mood_docs().into_iter().take(2)),
    );
    let engine = engine(store, dir.path());

    let first = engine.generate("a_b").await.unwrap();
    let second = engine.generate("a.b").await.unwrap();

    let first_path = first.path(Category::Mood).unwrap();
    let second_path = second.path(Category::Mood).unwrap();
    assert_ne!(first_path, second_path);
    assert_eq!(
        first.outcome(Category::Mood).artifact().unwrap().chart.points().len(),
        5
    );
    assert!(first_path.exists());
    assert!(second_path.exists());
    assert_ne!(
        std::fs::read(first_path).unwrap(),
        std::fs::read(second_path).unwrap()
    );
}
