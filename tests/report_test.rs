//! Tests for the narrated engagement report

use engagement_insights::config::EngineConfig;
use engagement_insights::dataset::{Dataset, PostRecord};
use engagement_insights::insights::{recommend, DatasetOverview, InsightsEngine};
use engagement_insights::{Error, GroupKey};

fn post(post_type: &str, weekday: i64, hour: i64, total: f64) -> PostRecord {
    PostRecord::builder()
        .post_type(post_type)
        .weekday(weekday)
        .hour(hour)
        .total_interactions(total)
        .metric("like", total * 0.8)
        .metric("share", total * 0.1)
        .build()
}

fn sample_posts() -> Dataset {
    Dataset::from_records(&[
        post("Photo", 1, 9, 10.0),
        post("Photo", 2, 10, 20.0),
        post("Photo", 3, 10, 30.0),
        post("Video", 7, 10, 100.0),
    ])
    .unwrap()
}

#[test]
fn test_report_narratives() {
    let dataset = sample_posts();
    let report = InsightsEngine::builder().build().unwrap().report(&dataset).unwrap();
    let text = report.to_string();

    assert!(text.contains("The dataset contains 4 posts and 6 columns of information."));
    for sentence in [
        "On average, Video posts perform the best with about 100.0 interactions.",
        "The best day to post is Day 7 with about 100.0 interactions on average.",
        "The best time to post is around 10:00 with about 50.0 interactions.",
        "Posts with more total_interactions also tend to have more like (r = 1.00).",
    ] {
        assert!(text.contains(sentence), "missing: {sentence}");
    }
}

#[test]
fn test_report_json_shape() {
    let dataset = sample_posts();
    let report = InsightsEngine::builder()
        .dimensions(["post_type"])
        .metrics(["like", "share"])
        .build()
        .unwrap()
        .report(&dataset)
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    for key in [
        "generated_at",
        "overview",
        "dimensions",
        "unavailable",
        "correlation",
        "strong_correlations",
        "correlation_notes",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["overview"]["rows"], 4);
    assert_eq!(json["dimensions"][0]["recommendation"]["key"], "Video");
    assert_eq!(json["dimensions"][0]["ranking"][0]["rank"], 1);
    assert_eq!(json["strong_correlations"][0]["metric_a"], "like");
}

#[test]
fn test_dimension_without_records_is_unavailable() {
    let dataset = Dataset::from_records(&[
        PostRecord::builder().post_type("Photo").weekday(3).total_interactions(12.0).build(),
        PostRecord::builder().post_type("Link").weekday(3).total_interactions(8.0).build(),
    ])
    .unwrap();

    let report = InsightsEngine::builder().build().unwrap().report(&dataset).unwrap();
    assert_eq!(report.dimensions.len(), 2);
    assert_eq!(report.unavailable.len(), 1);
    assert_eq!(report.unavailable[0].dimension, "hour");
    assert!(report.to_string().contains("No insight for hour"));
}

#[test]
fn test_unknown_requested_dimension_fails_report() {
    let dataset = sample_posts();
    let engine = InsightsEngine::builder()
        .dimensions(["post_type", "nonexistent_field"])
        .build()
        .unwrap();
    assert!(matches!(
        engine.report(&dataset),
        Err(Error::UnknownDimension(ref name)) if name == "nonexistent_field"
    ));
}

#[test]
fn test_threshold_outside_unit_interval_rejected() {
    for threshold in [-0.1, 1.5, f64::NAN] {
        let result = InsightsEngine::builder()
            .strong_correlation_threshold(threshold)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

#[test]
fn test_recommend_single_dimension() {
    let dataset = sample_posts();
    let recommendation = recommend(&dataset, "weekday").unwrap();
    assert_eq!(recommendation.key, GroupKey::Ordinal(7));
    assert_eq!(recommendation.count, 1);
    assert_eq!(recommendation.label, "weekday");
}

#[test]
fn test_overview_and_head() {
    let dataset = sample_posts();
    let overview = DatasetOverview::of(&dataset);
    assert_eq!(overview.rows, 4);
    assert_eq!(
        overview.column_names,
        vec!["total_interactions", "post_type", "weekday", "hour", "like", "share"]
    );
    assert_eq!(dataset.head(2).num_rows(), 2);
    assert_eq!(dataset.head(10).num_rows(), 4);
}

#[test]
fn test_engine_from_config() {
    let config =
        EngineConfig::from_json_str(r#"{ "strong_correlation_threshold": 0.95 }"#).unwrap();
    let engine = InsightsEngine::from_config(&config).unwrap();
    assert!((engine.strong_correlation_threshold() - 0.95).abs() < f64::EPSILON);

    let bad = EngineConfig::from_json_str(r#"{ "dimensions": ["Colour"] }"#);
    assert!(matches!(bad, Err(Error::UnknownDimension(_))));
}

#[test]
fn test_overview_preview_rows() {
    let dataset = Dataset::from_records(&[
        post("Photo", 1, 9, 10.0),
        PostRecord::builder().post_type("Link").weekday(4).total_interactions(3.0).build(),
        post("Video", 7, 10, 100.0),
    ])
    .unwrap();

    let report = InsightsEngine::builder()
        .preview_rows(2)
        .build()
        .unwrap()
        .report(&dataset)
        .unwrap();
    let preview = &report.overview.preview;

    assert_eq!(preview.len(), 2);
    assert!(preview.iter().all(|row| row.len() == report.overview.columns));
    // total_interactions, post_type, weekday, hour, like, share
    assert_eq!(preview[0][1], "Photo");
    assert_eq!(preview[0][2], "1");
    assert_eq!(preview[0][3], "9");
    assert_eq!(preview[1][1], "Link");
    assert_eq!(preview[1][3], "null");

    let text = report.to_string();
    assert!(text.contains("Here are the first 2 rows of data:"));
    assert!(text.contains("total_interactions | post_type | weekday | hour | like | share"));
    assert!(!text.contains("Video |"));
}

#[test]
fn test_preview_rows_from_config() {
    let config = EngineConfig::from_json_str(r#"{ "preview_rows": 1 }"#).unwrap();
    let engine = InsightsEngine::from_config(&config).unwrap();
    assert_eq!(engine.preview_rows(), 1);

    let report = engine.report(&sample_posts()).unwrap();
    assert_eq!(report.overview.preview.len(), 1);

    let silent = InsightsEngine::builder().preview_rows(0).build().unwrap();
    let report = silent.report(&sample_posts()).unwrap();
    assert!(report.overview.preview.is_empty());
    assert!(!report.to_string().contains("Here are the first"));
}

#[test]
fn test_constant_fractional_metric_not_reported_strong() {
    let records: Vec<_> = [10.0, 20.0, 40.0, 80.0]
        .into_iter()
        .map(|total| {
            PostRecord::builder()
                .post_type("Photo")
                .total_interactions(total)
                .metric("like", 0.1)
                .metric("share", 0.1)
                .build()
        })
        .collect();
    let dataset = Dataset::from_records(&records).unwrap();

    let report = InsightsEngine::builder().build().unwrap().report(&dataset).unwrap();
    assert!(report.strong_correlations.is_empty());
    assert!(report.correlation_notes.is_empty());
    assert!(!report.correlation.coefficient("like", "share").unwrap().is_defined());
    assert!(!report
        .correlation
        .coefficient("total_interactions", "like")
        .unwrap()
        .is_defined());
}
