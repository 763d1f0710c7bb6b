//! Integration tests: file loading through to insights
//!
//! Tests the complete pipeline:
//! 1. Write CSV / Parquet files to /tmp
//! 2. Load them against a schema
//! 3. Aggregate, rank and correlate
//! 4. Produce the narrated report

use arrow::array::{Float32Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use engagement_insights::config::EngineConfig;
use engagement_insights::dataset::{CsvOptions, Dataset, PostRecord};
use engagement_insights::insights::InsightsEngine;
use engagement_insights::schema::DatasetSchema;
use engagement_insights::{aggregate_by, correlation_matrix, top_group, Error, GroupKey};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

const POSTS_CSV: &str = "\
post_type,weekday,hour,total_interactions,like,share
Photo,1,9,10,8,2
Photo,1,13,20,17,3
Photo,7,13,30,25,5
Video,7,20,100,80,20
Link,3,,4,4,0
,3,9,50,40,10
";

fn posts_records() -> Vec<PostRecord> {
    let rows = [
        (Some("Photo"), Some(1), Some(9), 10.0, 8.0, 2.0),
        (Some("Photo"), Some(1), Some(13), 20.0, 17.0, 3.0),
        (Some("Photo"), Some(7), Some(13), 30.0, 25.0, 5.0),
        (Some("Video"), Some(7), Some(20), 100.0, 80.0, 20.0),
        (Some("Link"), Some(3), None, 4.0, 4.0, 0.0),
        (None, Some(3), Some(9), 50.0, 40.0, 10.0),
    ];
    rows.iter()
        .map(|&(post_type, weekday, hour, total, like, share)| {
            let mut builder = PostRecord::builder()
                .total_interactions(total)
                .metric("like", like)
                .metric("share", share);
            if let Some(post_type) = post_type {
                builder = builder.post_type(post_type);
            }
            if let Some(weekday) = weekday {
                builder = builder.weekday(weekday);
            }
            if let Some(hour) = hour {
                builder = builder.hour(hour);
            }
            builder.build()
        })
        .collect()
}

fn write_file<P: AsRef<Path>>(path: P, content: &str) {
    std::fs::write(path, content).expect("Failed to write test file");
}

/// Parquet file with narrower types than the canonical ones
fn create_test_parquet<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::new(vec![
        Field::new("post_type", DataType::Utf8, true),
        Field::new("weekday", DataType::Int32, true),
        Field::new("hour", DataType::Int32, true),
        Field::new("total_interactions", DataType::Float32, true),
    ]);

    let num_rows: i32 = 1_000;
    let types = ["Photo", "Status", "Link", "Video"];
    let post_type = StringArray::from_iter_values((0..num_rows).map(|i| types[(i % 4) as usize]));
    let weekday = Int32Array::from_iter_values((0..num_rows).map(|i| i % 7 + 1));
    let hour = Int32Array::from_iter_values((0..num_rows).map(|i| i % 24));
    // Photo 10, Status 20, Link 30, Video 40
    let total =
        Float32Array::from_iter_values((0..num_rows).map(|i| ((i % 4) as f32 + 1.0) * 10.0));

    let batch = RecordBatch::try_new(
        Arc::new(schema.clone()),
        vec![
            Arc::new(post_type),
            Arc::new(weekday),
            Arc::new(hour),
            Arc::new(total),
        ],
    )?;

    let file = File::create(path.as_ref())?;
    let props = WriterProperties::builder()
        .set_max_row_group_size(400) // 3 row groups
        .build();
    let mut writer = ArrowWriter::try_new(file, Arc::new(schema), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

#[test]
fn test_csv_matches_records() {
    let test_file = "/tmp/engagement_insights_posts.csv";
    write_file(test_file, POSTS_CSV);

    let schema = DatasetSchema::posts(["like", "share"]).unwrap();
    let from_csv = Dataset::load_csv(test_file, schema, &CsvOptions::default())
        .expect("Failed to load CSV file");
    let from_records = Dataset::from_records(&posts_records()).unwrap();

    assert_eq!(from_csv.num_rows(), 6);
    for dimension in ["post_type", "weekday", "hour"] {
        assert_eq!(
            aggregate_by(&from_csv, dimension).unwrap(),
            aggregate_by(&from_records, dimension).unwrap(),
            "aggregates differ for {dimension}"
        );
    }

    let metrics = ["total_interactions", "like", "share"];
    assert_eq!(
        correlation_matrix(&from_csv, &metrics).unwrap(),
        correlation_matrix(&from_records, &metrics).unwrap()
    );

    let by_type = aggregate_by(&from_csv, "post_type").unwrap();
    assert_eq!(by_type.mean("Photo"), Some(20.0));
    assert_eq!(by_type.total_count(), 5, "blank post type must not be counted");

    std::fs::remove_file(test_file).ok();
}

#[test]
fn test_csv_missing_column_is_schema_mismatch() {
    let test_file = "/tmp/engagement_insights_missing_column.csv";
    write_file(test_file, "post_type,weekday,total_interactions\nPhoto,1,10\n");

    let schema = DatasetSchema::posts(Vec::<String>::new()).unwrap();
    let result = Dataset::load_csv(test_file, schema, &CsvOptions::default());
    assert!(matches!(result, Err(Error::SchemaMismatch(ref msg)) if msg.contains("hour")));

    std::fs::remove_file(test_file).ok();
}

#[test]
fn test_csv_text_engagement_is_schema_mismatch() {
    let test_file = "/tmp/engagement_insights_text_engagement.csv";
    write_file(
        test_file,
        "post_type,weekday,hour,total_interactions\nPhoto,1,9,lots\n",
    );

    let schema = DatasetSchema::posts(Vec::<String>::new()).unwrap();
    let result = Dataset::load_csv(test_file, schema, &CsvOptions::default());
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));

    std::fs::remove_file(test_file).ok();
}

#[test]
fn test_missing_file_is_storage_error() {
    let schema = DatasetSchema::posts(Vec::<String>::new()).unwrap();
    let result = Dataset::load_csv(
        "/tmp/engagement_insights_does_not_exist.csv",
        schema,
        &CsvOptions::default(),
    );
    assert!(matches!(result, Err(Error::StorageError(_))));
}

#[test]
fn test_parquet_load_casts_to_canonical_types() {
    let test_file = "/tmp/engagement_insights_posts.parquet";
    create_test_parquet(test_file).expect("Failed to create test Parquet file");

    let schema = DatasetSchema::posts(Vec::<String>::new()).unwrap();
    let dataset = Dataset::load_parquet(test_file, schema).expect("Failed to load Parquet file");
    assert_eq!(dataset.num_rows(), 1_000);

    let arrow_schema = dataset.batch().schema();
    assert_eq!(
        arrow_schema.field_with_name("weekday").unwrap().data_type(),
        &DataType::Int64
    );
    assert_eq!(
        arrow_schema
            .field_with_name("total_interactions")
            .unwrap()
            .data_type(),
        &DataType::Float64
    );

    let by_type = aggregate_by(&dataset, "post_type").unwrap();
    assert_eq!(by_type.len(), 4);
    assert_eq!(by_type.mean("Video"), Some(40.0));
    assert_eq!(top_group(&by_type).unwrap().key, GroupKey::from("Video"));

    let by_hour = aggregate_by(&dataset, "hour").unwrap();
    assert_eq!(by_hour.len(), 24);
    assert_eq!(by_hour.total_count(), 1_000);

    std::fs::remove_file(test_file).ok();
}

/// A few rows in the semicolon-separated layout of the Facebook export
fn facebook_csv() -> String {
    let header = [
        "Page total likes",
        "Type",
        "Category",
        "Post Month",
        "Post Weekday",
        "Post Hour",
        "Paid",
        "Lifetime Post Total Reach",
        "Lifetime Post Total Impressions",
        "Lifetime Engaged Users",
        "Lifetime Post Consumers",
        "Lifetime Post Consumptions",
        "Lifetime Post Impressions by people who have liked your Page",
        "Lifetime Post reach by people who like your Page",
        "Lifetime People who have liked your Page and engaged with your post",
        "comment",
        "like",
        "share",
        "Total Interactions",
    ]
    .join(";");

    let rows = [
        "139441;Photo;2;12;4;3;0;2752;5091;178;109;159;3078;1640;119;4;79;17;100",
        "139441;Status;2;12;3;10;0;10460;19057;1457;1361;1674;11710;6112;1108;5;130;29;164",
        "139441;Photo;3;12;3;3;0;2413;4373;177;113;154;2812;1503;132;0;66;14;80",
        "139441;Photo;2;12;2;10;1;50128;87991;2211;790;1119;61027;32048;1386;58;1572;147;1777",
        "139441;Photo;2;12;2;3;0;7244;13594;671;410;580;6228;3200;396;19;325;49;393",
        "139441;Video;1;12;1;9;;10472;20849;1191;1073;1389;16034;7852;1016;1;152;33;186",
    ];

    let mut csv = header;
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv.push('\n');
    csv
}

#[test]
fn test_config_driven_report_on_facebook_export() {
    let data_file = "/tmp/engagement_insights_facebook.csv";
    let config_file = "/tmp/engagement_insights_config.json";
    write_file(data_file, &facebook_csv());
    write_file(
        config_file,
        r#"{
            "strong_correlation_threshold": 0.9,
            "dimensions": ["Type", "Post Weekday", "Post Hour", "Paid"],
            "metrics": ["like", "share", "comment", "Total Interactions"],
            "csv": { "delimiter": ";" }
        }"#,
    );

    let config = EngineConfig::from_json_file(config_file).expect("Failed to load config");
    let dataset = config.load_dataset(data_file).expect("Failed to load dataset");
    assert_eq!(dataset.num_rows(), 6);
    assert_eq!(dataset.num_columns(), 19);

    let engine = InsightsEngine::from_config(&config).unwrap();
    let report = engine.report(&dataset).unwrap();

    assert_eq!(report.overview.rows, 6);
    assert!(report.unavailable.is_empty());

    let by_type = report.dimension("Type").unwrap();
    assert_eq!(by_type.recommendation.key, GroupKey::from("Photo"));
    assert_eq!(by_type.ranking.len(), 3);

    let by_day = report.dimension("Post Weekday").unwrap();
    assert_eq!(by_day.recommendation.key, GroupKey::Ordinal(2));

    // Paid is blank on one row
    let paid = report.dimension("Paid").unwrap();
    let paid_total: usize = paid.ranking.iter().map(|r| r.count).sum();
    assert_eq!(paid_total, 5);

    // like dominates the interaction total
    assert!(report
        .strong_correlations
        .iter()
        .any(|pair| pair.metric_a == "like" && pair.metric_b == "Total Interactions"));

    std::fs::remove_file(data_file).ok();
    std::fs::remove_file(config_file).ok();
}
