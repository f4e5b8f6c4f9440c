//! End-to-end tests: uploads in, materialized pages through the pipeline,
//! records and failures out.
//!
//! Reply handling is data driven: add an entry to `reply_cases` with the raw
//! model text and the expected outcome.

mod common;

use std::sync::Arc;

use manuscan::asset::{DocumentId, PageNumber, UploadKind};
use manuscan::normalize::ExtractionStrategy;
use manuscan::pipeline::{ChannelProgress, FailureKind, ProgressEvent};
use serde_json::json;

use common::{
    jpeg_bytes, tiff_bytes, zip_bytes, PipelineConfigBuilder, ScriptedClient, TestHarness,
};

enum Expect {
    Record(Vec<(&'static str, serde_json::Value)>),
    Failure(FailureKind),
}

struct ReplyCase {
    name: &'static str,
    reply: &'static str,
    extraction: ExtractionStrategy,
    require_all: bool,
    expect: Expect,
}

fn reply_cases() -> Vec<ReplyCase> {
    vec![
        ReplyCase {
            name: "fenced_object",
            reply: "```json\n{\"Illustration present\": true, \"Frame present\": \"Black\"}\n```",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: false,
            expect: Expect::Record(vec![
                ("Illustration present", json!(true)),
                ("Frame present", json!("Black")),
            ]),
        },
        ReplyCase {
            name: "prose_around_object",
            reply: "Here is the analysis: {\"Arabic numeral int\": \"12\"} Hope it helps.",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: false,
            expect: Expect::Record(vec![("Arabic numeral int", json!(12))]),
        },
        ReplyCase {
            name: "line_trim_fenced",
            reply: "```json\n{\"Chinese page number\": \"false\"}\n```",
            extraction: ExtractionStrategy::LineTrim,
            require_all: false,
            expect: Expect::Record(vec![("Chinese page number", json!(false))]),
        },
        ReplyCase {
            name: "line_trim_single_line_over_trims",
            reply: "{\"Chinese page number\": false}",
            extraction: ExtractionStrategy::LineTrim,
            require_all: false,
            expect: Expect::Failure(FailureKind::Parse),
        },
        ReplyCase {
            name: "no_json_at_all",
            reply: "I'm sorry, I can't help with that.",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: false,
            expect: Expect::Failure(FailureKind::Parse),
        },
        ReplyCase {
            name: "wrong_type",
            reply: "{\"Illustration present\": \"maybe\"}",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: false,
            expect: Expect::Failure(FailureKind::Schema),
        },
        ReplyCase {
            name: "missing_field_when_required",
            reply: "{\"Illustration present\": true}",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: true,
            expect: Expect::Failure(FailureKind::Schema),
        },
        ReplyCase {
            name: "out_of_vocabulary_is_kept",
            reply: "{\"Frame present\": \"Green\"}",
            extraction: ExtractionStrategy::BalancedObject,
            require_all: false,
            expect: Expect::Record(vec![("Frame present", json!("Green"))]),
        },
    ]
}

#[test]
fn test_reply_cases() {
    for case in reply_cases() {
        let harness = TestHarness::new();
        harness.write_input("page.jpg", &jpeg_bytes(4, 4));

        let mut builder = PipelineConfigBuilder::new().extraction(case.extraction);
        if case.require_all {
            builder = builder.require_all_fields();
        }
        let client = Arc::new(ScriptedClient::new().default_reply(case.reply));

        let outcome = harness.run_quiet(&[harness.upload("page.jpg")], builder.build(), client);
        assert_eq!(outcome.total, 1, "case {}", case.name);

        match case.expect {
            Expect::Record(expected) => {
                assert_eq!(outcome.succeeded(), 1, "case {}: {:?}", case.name, outcome.failures);
                let record = &outcome.results.records()[0];
                assert!(!expected.is_empty(), "case {} checks no fields", case.name);
                for (key, value) in &expected {
                    assert_eq!(record.fields.get(*key), Some(value), "case {}", case.name);
                }
            }
            Expect::Failure(kind) => {
                assert_eq!(outcome.failed(), 1, "case {}", case.name);
                let failure = &outcome.failures[0];
                assert_eq!(failure.kind, kind, "case {}", case.name);
                assert_eq!(failure.raw_response.as_deref(), Some(case.reply), "case {}", case.name);
            }
        }
    }
}

#[test]
fn test_coerced_values_reach_the_table() {
    let harness = TestHarness::new();
    harness.write_input("page.jpg", &jpeg_bytes(4, 4));
    let client = Arc::new(
        ScriptedClient::new()
            .default_reply("{\"Arabic numeral int\": \"12\", \"Chinese page number\": \"False\"}"),
    );

    let outcome = harness.run_quiet(
        &[harness.upload("page.jpg")],
        PipelineConfigBuilder::new().build(),
        client,
    );

    let fields = &outcome.results.records()[0].fields;
    assert_eq!(fields["Arabic numeral int"], json!(12));
    assert_eq!(fields["Chinese page number"], json!(false));
}

#[test]
fn test_mixed_batch_from_archive() {
    let harness = TestHarness::new();
    harness.write_input(
        "1234.zip",
        &zip_bytes(&[
            ("001_a.jpg", jpeg_bytes(4, 4)),
            ("002_a.jpg", jpeg_bytes(4, 4)),
            ("003_a.jpg", jpeg_bytes(4, 4)),
            ("999_calibration.jpg", jpeg_bytes(4, 4)),
        ]),
    );
    let upload = harness.upload("1234.zip");
    assert_eq!(upload.kind, UploadKind::Archive);

    let client = Arc::new(
        ScriptedClient::new()
            .reply("002_a.jpg", "The page shows a frame.")
            .fail("003_a.jpg", 500),
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let outcome = harness.run(
        &[upload],
        PipelineConfigBuilder::new().build(),
        client.clone(),
        &ChannelProgress::new(tx),
    );

    // calibration page is never sent
    assert_eq!(client.calls(), 3);
    assert!(!client.seen().iter().any(|n| n.contains("calibration")));

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.succeeded() + outcome.failed(), outcome.total);
    assert_eq!(outcome.succeeded(), 1);

    let record = &outcome.results.records()[0];
    assert_eq!(record.asset.document_id, DocumentId::Known("1234".to_string()));
    assert_eq!(record.asset.page_number, PageNumber::Number(1));
    assert_eq!(record.fields["Frame present"], json!("Red"));

    let kinds: Vec<_> = outcome.failures.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FailureKind::Parse, FailureKind::Call]);
    assert!(outcome.failures[1].raw_response.is_none());

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_eq!(events.first(), Some(&ProgressEvent::Started { total: 3 }));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished {
            succeeded: 1,
            failed: 2
        })
    );
    let fractions: Vec<f64> = events.iter().filter_map(|e| e.fraction()).collect();
    assert_eq!(fractions.len(), 3);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!((fractions[2] - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_legacy_raster_pages_are_converted_before_analysis() {
    let harness = TestHarness::new();
    harness.write_input(
        "5678.zip",
        &zip_bytes(&[
            ("010_x.tif", tiff_bytes(8, 8)),
            ("011_x.jpg", jpeg_bytes(8, 8)),
            ("012_x.jpg", jpeg_bytes(8, 8)),
        ]),
    );
    let client = Arc::new(ScriptedClient::new());

    let outcome = harness.run_quiet(
        &[harness.upload("5678.zip")],
        PipelineConfigBuilder::new().build(),
        client.clone(),
    );

    assert_eq!(client.seen(), vec!["010_x.jpg", "011_x.jpg"]);
    assert_eq!(outcome.succeeded(), 2);
    assert!(!harness.work_dir.join("5678/010_x.tif").exists());
    assert!(harness.work_dir.join("5678/010_x.jpg").exists());
    assert!(!harness.work_dir.join("5678/012_x.jpg").exists());
}

#[test]
fn test_rerun_on_same_assets_is_idempotent() {
    let harness = TestHarness::new();
    harness.write_input(
        "42.zip",
        &zip_bytes(&[
            ("1.jpg", jpeg_bytes(4, 4)),
            ("2.jpg", jpeg_bytes(4, 4)),
            ("3.jpg", jpeg_bytes(4, 4)),
        ]),
    );
    let (report, _workspace) = harness.materialize(&[harness.upload("42.zip")]);
    let pipeline = harness.pipeline(
        PipelineConfigBuilder::new().build(),
        Arc::new(ScriptedClient::new()),
    );

    let first = pipeline.run(&report.assets, &manuscan::pipeline::NoopProgress);
    let second = pipeline.run(&report.assets, &manuscan::pipeline::NoopProgress);

    assert_eq!(first.succeeded(), 2);
    assert!(first.results.same_content(&second.results));
}

#[test]
fn test_pooled_run_matches_sequential_order() {
    let harness = TestHarness::new();
    let entries: Vec<(String, Vec<u8>)> = (1..=13)
        .map(|n| (format!("{:03}.jpg", n), jpeg_bytes(2, 2)))
        .collect();
    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    harness.write_input("900.zip", &zip_bytes(&borrowed));
    let (report, _workspace) = harness.materialize(&[harness.upload("900.zip")]);

    let client = Arc::new(ScriptedClient::new().fail("005.jpg", 429));
    let sequential = harness
        .pipeline(PipelineConfigBuilder::new().build(), client.clone())
        .run(&report.assets, &manuscan::pipeline::NoopProgress);
    let pooled = harness
        .pipeline(PipelineConfigBuilder::new().workers(4).build(), client)
        .run(&report.assets, &manuscan::pipeline::NoopProgress);

    assert_eq!(pooled.total, 12);
    assert_eq!(pooled.succeeded(), 11);
    assert!(sequential.results.same_content(&pooled.results));
    assert_eq!(pooled.failures[0].asset.page_number, PageNumber::Number(5));
}

#[test]
fn test_workspace_cleanup_removes_materialized_pages() {
    let harness = TestHarness::new();
    harness.write_input("loose.jpg", &jpeg_bytes(4, 4));
    harness.write_input("77.zip", &zip_bytes(&[("1.jpg", jpeg_bytes(4, 4)), ("2.jpg", jpeg_bytes(4, 4))]));

    let (report, mut workspace) =
        harness.materialize(&[harness.upload("loose.jpg"), harness.upload("77.zip")]);
    assert_eq!(report.assets.len(), 2);
    assert_eq!(report.assets[0].document_id, DocumentId::Unknown);

    let summary = workspace.cleanup();
    assert_eq!(summary.files_removed, 2);
    assert!(!harness.work_dir.exists());
}
