//! End-to-end export pipeline tests over the in-memory object store:
//! envelope validity, streaming semantics, inheritance resolution, and
//! failure behavior.

use serde_json::{json, Value};

use steward_core::emitter::BufferSink;
use steward_core::error::ExportError;
use steward_core::filter::Filter;
use steward_core::object_type::ObjectType;
use steward_core::pipeline::{load_object, run_export, CancelToken, ExportOptions};
use steward_core::resolver::{ResolutionMode, ResolutionPolicy};
use steward_core::store::memory::{row, MemoryStore};
use steward_core::store::ObjectStore;

fn seed_hosts(store: &MemoryStore, count: usize) {
    for i in 0..count {
        store.insert(
            ObjectType::Host,
            row(&[
                ("id", json!(i as i64 + 1)),
                ("object_name", json!(format!("host{i:04}"))),
                ("object_type", json!("object")),
                ("address", json!(format!("192.0.2.{}", i % 250))),
            ]),
        );
    }
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(
        ObjectType::Command,
        row(&[("id", json!(1)), ("object_name", json!("ping"))]),
    );
    store.insert(
        ObjectType::HostGroup,
        row(&[("id", json!(10)), ("object_name", json!("linux-servers"))]),
    );
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(500)),
            ("object_name", json!("generic-host")),
            ("object_type", json!("template")),
            ("check_interval", json!(60)),
            ("check_command_id", json!(1)),
            ("vars", json!({"os": "Linux"})),
        ]),
    );
    store
}

async fn export_to_string(
    store: &MemoryStore,
    object_type: ObjectType,
    filter: Option<Filter>,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let mut sink = BufferSink::new();
    run_export(
        store,
        object_type,
        filter,
        options,
        &mut sink,
        &CancelToken::new(),
    )
    .await?;
    Ok(String::from_utf8(sink.into_bytes()).unwrap())
}

#[tokio::test]
async fn test_output_parses_for_all_result_sizes() {
    for count in [0usize, 1, 3, 101, 250] {
        let store = MemoryStore::new();
        seed_hosts(&store, count);

        let output = export_to_string(
            &store,
            ObjectType::Host,
            None,
            &ExportOptions::default(),
        )
        .await
        .unwrap();

        let parsed: Value = serde_json::from_str(&output)
            .unwrap_or_else(|e| panic!("invalid JSON for N={count}: {e}"));
        assert_eq!(
            parsed["objects"].as_array().unwrap().len(),
            count,
            "element count must equal yielded row count"
        );
    }
}

#[tokio::test]
async fn test_empty_result_exact_bytes() {
    let store = MemoryStore::new();
    seed_hosts(&store, 5);

    let filter = Filter::parse("object_name=matches-nothing").unwrap();
    let output = export_to_string(
        &store,
        ObjectType::Host,
        Some(filter),
        &ExportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(output, "{ \"objects\": [ ] }\n");
}

#[tokio::test]
async fn test_batch_threshold_never_changes_content() {
    let store = MemoryStore::new();
    seed_hosts(&store, 42);

    let mut outputs = Vec::new();
    for batch_size in [1usize, 100, 100_000] {
        let options = ExportOptions {
            batch_size,
            ..ExportOptions::default()
        };
        outputs.push(
            export_to_string(&store, ObjectType::Host, None, &options)
                .await
                .unwrap(),
        );
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[tokio::test]
async fn test_export_preserves_cursor_order() {
    let store = MemoryStore::new();
    seed_hosts(&store, 20);

    let output = export_to_string(&store, ObjectType::Host, None, &ExportOptions::default())
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    let names: Vec<&str> = parsed["objects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["object_name"].as_str().unwrap())
        .collect();

    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted, "objects stream in cursor (name) order");
}

#[tokio::test]
async fn test_filter_restricts_result_set() {
    let store = MemoryStore::new();
    seed_hosts(&store, 30);

    let filter = Filter::parse("object_name=host000*").unwrap();
    let output = export_to_string(
        &store,
        ObjectType::Host,
        Some(filter),
        &ExportOptions::default(),
    )
    .await
    .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    // host0000 through host0009
    assert_eq!(parsed["objects"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_resolved_mode_local_beats_inherited() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("check_interval", json!(30)),
            ("imports", json!(["generic-host"])),
        ]),
    );

    let options = ExportOptions {
        mode: ResolutionMode::Resolved,
        ..ExportOptions::default()
    };
    let filter = Filter::parse("object_type=object").unwrap();
    let output = export_to_string(&store, ObjectType::Host, Some(filter), &options)
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    let web01 = &parsed["objects"][0];

    assert_eq!(web01["check_interval"], json!(30), "local value wins");
    assert_eq!(web01["check_command"], json!("ping"), "inherited fills gap");
    assert_eq!(web01["vars"], json!({"os": "Linux"}));
}

#[tokio::test]
async fn test_raw_mode_skips_inheritance() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("imports", json!(["generic-host"])),
        ]),
    );

    let filter = Filter::parse("object_type=object").unwrap();
    let output = export_to_string(
        &store,
        ObjectType::Host,
        Some(filter),
        &ExportOptions::default(),
    )
    .await
    .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    let web01 = &parsed["objects"][0];

    assert_eq!(web01["imports"], json!(["generic-host"]));
    assert!(web01.get("check_interval").is_none());
}

#[tokio::test]
async fn test_dangling_group_lenient_mode_yields_empty_field() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("groups", json!(["no-such-group"])),
        ]),
    );

    let options = ExportOptions {
        mode: ResolutionMode::Resolved,
        policy: ResolutionPolicy::Lenient,
        ..ExportOptions::default()
    };
    let filter = Filter::parse("object_type=object").unwrap();
    let output = export_to_string(&store, ObjectType::Host, Some(filter), &options)
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();

    // Field present but empty, not a thrown error.
    assert_eq!(parsed["objects"][0]["groups"], json!([]));
}

#[tokio::test]
async fn test_dangling_group_strict_mode_aborts() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("groups", json!(["no-such-group"])),
        ]),
    );

    let options = ExportOptions {
        mode: ResolutionMode::Resolved,
        policy: ResolutionPolicy::Strict,
        ..ExportOptions::default()
    };
    let filter = Filter::parse("object_type=object").unwrap();
    let err = export_to_string(&store, ObjectType::Host, Some(filter), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::DanglingReference { .. }));
}

#[tokio::test]
async fn test_benchmark_trailer_is_valid_and_nonempty() {
    let store = MemoryStore::new();
    seed_hosts(&store, 3);

    let options = ExportOptions {
        benchmark: true,
        ..ExportOptions::default()
    };
    let output = export_to_string(&store, ObjectType::Host, None, &options)
        .await
        .unwrap();

    assert!(output.ends_with("}\n"));
    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["objects"].as_array().unwrap().len(), 3);

    let report = parsed["benchmark_string"].as_str().unwrap();
    assert!(!report.is_empty());
    assert!(report.contains("all done"));
    assert!(report.contains("first row fetched"));
}

#[tokio::test]
async fn test_repeated_export_is_byte_identical() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("imports", json!(["generic-host"])),
        ]),
    );

    let options = ExportOptions {
        mode: ResolutionMode::Resolved,
        ..ExportOptions::default()
    };
    let first = export_to_string(&store, ObjectType::Host, None, &options)
        .await
        .unwrap();
    let second = export_to_string(&store, ObjectType::Host, None, &options)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_mid_stream_store_failure_truncates_output() {
    let store = MemoryStore::failing_after(2);
    seed_hosts(&store, 10);

    let mut sink = BufferSink::new();
    let err = run_export(
        &store,
        ObjectType::Host,
        None,
        &ExportOptions::default(),
        &mut sink,
        &CancelToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExportError::Store(_)));

    // Whatever made it out must not parse as a complete document.
    let partial = String::from_utf8(sink.into_bytes()).unwrap();
    assert!(serde_json::from_str::<Value>(&partial).is_err());
}

#[tokio::test]
async fn test_cancellation_aborts_without_closing_envelope() {
    let store = MemoryStore::new();
    seed_hosts(&store, 10);

    let cancel = CancelToken::new();
    cancel.cancel();

    let mut sink = BufferSink::new();
    let err = run_export(
        &store,
        ObjectType::Host,
        None,
        &ExportOptions::default(),
        &mut sink,
        &cancel,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExportError::Cancelled));

    let partial = String::from_utf8(sink.into_bytes()).unwrap();
    assert!(serde_json::from_str::<Value>(&partial).is_err());
    // No half-written JSON token: the envelope opener is all there is.
    assert_eq!(partial, "{ \"objects\": [ ");
}

#[tokio::test]
async fn test_load_object_resolves_single_object() {
    let store = seeded_store();
    store.insert(
        ObjectType::Host,
        row(&[
            ("id", json!(1)),
            ("object_name", json!("web01")),
            ("object_type", json!("object")),
            ("imports", json!(["generic-host"])),
        ]),
    );

    let object = load_object(
        &store,
        ObjectType::Host,
        "web01",
        ResolutionMode::Resolved,
        ResolutionPolicy::Lenient,
    )
    .await
    .unwrap()
    .expect("web01 exists");
    assert_eq!(object["check_command"], json!("ping"));

    let missing = load_object(
        &store,
        ObjectType::Host,
        "nope",
        ResolutionMode::Raw,
        ResolutionPolicy::Lenient,
    )
    .await
    .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_store_trait_object_is_usable() {
    // The pipeline accepts the store through the trait, the way the web
    // layer hands it a PgObjectStore.
    let store = MemoryStore::new();
    seed_hosts(&store, 2);
    let store: &dyn ObjectStore = &store;

    let mut sink = BufferSink::new();
    let stats = run_export(
        store,
        ObjectType::Host,
        None,
        &ExportOptions::default(),
        &mut sink,
        &CancelToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.rows, 2);
}
