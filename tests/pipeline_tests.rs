use forumscope::config::PipelineConfig;
use forumscope::error::ForumError;
use forumscope::pipeline::{self, load_checkpoint, load_mapping};
use forumscope::table::Value;
use forumscope::text_anonymizer::PatternAnonymizer;
use forumscope::text_column::deanonymize_column;
use std::fs;
use std::path::Path;

fn write_exports(dir: &Path) {
    fs::write(dir.join("accounts.csv"), "PosterID,Role\n101,member\n102,member\n103,moderator\n").unwrap();
    fs::write(dir.join("groups.csv"), "ForumGroupID,AccountID,Name\n1,basic,General\n2,premium,Members\n").unwrap();
    fs::write(
        dir.join("topics.csv"),
        "ForumTopicID,ForumGroupID,Title,StartDate\n1,1,Welcome,2023-01-01\n2,2,Lounge,2023-01-02\n3,1,Empty,2023-01-03\n",
    )
    .unwrap();
    fs::write(
        dir.join("messages.csv"),
        "MessageID,ForumTopicID,PosterID,MessageText,PostDate\n\
         1,1,101,<p>Hello <b>world</b></p>,2023-01-05 10:00:00\n\
         2,1,102,Mail me at anna@example.com,2023-01-06 11:00:00\n\
         3,2,103,another message here,2023-02-01 09:30:00\n\
         4,1,101,second post,garbage\n\
         ,,,,\n",
    )
    .unwrap();
}

fn config(data: &Path, out: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data.to_path_buf(),
        output_dir: out.to_path_buf(),
        top_n: 2,
        ..PipelineConfig::default()
    }
}

#[test]
fn full_run_writes_every_artifact() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());

    let report = pipeline::run(&config(data.path(), out.path())).unwrap();
    assert_eq!(report.mapped_ids, 3);
    assert_eq!(report.account_types, vec!["basic".to_string(), "premium".to_string()]);
    assert!(report.skipped.is_empty());

    for name in [
        "anonymization_mapping",
        "anonymized_top_2",
        "accounts_cleaned_anonymized",
        "groups_cleaned_anonymized",
        "topics_cleaned_anonymized",
        "messages_cleaned_anonymized",
        "words_chars_per_user",
        "words_chars_per_topic",
        "messages_per_topic",
        "topics_per_user",
        "words_per_user_per_month",
        "word_count_message_text",
        "topics_with_post_counts",
        "top_2_topics_by_post_count",
        "groups_account_type_basic",
        "topics_account_type_premium",
        "messages_account_type_basic",
        "top_2_posters_account_type_basic",
        "top_2_posters_account_type_premium",
    ] {
        assert!(out.path().join(format!("{name}.csv")).exists(), "missing {name}");
        assert!(report.artifacts.iter().any(|a| a.name == name), "unreported {name}");
    }
    assert!(out.path().join("table_profiles.json").exists());

    let messages = report.tables.iter().find(|t| t.name == "messages").unwrap();
    assert_eq!(messages.rows, 4);
    assert_eq!(messages.rows_dropped, 1);
    assert_eq!(messages.unparseable_dates, 1);
}

#[test]
fn persisted_messages_hold_no_original_ids_or_emails() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    pipeline::run(&config(data.path(), out.path())).unwrap();

    let t = load_checkpoint(out.path(), "messages_cleaned_anonymized").unwrap();
    let ids: Vec<String> = t.column_values(t.column_index("PosterID").unwrap()).filter_map(Value::render).collect();
    assert_eq!(ids, vec!["user_1", "user_2", "user_3", "user_1"]);
    let text_idx = t.column_index("MessageText").unwrap();
    assert!(t.column_values(text_idx).all(|v| !v.to_string().contains("anna@example.com")));
    // the reversal map is kept beside the text
    assert!(t.has_column("_MessageText_AnonymizationMap"));

    let restored = deanonymize_column(&t, "MessageText", &PatternAnonymizer::new()).unwrap();
    let texts: Vec<String> = restored
        .column_values(restored.column_index("MessageText").unwrap())
        .filter_map(Value::render)
        .collect();
    assert_eq!(texts, vec!["Hello world", "Mail me at anna@example.com", "another message here", "second post"]);

    let mapping = load_mapping(out.path()).unwrap();
    assert_eq!(mapping.value(0, "OriginalID"), Some(&Value::text("101")));
    assert_eq!(mapping.value(0, "AnonymizedID"), Some(&Value::text("user_1")));
}

#[test]
fn text_anonymization_can_be_switched_off() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    let cfg = PipelineConfig { anonymize_text: false, ..config(data.path(), out.path()) };
    let report = pipeline::run(&cfg).unwrap();
    assert_eq!(report.text_cells_anonymized, 0);

    let t = load_checkpoint(out.path(), "messages_cleaned_anonymized").unwrap();
    assert!(!t.has_column("_MessageText_AnonymizationMap"));
    assert_eq!(t.value(1, "MessageText"), Some(&Value::text("Mail me at anna@example.com")));
}

#[test]
fn missing_source_table_stops_the_run() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    fs::remove_file(data.path().join("groups.csv")).unwrap();
    let err = pipeline::run(&config(data.path(), out.path())).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn segmentation_is_skipped_without_groups() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    let cfg = PipelineConfig {
        tables: vec!["messages".to_string(), "topics".to_string()],
        ..config(data.path(), out.path())
    };
    let report = pipeline::run(&cfg).unwrap();
    assert_eq!(report.skipped, vec!["segmentation".to_string()]);
    assert!(report.account_types.is_empty());
    assert!(out.path().join("words_chars_per_user.csv").exists());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forumscope.json");
    fs::write(&path, r#"{"top_n": 10, "known_names": ["Pekka"], "parallel": true}"#).unwrap();
    let cfg = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.top_n, 10);
    assert!(cfg.parallel);
    assert_eq!(cfg.id_column, "PosterID");
    assert!(PipelineConfig::from_json_file(&dir.path().join("nope.json")).unwrap_err().is_not_found());
}

#[test]
fn account_type_partitions_carry_no_reversal_maps() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    pipeline::run(&config(data.path(), out.path())).unwrap();

    let mut partitions = 0;
    for entry in fs::read_dir(out.path()).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if !name.contains("_account_type_") {
            continue;
        }
        partitions += 1;
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("anna@example.com"), "original address in {name}");
        assert!(!raw.contains("_MessageText_AnonymizationMap"), "reversal map in {name}");
    }
    assert!(partitions >= 6);

    // the checkpoint keeps the map for authorized reversal
    let t = load_checkpoint(out.path(), "messages_cleaned_anonymized").unwrap();
    assert!(t.has_column("_MessageText_AnonymizationMap"));
}

#[test]
fn oversized_name_list_fails_the_run() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_exports(data.path());
    let cfg = PipelineConfig {
        known_names: (0..500).map(|i| format!("Member{i}x")).collect(),
        name_pattern_size_limit: 1024,
        ..config(data.path(), out.path())
    };
    let err = pipeline::run(&cfg).unwrap_err();
    assert!(matches!(err, ForumError::NamePattern(_)));
}
