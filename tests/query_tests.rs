use forumscope::config::PipelineConfig;
use forumscope::error::ForumError;
use forumscope::pipeline;
use forumscope::query::{QueryKind, QueryService};
use std::fs;
use std::path::Path;

fn run_pipeline(data: &Path, out: &Path) {
    fs::write(data.join("accounts.csv"), "PosterID\n101\n102\n103\n").unwrap();
    fs::write(data.join("groups.csv"), "ForumGroupID,AccountID\n1,basic\n").unwrap();
    fs::write(data.join("topics.csv"), "ForumTopicID,ForumGroupID\n1,1\n2,1\n").unwrap();
    fs::write(
        data.join("messages.csv"),
        "ForumTopicID,PosterID,MessageText,PostDate\n\
         1,101,Hello world,2023-01-05 10:00:00\n\
         1,102,Mail me at anna@example.com,2023-01-06 11:00:00\n\
         2,103,another message here,2023-02-01 09:30:00\n\
         1,101,second post,garbage\n",
    )
    .unwrap();
    let cfg = PipelineConfig {
        data_dir: data.to_path_buf(),
        output_dir: out.to_path_buf(),
        ..PipelineConfig::default()
    };
    pipeline::run(&cfg).unwrap();
}

#[test]
fn queries_read_the_persisted_messages() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    run_pipeline(data.path(), out.path());
    let q = QueryService::new(out.path());

    let users = q.words_per_user(None).unwrap();
    let flat: Vec<(&str, usize)> = users.iter().map(|u| (u.poster_id.as_str(), u.word_count)).collect();
    assert_eq!(flat, vec![("user_1", 4), ("user_2", 4), ("user_3", 3)]);

    let monthly = q.words_per_user_per_month(None).unwrap();
    let flat: Vec<(&str, &str, usize)> = monthly
        .iter()
        .map(|r| (r.poster_id.as_str(), r.year_month.as_str(), r.word_count))
        .collect();
    assert_eq!(flat, vec![("user_1", "2023-01", 2), ("user_2", "2023-01", 4), ("user_3", "2023-02", 3)]);

    let topics = q.messages_per_topic(None).unwrap();
    assert_eq!(topics[0].topic_id, "1");
    assert_eq!(topics[0].message_count, 3);
}

#[test]
fn poster_filter_applies_before_aggregation() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    run_pipeline(data.path(), out.path());
    let q = QueryService::new(out.path());

    let one = q.words_per_user(Some("user_1")).unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].word_count, 4);

    let topics = q.words_per_topic(Some("user_3")).unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].topic_id, "2");

    assert!(q.topics_per_user(Some("user_99")).unwrap().is_empty());
    let words = q.word_frequency(Some("user_1")).unwrap();
    assert!(words.iter().any(|w| w.word == "second"));
    assert!(words.iter().all(|w| w.word != "another"));
}

#[test]
fn run_dispatches_by_name_and_returns_json_rows() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    run_pipeline(data.path(), out.path());
    let q = QueryService::new(out.path());

    let kind: QueryKind = "topics-per-user".parse().unwrap();
    assert_eq!(kind, QueryKind::TopicsPerUser);
    let rows = q.run(kind, None).unwrap();
    let arr = rows.as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[0]["PosterID"], "user_1");
    assert_eq!(arr[0]["topic_count"], 1);

    for k in QueryKind::ALL {
        assert_eq!(k.as_str().parse::<QueryKind>().unwrap(), k);
    }
}

#[test]
fn unknown_query_name_is_rejected() {
    let err = "words-per-planet".parse::<QueryKind>().unwrap_err();
    assert!(matches!(err, ForumError::UnknownQuery(ref s) if s == "words-per-planet"));
}

#[test]
fn missing_source_is_not_found() {
    let out = tempfile::tempdir().unwrap();
    let q = QueryService::new(out.path());
    let err = q.words_per_user(None).unwrap_err();
    assert!(err.is_not_found());
}
