use forumscope::identifiers::{apply_mapping, build_mapping, count_ids, top_ids};
use forumscope::table::{Table, Value};

fn ids(name: &str, values: &[&str]) -> Table {
    Table::from_rows(
        name,
        &["PosterID", "ForumTopicID"],
        values.iter().map(|v| vec![Value::from_cell(v), "7".into()]).collect(),
    )
}

#[test]
fn numeric_ids_are_numbered_in_numeric_order() {
    let tables = vec![ids("messages", &["10", "2"]), ids("accounts", &["1", "2"])];
    let map = build_mapping(&tables, "PosterID");
    assert_eq!(map.len(), 3);
    assert_eq!(map.get("1"), Some("user_1"));
    assert_eq!(map.get("2"), Some("user_2"));
    assert_eq!(map.get("10"), Some("user_3"));
}

#[test]
fn mixed_ids_fall_back_to_lexicographic_order() {
    let map = build_mapping(&[ids("messages", &["b", "a2", "a10"])], "PosterID");
    let order: Vec<&str> = map.entries().iter().map(|e| e.original_id.as_str()).collect();
    assert_eq!(order, vec!["a10", "a2", "b"]);
}

#[test]
fn mapping_ignores_row_order_and_nulls() {
    let a = build_mapping(&[ids("m", &["3", "", "1", "2"])], "PosterID");
    let b = build_mapping(&[ids("m", &["2", "1", "3", "3"])], "PosterID");
    assert_eq!(a.entries(), b.entries());
    assert_eq!(a.len(), 3);
}

#[test]
fn mapping_is_a_bijection() {
    let map = build_mapping(&[ids("m", &["5", "9", "7"])], "PosterID");
    let mut anon: Vec<&str> = map.entries().iter().map(|e| e.anonymized_id.as_str()).collect();
    anon.sort();
    anon.dedup();
    assert_eq!(anon.len(), 3);
    let table = map.to_table("anonymization_mapping");
    assert_eq!(table.columns(), &["OriginalID".to_string(), "AnonymizedID".to_string()]);
    assert_eq!(table.len(), 3);
}

#[test]
fn apply_rewrites_only_the_id_column() {
    let map = build_mapping(&[ids("accounts", &["1", "2"])], "PosterID");
    let mut tables = vec![ids("messages", &["2", "3", ""])];
    let rewritten = apply_mapping(&mut tables, "PosterID", &map);
    assert_eq!(rewritten, 1);
    let t = &tables[0];
    assert_eq!(t.value(0, "PosterID"), Some(&Value::text("user_2")));
    // unmapped and null ids both end up null
    assert_eq!(t.value(1, "PosterID"), Some(&Value::Null));
    assert_eq!(t.value(2, "PosterID"), Some(&Value::Null));
    assert!(t.rows().iter().all(|r| r[1] == Value::text("7")));
}

#[test]
fn tables_without_the_column_are_left_alone() {
    let map = build_mapping(&[ids("accounts", &["1"])], "PosterID");
    let groups = Table::from_rows("groups", &["ForumGroupID"], vec![vec!["1".into()]]);
    let mut tables = vec![groups.clone()];
    assert_eq!(apply_mapping(&mut tables, "PosterID", &map), 0);
    assert_eq!(tables[0], groups);
}

#[test]
fn id_counts_rank_by_frequency_with_stable_ties() {
    let tables = vec![
        ids("messages", &["user_2", "user_1", "user_2"]),
        ids("accounts", &["user_3", "user_1", "user_4"]),
    ];
    let counts = count_ids(&tables, "PosterID");
    let flat: Vec<(&str, usize)> = counts.iter().map(|c| (c.anonymized_id.as_str(), c.count)).collect();
    assert_eq!(flat, vec![("user_2", 2), ("user_1", 2), ("user_3", 1), ("user_4", 1)]);

    let top = top_ids(&tables, "PosterID", 3);
    assert_eq!(top.len(), 3);
    assert_eq!(top[2].anonymized_id, "user_3");
}
