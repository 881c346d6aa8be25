//! Reference executor over the shop fixture

mod common;

use aeroql::executor::{paged_len, paginate};
use aeroql::expr::Params;
use common::{engine, run, store};
use serde_json::{json, Value};

#[test]
fn one_without_filter_is_first_in_natural_order() {
    assert_eq!(
        run("?category"),
        json!({"id": 1, "name": "Music", "group_id": 1})
    );
}

#[test]
fn ordered_page_of_categories() {
    assert_eq!(
        run("*category :asc name :offset 1 :limit 2 + name"),
        json!([{"name": "Books"}, {"name": "Film"}])
    );
}

#[test]
fn count_of_products_in_category() {
    assert_eq!(run("#product (eq .category 3)"), json!(3));
    assert_eq!(run("#product (eq .category 6)"), json!(0));
}

#[test]
fn products_grouped_under_each_category() {
    let value = run(
        "*category :asc id + name \
         +products(*product (eq .category ..id) :asc name + name)",
    );
    assert_eq!(
        value,
        json!([
            {"name": "Music", "products": [{"name": "Album"}]},
            {"name": "Books", "products": [{"name": "Novel"}]},
            {"name": "Garden", "products": [{"name": "Hose"}, {"name": "Rake"}, {"name": "Shovel"}]},
            {"name": "Tools", "products": []},
            {"name": "Kitchen", "products": [{"name": "Kettle"}]},
            {"name": "Film", "products": []},
            {"name": "Attic", "products": []}
        ])
    );
}

#[test]
fn per_parent_ordering_is_independent() {
    let value = run(
        "*category (eq .id 3) + name \
         +cheap(*product.name (eq .category ..id) :asc price) \
         +dear(*product.name (eq .category ..id) :desc price :limit 1)",
    );
    assert_eq!(
        value,
        json!([{"name": "Garden", "cheap": ["Rake", "Shovel", "Hose"], "dear": ["Hose"]}])
    );
}

#[test]
fn joined_group_drops_categories_without_one() {
    let value = run("*category :asc name + name +grp(?group.name (eq .id ..group_id))");
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Books", "Film", "Garden", "Kitchen", "Music", "Tools"]);
    assert_eq!(value[2]["grp"], json!("Outdoor"));
}

#[test]
fn nested_count_and_grandchildren() {
    let value = run(
        "*group (eq .id 3) + name \
         +categories(*category (eq .group_id ..id) + name \
            +n(#product (eq .category ..id)) \
            +top(?product.name (eq .category ..id) :desc price))",
    );
    assert_eq!(
        value,
        json!([{"name": "Outdoor", "categories": [{"name": "Garden", "n": 3, "top": "Hose"}]}])
    );
}

#[test]
fn multiple_roots_with_references() {
    let mut params = Params::new();
    params.insert("limit".into(), json!(2));
    let value = engine()
        .query(
            "garden: ?category (eq .name \"Garden\") + id\n\
             items: *product.name (eq .category /garden.id) :asc name :limit $limit\n\
             total: #product\n\
             more: (+ /total 1)",
            params,
            &store(),
        )
        .unwrap();
    assert_eq!(value["garden"], json!({"id": 3}));
    assert_eq!(value["items"], json!(["Hose", "Rake"]));
    assert_eq!(value["total"], json!(6));
    assert_eq!(value["more"], json!(7));
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["garden", "items", "total", "more"]);
}

#[test]
fn pagination_law_over_categories() {
    let all = run("*category.name :asc name");
    let all = all.as_array().unwrap().clone();
    let n = all.len() as u64;
    assert_eq!(n, 7);

    for offset in 0..=8u64 {
        for limit in 0..=8u64 {
            let mut text = String::from("*category.name :asc name");
            if offset > 0 {
                text.push_str(&format!(" :offset {}", offset));
            }
            if limit > 0 {
                text.push_str(&format!(" :limit {}", limit));
            }
            let page = run(&text);
            let expected: Vec<Value> = paginate(all.clone(), offset, limit);
            assert_eq!(page, Value::Array(expected), "offset {} limit {}", offset, limit);

            let count = run(&text.replacen('*', "#", 1).replace(".name", ""));
            assert_eq!(count, json!(paged_len(n, offset, limit)));
        }
    }
}

#[test]
fn count_matches_filtered_length() {
    for category in 0..=8 {
        let filter = format!("(eq .category {})", category);
        let listed = run(&format!("*product {} + id", filter));
        let counted = run(&format!("#product {}", filter));
        assert_eq!(counted, json!(listed.as_array().unwrap().len()));
    }
}
