//! Shared shop fixture: 3 groups, 7 categories, 6 products
#![allow(dead_code)]

use std::collections::VecDeque;

use serde_json::{json, Map, Value};

use aeroql::config::EngineConfig;
use aeroql::executor::MemoryStore;
use aeroql::expr::Params;
use aeroql::schema::Catalog;
use aeroql::sql::{CompiledStatement, ConnectionError, SqlConnection};
use aeroql::{Engine, Prepared};

pub const CATALOG: &str = r#"{"records": {
    "shop.group": [
        {"name": "id", "type": "int", "primary_key": true, "nullable": false},
        {"name": "name", "type": "string"}
    ],
    "shop.category": [
        {"name": "id", "type": "int", "primary_key": true, "nullable": false},
        {"name": "name", "type": "string"},
        {"name": "group_id", "type": "int"}
    ],
    "shop.product": [
        {"name": "id", "type": "int", "primary_key": true, "nullable": false},
        {"name": "name", "type": "string"},
        {"name": "category", "type": "int"},
        {"name": "price", "type": "float"}
    ]
}}"#;

pub fn catalog() -> Catalog {
    Catalog::from_json(CATALOG).unwrap()
}

pub fn store() -> MemoryStore {
    MemoryStore::from_value(json!({
        "shop.group": [
            {"id": 1, "name": "Media"},
            {"id": 2, "name": "Home"},
            {"id": 3, "name": "Outdoor"}
        ],
        "shop.category": [
            {"id": 1, "name": "Music", "group_id": 1},
            {"id": 2, "name": "Books", "group_id": 1},
            {"id": 3, "name": "Garden", "group_id": 3},
            {"id": 4, "name": "Tools", "group_id": 2},
            {"id": 5, "name": "Kitchen", "group_id": 2},
            {"id": 6, "name": "Film", "group_id": 1},
            {"id": 7, "name": "Attic", "group_id": null}
        ],
        "shop.product": [
            {"id": 1, "name": "Rake", "category": 3, "price": 12.5},
            {"id": 2, "name": "Novel", "category": 2, "price": 9.0},
            {"id": 3, "name": "Hose", "category": 3, "price": 30.0},
            {"id": 4, "name": "Album", "category": 1, "price": 15.0},
            {"id": 5, "name": "Shovel", "category": 3, "price": 22.0},
            {"id": 6, "name": "Kettle", "category": 5, "price": 40.0}
        ]
    }))
    .unwrap()
}

/// Engine resolving one-segment subjects against `shop`
pub fn engine() -> Engine {
    let config = EngineConfig {
        default_schema: Some("shop".into()),
        ..EngineConfig::default()
    };
    Engine::new(catalog(), config)
}

pub fn run(text: &str) -> Value {
    engine().query(text, Params::new(), &store()).unwrap()
}

pub fn prepare(text: &str) -> Prepared {
    engine().prepare(text, Params::new()).unwrap()
}

/// Connection replaying canned row sets in order and recording every call
#[derive(Default)]
pub struct Replay {
    rows: VecDeque<Vec<Vec<Value>>>,
    pub calls: Vec<(String, Vec<Value>)>,
}

impl Replay {
    pub fn new(rows: Vec<Vec<Vec<Value>>>) -> Self {
        Self {
            rows: rows.into(),
            calls: Vec::new(),
        }
    }
}

impl SqlConnection for Replay {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, ConnectionError> {
        self.calls.push((sql.to_string(), params.to_vec()));
        self.rows
            .pop_front()
            .ok_or_else(|| ConnectionError::new("connection closed"))
    }
}

/// Rows PostgreSQL would return for `statement`, given the task's result
///
/// Nested JSON takes jsonb's shape: object keys sorted shortest first, whole
/// floats written as integers.
pub fn pg_rows(statement: &CompiledStatement, result: &Value) -> Vec<Vec<Value>> {
    let values: Vec<&Value> = match result {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    if statement.columns.is_empty() {
        return values.into_iter().map(|v| vec![jsonb(v)]).collect();
    }
    values
        .into_iter()
        .map(|record| {
            statement
                .columns
                .iter()
                .map(|column| jsonb(&record[column.as_str()]))
                .collect()
        })
        .collect()
}

/// Canned rows for every statement of `prepared`, taken from the memory result
pub fn replay_for(engine: &Engine, prepared: &Prepared, memory: &Value) -> Replay {
    let statements = engine.compile_sql(prepared).unwrap();
    let document = prepared.document();
    let rows = statements
        .iter()
        .map(|statement| {
            let result = if document.is_bare() {
                memory
            } else {
                &memory[document.task(statement.task).name.as_str()]
            };
            pg_rows(statement, result)
        })
        .collect();
    Replay::new(rows)
}

fn jsonb(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 => json!(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(jsonb).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), jsonb(&map[k.as_str()])))
                .collect();
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}
