#![no_main]

//! Fuzz target for payload sanitization.
//!
//! Server payloads are untrusted: any shape of JSON must come out as fully
//! populated jobs without panicking, and a sanitized job must survive a
//! serialize/sanitize cycle unchanged.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value};

use jobtrack::models::{sanitize, sanitize_all};

#[derive(Arbitrary, Debug)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Node>),
    Object(Vec<(Key, Node)>),
}

/// Keys biased towards the fields the sanitizer looks at.
#[derive(Arbitrary, Debug)]
enum Key {
    Id,
    Company,
    Status,
    AppliedOn,
    Contacts,
    Name,
    Email,
    Other(String),
}

impl Key {
    fn as_str(&self) -> &str {
        match self {
            Key::Id => "id",
            Key::Company => "company",
            Key::Status => "status",
            Key::AppliedOn => "appliedOn",
            Key::Contacts => "contacts",
            Key::Name => "name",
            Key::Email => "email",
            Key::Other(s) => s,
        }
    }
}

fn to_value(node: &Node, depth: u8) -> Value {
    if depth > 6 {
        return Value::Null;
    }
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Int(i) => Value::from(*i),
        Node::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Node::Text(s) => Value::String(s.clone()),
        Node::List(items) => Value::Array(items.iter().map(|n| to_value(n, depth + 1)).collect()),
        Node::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.as_str().to_string(), to_value(value, depth + 1));
            }
            Value::Object(map)
        }
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    payload: Node,
    raw: String,
}

fuzz_target!(|input: Input| {
    let payload = to_value(&input.payload, 0);
    for job in sanitize_all(&payload) {
        let again = sanitize(&serde_json::to_value(&job).expect("jobs always serialize"));
        assert_eq!(again, job);
    }
    let _ = sanitize(&payload);

    if let Ok(raw) = serde_json::from_str::<Value>(&input.raw) {
        let _ = sanitize_all(&raw);
    }
});
