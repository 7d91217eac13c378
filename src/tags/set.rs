//! Tag 258: sets, carried as an array of members with set semantics.
//! Decoded into [`Value::Set`], an ordered `Vec` — see that variant's
//! doc comment for why this crate never silently re-sorts or dedupes.

use crate::value::Value;

pub fn decode_set(members: Vec<Value>) -> Value {
    Value::Set(members)
}

pub fn encode_set(members: &[Value]) -> Vec<Value> {
    members.to_vec()
}
