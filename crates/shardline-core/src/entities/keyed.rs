//! Arrays of entities on the wire, id-keyed maps in memory

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

use crate::value_objects::Snowflake;

/// An entity with a stable snowflake key
pub trait Keyed {
    fn key(&self) -> Snowflake;
}

pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<Snowflake, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Keyed + Deserialize<'de>,
{
    let items = Vec::<T>::deserialize(deserializer)?;
    Ok(items.into_iter().map(|item| (item.key(), item)).collect())
}

pub(crate) fn serialize<S, T>(map: &HashMap<Snowflake, T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    serializer.collect_seq(map.values())
}
