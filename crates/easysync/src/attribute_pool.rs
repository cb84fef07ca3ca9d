//! Attribute interning.
//!
//! Changesets never spell out formatting attributes; they refer to them by
//! number. An [`AttributePool`] maps those numbers to `(key, value)` pairs.
//! Numbers are handed out densely from zero and never reused, so a pool only
//! ever grows.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// A `(key, value)` attribute pair. An empty value means "unset".
pub type Attribute = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("pool json is not an object with numToAttrib and nextNum")]
    NotAPool,
    #[error("pool entry {0:?} is not a [key, value] pair")]
    BadEntry(String),
    #[error("pool numbers are not dense: missing {0}")]
    Gap(u32),
    #[error("pool nextNum is {next_num} but it holds {len} attributes")]
    NextNum { next_num: u64, len: usize },
    #[error("attribute {0:?} is interned twice")]
    Duplicate(Attribute),
    #[error("attribute number {0} is not an array index")]
    BadIndex(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePool {
    num_to_attrib: Vec<Attribute>,
    attrib_to_num: HashMap<Attribute, u32>,
}

impl AttributePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool whose numbers follow the order of `pairs`. Repeated
    /// pairs keep their first number.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pool = Self::new();
        for (k, v) in pairs {
            let attrib = (k.into(), v.into());
            pool.intern(attrib);
        }
        pool
    }

    fn intern(&mut self, attrib: Attribute) -> u32 {
        if let Some(&num) = self.attrib_to_num.get(&attrib) {
            return num;
        }
        let num = self.num_to_attrib.len() as u32;
        self.attrib_to_num.insert(attrib.clone(), num);
        self.num_to_attrib.push(attrib);
        num
    }

    /// Returns the number of `(key, value)`, adding it if it is new.
    pub fn put_attrib(&mut self, key: &str, value: &str) -> u32 {
        if let Some(num) = self.attrib_num(key, value) {
            return num;
        }
        self.intern((key.to_string(), value.to_string()))
    }

    /// Looks up `(key, value)` without adding it.
    pub fn attrib_num(&self, key: &str, value: &str) -> Option<u32> {
        self.attrib_to_num
            .get(&(key.to_string(), value.to_string()))
            .copied()
    }

    pub fn get_attrib(&self, num: u32) -> Option<(&str, &str)> {
        self.num_to_attrib
            .get(num as usize)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Key of attribute `num`, or `""` if the pool does not know it.
    pub fn attrib_key(&self, num: u32) -> &str {
        self.get_attrib(num).map_or("", |(k, _)| k)
    }

    /// Value of attribute `num`, or `""` if the pool does not know it.
    pub fn attrib_value(&self, num: u32) -> &str {
        self.get_attrib(num).map_or("", |(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.num_to_attrib.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_to_attrib.is_empty()
    }

    /// The number the next new attribute will receive.
    pub fn next_num(&self) -> u32 {
        self.num_to_attrib.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &str)> + '_ {
        self.num_to_attrib
            .iter()
            .enumerate()
            .map(|(i, (k, v))| (i as u32, k.as_str(), v.as_str()))
    }

    pub fn each_attrib<F: FnMut(&str, &str)>(&self, mut f: F) {
        for (_, k, v) in self.iter() {
            f(k, v);
        }
    }

    /// The object form stored alongside pads:
    /// `{"numToAttrib": {"0": [k, v], ...}, "nextNum": n}`.
    pub fn to_jsonable(&self) -> Value {
        let mut num_to_attrib = Map::new();
        for (num, k, v) in self.iter() {
            num_to_attrib.insert(num.to_string(), json!([k, v]));
        }
        json!({
            "numToAttrib": num_to_attrib,
            "nextNum": self.next_num(),
        })
    }

    /// Reads the object form produced by [`to_jsonable`](Self::to_jsonable)
    /// and checks it.
    pub fn from_jsonable(value: &Value) -> Result<Self, PoolError> {
        let obj = value.as_object().ok_or(PoolError::NotAPool)?;
        let entries = obj
            .get("numToAttrib")
            .and_then(Value::as_object)
            .ok_or(PoolError::NotAPool)?;
        let next_num = obj
            .get("nextNum")
            .and_then(Value::as_u64)
            .ok_or(PoolError::NotAPool)?;

        let mut slots: Vec<Option<Attribute>> = vec![None; entries.len()];
        for (num, entry) in entries {
            let idx: usize = num
                .parse()
                .map_err(|_| PoolError::BadIndex(num.clone()))?;
            let attrib = attribute_from_json(entry)?;
            let slot = slots
                .get_mut(idx)
                .ok_or_else(|| PoolError::BadIndex(num.clone()))?;
            *slot = Some(attrib);
        }

        let mut pool = Self::new();
        for (i, slot) in slots.into_iter().enumerate() {
            let attrib = slot.ok_or(PoolError::Gap(i as u32))?;
            if pool.attrib_to_num.contains_key(&attrib) {
                return Err(PoolError::Duplicate(attrib));
            }
            pool.intern(attrib);
        }
        if next_num != pool.len() as u64 {
            return Err(PoolError::NextNum {
                next_num,
                len: pool.len(),
            });
        }
        Ok(pool)
    }

    /// Verifies that both directions of the mapping agree.
    pub fn check(&self) -> Result<(), PoolError> {
        if self.attrib_to_num.len() != self.num_to_attrib.len() {
            return Err(PoolError::NextNum {
                next_num: self.attrib_to_num.len() as u64,
                len: self.num_to_attrib.len(),
            });
        }
        for (i, attrib) in self.num_to_attrib.iter().enumerate() {
            match self.attrib_to_num.get(attrib) {
                Some(&n) if n as usize == i => {}
                Some(_) => return Err(PoolError::Duplicate(attrib.clone())),
                None => return Err(PoolError::Gap(i as u32)),
            }
        }
        Ok(())
    }
}

fn attribute_from_json(entry: &Value) -> Result<Attribute, PoolError> {
    let bad = || PoolError::BadEntry(entry.to_string());
    let items = entry.as_array().ok_or_else(bad)?;
    let text = |v: &Value| v.as_str().map(str::to_string).ok_or_else(bad);
    match items.as_slice() {
        [k] => Ok((text(k)?, String::new())),
        [k, v] => Ok((text(k)?, text(v)?)),
        _ => Err(bad()),
    }
}

// ── serde: ordered array of [key, value] pairs ───────────────────────────

impl Serialize for AttributePool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for attrib in &self.num_to_attrib {
            seq.serialize_element(attrib)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for AttributePool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PoolVisitor;

        impl<'de> Visitor<'de> for PoolVisitor {
            type Value = AttributePool;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of [key, value] or [key] arrays")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut pool = AttributePool::new();
                while let Some(entry) = seq.next_element::<Vec<String>>()? {
                    let attrib = match <[String; 1]>::try_from(entry) {
                        Ok([k]) => (k, String::new()),
                        Err(entry) => match <[String; 2]>::try_from(entry) {
                            Ok([k, v]) => (k, v),
                            Err(entry) => {
                                return Err(de::Error::invalid_length(entry.len(), &self))
                            }
                        },
                    };
                    if pool.attrib_to_num.contains_key(&attrib) {
                        return Err(de::Error::custom(PoolError::Duplicate(attrib)));
                    }
                    pool.intern(attrib);
                }
                Ok(pool)
            }
        }

        deserializer.deserialize_seq(PoolVisitor)
    }
}
