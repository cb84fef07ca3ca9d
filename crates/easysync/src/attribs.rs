//! Attribute lists as written in ops (`*0*3*a`) and a key/value view of
//! them.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::attribute_pool::AttributePool;
use crate::base36;
use crate::error::{InvalidChangeset, ParseError};

/// The attribute numbers carried by one op, in written order.
///
/// Lists built by this crate are strictly ascending; parsed lists keep
/// whatever order the input had.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attribs(Vec<u32>);

impl Attribs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Sorted, deduplicated list.
    pub fn sorted<I: IntoIterator<Item = u32>>(nums: I) -> Self {
        let mut v: Vec<u32> = nums.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }

    /// Parses an attribute string such as `*0*1q`.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut nums = Vec::new();
        if s.is_empty() {
            return Ok(Self(nums));
        }
        let Some(rest) = s.strip_prefix('*') else {
            return Err(ParseError::InvalidAttribString(s.to_string()));
        };
        for token in rest.split('*') {
            if token.is_empty() {
                return Err(ParseError::InvalidAttribString(s.to_string()));
            }
            nums.push(base36::decode_u32(token)?);
        }
        Ok(Self(nums))
    }

    /// Attribute numbers interned from `pairs` via an [`AttributeMap`].
    pub fn from_pairs<I, K, V>(pairs: I, pool: &mut AttributePool, empty_value_is_delete: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = AttributeMap::new();
        map.update(pairs, empty_value_is_delete);
        map.to_attribs(pool)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, num: u32) -> bool {
        self.0.contains(&num)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub(crate) fn push(&mut self, num: u32) {
        self.0.push(num);
    }

    pub fn is_ascending(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    /// Value of `key` among these attributes, `""` if absent.
    pub fn value_of<'p>(&self, key: &str, pool: &'p AttributePool) -> &'p str {
        self.iter()
            .filter_map(|n| pool.get_attrib(n))
            .find(|(k, _)| *k == key)
            .map_or("", |(_, v)| v)
    }
}

impl FromIterator<u32> for Attribs {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Attribs {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Attribs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &n in &self.0 {
            f.write_str("*")?;
            base36::write(f, n as usize)?;
        }
        Ok(())
    }
}

/// Insertion-ordered `key -> value` view of an attribute list.
///
/// Setting an existing key keeps its position. Converting back with
/// [`to_attribs`](Self::to_attribs) interns every pair and sorts the numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: IndexMap<String, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attribs(attribs: &Attribs, pool: &AttributePool) -> Result<Self, InvalidChangeset> {
        let mut map = Self::new();
        map.update_from_attribs(attribs, pool, false)?;
        Ok(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets every pair; with `empty_value_is_delete` an empty value removes
    /// the key instead.
    pub fn update<I, K, V>(&mut self, pairs: I, empty_value_is_delete: bool) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            let (k, v) = (k.into(), v.into());
            if v.is_empty() && empty_value_is_delete {
                self.entries.shift_remove(&k);
            } else {
                self.entries.insert(k, v);
            }
        }
        self
    }

    pub fn update_from_attribs(
        &mut self,
        attribs: &Attribs,
        pool: &AttributePool,
        empty_value_is_delete: bool,
    ) -> Result<&mut Self, InvalidChangeset> {
        let pairs = attribs
            .iter()
            .map(|n| pool.get_attrib(n).ok_or(InvalidChangeset::UnknownAttrib(n)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.update(pairs, empty_value_is_delete))
    }

    pub fn to_attribs(&self, pool: &mut AttributePool) -> Attribs {
        Attribs::sorted(self.entries.iter().map(|(k, v)| pool.put_attrib(k, v)))
    }
}
