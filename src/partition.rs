//! Partition key derivation and bucketing
//!
//! Identifiers are grouped by `<seg0>.<seg1>.<seg2>` with the third segment
//! left-padded with zeros to [`PARTITION_ISSUE_WIDTH`] digits, so that string
//! order of keys matches numeric order of issues below 1000.

use crate::types::{Identifier, PartitionKey};
use std::collections::BTreeMap;

/// Zero-padded width of the issue segment in a partition key
pub const PARTITION_ISSUE_WIDTH: usize = 3;

/// Derive the partition key for one identifier
///
/// Returns `None` when the identifier has fewer than three dot-separated
/// segments. Segments wider than the padding width are used unchanged.
pub fn partition_key(id: &Identifier) -> Option<PartitionKey> {
    let mut segments = id.as_str().split('.');
    let journal = segments.next()?;
    let volume = segments.next()?;
    let issue = segments.next()?;
    let issue = format!("{issue:0>width$}", width = PARTITION_ISSUE_WIDTH);
    Some(PartitionKey::from_parts(journal, volume, &issue))
}

/// Identifiers bucketed by partition key
///
/// Buckets iterate in sorted key order; each bucket keeps listing order.
/// Built once before dispatch and not changed afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partitions {
    buckets: BTreeMap<PartitionKey, Vec<Identifier>>,
    unkeyed: Vec<Identifier>,
}

impl Partitions {
    /// Number of partitions
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no identifier could be keyed
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total identifiers across all buckets
    pub fn identifier_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Identifiers with too few segments to derive a key
    pub fn unkeyed(&self) -> &[Identifier] {
        &self.unkeyed
    }

    /// Identifiers assigned to `key`
    pub fn get(&self, key: &PartitionKey) -> Option<&[Identifier]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Keys in dispatch order
    pub fn keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.buckets.keys()
    }

    /// Buckets in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = (&PartitionKey, &[Identifier])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Output file name for every partition, unique within this set
    ///
    /// Partitions get [`PartitionKey::file_name`] unless another partition
    /// maps to the same name, in which case all of them fall back to
    /// [`PartitionKey::qualified_file_name`]. Keys that still collide after
    /// separator replacement get a `.<n>` suffix in key order. The result
    /// depends only on the set of keys, so re-runs pick the same names.
    pub fn file_names(&self) -> BTreeMap<PartitionKey, String> {
        let mut names = BTreeMap::new();
        for (name, keys) in group_by_name(self.buckets.keys(), PartitionKey::file_name) {
            if let [key] = keys.as_slice() {
                names.insert((*key).clone(), name);
                continue;
            }
            tracing::warn!(
                file = %name,
                partitions = keys.len(),
                "partitions share an output file name, using full keys"
            );
            for (qualified, same) in
                group_by_name(keys.into_iter(), PartitionKey::qualified_file_name)
            {
                if let [key] = same.as_slice() {
                    names.insert((*key).clone(), qualified);
                    continue;
                }
                let stem = qualified.strip_suffix(".txt").unwrap_or(&qualified);
                for (n, key) in same.into_iter().enumerate() {
                    names.insert(key.clone(), format!("{stem}.{}.txt", n + 1));
                }
            }
        }
        names
    }
}

fn group_by_name<'a>(
    keys: impl Iterator<Item = &'a PartitionKey>,
    name: fn(&PartitionKey) -> String,
) -> BTreeMap<String, Vec<&'a PartitionKey>> {
    let mut groups: BTreeMap<String, Vec<&PartitionKey>> = BTreeMap::new();
    for key in keys {
        groups.entry(name(key)).or_default().push(key);
    }
    groups
}

impl IntoIterator for Partitions {
    type Item = (PartitionKey, Vec<Identifier>);
    type IntoIter = std::collections::btree_map::IntoIter<PartitionKey, Vec<Identifier>>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

/// Bucket identifiers by partition key
pub fn partition<I>(identifiers: I) -> Partitions
where
    I: IntoIterator<Item = Identifier>,
{
    let mut partitions = Partitions::default();
    for id in identifiers {
        match partition_key(&id) {
            Some(key) => partitions.buckets.entry(key).or_default().push(id),
            None => {
                tracing::warn!(identifier = %id, "identifier has too few segments, skipping");
                partitions.unkeyed.push(id);
            }
        }
    }
    partitions
}
