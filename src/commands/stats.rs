//! `prefstore stats` - entry counts by kind and shape, plus file size.

use prefstore::store::{KeyShape, shape_of};
use prefstore::utils::format_bytes;
use prefstore::{Value, ValueKind};
use std::collections::HashMap;

use super::OpenedStore;

/// Counts gathered from the cache.
#[derive(Debug, Default, PartialEq)]
pub struct Stats {
    pub entries: usize,
    pub by_kind: Vec<(ValueKind, usize)>,
    pub objects: usize,
    pub lists: usize,
}

impl Stats {
    fn collect<'a>(entries: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Self {
        let mut kinds: HashMap<ValueKind, usize> = HashMap::new();
        let mut stats = Self::default();

        for (key, value) in entries {
            stats.entries += 1;
            *kinds.entry(value.kind()).or_default() += 1;
            match shape_of(key) {
                KeyShape::Object => stats.objects += 1,
                KeyShape::List => stats.lists += 1,
                KeyShape::Scalar => {},
            }
        }

        stats.by_kind = ValueKind::ALL
            .into_iter()
            .filter_map(|kind| kinds.get(&kind).map(|n| (kind, *n)))
            .collect();
        stats
    }
}

pub fn execute(opened: &OpenedStore) {
    let store = &opened.store;
    let snapshot = store.snapshot();
    let stats = Stats::collect(&snapshot);

    println!("Preferences Store");
    println!("=================");
    println!("Backend:   {}", store.backend_name());
    println!("Cipher:    {}", store.cipher_name().unwrap_or("none"));
    match &opened.path {
        Some(path) => {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            println!("Location:  {}", path.display());
            println!("Size:      {}", format_bytes(size));
        },
        None => println!("Location:  (memory)"),
    }
    println!();
    println!("Entries:   {}", stats.entries);
    for (kind, count) in &stats.by_kind {
        println!("  {:<9} {count}", kind.tag());
    }
    println!("Objects:   {}", stats.objects);
    println!("Lists:     {}", stats.lists);
}
