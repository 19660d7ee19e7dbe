/// Schema cache behaviour under concurrent access
///
/// Many threads asking for the same uncached type must all end up holding one
/// shared compiled schema, compiled exactly once, and conversions running in
/// parallel must not interfere with each other.
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use xml_marshal::{
    FieldDescriptor, ScalarKind, SchemaCache, TypeDescriptor, XmlMapper, XmlType,
};

use crate::common::fixtures::{AuditedOrder, Order, sample_audited_order, sample_order};
use crate::common::test_helpers::{init_tracing, isolated_mapper};

const THREADS: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Heartbeat {
    node: String,
    sequence: u64,
}

impl XmlType for Heartbeat {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("heartbeat")
            .field(FieldDescriptor::attribute("node", ScalarKind::String))
            .field(FieldDescriptor::element("sequence", ScalarKind::Integer))
    }
}

fn thread_pool() -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(THREADS)
        .build()
        .unwrap()
}

#[test]
fn test_concurrent_first_lookup_compiles_once() {
    init_tracing();
    let cache = Arc::new(SchemaCache::new());

    let schemas: Vec<_> = thread_pool().install(|| {
        (0..THREADS * 4)
            .into_par_iter()
            .map(|_| cache.schema::<Order>().unwrap())
            .collect()
    });

    let first = &schemas[0];
    assert!(schemas.iter().all(|schema| Arc::ptr_eq(schema, first)));

    let stats = cache.stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.hits + stats.misses, (THREADS * 4) as u64);
}

#[test]
fn test_concurrent_mixed_types() {
    let mapper = isolated_mapper();

    thread_pool().install(|| {
        (0..THREADS * 8).into_par_iter().for_each(|i| match i % 3 {
            0 => {
                let order = sample_order();
                let xml = mapper.to_xml(&order).unwrap();
                assert_eq!(mapper.from_xml::<Order>(&xml).unwrap(), Some(order));
            }
            1 => {
                let order = sample_audited_order();
                let xml = mapper.to_xml(&order).unwrap();
                assert_eq!(mapper.from_xml::<AuditedOrder>(&xml).unwrap(), Some(order));
            }
            _ => {
                let beat = Heartbeat {
                    node: format!("node-{}", i),
                    sequence: i as u64,
                };
                let xml = mapper.to_xml(&beat).unwrap();
                assert_eq!(mapper.from_xml::<Heartbeat>(&xml).unwrap(), Some(beat));
            }
        })
    });

    let stats = mapper.cache().stats();
    assert_eq!(stats.compilations, 3);
    assert_eq!(stats.entry_count, 3);
}

#[test]
fn test_global_cache_shared_across_threads() {
    init_tracing();

    let schemas: Vec<_> = thread_pool().install(|| {
        (0..THREADS)
            .into_par_iter()
            .map(|_| XmlMapper::new().schema::<Heartbeat>().unwrap())
            .collect()
    });

    assert!(schemas.iter().all(|schema| Arc::ptr_eq(schema, &schemas[0])));
    assert!(Arc::ptr_eq(
        &schemas[0],
        &SchemaCache::global().schema::<Heartbeat>().unwrap()
    ));
}
