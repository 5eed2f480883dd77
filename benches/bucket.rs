use cowbucket::{Bucket, KeyValuePair, Pair};
use criterion::{criterion_group, criterion_main, Criterion};
use sdd::{Guard, Shared};
use std::sync::Mutex;
use std::time::Instant;

const CHAIN_LEN: usize = 16;

fn filled(lock: &Mutex<()>) -> Bucket<KeyValuePair<usize>> {
    let bucket = Bucket::new();
    for k in 0..CHAIN_LEN {
        let pair = KeyValuePair::new(k.to_string(), k);
        assert!(bucket.put(Some(Shared::new(pair)), Some(lock)).unwrap());
    }
    bucket
}

fn put_update(c: &mut Criterion) {
    let lock = Mutex::new(());
    let bucket = filled(&lock);
    let mut i: usize = 0;
    c.bench_function("Bucket: put, update", |b| {
        b.iter(|| {
            let pair = KeyValuePair::new((i % CHAIN_LEN).to_string(), i);
            assert!(!bucket.put(Some(Shared::new(pair)), Some(&lock)).unwrap());
            i += 1;
        })
    });
}

fn get(c: &mut Criterion) {
    let lock = Mutex::new(());
    let bucket = filled(&lock);
    let keys: Vec<String> = (0..CHAIN_LEN).map(|k| k.to_string()).collect();
    let mut i: usize = 0;
    c.bench_function("Bucket: get", |b| {
        b.iter(|| {
            let key = &keys[i % CHAIN_LEN];
            assert_eq!(bucket.get(key).map(|p| *p.element()), Some(i % CHAIN_LEN));
            i += 1;
        })
    });
}

fn delete_put(c: &mut Criterion) {
    c.bench_function("Bucket: delete-put, oldest", |b| {
        b.iter_custom(|iters| {
            let lock = Mutex::new(());
            let bucket = filled(&lock);
            let start = Instant::now();
            for _ in 0..iters {
                // The oldest node sits at the end of the chain, so the whole prefix is copied.
                let oldest = bucket
                    .iter(&Guard::new())
                    .last()
                    .map(|p| p.key().to_owned())
                    .unwrap();
                assert!(bucket.delete(&oldest, Some(&lock)));
                let pair = KeyValuePair::new(oldest, 0);
                assert!(bucket.put(Some(Shared::new(pair)), Some(&lock)).unwrap());
            }
            start.elapsed()
        })
    });
}

criterion_group!(bucket, put_update, get, delete_put);
criterion_main!(bucket);
