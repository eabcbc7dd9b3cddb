// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for envelope sealing and integrity hashing in the
// folio-security crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use folio_security::{SystemNonceSource, hash_bytes, open, seal};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Seal-then-open round trip on a 1 MiB payload, roughly a scanned page.
fn bench_envelope_roundtrip(c: &mut Criterion) {
    let password = "correct-horse-battery-staple";
    let plaintext = vec![0x42u8; 1024 * 1024];
    let nonces = SystemNonceSource::new();

    c.bench_function("envelope_roundtrip (1 MiB)", |b| {
        b.iter(|| {
            let sealed = seal(black_box(&plaintext), password, &nonces).expect("seal failed");
            let opened = open(&sealed, password).expect("open failed");
            assert_eq!(opened.len(), plaintext.len());
            black_box(opened);
        });
    });
}

/// Rejecting a wrong password should cost about the same as a successful
/// open: the tag is verified before anything is returned.
fn bench_envelope_wrong_password(c: &mut Criterion) {
    let nonces = SystemNonceSource::new();
    let sealed = seal(&vec![0u8; 64 * 1024], "right", &nonces).expect("seal failed");

    c.bench_function("envelope_wrong_password (64 KiB)", |b| {
        b.iter(|| {
            let result = open(black_box(&sealed), "wrong");
            assert!(result.is_err());
        });
    });
}

fn bench_integrity_hash(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[
        ("1 KiB", 1024),
        ("100 KiB", 100 * 1024),
        ("1 MiB", 1024 * 1024),
    ];

    let mut group = c.benchmark_group("integrity_hash_sha256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| black_box(hash_bytes(black_box(&data))));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_envelope_roundtrip,
    bench_envelope_wrong_password,
    bench_integrity_hash,
);
criterion_main!(benches);
