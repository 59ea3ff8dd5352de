use consentscan::classify::Classifier;
use consentscan::collector::observation::{CookieObservation, DetectionChannel};
use consentscan::merge::{merge_observations, CookieRecord};
use consentscan::session::context::ScanContext;
use consentscan::vendor::VendorDirectory;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use time::OffsetDateTime;

fn sample_records() -> Vec<CookieRecord> {
    let ts = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    let names = [
        ("_ga", "GA1.2.1234567890.1700000000", "example.com"),
        ("PHPSESSID", "8f3b2c9d4e", "example.com"),
        ("xk92jd", "AbC123xyz", "doubleclick.net"),
        ("_fbp", "fb.1.1700000000.999", "example.com"),
        ("OptanonConsent", "isIABGlobal=false", "example.com"),
        ("ui_prefs", "dark", "example.com"),
    ];
    let observations = names
        .iter()
        .map(|(name, value, domain)| {
            CookieObservation::bare(*name, *value, *domain, DetectionChannel::CookieJar, ts)
        })
        .collect();
    merge_observations(observations, "example.com")
}

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::new();
    let directory = VendorDirectory::builtin();
    let ctx = ScanContext::default();
    let records = sample_records();

    c.bench_function("classify_mixed_batch", |b| {
        b.iter(|| {
            for record in &records {
                black_box(classifier.classify(black_box(record), &ctx, &directory));
            }
        })
    });

    let ga = records.iter().find(|r| r.name == "_ga").unwrap();
    c.bench_function("classify_rule_stage_hit", |b| {
        b.iter(|| black_box(classifier.classify(black_box(ga), &ctx, &directory)))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
