use consentscan::collector::observation::{CookieObservation, DetectionChannel};
use consentscan::merge::{merge_observations, CookieRecord};
use consentscan::session::context::ScanContext;
use consentscan::vendor::{resolver, VendorDirectory};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use time::OffsetDateTime;

fn record(name: &str, value: &str, domain: &str) -> CookieRecord {
    let obs = CookieObservation::bare(
        name,
        value,
        domain,
        DetectionChannel::CookieJar,
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
    );
    merge_observations(vec![obs], "example.com").remove(0)
}

fn bench_resolver(c: &mut Criterion) {
    let directory = VendorDirectory::builtin();
    let ctx = ScanContext::default();

    let exact_domain = record("xk92jd", "v", "doubleclick.net");
    c.bench_function("resolve_exact_domain", |b| {
        b.iter(|| black_box(resolver::resolve(black_box(&exact_domain), &ctx, &directory)))
    });

    let parent_walk = record("xk92jd", "v", "stats.g.doubleclick.net");
    c.bench_function("resolve_parent_walk", |b| {
        b.iter(|| black_box(resolver::resolve(black_box(&parent_walk), &ctx, &directory)))
    });

    let similarity_miss = record("zzqq", "1", "example.com");
    c.bench_function("resolve_similarity_miss", |b| {
        b.iter(|| black_box(resolver::resolve(black_box(&similarity_miss), &ctx, &directory)))
    });
}

criterion_group!(benches, bench_resolver);
criterion_main!(benches);
