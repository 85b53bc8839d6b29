use cadence_core::models::{Frequency, RecurrenceRule, RulePayload};
use cadence_core::recurrence;
use chrono::{Duration, TimeZone, Utc, Weekday};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn daily_rule() -> RecurrenceRule {
    RulePayload {
        frequency: Some(Frequency::Daily),
        never: true,
        ..Default::default()
    }
    .validate()
    .unwrap()
}

fn sparse_monthly_rule() -> RecurrenceRule {
    RulePayload {
        frequency: Some(Frequency::Monthly),
        by_month_day: vec![-1, 15],
        by_day: vec![Weekday::Mon, Weekday::Fri],
        never: true,
        ..Default::default()
    }
    .validate()
    .unwrap()
}

fn bench_payload_validation(c: &mut Criterion) {
    let payload = RulePayload {
        frequency: Some(Frequency::Yearly),
        interval: Some(2),
        by_month: vec![1, 4, 7, 10],
        by_month_day: vec![1, 15, -1],
        count: Some(100),
        ..Default::default()
    };

    c.bench_function("payload_validation", |b| {
        b.iter(|| black_box(&payload).validate().unwrap())
    });
}

fn bench_window_expansion(c: &mut Criterion) {
    let rule = daily_rule();
    let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let mut group = c.benchmark_group("window_expansion");
    for days in [7, 30, 90, 365].iter() {
        let until = anchor + Duration::days(*days);
        group.bench_with_input(BenchmarkId::new("days", days), days, |b, _| {
            b.iter(|| {
                recurrence::expand_between(
                    black_box(&rule),
                    black_box(anchor),
                    black_box(anchor),
                    black_box(until),
                )
                .count()
            })
        });
    }
    group.finish();
}

fn bench_sparse_rule_expansion(c: &mut Criterion) {
    let rule = sparse_monthly_rule();
    let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let until = anchor + Duration::days(365 * 5);

    c.bench_function("sparse_monthly_five_years", |b| {
        b.iter(|| {
            recurrence::expand_between(
                black_box(&rule),
                black_box(anchor),
                black_box(anchor),
                black_box(until),
            )
            .count()
        })
    });
}

fn bench_deep_occurrence_lookup(c: &mut Criterion) {
    let rule = daily_rule();
    let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let target = Utc.with_ymd_and_hms(2027, 12, 31, 0, 0, 0).unwrap();

    c.bench_function("deep_occurrence_lookup", |b| {
        b.iter(|| {
            recurrence::occurrence_on(black_box(&rule), black_box(anchor), black_box(target))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_payload_validation,
    bench_window_expansion,
    bench_sparse_rule_expansion,
    bench_deep_occurrence_lookup
);
criterion_main!(benches);
