use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use raq_sim::events::{Event, Scheduler};

const EVENT_COUNTS: &[usize] = &[128, 1_024, 8_192, 65_536];

fn build_events(count: usize) -> Vec<(u64, Event)> {
    (0..count)
        .map(|idx| {
            // interleave times so the heap actually reorders
            let time_ms = ((idx * 7_919) % count) as u64;
            let rake = idx % 8;
            let event = match idx % 4 {
                0 => Event::GenerateOrder,
                1 => Event::DispatchRake { rake },
                2 => Event::LoadingComplete { rake },
                _ => Event::RakeReturned { rake },
            };
            (time_ms, event)
        })
        .collect()
}

fn bench_engine_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_queue");

    for &count in EVENT_COUNTS {
        group.bench_with_input(BenchmarkId::new("push_pop", count), &count, |b, &count| {
            b.iter_batched(
                || (Scheduler::new(), build_events(count)),
                |(mut scheduler, events)| {
                    for (time_ms, event) in events {
                        scheduler.schedule(time_ms, event);
                    }
                    while let Some(event) = scheduler.pop() {
                        black_box(event);
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine_queue);
criterion_main!(benches);
