use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stockyard_core::{Barcode, Status};
use stockyard_inventory::{StockEntry, current_stock};

fn history(products: usize, lines: usize) -> (Vec<Barcode>, Vec<StockEntry>, Vec<StockEntry>) {
    let known: Vec<Barcode> = (0..products)
        .map(|i| format!("46000000{i:05}").parse().unwrap())
        .collect();

    let entry = |i: usize| {
        let status = Status::ALL[i % Status::ALL.len()];
        StockEntry::new(known[i % products].clone(), (i % 17) as i64 + 1, status)
    };
    let inbound = (0..lines).map(entry).collect();
    let outbound = (0..lines / 2).map(entry).collect();
    (known, inbound, outbound)
}

/// Full re-aggregation, as performed on every product list read.
fn bench_current_stock(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_stock");

    for lines in [1_000usize, 10_000, 100_000] {
        let (known, inbound, outbound) = history(500, lines);
        group.throughput(Throughput::Elements((inbound.len() + outbound.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| {
                let levels = current_stock(known.iter(), black_box(&inbound), black_box(&outbound));
                black_box(levels)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_current_stock);
criterion_main!(benches);
