use criterion::{criterion_group, criterion_main, Criterion};
use geo::{polygon, Geometry};

use cartoconv::algorithm::stats::{compute_stats, StatsOptions};
use cartoconv::crs::Crs;
use cartoconv::table::GeometryTable;

/// A grid of small squares around Zurich.
fn parcels(side: usize) -> GeometryTable {
    let mut geometries = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            let x = 8.5 + i as f64 * 0.001;
            let y = 47.3 + j as f64 * 0.001;
            let square: Geometry = polygon![
                (x: x, y: y),
                (x: x + 0.0009, y: y),
                (x: x + 0.0009, y: y + 0.0009),
                (x: x, y: y + 0.0009),
                (x: x, y: y),
            ]
            .into();
            geometries.push(Some(square));
        }
    }
    GeometryTable::from_geometries(geometries, Crs::wgs84()).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let table = parcels(100);
    let options = StatsOptions::default();

    c.bench_function("stats of 10k squares in web mercator", |b| {
        b.iter(|| compute_stats(&table, &options).unwrap())
    });
    c.bench_function("reproject 10k squares to web mercator", |b| {
        b.iter(|| table.to_crs(&Crs::web_mercator()).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
