use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use raster_stream::filters::{BoxMean, FnSource, ShiftScale};
use raster_stream::splitter::{RamDrivenStriped, TiledByDimension};
use raster_stream::{
    ExecutionContext, MemoryLayout, NullSink, Pipeline, Region, StreamingManager, StreamingWriter,
};

fn bench_splitters(c: &mut Criterion) {
    let full = Region::from_size([10013, 5727]);
    let layout = MemoryLayout::new(10, 2, 1);

    c.bench_function("ram_strips_10013x5727", |b| {
        let mut manager = RamDrivenStriped::new(1);
        b.iter(|| {
            manager.prepare_streaming(&layout, black_box(&full));
            black_box(manager.number_of_splits());
        })
    });

    c.bench_function("tiles_100_10013x5727", |b| {
        let mut manager = TiledByDimension::new(100);
        b.iter(|| {
            manager.prepare_streaming(&layout, black_box(&full));
            black_box(manager.number_of_splits());
        })
    });
}

fn bench_streaming(c: &mut Criterion) {
    let ctx = ExecutionContext::new(0).expect("Failed to build worker pool");

    c.bench_function("stream_box_mean_512", |b| {
        let mut pipeline = Pipeline::new();
        let source = pipeline
            .add_source(
                "source",
                FnSource::new(
                    Region::from_size([512, 512]),
                    1,
                    |index, pixel| pixel[0] = (index[0] ^ index[1]) as f32,
                ),
            )
            .expect("Failed to add source");
        let mean = pipeline
            .add_filter("mean", BoxMean::new(2), &[source])
            .expect("Failed to add box mean");
        let terminal = pipeline
            .add_filter("scale", ShiftScale::new(0.0, 0.5), &[mean])
            .expect("Failed to add shift scale");

        b.iter(|| {
            pipeline.invalidate(source).expect("Unknown source node");
            let report = StreamingWriter::new(TiledByDimension::new(128))
                .write(&mut pipeline, terminal, &mut NullSink::default(), &ctx)
                .expect("Streaming failed");
            black_box(report);
        })
    });
}

criterion_group!(benches, bench_splitters, bench_streaming);
criterion_main!(benches);
