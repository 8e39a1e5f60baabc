use std::sync::Arc;

use parking_lot::Mutex;

use super::{ramp_source, FailOnRegion};
use crate::buffer::ImageBuffer;
use crate::driver::{StreamingProgress, StreamingWriter};
use crate::error::StreamError;
use crate::filters::{BoxMean, ShiftScale};
use crate::pipeline::{ExecutionContext, NodeId, Pipeline};
use crate::region::Region;
use crate::sink::{read_raw_image, MemorySink, RawFileSink};
use crate::splitter::{
    RamDrivenStriped, RamDrivenTiled, StreamingManager, StreamingMode, StripedByCount,
    TiledByDimension,
};

const SIZE: [u64; 2] = [61, 47];

fn smoothing_pipeline() -> (Pipeline<2>, NodeId) {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_source("source", ramp_source(SIZE)).unwrap();
    let mean = pipeline.add_filter("mean", BoxMean::new(2), &[source]).unwrap();
    let scaled = pipeline
        .add_filter("scaled", ShiftScale::new(-3.0, 0.5), &[mean])
        .unwrap();
    (pipeline, scaled)
}

fn whole_image() -> ImageBuffer<2> {
    let (mut pipeline, terminal) = smoothing_pipeline();
    pipeline
        .update(terminal, &ExecutionContext::single_threaded().unwrap())
        .unwrap();
    pipeline.output(terminal).unwrap().clone()
}

#[test]
fn streamed_output_matches_single_update() {
    common::test_utils::init_tracing();
    let expected = whole_image();
    let ctx = ExecutionContext::new(4).unwrap();

    let managers: Vec<Box<dyn StreamingManager<2>>> = vec![
        Box::new(StripedByCount::new(6)),
        Box::new(TiledByDimension::new(16)),
        // ~7 lines of 61 pixels x 2 components x 4 bytes x 3 stages
        Box::new(RamDrivenStriped::new(1).with_bias(100.0)),
        Box::new(RamDrivenTiled::new(1).with_bias(400.0)),
        StreamingMode::TileCount { count: 9 }.build(1.0),
    ];

    for manager in managers {
        let (mut pipeline, terminal) = smoothing_pipeline();
        let mut writer = StreamingWriter::from_boxed(manager);
        let mut sink = MemorySink::new();

        let report = writer.write(&mut pipeline, terminal, &mut sink, &ctx).unwrap();

        let name = writer.manager().name();
        assert!(report.splits > 1, "{name} did not split");
        assert_eq!(report.full_region, Region::from_size(SIZE));
        assert_eq!(sink.committed(), writer.manager().splits(), "{name}");
        assert_eq!(sink.image(), &expected, "{name}");
    }
}

#[test]
fn progress_reports_every_split() {
    let (mut pipeline, terminal) = smoothing_pipeline();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);

    let mut writer = StreamingWriter::new(StripedByCount::new(4))
        .with_progress(move |progress| sink_seen.lock().push(progress));
    let report = writer
        .write(
            &mut pipeline,
            terminal,
            &mut MemorySink::new(),
            &ExecutionContext::new(2).unwrap(),
        )
        .unwrap();

    let seen = seen.lock();
    assert_eq!(report.splits, 4);
    assert_eq!(
        *seen,
        (1..=4)
            .map(|current| StreamingProgress { current, total: 4 })
            .collect::<Vec<_>>()
    );
    assert_eq!(seen[1].fraction(), 0.5);
}

#[test]
fn failed_split_stops_the_stream() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_source("source", ramp_source([20, 50])).unwrap();
    let fail = pipeline
        .add_filter(
            "fail",
            FailOnRegion {
                poison: Region::new([7, 33], [1, 1]),
            },
            &[source],
        )
        .unwrap();
    let ctx = ExecutionContext::new(3).unwrap();

    let mut writer = StreamingWriter::new(StripedByCount::new(5));
    let mut sink = MemorySink::new();
    let err = writer.write(&mut pipeline, fail, &mut sink, &ctx).unwrap_err();

    match &err {
        StreamError::StreamingAborted {
            split_index,
            committed,
            ..
        } => {
            assert_eq!((*split_index, *committed), (3, 3));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), StreamError::Generate { node, .. } if *node == fail));

    // splits 0..3 exactly once, nothing after
    let committed = sink.committed();
    assert_eq!(committed, &writer.manager().splits()[..3]);
    let image = sink.image();
    assert_eq!(image.pixel(&[5, 29]), &[5.0 + 29_000.0, 5.0]);
    assert_eq!(image.pixel(&[5, 30]), &[0.0, 0.0]);

    // the pipeline recovers once the cause is gone
    pipeline
        .modify_filter::<FailOnRegion, _>(fail, |filter| filter.poison = Region::null())
        .unwrap();
    writer.write(&mut pipeline, fail, &mut sink, &ctx).unwrap();
    assert_eq!(sink.committed().len(), 5);
}

#[test]
fn aborted_raw_file_keeps_committed_splits() {
    let path = common::test_utils::test_output_path("aborted_stream.raw");
    let full = Region::from_size([12, 10]);

    let mut pipeline = Pipeline::new();
    let source = pipeline.add_source("source", ramp_source([12, 10])).unwrap();
    let fail = pipeline
        .add_filter(
            "fail",
            FailOnRegion {
                poison: Region::new([0, 6], [12, 1]),
            },
            &[source],
        )
        .unwrap();

    let mut writer = StreamingWriter::new(StripedByCount::new(5));
    let err = writer
        .write(
            &mut pipeline,
            fail,
            &mut RawFileSink::new(&path),
            &ExecutionContext::single_threaded().unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, StreamError::StreamingAborted { split_index: 3, .. }));

    let on_disk = read_raw_image(&path, full, 2).unwrap();
    assert_eq!(on_disk.pixel(&[11, 5]), &[11.0 + 5000.0, 4.0]);
    assert_eq!(on_disk.pixel(&[0, 6]), &[0.0, 0.0]);
    assert_eq!(on_disk.pixel(&[3, 9]), &[0.0, 0.0]);
}

#[test]
fn raw_file_stream_round_trips() {
    let path = common::test_utils::test_output_path("tiled_stream.raw");
    let expected = whole_image();
    let (mut pipeline, terminal) = smoothing_pipeline();

    let mut writer = StreamingWriter::new(TiledByDimension::new(20));
    let report = writer
        .write(
            &mut pipeline,
            terminal,
            &mut RawFileSink::new(&path),
            &ExecutionContext::new(3).unwrap(),
        )
        .unwrap();

    assert_eq!(report.splits, 4 * 3);
    assert_eq!(read_raw_image(&path, Region::from_size(SIZE), 2).unwrap(), expected);
}

#[test]
fn release_data_does_not_change_output() {
    let expected = whole_image();
    let (mut pipeline, terminal) = smoothing_pipeline();
    let ctx = ExecutionContext::new(2).unwrap().with_release_data(true);

    let mut sink = MemorySink::new();
    StreamingWriter::new(StripedByCount::new(3))
        .write(&mut pipeline, terminal, &mut sink, &ctx)
        .unwrap();

    assert_eq!(sink.image(), &expected);
    let mean = pipeline.node_by_name("mean").unwrap();
    assert!(pipeline.is_data_released(mean).unwrap());
}

#[test]
fn sub_region_streaming() {
    let expected = whole_image();
    let (mut pipeline, terminal) = smoothing_pipeline();
    let part = Region::new([10, 5], [30, 30]);

    let mut sink = MemorySink::new();
    let report = StreamingWriter::new(TiledByDimension::new(8))
        .write_region(
            &mut pipeline,
            terminal,
            part,
            &mut sink,
            &ExecutionContext::new(2).unwrap(),
        )
        .unwrap();

    assert_eq!(report.full_region, part);
    assert_eq!(sink.image(), &expected.crop_to(&part));
}

#[test]
fn region_outside_image_aborts_first_split() {
    let (mut pipeline, terminal) = smoothing_pipeline();
    let err = StreamingWriter::new(StripedByCount::new(2))
        .write_region(
            &mut pipeline,
            terminal,
            Region::new([50, 0], [20, 10]),
            &mut MemorySink::new(),
            &ExecutionContext::single_threaded().unwrap(),
        )
        .unwrap_err();

    assert!(matches!(err, StreamError::StreamingAborted { split_index: 0, committed: 0, .. }));
    assert!(matches!(err.root(), StreamError::RegionConsistency { .. }));
}
