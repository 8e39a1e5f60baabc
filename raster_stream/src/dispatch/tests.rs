use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use parking_lot::Mutex;

use super::*;
use crate::region::Region;

/// Writes `thread_index` into every pixel and remembers which strips it saw.
#[derive(Default)]
struct ThreadStamp {
    calls: AtomicUsize,
    strips: Mutex<Vec<(usize, Region<2>)>>,
}

impl Filter<2> for ThreadStamp {
    fn generate(
        &self,
        _inputs: &[&ImageBuffer<2>],
        output: &mut BufferViewMut<'_, 2>,
        thread_index: usize,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.strips.lock().push((thread_index, *output.region()));
        output.data_mut().fill(thread_index as f32);
        Ok(())
    }
}

struct FailOnThread(usize);

impl Filter<2> for FailOnThread {
    fn generate(
        &self,
        _inputs: &[&ImageBuffer<2>],
        _output: &mut BufferViewMut<'_, 2>,
        thread_index: usize,
    ) -> anyhow::Result<()> {
        if thread_index >= self.0 {
            bail!("strip {thread_index} failed");
        }
        Ok(())
    }
}

#[test]
fn strips_map_to_fixed_slots() {
    let dispatch = ThreadedDispatch::new(4).unwrap();
    assert_eq!(dispatch.width(), 4);

    let filter = ThreadStamp::default();
    let mut output = ImageBuffer::new(Region::new([0, 10], [3, 8]), 1);
    dispatch.run(&filter, &[], &mut output).unwrap();

    let mut strips = filter.strips.into_inner();
    strips.sort_by_key(|&(thread_index, _)| thread_index);
    assert_eq!(
        strips,
        vec![
            (0, Region::new([0, 10], [3, 2])),
            (1, Region::new([0, 12], [3, 2])),
            (2, Region::new([0, 14], [3, 2])),
            (3, Region::new([0, 16], [3, 2])),
        ]
    );
    assert_eq!(output.pixel(&[2, 13]), &[1.0]);
    assert_eq!(output.pixel(&[0, 17]), &[3.0]);
}

#[test]
fn short_regions_use_fewer_slots() {
    let dispatch = ThreadedDispatch::new(8).unwrap();
    let filter = ThreadStamp::default();
    let mut output = ImageBuffer::new(Region::from_size([5, 3]), 2);
    dispatch.run(&filter, &[], &mut output).unwrap();

    assert_eq!(filter.calls.load(Ordering::Relaxed), 3);
    assert!(filter.strips.lock().iter().all(|&(thread_index, _)| thread_index < 3));
}

#[test]
fn null_region_runs_nothing() {
    let dispatch = ThreadedDispatch::new(2).unwrap();
    let filter = ThreadStamp::default();
    let mut output = ImageBuffer::new(Region::null(), 1);
    dispatch.run(&filter, &[], &mut output).unwrap();
    assert_eq!(filter.calls.load(Ordering::Relaxed), 0);
}

#[test]
fn lowest_failing_strip_wins() {
    let dispatch = ThreadedDispatch::new(4).unwrap();
    let mut output = ImageBuffer::new(Region::from_size([2, 8]), 1);
    let err = dispatch
        .run(&FailOnThread(1), &[], &mut output)
        .unwrap_err();
    assert_eq!(err.to_string(), "strip 1 failed");
}
