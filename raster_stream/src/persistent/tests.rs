use super::*;

fn ramp(region: Region<2>) -> ImageBuffer<2> {
    let mut image = ImageBuffer::new(region, 2);
    for index in region.indices() {
        let pixel = image.pixel_mut(&index);
        pixel[0] = (index[0] + 4 * index[1]) as f32;
        pixel[1] = 1.0;
    }
    image
}

/// Feeds `region` of `input` to `filter` on `thread_index`, like one dispatched strip.
fn feed<K: Accumulate<2>>(
    filter: &PersistentFilter<K, 2>,
    input: &ImageBuffer<2>,
    region: Region<2>,
    thread_index: usize,
) -> anyhow::Result<ImageBuffer<2>> {
    let mut output = ImageBuffer::new(region, input.components());
    filter.generate(&[input], &mut output.view_mut(), thread_index)?;
    Ok(output)
}

#[test]
fn lifecycle_tracks_validity() {
    let image = ramp(Region::from_size([4, 4]));
    let mut filter = PersistentFilter::<_, 2>::new(PixelStatistics);

    assert_eq!(filter.state(), PersistentState::Reset);
    assert!(filter.before_generate(image.region()).is_err());
    assert!(filter.result().is_none());

    filter.reset(2);
    filter.reset(2);
    filter.before_generate(image.region()).unwrap();
    assert_eq!(filter.state(), PersistentState::Accumulating);

    feed(&filter, &image, Region::from_size([4, 2]), 0).unwrap();
    feed(&filter, &image, Region::new([0, 2], [4, 2]), 1).unwrap();
    filter.synthetize();

    assert_eq!(filter.state(), PersistentState::Synthesized);
    assert!(filter.is_valid());
    let stats = filter.result().unwrap();
    assert_eq!(stats.count, 16);
    assert_eq!(stats.sum, vec![120.0, 16.0]);
    assert_eq!(stats.min, vec![0.0, 1.0]);
    assert_eq!(stats.max, vec![15.0, 1.0]);

    // slots are gone until the next reset
    assert!(filter.before_generate(image.region()).is_err());

    filter.reset(1);
    assert!(!filter.is_valid());
    assert!(filter.result().is_none());
    assert_eq!(filter.last_result().unwrap().count, 16);
}

#[test]
fn synthetize_without_reset_keeps_prior_state() {
    let mut filter = PersistentFilter::<_, 2>::new(PixelStatistics);
    filter.synthetize();
    assert!(!filter.is_valid());
    assert_eq!(filter.state(), PersistentState::Reset);
}

#[test]
fn pixels_pass_through() {
    let image = ramp(Region::from_size([3, 3]));
    let mut filter = PersistentFilter::<_, 2>::new(PixelStatistics);
    filter.reset(1);

    let part = Region::new([1, 0], [2, 3]);
    let output = feed(&filter, &image, part, 0).unwrap();
    assert_eq!(output, image.crop_to(&part));
}

#[test]
fn thread_without_slot_is_an_error() {
    let image = ramp(Region::from_size([2, 2]));
    let mut filter = PersistentFilter::<_, 2>::new(PixelStatistics);
    filter.reset(2);

    let err = feed(&filter, &image, *image.region(), 2).unwrap_err();
    assert!(err.to_string().contains("thread 2"));
}

#[test]
fn samples_merge_thread_first() {
    let image = ramp(Region::from_size([4, 4]));
    let mut filter = PersistentFilter::<_, 2>::new(SampleCollector::new(2));
    filter.reset(2);

    // two splits, two strips each
    feed(&filter, &image, Region::from_size([4, 1]), 0).unwrap();
    feed(&filter, &image, Region::new([0, 1], [4, 1]), 1).unwrap();
    feed(&filter, &image, Region::new([0, 2], [4, 1]), 0).unwrap();
    feed(&filter, &image, Region::new([0, 3], [4, 1]), 1).unwrap();
    filter.synthetize();

    let indices: Vec<[i64; 2]> = filter.result().unwrap().iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![[0, 0], [2, 0], [0, 2], [2, 2]]);
    assert_eq!(filter.result().unwrap()[3].values, vec![10.0, 1.0]);
}

#[test]
fn statistics_moments() {
    let mut filter = PersistentFilter::<_, 2>::new(PixelStatistics);
    filter.reset(1);

    let region = Region::from_size([4, 1]);
    let image = ImageBuffer::from_vec(region, 1, vec![2.0, 4.0, 4.0, 6.0]);
    feed(&filter, &image, region, 0).unwrap();
    filter.synthetize();

    let stats = filter.result().unwrap();
    assert_eq!(stats.mean(), vec![4.0]);
    assert_eq!(stats.variance(), vec![2.0]);
}

#[test]
fn negative_coordinates_sample_on_grid() {
    let collector = SampleCollector::new(3);
    assert!(collector.keeps(&[-3, 6]));
    assert!(!collector.keeps(&[-1, 0]));
    assert_eq!(SampleCollector::new(0).stride(), 1);
}
