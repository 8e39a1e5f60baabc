use super::*;

fn r2(ix: i64, iy: i64, sx: u64, sy: u64) -> Region<2> {
    Region::new([ix, iy], [sx, sy])
}

#[test]
fn null_region_has_a_zero_dimension() {
    assert!(Region::<2>::null().is_null());
    assert!(r2(3, 4, 0, 10).is_null());
    assert!(!r2(3, 4, 1, 1).is_null());
    assert_eq!(Region::<3>::default(), Region::<3>::null());
}

#[test]
fn contains_follows_bounds() {
    let outer = r2(0, 0, 10, 10);
    assert!(outer.contains(&outer));
    assert!(outer.contains(&r2(2, 3, 4, 4)));
    assert!(outer.contains(&r2(9, 9, 1, 1)));
    assert!(!outer.contains(&r2(9, 9, 2, 1)));
    assert!(!outer.contains(&r2(-1, 0, 2, 2)));
    assert!(!r2(2, 3, 4, 4).contains(&outer));
}

#[test]
fn crop_intersects_or_returns_null() {
    let a = r2(0, 0, 10, 10);
    let b = r2(5, -3, 10, 6);
    assert_eq!(a.crop(&b), r2(5, 0, 5, 3));
    assert_eq!(b.crop(&a), a.crop(&b));

    let far = r2(20, 20, 5, 5);
    assert_eq!(a.crop(&far), Region::null());
    assert!(!a.overlaps(&far));

    // touching edges share no pixel
    assert!(a.crop(&r2(10, 0, 5, 5)).is_null());
}

#[test]
fn pad_does_not_clip() {
    let region = r2(0, 5, 4, 4);
    let padded = region.pad_by(2);
    assert_eq!(padded, r2(-2, 3, 8, 8));
    assert!(padded.contains(&region));

    let padded = region.pad_by_radius([1, 0]);
    assert_eq!(padded, r2(-1, 5, 6, 4));
}

#[test]
fn indices_are_row_major() {
    let region = r2(1, 10, 3, 2);
    let indices: Vec<[i64; 2]> = region.indices().collect();
    assert_eq!(
        indices,
        vec![[1, 10], [2, 10], [3, 10], [1, 11], [2, 11], [3, 11]]
    );

    for (offset, index) in region.indices().enumerate() {
        assert_eq!(region.linear_offset(&index), offset);
    }

    assert_eq!(r2(0, 0, 0, 5).indices().count(), 0);
}

#[test]
fn three_dimensional_offsets() {
    let region = Region::new([0, 0, 0], [4, 3, 2]);
    assert_eq!(region.number_of_pixels(), 24);
    assert_eq!(region.outer_stride(), 12);
    assert_eq!(region.linear_offset(&[1, 2, 1]), 1 + 2 * 4 + 12);
    assert_eq!(region.indices().count(), 24);
}

#[test]
fn display_shows_index_and_size() {
    assert_eq!(r2(1, 2, 3, 4).to_string(), "index=[1, 2] size=[3, 4]");
}

#[test]
fn union_is_bounding_box() {
    let a = r2(0, 0, 4, 4);
    let b = r2(6, -2, 2, 3);
    assert_eq!(a.union(&b), r2(0, -2, 8, 6));
    assert_eq!(a.union(&Region::null()), a);
    assert_eq!(Region::null().union(&b), b);
}
