use image::{Rgba, RgbaImage};
use packshot_image::{
    alpha, bounding_box, clean, crop, grid, normalize, quality_schedule, AlphaOptions, Pipeline,
    PipelineConfig,
};
use proptest::prelude::*;

fn grid_strategy() -> impl Strategy<Value = RgbaImage> {
    (1u32..=24, 1u32..=24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h) as usize).prop_map(move |alphas| {
            RgbaImage::from_fn(w, h, |x, y| {
                let a = alphas[(y * w + x) as usize];
                Rgba([x as u8, y as u8, a ^ 0x5A, a])
            })
        })
    })
}

/// Alpha that is mostly 0 or 255 so crops are non-trivial.
fn sparse_grid_strategy() -> impl Strategy<Value = RgbaImage> {
    (1u32..=24, 1u32..=24).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop_oneof![4 => Just(0u8), 1 => Just(255u8)], (w * h) as usize)
            .prop_map(move |alphas| {
                RgbaImage::from_fn(w, h, |x, y| Rgba([9, 9, 9, alphas[(y * w + x) as usize]]))
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn cleaned_alpha_is_binary(
        img in grid_strategy(),
        low in any::<u8>(),
        cutoff in any::<u8>(),
        radius in 0u32..=3,
    ) {
        let cleaned = clean(img.clone(), low, cutoff, radius).unwrap();
        prop_assert_eq!(cleaned.dimensions(), img.dimensions());
        for (before, after) in img.pixels().zip(cleaned.pixels()) {
            prop_assert!(after[3] == 0 || after[3] == 255);
            prop_assert_eq!(&before.0[..3], &after.0[..3]);
        }
    }

    #[test]
    fn below_threshold_never_survives(
        img in grid_strategy(),
        low in 1u8..=255,
        radius in 0u32..=3,
    ) {
        let cleaned = clean(img.clone(), low, 0, radius).unwrap();
        for (before, after) in img.pixels().zip(cleaned.pixels()) {
            if before[3] < low {
                prop_assert_eq!(after[3], 0);
            }
        }
    }

    #[test]
    fn erosion_never_raises_alpha(img in grid_strategy(), radius in 0u32..=4) {
        let original = grid::alpha_channel(&img);
        let mut eroded = original.clone();
        for _ in 0..radius {
            let next = alpha::erode(&eroded);
            for (a, b) in eroded.pixels().zip(next.pixels()) {
                prop_assert!(b[0] <= a[0]);
            }
            eroded = next;
        }
        for (a, b) in original.pixels().zip(eroded.pixels()) {
            prop_assert!(b[0] <= a[0]);
        }
    }

    #[test]
    fn zero_radius_is_threshold_then_binarize(img in grid_strategy(), low in any::<u8>(), cutoff in any::<u8>()) {
        let cleaned = clean(img.clone(), low, cutoff, 0).unwrap();
        for (before, after) in img.pixels().zip(cleaned.pixels()) {
            let a = if before[3] < low { 0 } else { before[3] };
            let expected = if a > cutoff { 255 } else { 0 };
            prop_assert_eq!(after[3], expected);
        }
    }

    #[test]
    fn crop_is_tight_and_idempotent(img in sparse_grid_strategy()) {
        let cropped = crop(img.clone());
        match bounding_box(&img) {
            None => {
                prop_assert_eq!(&cropped, &img);
            }
            Some(bbox) => {
                prop_assert_eq!(cropped.dimensions(), (bbox.width(), bbox.height()));
                let (w, h) = cropped.dimensions();
                prop_assert!((0..w).any(|x| cropped.get_pixel(x, 0)[3] > 0));
                prop_assert!((0..w).any(|x| cropped.get_pixel(x, h - 1)[3] > 0));
                prop_assert!((0..h).any(|y| cropped.get_pixel(0, y)[3] > 0));
                prop_assert!((0..h).any(|y| cropped.get_pixel(w - 1, y)[3] > 0));
            }
        }
        prop_assert_eq!(crop(cropped.clone()), cropped);
    }

    #[test]
    fn normalized_is_never_portrait(w in 1u32..=40, h in 1u32..=40, clockwise in any::<bool>()) {
        let (out, rotated) = normalize(RgbaImage::new(w, h), clockwise);
        prop_assert_eq!(rotated, h > w);
        prop_assert!(out.width() >= out.height());
        if rotated {
            prop_assert_eq!(out.dimensions(), (h, w));
        } else {
            prop_assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn rotations_are_inverse(img in grid_strategy()) {
        let (cw, rotated) = normalize(img.clone(), true);
        if rotated {
            prop_assert_eq!(image::imageops::rotate270(&cw), img);
        }
    }

    #[test]
    fn schedule_descends_to_floor(start in 0u8..=100, min in 0u8..=100, step in 1u8..=20) {
        let schedule = quality_schedule(start, min, step);
        prop_assert_eq!(schedule[0], start);
        prop_assert!(schedule.windows(2).all(|w| w[1] < w[0]));
        if start > min {
            prop_assert_eq!(*schedule.last().unwrap(), min);
            let bound = (start - min).div_ceil(step) as usize + 1;
            prop_assert_eq!(schedule.len(), bound);
        } else {
            prop_assert_eq!(schedule.len(), 1);
        }
    }
}

#[test]
fn ragged_rows_are_rejected() {
    let rows = vec![vec![[0, 0, 0, 255]; 3], vec![[0, 0, 0, 255]; 2]];
    assert!(matches!(
        grid::grid_from_rows(&rows),
        Err(packshot_image::ImageError::InvalidGrid(_))
    ));

    let rows = vec![vec![[1, 2, 3, 4]; 3]; 2];
    let built = grid::grid_from_rows(&rows).unwrap();
    assert_eq!(built.dimensions(), (3, 2));
    assert_eq!(built.get_pixel(2, 1).0, [1, 2, 3, 4]);
}

#[test]
fn opaque_scenario_keeps_every_pixel() {
    let img = RgbaImage::from_pixel(10, 10, Rgba([128, 64, 32, 255]));
    let cleaned = clean(img, 10, 128, 1).unwrap();
    assert!(cleaned.pixels().all(|p| p[3] == 255));
    assert_eq!(cleaned.get_pixel(5, 5)[3], 255);
}

#[test]
fn halo_scenario_crops_eroded_core() {
    let img = RgbaImage::from_fn(20, 20, |x, y| {
        let border = x < 2 || y < 2 || x >= 18 || y >= 18;
        Rgba([128, 64, 32, if border { 5 } else { 255 }])
    });

    let eroded = clean(img.clone(), 10, 128, 1).unwrap();
    assert_eq!(eroded.get_pixel(0, 0)[3], 0);
    assert_eq!(eroded.get_pixel(10, 10)[3], 255);
    assert_eq!(crop(eroded).dimensions(), (14, 14));

    let uneroded = clean(img, 10, 128, 0).unwrap();
    assert_eq!(crop(uneroded).dimensions(), (16, 16));
}

#[test]
fn pipeline_config_flows_through() {
    let config = PipelineConfig {
        alpha: AlphaOptions {
            erosion_radius: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let pipeline = Pipeline::new(&config).unwrap();
    let img = RgbaImage::from_fn(30, 10, |x, _| Rgba([0, 0, 0, if x < 5 { 255 } else { 0 }]));

    let t = pipeline.transform(img).unwrap();
    assert_eq!(t.grid.dimensions(), (10, 5));
    assert!(t.rotated);
}
