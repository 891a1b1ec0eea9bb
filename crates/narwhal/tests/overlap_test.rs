use narwhal::overlap::{Relaxer, resolve};
use narwhal::{ExpandFactor, OverlapOptions, Point, Rect};

fn crowded(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let a = i as f64 * 2.399_963;
            let r = 1.0 + i as f64 * 0.4;
            Point::new(50.0 + r * a.cos(), 50.0 + r * a.sin())
        })
        .collect()
}

#[test]
fn converged_symmetric_layout_is_a_fixed_point() {
    let bounds = Rect::from_size(100.0, 100.0);
    let mut positions = vec![
        Point::new(25.0, 25.0),
        Point::new(75.0, 25.0),
        Point::new(25.0, 75.0),
        Point::new(75.0, 75.0),
    ];
    let mut relaxer = Relaxer::new();
    let infractions = relaxer
        .relax(&mut positions, bounds, 30.0)
        .expect("relax");
    assert_eq!(infractions, 0);

    let before = positions.clone();
    relaxer
        .relax(&mut positions, bounds, 30.0)
        .expect("relax again");
    for (a, b) in before.iter().zip(&positions) {
        assert!(a.distance(*b) < 1e-9, "{a:?} moved to {b:?}");
    }
}

#[test]
fn expansion_never_exceeds_budget_and_never_shrinks_bounds() {
    let bounds = Rect::from_size(100.0, 100.0);
    let sites = crowded(16);
    let mut last = bounds;
    for cap in 0..6 {
        let opts = OverlapOptions {
            min_distance: 40.0,
            max_expand_iterations: cap,
            ..Default::default()
        };
        let out = resolve(&sites, bounds, &opts).expect("resolve");
        assert!(out.expansions <= cap);
        assert!(out.bounds.width() >= last.width() - 1e-9);
        assert!(out.bounds.height() >= last.height() - 1e-9);
        assert!(out.bounds.center().approx_eq(bounds.center()));
        last = out.bounds;
    }
}

#[test]
fn fixed_factor_grows_by_that_factor() {
    let bounds = Rect::from_size(100.0, 50.0);
    let opts = OverlapOptions {
        min_distance: 1000.0,
        expand_factor: ExpandFactor::Fixed(0.5),
        max_expand_iterations: 2,
        ..Default::default()
    };
    let out = resolve(&crowded(5), bounds, &opts).expect("resolve");
    assert!(out.infractions > 0);
    let expected = 1.5f64.powi(out.expansions as i32);
    assert!((out.bounds.width() - 100.0 * expected).abs() < 1e-9);
    assert!((out.bounds.height() - 50.0 * expected).abs() < 1e-9);
}

#[test]
fn positions_stay_inside_final_bounds() {
    let bounds = Rect::from_size(80.0, 80.0);
    let opts = OverlapOptions {
        min_distance: 25.0,
        ..Default::default()
    };
    let out = resolve(&crowded(12), bounds, &opts).expect("resolve");
    for p in &out.positions {
        assert!(out.bounds.contains(*p), "{p:?} outside {:?}", out.bounds);
    }
}

#[test]
fn no_minimum_distance_means_no_expansion() {
    let out = resolve(
        &crowded(10),
        Rect::from_size(100.0, 100.0),
        &OverlapOptions::default(),
    )
    .expect("resolve");
    assert_eq!(out.expansions, 0);
    assert_eq!(out.infractions, 0);
}
