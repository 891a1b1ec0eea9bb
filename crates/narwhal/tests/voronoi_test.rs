use narwhal::algo::rng::XorShift64Star;
use narwhal::geom::polygon_signed_area;
use narwhal::voronoi::{Builder, Diagram, compute};
use narwhal::{Point, Rect};

const TOL: f64 = 1e-6;

fn random_sites(n: usize, bounds: &Rect, seed: u64) -> Vec<Point> {
    let mut rng = XorShift64Star::new(seed);
    (0..n)
        .map(|_| {
            Point::new(
                bounds.left + rng.next_f64_unit() * bounds.width(),
                bounds.top + rng.next_f64_unit() * bounds.height(),
            )
        })
        .collect()
}

fn grid_sites(cols: usize, rows: usize, step: f64, origin: Point) -> Vec<Point> {
    let mut out = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            out.push(Point::new(
                origin.x + c as f64 * step,
                origin.y + r as f64 * step,
            ));
        }
    }
    out
}

fn assert_closed_rings(d: &Diagram) {
    for (c, cell) in d.cells.iter().enumerate() {
        let n = cell.halfedges.len();
        assert!(n >= 3, "cell {c} has {n} halfedges");
        for i in 0..n {
            let end = d.halfedge_end(&cell.halfedges[i]);
            let next = d.halfedge_start(&cell.halfedges[(i + 1) % n]);
            assert!(
                (end.x - next.x).abs() < TOL && (end.y - next.y).abs() < TOL,
                "cell {c}: ring broken at {i}: {end:?} vs {next:?}"
            );
        }
    }
}

fn assert_convex(d: &Diagram) {
    for c in 0..d.cells.len() {
        let poly = d.cell_polygon(c);
        let n = poly.len();
        let mut sign = 0.0f64;
        for i in 0..n {
            let (a, b, q) = (poly[i], poly[(i + 1) % n], poly[(i + 2) % n]);
            let cross = (b.x - a.x) * (q.y - b.y) - (b.y - a.y) * (q.x - b.x);
            if cross.abs() < TOL {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            }
            assert_eq!(sign, cross.signum(), "cell {c} is not convex: {poly:?}");
        }
    }
}

fn assert_covers(d: &Diagram, bounds: &Rect) {
    let total: f64 = (0..d.cells.len()).map(|c| d.cell_area(c)).sum();
    assert!(
        (total - bounds.area()).abs() < 1e-6 * bounds.area(),
        "cells cover {total}, rectangle is {}",
        bounds.area()
    );
    for v in d.cells.iter().flat_map(|c| c.halfedges.iter()) {
        let p = d.halfedge_start(v);
        assert!(bounds.expanded(1e-9).contains(p), "vertex {p:?} escapes {bounds:?}");
    }
}

fn assert_nearest_site(d: &Diagram, sites: &[Point]) {
    for (c, cell) in d.cells.iter().enumerate() {
        let own = sites[cell.source];
        let mut samples = d.cell_polygon(c);
        samples.extend(d.cell_centroid(c));
        for p in samples {
            let mine = p.distance(own);
            for other in sites {
                assert!(
                    mine <= p.distance(*other) + TOL,
                    "cell {c}: {p:?} is closer to {other:?} than to {own:?}"
                );
            }
        }
    }
}

fn assert_diagram(sites: &[Point], bounds: Rect) -> Diagram {
    let d = compute(sites, bounds).expect("diagram");
    assert_closed_rings(&d);
    assert_convex(&d);
    assert_covers(&d, &bounds);
    assert_nearest_site(&d, sites);
    d
}

#[test]
fn random_sites_partition_the_rectangle() {
    let bounds = Rect::from_size(640.0, 480.0);
    for seed in 0..8 {
        let sites = random_sites(200, &bounds, seed);
        let d = assert_diagram(&sites, bounds);
        assert_eq!(d.cells.len(), 200);
    }
}

#[test]
fn small_site_sets_partition_the_rectangle() {
    let bounds = Rect::from_size(100.0, 80.0);
    let mut rng = XorShift64Star::new(2024);
    for round in 0..300 {
        let n = 2 + (rng.next_u64() % 39) as usize;
        let sites: Vec<Point> = (0..n)
            .map(|_| {
                let x = rng.next_f64_unit() * bounds.width();
                let y = rng.next_f64_unit() * bounds.height();
                if round % 2 == 0 {
                    Point::new(x, y)
                } else {
                    // Lattice points produce ties, duplicates and cocircular quadruples.
                    Point::new(x.floor().clamp(1.0, 99.0), y.floor().clamp(1.0, 79.0))
                }
            })
            .collect();
        assert_diagram(&sites, bounds);
    }
}

#[test]
fn three_sites_with_a_steep_bisector() {
    let bounds = Rect::from_size(100.0, 80.0);
    let sites = [
        Point::new(60.0, 50.0),
        Point::new(20.0, 30.0),
        Point::new(40.0, 20.0),
    ];
    let d = assert_diagram(&sites, bounds);
    assert_eq!(d.cells.len(), 3);
}

#[test]
fn cocircular_grid_sites_partition_the_rectangle() {
    let bounds = Rect::from_size(100.0, 100.0);
    let sites = grid_sites(5, 5, 20.0, Point::new(10.0, 10.0));
    let d = assert_diagram(&sites, bounds);
    for c in 0..d.cells.len() {
        assert!((d.cell_area(c) - 400.0).abs() < 1e-6, "cell {c}");
        let centroid = d.cell_centroid(c).expect("centroid");
        assert!(centroid.distance(d.cells[c].site) < TOL, "cell {c}: {centroid:?}");
    }
}

#[test]
fn collinear_sites_split_into_strips() {
    let bounds = Rect::from_size(60.0, 10.0);
    let horizontal: Vec<Point> = (0..6).map(|i| Point::new(5.0 + 10.0 * i as f64, 5.0)).collect();
    let d = assert_diagram(&horizontal, bounds);
    assert_eq!(d.site_pairs().count(), 5);

    let bounds = Rect::from_size(10.0, 60.0);
    let vertical: Vec<Point> = (0..6).map(|i| Point::new(5.0, 5.0 + 10.0 * i as f64)).collect();
    assert_diagram(&vertical, bounds);

    let bounds = Rect::from_size(100.0, 100.0);
    let diagonal: Vec<Point> = (0..5)
        .map(|i| Point::new(10.0 + 20.0 * i as f64, 10.0 + 20.0 * i as f64))
        .collect();
    assert_diagram(&diagonal, bounds);
}

#[test]
fn sites_on_the_border_are_handled() {
    let bounds = Rect::from_size(50.0, 50.0);
    let sites = [
        Point::new(0.0, 0.0),
        Point::new(50.0, 0.0),
        Point::new(50.0, 50.0),
        Point::new(0.0, 50.0),
        Point::new(25.0, 25.0),
    ];
    let d = assert_diagram(&sites, bounds);
    assert_eq!(d.cells.len(), 5);
}

#[test]
fn sites_outside_the_rectangle_still_bound_their_cells() {
    let bounds = Rect::from_size(100.0, 100.0);
    let sites = [
        Point::new(-50.0, 50.0),
        Point::new(30.0, 40.0),
        Point::new(70.0, 60.0),
    ];
    let d = compute(&sites, bounds).expect("diagram");
    let total: f64 = (0..d.cells.len()).map(|c| d.cell_area(c)).sum();
    assert!((total - bounds.area()).abs() < 1e-6);
}

#[test]
fn inner_site_owns_the_rectangle_when_the_rest_are_outside() {
    let bounds = Rect::from_size(100.0, 100.0);
    let sites = [
        Point::new(50.0, 50.0),
        Point::new(500.0, 50.0),
        Point::new(50.0, -400.0),
    ];
    let d = compute(&sites, bounds).expect("diagram");
    let total: f64 = (0..d.cells.len()).map(|c| d.cell_area(c)).sum();
    assert!((total - bounds.area()).abs() < 1e-6, "{total}");
    let inside = d.cells.iter().position(|c| c.source == 0).expect("cell");
    assert_eq!(d.cells[inside].halfedges.len(), 4);
    let centroid = d.cell_centroid(inside).expect("centroid");
    assert!(centroid.approx_eq(Point::new(50.0, 50.0)), "{centroid:?}");
}

#[test]
fn recycled_builder_matches_fresh_builder() {
    let bounds = Rect::from_size(300.0, 300.0);
    let mut builder = Builder::new();
    for seed in 0..5 {
        let sites = random_sites(64, &bounds, 100 + seed);
        let fresh = compute(&sites, bounds).expect("fresh");
        let reused = builder.compute(&sites, bounds).expect("reused");
        assert_eq!(fresh.cells.len(), reused.cells.len());
        assert_eq!(fresh.edges, reused.edges);
        for c in 0..fresh.cells.len() {
            assert_eq!(fresh.cell_polygon(c), reused.cell_polygon(c));
        }
        builder.recycle(reused);
    }
}

#[test]
fn cell_areas_are_signed_consistently() {
    let bounds = Rect::from_size(120.0, 80.0);
    let sites = random_sites(30, &bounds, 42);
    let d = compute(&sites, bounds).expect("diagram");
    let signs: Vec<f64> = (0..d.cells.len())
        .map(|c| polygon_signed_area(&d.cell_polygon(c)).signum())
        .collect();
    assert!(signs.windows(2).all(|w| w[0] == w[1]), "{signs:?}");
}

#[test]
fn infractions_count_close_neighbours_only() {
    let bounds = Rect::from_size(100.0, 10.0);
    let sites = [
        Point::new(10.0, 5.0),
        Point::new(15.0, 5.0),
        Point::new(90.0, 5.0),
    ];
    let d = compute(&sites, bounds).expect("diagram");
    let by_cell: Vec<Point> = d.cells.iter().map(|c| c.site).collect();
    assert_eq!(d.infractions(&by_cell, 10.0), 1);
    assert_eq!(d.infractions(&by_cell, 100.0), 2);
    assert_eq!(d.infractions(&by_cell, 1.0), 0);
}
