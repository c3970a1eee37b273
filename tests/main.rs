use fortune::{Builder, Diagram, SourceCategory};
use proptest::prelude::*;

/// One piece of input geometry, used to identify cells independently of
/// insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Geom {
    Point(i32, i32),
    Segment(i32, i32, i32, i32),
}

fn build(geoms: &[Geom]) -> (Diagram, Vec<Geom>) {
    let mut builder = Builder::new();
    let mut by_index = Vec::new();
    for &g in geoms {
        match g {
            Geom::Point(x, y) => {
                builder.insert_point((x, y));
            }
            Geom::Segment(x1, y1, x2, y2) => {
                builder.insert_segment((x1, y1, x2, y2));
            }
        }
        by_index.push(g);
    }
    (builder.construct(), by_index)
}

/// Undirected edges of a compactified diagram with at least one finite
/// vertex satisfy `edges = vertices + cells - 1`.
fn assert_euler(diagram: &Diagram) {
    assert!(diagram.edges().len() % 2 == 0, "half-edges come in twins");
    let undirected = diagram.edges().len() / 2;
    assert_eq!(
        undirected,
        diagram.vertices().len() + diagram.cells().len() - 1,
        "Euler relation violated: {} undirected edges, {} vertices, {} cells",
        undirected,
        diagram.vertices().len(),
        diagram.cells().len(),
    );
}

fn check_dcel(diagram: &Diagram) {
    for i in 0..diagram.edges().len() {
        let id = fortune::diagram::EdgeId(i);
        let twin = diagram.edge_twin(id);
        assert_eq!(diagram.edge_twin(twin), id, "twin pairing broken");
        assert_ne!(twin, id);
        // next/prev must be mutually consistent where present.
        if let Some(next) = diagram.edge_next(id) {
            assert_eq!(diagram.edge_prev(next), Some(id));
        }
    }
}

/// Every infinite edge must be reachable along its cell boundary from a
/// finite vertex (when the diagram has vertices at all).
fn check_infinite_edges_reachable(diagram: &Diagram) {
    if diagram.vertices().is_empty() {
        return;
    }
    for i in 0..diagram.edges().len() {
        let id = fortune::diagram::EdgeId(i);
        if diagram.edge_is_finite(id) {
            continue;
        }
        let mut cursor = id;
        let mut found = false;
        for _ in 0..diagram.edges().len() + 1 {
            if diagram.edge_vertex0(cursor).is_some() || diagram.edge_vertex1(cursor).is_some() {
                found = true;
                break;
            }
            cursor = diagram.edge_next(cursor).expect("boundary chain not closed");
        }
        assert!(found, "infinite edge {:?} sees no vertex on its boundary", id);
    }
}

#[test]
fn empty_input() {
    let (diagram, _) = build(&[]);
    assert_eq!(diagram.cells().len(), 0);
    assert_eq!(diagram.vertices().len(), 0);
    assert_eq!(diagram.edges().len(), 0);
}

#[test]
fn single_point() {
    let (diagram, _) = build(&[Geom::Point(0, 0)]);
    assert_eq!(diagram.cells().len(), 1);
    assert_eq!(diagram.vertices().len(), 0);
    assert_eq!(diagram.edges().len(), 0);
    assert_eq!(diagram.cells()[0].category(), SourceCategory::SinglePoint);
    assert!(diagram.cells()[0].is_degenerate());
}

#[test]
fn two_points() {
    let (diagram, _) = build(&[Geom::Point(0, 0), Geom::Point(10, 0)]);
    assert_eq!(diagram.cells().len(), 2);
    assert_eq!(diagram.vertices().len(), 0);
    assert_eq!(diagram.edges().len(), 2);
    check_dcel(&diagram);
}

#[test]
fn three_collinear_points_on_a_vertical_line() {
    let (diagram, _) = build(&[
        Geom::Point(5, 0),
        Geom::Point(5, 5),
        Geom::Point(5, 10),
    ]);
    assert_eq!(diagram.cells().len(), 3);
    assert_eq!(diagram.vertices().len(), 0);
    assert_eq!(diagram.edges().len(), 4);
    check_dcel(&diagram);
}

#[test]
fn three_points_make_one_vertex() {
    let (diagram, _) = build(&[
        Geom::Point(0, 0),
        Geom::Point(1, 10),
        Geom::Point(2, 0),
    ]);
    assert_eq!(diagram.cells().len(), 3);
    assert_eq!(diagram.vertices().len(), 1);
    assert_eq!(diagram.edges().len(), 6);
    assert_euler(&diagram);
    check_dcel(&diagram);

    // The vertex is the circumcenter.
    let v = &diagram.vertices()[0];
    assert!((v.x() - 1.0).abs() < 1e-9);
    assert!((v.y() - 4.95).abs() < 1e-9);
}

#[test]
fn square_of_segments_with_a_stray() {
    let (diagram, _) = build(&[
        Geom::Segment(200, 200, 200, 400),
        Geom::Segment(200, 400, 400, 400),
        Geom::Segment(400, 400, 400, 200),
        Geom::Segment(400, 200, 200, 200),
        Geom::Segment(529, 242, 367, 107),
    ]);
    // Shared corners fold: 4 corner cells + 4 segment cells for the
    // square, 2 endpoint cells + 1 segment cell for the stray.
    assert_eq!(diagram.cells().len(), 11);
    assert!(!diagram.vertices().is_empty());
    assert_euler(&diagram);
    check_dcel(&diagram);
    check_infinite_edges_reachable(&diagram);

    // Runs are identical.
    let (again, _) = build(&[
        Geom::Segment(200, 200, 200, 400),
        Geom::Segment(200, 400, 400, 400),
        Geom::Segment(400, 400, 400, 200),
        Geom::Segment(400, 200, 200, 200),
        Geom::Segment(529, 242, 367, 107),
    ]);
    assert_eq!(format!("{:?}", diagram), format!("{:?}", again));
}

#[test]
fn two_disjoint_segments() {
    let (diagram, _) = build(&[
        Geom::Segment(498, 224, 475, 335),
        Geom::Segment(250, 507, 60, 77),
    ]);
    assert_eq!(diagram.cells().len(), 6);
    assert!(!diagram.vertices().is_empty());
    assert_euler(&diagram);
    check_dcel(&diagram);
    check_infinite_edges_reachable(&diagram);
}

#[test]
fn single_segment() {
    let (diagram, _) = build(&[Geom::Segment(0, 0, 10, 0)]);
    // Two endpoint cells plus the open segment cell; the secondary
    // bisectors at the endpoints are straight, the rest too (no point
    // sites away from the segment).
    assert_eq!(diagram.cells().len(), 3);
    assert_eq!(diagram.vertices().len(), 0);
    check_dcel(&diagram);
    let segment_cells = diagram
        .cells()
        .iter()
        .filter(|c| c.category().is_segment())
        .count();
    assert_eq!(segment_cells, 1);
}

#[test]
fn point_and_segment() {
    let (diagram, _) = build(&[Geom::Point(0, 0), Geom::Segment(2, -3, 2, 3)]);
    assert_eq!(diagram.cells().len(), 4);
    assert_euler(&diagram);
    check_dcel(&diagram);
    // The bisector between the point and the open segment is parabolic.
    assert!(diagram.edges().iter().any(|e| e.is_curved()));
}

#[test]
fn construct_is_repeatable() {
    let mut builder = Builder::new();
    builder.insert_point((0, 0));
    builder.insert_point((7, 3));
    builder.insert_segment((10, -5, 12, 9));
    let first = builder.construct();
    let second = builder.construct();
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
}

#[test]
fn clear_resets_input() {
    let mut builder = Builder::new();
    builder.insert_point((0, 0));
    builder.clear();
    let diagram = builder.construct();
    assert_eq!(diagram.cells().len(), 0);
}

/// Cells tagged with the geometry they came from, as an
/// order-independent fingerprint of the diagram's combinatorics.
fn cell_fingerprint(diagram: &Diagram, by_index: &[Geom]) -> Vec<(Geom, SourceCategory)> {
    let mut cells: Vec<_> = diagram
        .cells()
        .iter()
        .map(|c| (by_index[c.source_index()], c.category()))
        .collect();
    cells.sort();
    cells
}

proptest! {
    #[test]
    fn insertion_order_does_not_change_the_diagram(
        order in Just(vec![
            Geom::Point(31, 62),
            Geom::Point(150, 40),
            Geom::Segment(200, 200, 200, 400),
            Geom::Segment(200, 400, 400, 400),
            Geom::Segment(529, 242, 367, 107),
        ])
        .prop_shuffle()
    ) {
        let baseline = vec![
            Geom::Point(31, 62),
            Geom::Point(150, 40),
            Geom::Segment(200, 200, 200, 400),
            Geom::Segment(200, 400, 400, 400),
            Geom::Segment(529, 242, 367, 107),
        ];
        let (expected, expected_idx) = build(&baseline);
        let (actual, actual_idx) = build(&order);

        prop_assert_eq!(
            cell_fingerprint(&actual, &actual_idx),
            cell_fingerprint(&expected, &expected_idx)
        );
        prop_assert_eq!(actual.vertices().len(), expected.vertices().len());
        prop_assert_eq!(actual.edges().len(), expected.edges().len());
    }
}
