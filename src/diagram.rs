//! The output structure: a half-edge (DCEL) representation of the
//! Voronoi diagram.
//!
//! Cells correspond one-to-one with deduplicated input sites, vertices
//! with circle events that fired, and edges come in twin pairs, one
//! half-edge per incident cell. Infinite edges have no start vertex;
//! parabolic bisectors are marked non-linear but carry no tessellation
//! (that is a rendering concern).
//!
//! During construction the builder calls the `pub(crate)` methods in
//! event order; [`Diagram::build`] stitches and compacts the result.

use serde::Serialize;

use crate::circle::CircleEvent;
use crate::num::ulp_cmp;
use crate::site::{SiteEvent, SourceCategory};

/// Vertex-merge tolerance, in ulps.
const VERTEX_EQUALITY_ULPS: u64 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CellId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct VertexId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeId(pub usize);

/// A Voronoi cell: the region of the plane closest to one input site.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Cell {
    source_index: usize,
    category: SourceCategory,
    incident_edge: Option<EdgeId>,
}

impl Cell {
    /// Index of the input geometry (point or segment) owning this cell.
    /// All three cells of one segment share it.
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn category(&self) -> SourceCategory {
        self.category
    }

    pub fn incident_edge(&self) -> Option<EdgeId> {
        self.incident_edge
    }

    /// A cell with no edges (possible for degenerate inputs).
    pub fn is_degenerate(&self) -> bool {
        self.incident_edge.is_none()
    }

    pub fn contains_point(&self) -> bool {
        !self.category.is_segment()
    }

    pub fn contains_segment(&self) -> bool {
        self.category.is_segment()
    }
}

/// A finite Voronoi vertex, equidistant to three or more sites.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Vertex {
    x: f64,
    y: f64,
    incident_edge: Option<EdgeId>,
    is_site_point: bool,
}

impl Vertex {
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// One of the edges leaving this vertex.
    pub fn incident_edge(&self) -> Option<EdgeId> {
        self.incident_edge
    }

    /// True if the vertex coincides with an input point.
    pub fn is_site_point(&self) -> bool {
        self.is_site_point
    }

    fn coincides_with(&self, other: &Vertex) -> bool {
        ulp_cmp(self.x, other.x, VERTEX_EQUALITY_ULPS) == std::cmp::Ordering::Equal
            && ulp_cmp(self.y, other.y, VERTEX_EQUALITY_ULPS) == std::cmp::Ordering::Equal
    }
}

/// A half-edge of the diagram. Twins share an (undirected) bisector.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Edge {
    cell: CellId,
    vertex0: Option<VertexId>,
    twin: Option<EdgeId>,
    next: Option<EdgeId>,
    prev: Option<EdgeId>,
    is_linear: bool,
    is_primary: bool,
}

impl Edge {
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// The vertex this half-edge leaves, if finite on that end.
    pub fn vertex0(&self) -> Option<VertexId> {
        self.vertex0
    }

    /// Straight bisector; curved (parabolic) otherwise.
    pub fn is_linear(&self) -> bool {
        self.is_linear
    }

    pub fn is_curved(&self) -> bool {
        !self.is_linear
    }

    /// False for a bisector between a segment and its own endpoint.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}

/// The assembled diagram.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Diagram {
    cells: Vec<Cell>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Diagram {
    pub(crate) fn new() -> Self {
        Diagram::default()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edge_twin(&self, id: EdgeId) -> EdgeId {
        self.edges[id.0].twin.expect("half-edge without a twin")
    }

    pub fn edge_next(&self, id: EdgeId) -> Option<EdgeId> {
        self.edges[id.0].next
    }

    pub fn edge_prev(&self, id: EdgeId) -> Option<EdgeId> {
        self.edges[id.0].prev
    }

    pub fn edge_vertex0(&self, id: EdgeId) -> Option<VertexId> {
        self.edges[id.0].vertex0
    }

    pub fn edge_vertex1(&self, id: EdgeId) -> Option<VertexId> {
        self.edge_vertex0(self.edge_twin(id))
    }

    /// The next edge leaving the same start vertex, counterclockwise.
    pub fn edge_rot_next(&self, id: EdgeId) -> Option<EdgeId> {
        self.edge_prev(id).map(|prev| self.edge_twin(prev))
    }

    /// The previous edge leaving the same start vertex.
    pub fn edge_rot_prev(&self, id: EdgeId) -> Option<EdgeId> {
        self.edge_next(self.edge_twin(id))
    }

    /// Finite edges have a vertex at both ends.
    pub fn edge_is_finite(&self, id: EdgeId) -> bool {
        self.edge_vertex0(id).is_some() && self.edge_vertex1(id).is_some()
    }

    pub fn edge_is_infinite(&self, id: EdgeId) -> bool {
        !self.edge_is_finite(id)
    }

    /// Walks the boundary of a cell, starting at its incident edge.
    pub fn cell_edges(&self, id: CellId) -> CellEdgeIter<'_> {
        let start = self.cells[id.0].incident_edge;
        CellEdgeIter {
            diagram: self,
            start,
            next: start,
        }
    }

    // -----------------------------------------------------------------
    // Construction-time interface, called by the builder in event order.
    // -----------------------------------------------------------------

    pub(crate) fn reserve(&mut self, sites: usize) {
        self.cells.reserve(sites);
        self.vertices.reserve(sites << 1);
        self.edges.reserve((sites << 2) + (sites << 1));
    }

    /// Cells are created in sorted-site order, exactly once per site.
    fn make_cell(&mut self, site: &SiteEvent) {
        debug_assert_eq!(self.cells.len(), site.sorted_index());
        self.cells.push(Cell {
            source_index: site.initial_index(),
            category: site.category(),
            incident_edge: None,
        });
    }

    pub(crate) fn process_single_site(&mut self, site: &SiteEvent) {
        self.make_cell(site);
    }

    /// Inserts the twin pair of half-edges for a new bisector between
    /// `site1` and `site2`, where `site2` is the site being added.
    pub(crate) fn insert_edge_pair(
        &mut self,
        site1: &SiteEvent,
        site2: &SiteEvent,
    ) -> (EdgeId, EdgeId) {
        let is_linear = SiteEvent::is_linear_edge(site1, site2);
        let is_primary = SiteEvent::is_primary_edge(site1, site2);

        let edge1 = EdgeId(self.edges.len());
        let edge2 = EdgeId(self.edges.len() + 1);
        self.edges.push(Edge {
            cell: CellId(site1.sorted_index()),
            vertex0: None,
            twin: Some(edge2),
            next: None,
            prev: None,
            is_linear,
            is_primary,
        });
        self.edges.push(Edge {
            cell: CellId(site2.sorted_index()),
            vertex0: None,
            twin: Some(edge1),
            next: None,
            prev: None,
            is_linear,
            is_primary,
        });

        // The very first pair also creates the cell of the enclosing arc.
        if self.cells.is_empty() {
            self.make_cell(site1);
        }
        self.make_cell(site2);
        (edge1, edge2)
    }

    /// Materializes the Voronoi vertex of a collapsed arc triple and the
    /// new bisector between the outer sites. `edge12` and `edge23` are
    /// the half-edges of the two bisectors that now end at the vertex.
    pub(crate) fn insert_vertex_and_edge(
        &mut self,
        site1: &SiteEvent,
        site3: &SiteEvent,
        circle: &CircleEvent,
        edge12: EdgeId,
        edge23: EdgeId,
    ) -> (EdgeId, EdgeId) {
        let is_linear = SiteEvent::is_linear_edge(site1, site3);
        let is_primary = SiteEvent::is_primary_edge(site1, site3);

        let new_edge1 = EdgeId(self.edges.len());
        let new_edge2 = EdgeId(self.edges.len() + 1);
        self.edges.push(Edge {
            cell: CellId(site1.sorted_index()),
            vertex0: None,
            twin: Some(new_edge2),
            next: None,
            prev: None,
            is_linear,
            is_primary,
        });
        self.edges.push(Edge {
            cell: CellId(site3.sorted_index()),
            vertex0: None,
            twin: Some(new_edge1),
            next: None,
            prev: None,
            is_linear,
            is_primary,
        });

        let vertex = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            x: circle.x.into_inner(),
            y: circle.y.into_inner(),
            incident_edge: None,
            is_site_point: circle.is_site_point,
        });

        // The collapsed bisectors now start at the new vertex; so does
        // the outward half of the new bisector.
        self.set_vertex0(Some(edge12), Some(vertex));
        self.set_vertex0(Some(edge23), Some(vertex));
        self.set_vertex0(Some(new_edge2), Some(vertex));

        self.set_prev(Some(edge12), Some(new_edge1));
        self.set_next(Some(new_edge1), Some(edge12));
        let edge12_twin = self.get_twin(Some(edge12));
        self.set_next(edge12_twin, Some(edge23));
        self.set_prev(Some(edge23), edge12_twin);
        let edge23_twin = self.get_twin(Some(edge23));
        self.set_next(edge23_twin, Some(new_edge2));
        self.set_prev(Some(new_edge2), edge23_twin);

        (new_edge1, new_edge2)
    }

    // Option-lifted pointer plumbing for the stitching passes.

    fn get_twin(&self, edge: Option<EdgeId>) -> Option<EdgeId> {
        self.edges[edge?.0].twin
    }

    fn get_next(&self, edge: Option<EdgeId>) -> Option<EdgeId> {
        self.edges[edge?.0].next
    }

    fn get_prev(&self, edge: Option<EdgeId>) -> Option<EdgeId> {
        self.edges[edge?.0].prev
    }

    fn get_vertex0(&self, edge: Option<EdgeId>) -> Option<VertexId> {
        self.edges[edge?.0].vertex0
    }

    fn get_vertex1(&self, edge: Option<EdgeId>) -> Option<VertexId> {
        self.get_vertex0(self.get_twin(edge))
    }

    fn rot_next(&self, edge: Option<EdgeId>) -> Option<EdgeId> {
        self.get_twin(self.get_prev(edge))
    }

    fn rot_prev(&self, edge: Option<EdgeId>) -> Option<EdgeId> {
        self.get_next(self.get_twin(edge))
    }

    fn set_next(&mut self, edge: Option<EdgeId>, next: Option<EdgeId>) {
        if let Some(e) = edge {
            self.edges[e.0].next = next;
        }
    }

    fn set_prev(&mut self, edge: Option<EdgeId>, prev: Option<EdgeId>) {
        if let Some(e) = edge {
            self.edges[e.0].prev = prev;
        }
    }

    fn set_twin(&mut self, edge: Option<EdgeId>, twin: Option<EdgeId>) {
        if let Some(e) = edge {
            self.edges[e.0].twin = twin;
        }
    }

    fn set_vertex0(&mut self, edge: Option<EdgeId>, vertex: Option<VertexId>) {
        if let Some(e) = edge {
            self.edges[e.0].vertex0 = vertex;
        }
    }

    /// Unlinks a zero-length edge, redirecting everything incident to its
    /// end vertex onto its start vertex.
    fn remove_edge(&mut self, edge: EdgeId) {
        let edge = Some(edge);
        let vertex = self.get_vertex0(edge);
        let twin = self.get_twin(edge);
        let mut updated = self.rot_next(twin);
        while updated != twin {
            self.set_vertex0(updated, vertex);
            updated = self.rot_next(updated);
        }

        let edge1 = edge;
        let edge2 = twin;
        let edge1_rot_next = self.rot_next(edge1);
        let edge1_rot_prev = self.rot_prev(edge1);
        let edge2_rot_next = self.rot_next(edge2);
        let edge2_rot_prev = self.rot_prev(edge2);

        self.set_next(self.get_twin(edge1_rot_next), edge2_rot_prev);
        self.set_prev(edge2_rot_prev, self.get_twin(edge1_rot_next));
        self.set_prev(edge1_rot_prev, self.get_twin(edge2_rot_next));
        self.set_next(self.get_twin(edge2_rot_next), edge1_rot_prev);
    }

    fn edge_copy(&mut self, dest: usize, source: usize) {
        self.edges[dest] = self.edges[source];
    }

    fn vertex_copy(&mut self, dest: usize, source: usize) {
        self.vertices[dest] = self.vertices[source];
    }

    /// Finalizes the diagram: removes degenerate edges and vertices,
    /// wires incident-edge pointers, and closes the boundary chains of
    /// infinite edges.
    pub(crate) fn build(&mut self) {
        // Remove degenerate (zero-length) edges. Twins are adjacent by
        // construction, so the scan and compaction work on pairs.
        if !self.edges.is_empty() {
            let mut last_edge = 0;
            let edges_end = self.edges.len();
            let mut it = 0;
            while it < edges_end {
                let e = EdgeId(it);
                let degenerate = match (self.get_vertex0(Some(e)), self.get_vertex1(Some(e))) {
                    (Some(v0), Some(v1)) => {
                        self.vertices[v0.0].coincides_with(&self.vertices[v1.0])
                    }
                    _ => false,
                };
                if degenerate {
                    self.remove_edge(e);
                } else {
                    if it != last_edge {
                        self.edge_copy(last_edge, it);
                        self.edge_copy(last_edge + 1, it + 1);
                        let e1 = Some(EdgeId(last_edge));
                        let e2 = Some(EdgeId(last_edge + 1));
                        self.set_twin(e1, e2);
                        self.set_twin(e2, e1);
                        if self.get_prev(e1).is_some() {
                            self.set_next(self.get_prev(e1), e1);
                            self.set_prev(self.get_next(e2), e2);
                        }
                        if self.get_prev(e2).is_some() {
                            self.set_prev(self.get_next(e1), e1);
                            self.set_next(self.get_prev(e2), e2);
                        }
                    }
                    last_edge += 2;
                }
                it += 2;
            }
            self.edges.truncate(last_edge);
        }

        // Set up incident-edge pointers for cells and vertices.
        for it in 0..self.edges.len() {
            let edge = EdgeId(it);
            let cell = self.edges[it].cell;
            if self.cells[cell.0].incident_edge.is_none() {
                self.cells[cell.0].incident_edge = Some(edge);
            }
            if let Some(v) = self.edges[it].vertex0 {
                self.vertices[v.0].incident_edge = Some(edge);
            }
        }

        // Drop vertices with no surviving edges; compact the rest.
        if !self.vertices.is_empty() {
            let mut last_vertex = 0;
            for it in 0..self.vertices.len() {
                if self.vertices[it].incident_edge.is_some() {
                    if it != last_vertex {
                        self.vertex_copy(last_vertex, it);
                        let v = Some(VertexId(last_vertex));
                        let start = self.vertices[last_vertex].incident_edge;
                        let mut e = start;
                        loop {
                            self.set_vertex0(e, v);
                            e = self.rot_next(e);
                            if e == start {
                                break;
                            }
                        }
                    }
                    last_vertex += 1;
                }
            }
            self.vertices.truncate(last_vertex);
        }

        if self.vertices.is_empty() {
            // All edges are full lines (collinear input); chain the pairs
            // to each other.
            if !self.edges.is_empty() {
                let n = self.edges.len();
                self.set_next(Some(EdgeId(0)), Some(EdgeId(0)));
                self.set_prev(Some(EdgeId(0)), Some(EdgeId(0)));
                let mut it = 1;
                while it + 2 < n {
                    let edge1 = Some(EdgeId(it));
                    let edge2 = Some(EdgeId(it + 1));
                    self.set_next(edge1, edge2);
                    self.set_prev(edge1, edge2);
                    self.set_next(edge2, edge1);
                    self.set_prev(edge2, edge1);
                    it += 2;
                }
                let last = Some(EdgeId(it));
                self.set_next(last, last);
                self.set_prev(last, last);
            }
        } else {
            // Close each boundary cell's chain of infinite edges.
            for cell_it in 0..self.cells.len() {
                if self.cells[cell_it].is_degenerate() {
                    continue;
                }
                // Walk clockwise as far as possible.
                let terminal = self.cells[cell_it].incident_edge;
                let mut left = terminal;
                while let Some(prev) = self.get_prev(left) {
                    left = Some(prev);
                    // Interior cells close on themselves.
                    if left == terminal {
                        break;
                    }
                }
                if self.get_prev(left).is_some() {
                    continue;
                }
                let mut right = self.cells[cell_it].incident_edge;
                while let Some(next) = self.get_next(right) {
                    right = Some(next);
                }
                self.set_prev(left, right);
                self.set_next(right, left);
            }
        }
    }
}

/// Iterator over a cell's boundary edges.
pub struct CellEdgeIter<'a> {
    diagram: &'a Diagram,
    start: Option<EdgeId>,
    next: Option<EdgeId>,
}

impl<'a> Iterator for CellEdgeIter<'a> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        let current = self.next?;
        self.next = match self.diagram.edge_next(current) {
            Some(next) if Some(next) != self.start => Some(next),
            _ => None,
        };
        Some(current)
    }
}
