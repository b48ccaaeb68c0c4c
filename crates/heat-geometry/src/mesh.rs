//! Structured meshes over rectangular domains.
//!
//! A [`StructuredMesh`] covers a [`Geometry`] with a regular, axis-aligned
//! grid. The longest side receives `Nmax` cells for the chosen
//! [`MeshSize`]; every other side gets the number of cells that keeps the
//! spacing closest to uniform. Nodes and cells are addressed through
//! per-axis strides, so the same code serves lines, rectangles and blocks.
//!
//! Node storage order, slowest to fastest varying:
//!
//! | d | order   |
//! |---|---------|
//! | 1 | x       |
//! | 2 | y, x    |
//! | 3 | x, y, z |
//!
//! Cells follow the same order. Corner ordering within a cell matches the
//! VTK polyline, pixel and voxel kinds.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::domain::{Axis, Face, Geometry, GeometryError, Side};

/// Relative tolerance used when testing whether a node lies on a face.
const FACE_TOLERANCE: f64 = 1e-9;

/// Resolution policy for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshSize {
    #[default]
    Coarse,
    Normal,
    Fine,
}

impl MeshSize {
    /// Number of cells assigned to the longest axis.
    pub fn max_cells(self, dimension: usize) -> usize {
        match (dimension, self) {
            (1, MeshSize::Coarse) => 10,
            (1, MeshSize::Normal) => 100,
            (1, MeshSize::Fine) => 1000,
            (2, MeshSize::Coarse) => 10,
            (2, MeshSize::Normal) => 50,
            (2, MeshSize::Fine) => 100,
            (_, MeshSize::Coarse) => 10,
            (_, MeshSize::Normal) => 20,
            (_, MeshSize::Fine) => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeshSize::Coarse => "coarse",
            MeshSize::Normal => "normal",
            MeshSize::Fine => "fine",
        }
    }
}

impl fmt::Display for MeshSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeshSize {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coarse" => Ok(MeshSize::Coarse),
            "normal" => Ok(MeshSize::Normal),
            "fine" => Ok(MeshSize::Fine),
            _ => Err(GeometryError::InvalidMeshSize(s.to_string())),
        }
    }
}

/// VTK cell kind used for a given dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    PolyLine,
    Pixel,
    Voxel,
}

impl CellType {
    pub fn for_dimension(dimension: usize) -> Self {
        match dimension {
            1 => CellType::PolyLine,
            2 => CellType::Pixel,
            _ => CellType::Voxel,
        }
    }

    /// Integer code written to the `types` array of a VTU file.
    pub fn vtk_code(self) -> u8 {
        match self {
            CellType::PolyLine => 4,
            CellType::Pixel => 8,
            CellType::Voxel => 11,
        }
    }

    /// Number of nodes per cell.
    pub fn corners(self) -> usize {
        match self {
            CellType::PolyLine => 2,
            CellType::Pixel => 4,
            CellType::Voxel => 8,
        }
    }
}

/// Number of cells of width `spacing` that best fit `length`, never fewer than one.
pub fn cell_count(length: f64, spacing: f64) -> usize {
    let n = (length / spacing).round();
    if n < 1.0 {
        log::warn!("Side of length {length} is shorter than half a cell ({spacing}); using one cell");
        1
    } else {
        n as usize
    }
}

fn storage_order(dimension: usize) -> &'static [Axis] {
    match dimension {
        1 => &[Axis::X],
        2 => &[Axis::Y, Axis::X],
        _ => &[Axis::X, Axis::Y, Axis::Z],
    }
}

/// Local axis carried by each bit of a corner number.
fn corner_order(dimension: usize) -> &'static [Axis] {
    match dimension {
        1 => &[Axis::X],
        2 => &[Axis::X, Axis::Y],
        _ => &[Axis::Z, Axis::X, Axis::Y],
    }
}

fn strides(order: &[Axis], extent: impl Fn(Axis) -> usize) -> [usize; 3] {
    let mut strides = [0; 3];
    let mut step = 1;
    for &axis in order.iter().rev() {
        strides[axis.index()] = step;
        step *= extent(axis);
    }
    strides
}

/// A regular grid of nodes and cells over a [`Geometry`].
#[derive(Debug, Clone)]
pub struct StructuredMesh {
    geometry: Arc<Geometry>,
    size: MeshSize,
    cells: [usize; 3],
    node_strides: [usize; 3],
    cell_strides: [usize; 3],
    coordinates: [Vec<f64>; 3],
    points: OnceLock<Vec<[f64; 3]>>,
    connectivity: OnceLock<Vec<usize>>,
    boundary: OnceLock<Vec<usize>>,
}

impl StructuredMesh {
    pub fn new(geometry: Arc<Geometry>, size: MeshSize) -> Self {
        let cells = cells_per_axis(&geometry, size);
        let order = storage_order(geometry.dimension());
        let node_strides = strides(order, |a| cells[a.index()] + 1);
        let cell_strides = strides(order, |a| cells[a.index()]);

        let mut coordinates: [Vec<f64>; 3] = Default::default();
        for &axis in geometry.axes() {
            if let Some(length) = geometry.length(axis) {
                coordinates[axis.index()] = axis_coordinates(length, cells[axis.index()]);
            }
        }

        log::debug!(
            "{} mesh ({size}): cells per axis {:?}",
            geometry.name(),
            &cells[..geometry.dimension()]
        );

        Self {
            geometry,
            size,
            cells,
            node_strides,
            cell_strides,
            coordinates,
            points: OnceLock::new(),
            connectivity: OnceLock::new(),
            boundary: OnceLock::new(),
        }
    }

    /// Build a mesh from a size name such as `"coarse"`.
    ///
    /// The name is checked before anything else is computed.
    pub fn from_size_name(geometry: Arc<Geometry>, size: &str) -> Result<Self, GeometryError> {
        let size = size.parse::<MeshSize>()?;
        Ok(Self::new(geometry, size))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The shared handle to the meshed geometry.
    pub fn shared_geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn size(&self) -> MeshSize {
        self.size
    }

    pub fn dimension(&self) -> usize {
        self.geometry.dimension()
    }

    /// Cell counts along each used axis.
    pub fn cells_per_axis(&self) -> Vec<usize> {
        self.cells[..self.dimension()].to_vec()
    }

    /// Cell count along `axis`; zero for an unused axis.
    pub fn axis_cells(&self, axis: Axis) -> usize {
        self.cells[axis.index()]
    }

    pub fn num_cells(&self) -> usize {
        self.geometry.axes().iter().map(|a| self.cells[a.index()]).product()
    }

    pub fn num_nodes(&self) -> usize {
        self.geometry.axes().iter().map(|a| self.cells[a.index()] + 1).product()
    }

    /// Node coordinates along `axis`, from `-l/2` to `l/2` inclusive.
    pub fn coordinates(&self, axis: Axis) -> &[f64] {
        &self.coordinates[axis.index()]
    }

    /// Distance in the node numbering between neighbours along `axis`.
    pub fn node_stride(&self, axis: Axis) -> usize {
        self.node_strides[axis.index()]
    }

    /// Index of `node` along `axis`.
    pub fn axis_index(&self, node: usize, axis: Axis) -> usize {
        let i = axis.index();
        if self.node_strides[i] == 0 {
            return 0;
        }
        (node / self.node_strides[i]) % (self.cells[i] + 1)
    }

    /// Global node number for per-axis indices `[ix, iy, iz]`.
    pub fn node_index(&self, indices: [usize; 3]) -> usize {
        self.geometry
            .axes()
            .iter()
            .map(|a| indices[a.index()] * self.node_strides[a.index()])
            .sum()
    }

    /// Position of `node`, with zero for unused axes.
    pub fn node_position(&self, node: usize) -> [f64; 3] {
        let mut p = [0.0; 3];
        for &axis in self.geometry.axes() {
            p[axis.index()] = self.coordinates[axis.index()][self.axis_index(node, axis)];
        }
        p
    }

    /// All node positions in storage order.
    pub fn points(&self) -> &[[f64; 3]] {
        self.points
            .get_or_init(|| (0..self.num_nodes()).map(|n| self.node_position(n)).collect())
    }

    pub fn cell_type(&self) -> CellType {
        CellType::for_dimension(self.dimension())
    }

    /// Flat connectivity: `corners()` node numbers per cell, cell after cell.
    pub fn connectivity(&self) -> &[usize] {
        self.connectivity.get_or_init(|| self.build_connectivity())
    }

    /// Node numbers of one cell.
    pub fn cell(&self, cell: usize) -> Option<&[usize]> {
        let corners = self.cell_type().corners();
        self.connectivity().get(cell * corners..(cell + 1) * corners)
    }

    /// Iterate over the node numbers of every cell.
    pub fn cells(&self) -> impl Iterator<Item = &[usize]> {
        self.connectivity().chunks_exact(self.cell_type().corners())
    }

    /// Cumulative connectivity length at the end of each cell.
    pub fn offsets(&self) -> Vec<usize> {
        let corners = self.cell_type().corners();
        (1..=self.num_cells()).map(|c| c * corners).collect()
    }

    /// VTK type code of each cell.
    pub fn types(&self) -> Vec<u8> {
        vec![self.cell_type().vtk_code(); self.num_cells()]
    }

    /// Faces of the bounding box that `node` lies on.
    pub fn node_faces(&self, node: usize) -> Vec<Face> {
        let position = self.node_position(node);
        let mut faces = Vec::new();
        for &axis in self.geometry.axes() {
            let Some(length) = self.geometry.length(axis) else {
                continue;
            };
            let half = 0.5 * length;
            let x = position[axis.index()];
            let tol = FACE_TOLERANCE * length;
            if (x + half).abs() <= tol {
                faces.push(Face { axis, side: Side::Lower });
            } else if (x - half).abs() <= tol {
                faces.push(Face { axis, side: Side::Upper });
            }
        }
        faces
    }

    /// Nodes lying on at least one face, in ascending order.
    pub fn boundary_nodes(&self) -> &[usize] {
        self.boundary.get_or_init(|| {
            (0..self.num_nodes())
                .filter(|&n| !self.node_faces(n).is_empty())
                .collect()
        })
    }

    /// The `2^d` corner nodes of the bounding box.
    pub fn vertex_nodes(&self) -> Vec<usize> {
        let d = self.dimension();
        self.boundary_nodes()
            .iter()
            .copied()
            .filter(|&n| self.node_faces(n).len() == d)
            .collect()
    }

    fn cell_axis_index(&self, cell: usize, axis: Axis) -> usize {
        let i = axis.index();
        (cell / self.cell_strides[i]) % self.cells[i]
    }

    fn build_connectivity(&self) -> Vec<usize> {
        let corners = corner_order(self.dimension());
        let corner_offsets: Vec<usize> = (0..1usize << corners.len())
            .map(|m| {
                corners
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| (m >> bit) & 1 == 1)
                    .map(|(_, a)| self.node_strides[a.index()])
                    .sum()
            })
            .collect();

        let mut connectivity = Vec::with_capacity(self.num_cells() * corner_offsets.len());
        for cell in 0..self.num_cells() {
            let base: usize = self
                .geometry
                .axes()
                .iter()
                .map(|&a| self.cell_axis_index(cell, a) * self.node_strides[a.index()])
                .sum();
            connectivity.extend(corner_offsets.iter().map(|o| base + o));
        }
        connectivity
    }
}

fn cells_per_axis(geometry: &Geometry, size: MeshSize) -> [usize; 3] {
    let max_cells = size.max_cells(geometry.dimension());
    let lengths = geometry.lengths();

    // First longest side wins ties.
    let longest = (0..lengths.len()).fold(0, |best, i| if lengths[i] > lengths[best] { i } else { best });
    let spacing = lengths[longest] / max_cells as f64;

    let mut cells = [0; 3];
    for (i, &length) in lengths.iter().enumerate() {
        cells[i] = if i == longest { max_cells } else { cell_count(length, spacing) };
    }
    cells
}

fn axis_coordinates(length: f64, cells: usize) -> Vec<f64> {
    let half = 0.5 * length;
    (0..=cells)
        .map(|i| {
            if i == cells {
                half
            } else {
                -half + length * i as f64 / cells as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn mesh(geometry: Geometry, size: &str) -> StructuredMesh {
        StructuredMesh::from_size_name(Arc::new(geometry), size).unwrap()
    }

    #[test]
    fn test_max_cells_table() {
        let expected = [(1, [10, 100, 1000]), (2, [10, 50, 100]), (3, [10, 20, 50])];
        for (d, counts) in expected {
            let sizes = [MeshSize::Coarse, MeshSize::Normal, MeshSize::Fine];
            for (size, n) in sizes.into_iter().zip(counts) {
                assert_eq!(size.max_cells(d), n, "d={d}, size={size}");
            }
        }
    }

    #[test]
    fn test_cell_count_rounding_and_floor() {
        assert_eq!(cell_count(1.2, 0.13), 9);
        assert_eq!(cell_count(0.1, 1.1), 1);
    }

    #[test]
    fn test_equal_sides_get_max_cells() {
        for (size, n) in [("coarse", 10), ("normal", 20), ("fine", 50)] {
            let m = mesh(Geometry::block(2.0, 2.0, 2.0).unwrap(), size);
            assert_eq!(m.cells_per_axis(), vec![n, n, n]);
        }
        let m = mesh(Geometry::rectangle(3.0, 3.0).unwrap(), "normal");
        assert_eq!(m.cells_per_axis(), vec![50, 50]);
        let m = mesh(Geometry::line(0.3).unwrap(), "fine");
        assert_eq!(m.cells_per_axis(), vec![1000]);
    }

    #[test]
    fn test_longest_axis_sets_spacing() {
        let m = mesh(Geometry::block(4.0, 2.98, 2.1).unwrap(), "coarse");
        assert_eq!(m.cells_per_axis(), vec![10, 7, 5]);
        assert_eq!(m.num_cells(), 350);
        assert_eq!(m.num_nodes(), 11 * 8 * 6);

        let m = mesh(Geometry::block(4.0, 6.0, 2.1).unwrap(), "coarse");
        assert_eq!(m.cells_per_axis(), vec![7, 10, 4]);

        let m = mesh(Geometry::block(4.0, 6.0, 9.0).unwrap(), "coarse");
        assert_eq!(m.cells_per_axis(), vec![4, 7, 10]);

        let m = mesh(Geometry::rectangle(4.0, 2.98).unwrap(), "coarse");
        assert_eq!(m.cells_per_axis(), vec![10, 7]);
        assert_eq!(m.num_cells(), 70);
    }

    #[test]
    fn test_invalid_size_name() {
        let g = Arc::new(Geometry::line(1.0).unwrap());
        let err = StructuredMesh::from_size_name(g, "medium").unwrap_err();
        assert_eq!(err, GeometryError::InvalidMeshSize("medium".into()));
        assert_eq!("  Fine ".parse::<MeshSize>(), Ok(MeshSize::Fine));
    }

    #[test]
    fn test_coordinates_are_centred() {
        let m = mesh(Geometry::rectangle(1.0, 0.2).unwrap(), "coarse");
        let x = m.coordinates(Axis::X);
        let y = m.coordinates(Axis::Y);
        assert_eq!(x.len(), 11);
        assert_eq!(y.len(), 3);
        assert_eq!(x[0], -0.5);
        assert_eq!(x[10], 0.5);
        assert_abs_diff_eq!(x[3], -0.2, epsilon = 1e-15);
        assert_eq!(y, &[-0.1, 0.0, 0.1]);
        assert!(m.coordinates(Axis::Z).is_empty());
    }

    #[test]
    fn test_2d_nodes_vary_fastest_in_x() {
        let m = mesh(Geometry::rectangle(1.0, 0.2).unwrap(), "coarse");
        let p = m.points();
        assert_eq!(p.len(), 33);
        assert_eq!(p[0], [-0.5, -0.1, 0.0]);
        assert_abs_diff_eq!(p[1][0], -0.4, epsilon = 1e-15);
        assert_eq!(p[1][1], -0.1);
        assert_eq!(p[11], [-0.5, 0.0, 0.0]);
        assert_eq!(p[32], [0.5, 0.1, 0.0]);
    }

    #[test]
    fn test_3d_nodes_vary_fastest_in_z() {
        let m = mesh(Geometry::block(1.0, 0.2, 0.1).unwrap(), "coarse");
        assert_eq!(m.cells_per_axis(), vec![10, 2, 1]);
        let p = m.points();
        assert_eq!(p[0], [-0.5, -0.1, -0.05]);
        assert_eq!(p[1], [-0.5, -0.1, 0.05]);
        assert_eq!(p[2], [-0.5, 0.0, -0.05]);
        assert_eq!(m.axis_index(6, Axis::X), 1);
        assert_eq!(m.node_index([1, 0, 0]), 6);
        assert_eq!(m.node_index([10, 2, 1]), 65);
    }

    #[test]
    fn test_3d_connectivity_fixture() {
        let m = mesh(Geometry::block(1.0, 0.2, 0.1).unwrap(), "coarse");
        let expected: [[usize; 8]; 20] = [
            [0, 1, 6, 7, 2, 3, 8, 9],
            [2, 3, 8, 9, 4, 5, 10, 11],
            [6, 7, 12, 13, 8, 9, 14, 15],
            [8, 9, 14, 15, 10, 11, 16, 17],
            [12, 13, 18, 19, 14, 15, 20, 21],
            [14, 15, 20, 21, 16, 17, 22, 23],
            [18, 19, 24, 25, 20, 21, 26, 27],
            [20, 21, 26, 27, 22, 23, 28, 29],
            [24, 25, 30, 31, 26, 27, 32, 33],
            [26, 27, 32, 33, 28, 29, 34, 35],
            [30, 31, 36, 37, 32, 33, 38, 39],
            [32, 33, 38, 39, 34, 35, 40, 41],
            [36, 37, 42, 43, 38, 39, 44, 45],
            [38, 39, 44, 45, 40, 41, 46, 47],
            [42, 43, 48, 49, 44, 45, 50, 51],
            [44, 45, 50, 51, 46, 47, 52, 53],
            [48, 49, 54, 55, 50, 51, 56, 57],
            [50, 51, 56, 57, 52, 53, 58, 59],
            [54, 55, 60, 61, 56, 57, 62, 63],
            [56, 57, 62, 63, 58, 59, 64, 65],
        ];
        assert_eq!(m.num_cells(), 20);
        for (c, cell) in m.cells().enumerate() {
            assert_eq!(cell, &expected[c], "cell {c}");
        }
        assert_eq!(m.offsets(), (1..=20).map(|c| 8 * c).collect::<Vec<_>>());
        assert_eq!(m.types(), vec![11; 20]);
    }

    #[test]
    fn test_2d_connectivity() {
        let m = mesh(Geometry::rectangle(1.0, 0.2).unwrap(), "coarse");
        assert_eq!(m.num_cells(), 20);
        assert_eq!(m.cell(0), Some(&[0, 1, 11, 12][..]));
        assert_eq!(m.cell(1), Some(&[1, 2, 12, 13][..]));
        assert_eq!(m.cell(9), Some(&[9, 10, 20, 21][..]));
        assert_eq!(m.cell(10), Some(&[11, 12, 22, 23][..]));
        assert_eq!(m.cell(19), Some(&[20, 21, 31, 32][..]));
        assert_eq!(m.cell(20), None);
        assert_eq!(m.offsets().last(), Some(&80));
        assert_eq!(m.types(), vec![8; 20]);
    }

    #[test]
    fn test_1d_connectivity() {
        let m = mesh(Geometry::line(1.0).unwrap(), "coarse");
        let expected: Vec<usize> = (0..10).flat_map(|i| [i, i + 1]).collect();
        assert_eq!(m.connectivity(), expected.as_slice());
        assert_eq!(m.offsets(), (1..=10).map(|c| 2 * c).collect::<Vec<_>>());
        assert_eq!(m.types(), vec![4; 10]);
    }

    #[test]
    fn test_boundary_and_vertex_nodes() {
        let m = mesh(Geometry::rectangle(4.0, 2.98).unwrap(), "coarse");
        // 11 x 8 nodes, 9 x 6 interior.
        assert_eq!(m.boundary_nodes().len(), 88 - 54);
        assert_eq!(m.vertex_nodes(), vec![0, 10, 77, 87]);

        let corner = m.node_faces(0);
        assert!(corner.contains(&Face { axis: Axis::X, side: Side::Lower }));
        assert!(corner.contains(&Face { axis: Axis::Y, side: Side::Lower }));
        assert!(m.node_faces(m.node_index([5, 3, 0])).is_empty());

        let block = mesh(Geometry::block(1.0, 1.0, 1.0).unwrap(), "coarse");
        assert_eq!(block.boundary_nodes().len(), 11 * 11 * 11 - 9 * 9 * 9);
        assert_eq!(block.vertex_nodes().len(), 8);

        let line = mesh(Geometry::line(2.0).unwrap(), "coarse");
        assert_eq!(line.boundary_nodes(), &[0, 10]);
    }
}
