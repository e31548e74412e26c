// THEORY:
// The `Grid` is the rasterization layer of the coverage engine. Computing the
// exact union of hundreds of overlapping circular footprints is expensive and
// unnecessary for scheduling decisions, so the grid approximates every
// footprint by "painting" it onto a lattice of square pixels whose side is
// the configured precision. The area error this introduces shrinks with the
// precision and is an accepted trade-off for speed.
//
// Key architectural principles:
// 1.  **Sparse Storage**: A pixel only exists once at least one sensor covers
//     it. Untouched parts of the sensing field cost no memory, which matters
//     because fields are large and footprints are small.
// 2.  **Bounded Painting**: `add_node` never walks the whole field. It visits
//     only the bounding square around the node's footprint, clipped to the
//     field, which keeps rasterization tractable for hundreds of nodes.
// 3.  **Quantized Keys, Exact Geometry**: Pixels are keyed by integer cell
//     indices (`floor(coordinate / precision)`), but the inside-the-circle
//     test always runs on un-quantized coordinates against the node's true
//     position. Quantization is a storage optimization, not a substitute for
//     the geometric test.
// 4.  **Dumb Producer**: The grid knows nothing about regions or coverage
//     totals. Its only output is the table of painted pixels, which the
//     `RegionsConverter` consumes in a single pass.

use std::collections::HashMap;
use tracing::debug;

/// Identifier of a sensor node, assigned by the network layer.
pub type NodeId = u32;

/// A sparse pixel grid onto which circular sensor footprints are painted.
pub struct Grid {
    /// Side length of one pixel, in meters. Controls the approximation error.
    precision: f64,
    /// Horizontal extent of the sensing field, in meters.
    field_width: f64,
    /// Vertical extent of the sensing field, in meters.
    field_height: f64,
    /// Painted pixels only, keyed by quantized cell index. The value lists
    /// every node whose footprint covers the pixel, in paint order.
    pixels: HashMap<(i64, i64), Vec<NodeId>>,
}

impl Grid {
    pub fn new(field_width: f64, field_height: f64, precision: f64) -> Self {
        Self {
            precision,
            field_width,
            field_height,
            pixels: HashMap::new(),
        }
    }

    /// Quantizes a coordinate to its cell index: `floor(c / precision)`.
    fn cell_of(&self, coordinate: f64) -> i64 {
        (coordinate / self.precision).floor() as i64
    }

    /// Paints the node's circular footprint onto the grid. Covers the
    /// bounding square around the circle, clipped to the field, and paints
    /// only pixels strictly inside the radius. Calling this twice for the
    /// same node is undefined.
    pub fn add_node(&mut self, id: NodeId, pos_x: f64, pos_y: f64, coverage_radius: f64) {
        // Clip the bounding square: floor toward the field's lower bound,
        // stop at the already-quantized field extent (exclusive).
        let first_x = self.cell_of(pos_x - coverage_radius).max(0);
        let first_y = self.cell_of(pos_y - coverage_radius).max(0);
        let last_x = self
            .cell_of(pos_x + coverage_radius)
            .min(self.cell_of(self.field_width));
        let last_y = self
            .cell_of(pos_y + coverage_radius)
            .min(self.cell_of(self.field_height));

        let radius_sq = coverage_radius * coverage_radius;
        let mut painted = 0usize;
        for cell_x in first_x..last_x {
            for cell_y in first_y..last_y {
                // The geometric test uses the pixel's un-quantized lattice
                // coordinate against the node's true position, strict `<`.
                let pixel_x = cell_x as f64 * self.precision;
                let pixel_y = cell_y as f64 * self.precision;
                let dx = pixel_x - pos_x;
                let dy = pixel_y - pos_y;
                if dx * dx + dy * dy < radius_sq {
                    self.paint_pixel(cell_x, cell_y, id);
                    painted += 1;
                }
            }
        }
        debug!(node = id, painted, "added node footprint to grid");
    }

    /// Paints a pixel if untouched, otherwise annotates the new owner.
    fn paint_pixel(&mut self, cell_x: i64, cell_y: i64, id: NodeId) {
        self.pixels.entry((cell_x, cell_y)).or_default().push(id);
    }

    /// The table of painted pixels and their owners.
    pub fn pixels(&self) -> &HashMap<(i64, i64), Vec<NodeId>> {
        &self.pixels
    }

    /// The area covered by one pixel (`precision²`).
    pub fn pixel_area(&self) -> f64 {
        self.precision * self.precision
    }

    /// Total painted area, counting every touched pixel exactly once. This is
    /// the ground truth the region extractor must conserve.
    pub fn touched_area(&self) -> f64 {
        self.pixels.len() as f64 * self.pixel_area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paints_only_inside_the_circle() {
        let mut grid = Grid::new(100.0, 100.0, 1.0);
        grid.add_node(7, 50.0, 50.0, 10.0);

        for (&(cell_x, cell_y), owners) in grid.pixels() {
            let dx = cell_x as f64 - 50.0;
            let dy = cell_y as f64 - 50.0;
            assert!(dx * dx + dy * dy < 100.0);
            assert_eq!(owners, &vec![7]);
        }
        // The painted area approximates the disc area (~314 m²).
        let area = grid.touched_area();
        assert!(area > 280.0 && area < 350.0, "area was {area}");
    }

    #[test]
    fn clips_footprints_at_the_field_boundary() {
        let mut grid = Grid::new(20.0, 20.0, 1.0);
        grid.add_node(1, 0.0, 0.0, 10.0);

        assert!(!grid.pixels().is_empty());
        for &(cell_x, cell_y) in grid.pixels().keys() {
            assert!(cell_x >= 0 && cell_y >= 0);
            assert!(cell_x < 20 && cell_y < 20);
        }
    }

    #[test]
    fn coincident_nodes_share_every_pixel() {
        let mut grid = Grid::new(100.0, 100.0, 1.0);
        grid.add_node(1, 40.0, 40.0, 10.0);
        grid.add_node(2, 40.0, 40.0, 10.0);

        for owners in grid.pixels().values() {
            assert_eq!(owners, &vec![1, 2]);
        }
    }

    #[test]
    fn finer_precision_converges_to_the_disc_area() {
        let analytic = std::f64::consts::PI * 25.0;
        let mut coarse = Grid::new(50.0, 50.0, 1.0);
        coarse.add_node(1, 25.0, 25.0, 5.0);
        let mut fine = Grid::new(50.0, 50.0, 0.1);
        fine.add_node(1, 25.0, 25.0, 5.0);

        let coarse_err = (coarse.touched_area() - analytic).abs();
        let fine_err = (fine.touched_area() - analytic).abs();
        assert!(fine_err < 1.0, "fine error was {fine_err}");
        assert!(fine_err <= coarse_err);
    }
}
