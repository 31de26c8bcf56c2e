//! Height-field water surface driven by the damped 2D wave equation.
//!
//! The surface is a `rows x cols` lattice stored as flat row-major buffers.
//! Two generations of positions are kept (`prev` at `t - dt`, `curr` at `t`);
//! each step writes the next generation into `prev` and swaps the buffers.
//! Normals and tangents are re-estimated from the settled heights afterwards.
//!
//! Both passes fan out over interior rows with rayon. Boundary points are
//! never written and hold height 0 for the lifetime of the field.

use crate::error::{Result, WaveError};
use crate::grid::Grid;
use crate::params::{StencilCoefficients, WaveParams};
use glam::DVec3;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, warn};

pub struct WaveField {
    grid: Grid,
    params: WaveParams,
    coefficients: StencilCoefficients,

    // Positions at t - dt and t. x/z never change, only y.
    prev: Vec<DVec3>,
    curr: Vec<DVec3>,

    normals: Vec<DVec3>,
    tangent_x: Vec<DVec3>,

    time_since_last_step: f64,
    step_count: u64,
}

impl WaveField {
    pub fn new(params: WaveParams) -> Result<Self> {
        params.validate()?;

        if !params.is_stable() {
            warn!(
                courant = params.courant(),
                time_step = params.time_step,
                max_stable_time_step = params.max_stable_time_step(),
                "wave parameters exceed the explicit stability limit; the surface will diverge"
            );
        }

        let grid = params.grid();
        let coefficients = StencilCoefficients::from_params(&params);

        let positions: Vec<DVec3> = (0..grid.vertex_count())
            .map(|idx| {
                let (row, col) = grid.row_col(idx);
                DVec3::new(grid.x_coord(col), 0.0, grid.z_coord(row))
            })
            .collect();

        debug!(
            rows = grid.rows,
            cols = grid.cols,
            k1 = coefficients.k1,
            k2 = coefficients.k2,
            k3 = coefficients.k3,
            "created wave field"
        );

        Ok(Self {
            grid,
            params,
            coefficients,
            prev: positions.clone(),
            curr: positions,
            normals: vec![DVec3::Y; grid.vertex_count()],
            tangent_x: vec![DVec3::X; grid.vertex_count()],
            time_since_last_step: 0.0,
            step_count: 0,
        })
    }

    /// Advance the frame clock by `delta_time` seconds.
    ///
    /// One integration step runs once the accumulated time reaches the fixed
    /// simulation step; the accumulator is then cleared. Never more than one
    /// step per call. Returns whether a step ran.
    ///
    /// Negative or non-finite frame times are dropped with a warning and
    /// leave the accumulator as it was.
    pub fn update(&mut self, delta_time: f64) -> bool {
        if !delta_time.is_finite() || delta_time < 0.0 {
            warn!(delta_time, "ignoring invalid frame time");
            return false;
        }

        self.time_since_last_step += delta_time;

        if self.time_since_last_step >= self.params.time_step {
            self.step();
            self.time_since_last_step = 0.0;
            true
        } else {
            false
        }
    }

    /// One discrete integration step, ignoring the frame clock.
    pub fn step(&mut self) {
        self.integrate_heights();
        self.refresh_normals();
        self.step_count += 1;
    }

    /// Same as [`WaveField::step`] but entirely on the calling thread.
    pub fn step_serial(&mut self) {
        let cols = self.grid.cols;
        let k = self.coefficients;
        let interior = self.interior_range();

        let curr = &self.curr;
        for (offset, prev_row) in self.prev[interior.clone()].chunks_mut(cols).enumerate() {
            integrate_row(curr, prev_row, offset + 1, cols, k);
        }
        std::mem::swap(&mut self.prev, &mut self.curr);

        let two_dx = 2.0 * self.grid.dx;
        let curr = &self.curr;
        for (offset, (normal_row, tangent_row)) in self.normals[interior.clone()]
            .chunks_mut(cols)
            .zip(self.tangent_x[interior].chunks_mut(cols))
            .enumerate()
        {
            shade_row(curr, normal_row, tangent_row, offset + 1, cols, two_dx);
        }

        self.step_count += 1;
    }

    fn integrate_heights(&mut self) {
        let cols = self.grid.cols;
        let k = self.coefficients;
        let interior = self.interior_range();

        // Each task owns one row of `prev` and only reads `curr`
        let curr = &self.curr;
        self.prev[interior]
            .par_chunks_mut(cols)
            .enumerate()
            .for_each(|(offset, prev_row)| {
                integrate_row(curr, prev_row, offset + 1, cols, k);
            });

        std::mem::swap(&mut self.prev, &mut self.curr);
    }

    fn refresh_normals(&mut self) {
        let cols = self.grid.cols;
        let two_dx = 2.0 * self.grid.dx;
        let interior = self.interior_range();

        let curr = &self.curr;
        self.normals[interior.clone()]
            .par_chunks_mut(cols)
            .zip(self.tangent_x[interior].par_chunks_mut(cols))
            .enumerate()
            .for_each(|(offset, (normal_row, tangent_row))| {
                shade_row(curr, normal_row, tangent_row, offset + 1, cols, two_dx);
            });
    }

    /// Flat index range covering rows `1..rows-1`.
    fn interior_range(&self) -> std::ops::Range<usize> {
        self.grid.cols..(self.grid.rows - 1) * self.grid.cols
    }

    /// Drop a splash at `(row, col)`: `magnitude` at the centre, half of it on
    /// each orthogonal neighbour. The point must be at least two cells from
    /// every edge; anything else is a caller bug and leaves the field untouched.
    pub fn disturb(&mut self, row: usize, col: usize, magnitude: f64) -> Result<()> {
        let Grid { rows, cols, .. } = self.grid;

        if !(row > 1 && row + 2 < rows && col > 1 && col + 2 < cols) {
            return Err(WaveError::DisturbanceOutOfRange {
                row,
                col,
                rows,
                cols,
            });
        }

        let half = 0.5 * magnitude;
        let idx = self.grid.index(row, col);

        self.curr[idx].y += magnitude;
        self.curr[idx + 1].y += half;
        self.curr[idx - 1].y += half;
        self.curr[idx + cols].y += half;
        self.curr[idx - cols].y += half;

        Ok(())
    }

    /// Flatten the surface and clear the clock.
    pub fn reset(&mut self) {
        for p in self.prev.iter_mut().chain(self.curr.iter_mut()) {
            p.y = 0.0;
        }
        self.normals.fill(DVec3::Y);
        self.tangent_x.fill(DVec3::X);
        self.time_since_last_step = 0.0;
        self.step_count = 0;
    }

    pub fn position(&self, i: usize) -> DVec3 {
        self.curr[i]
    }

    pub fn normal(&self, i: usize) -> DVec3 {
        self.normals[i]
    }

    pub fn tangent_x(&self, i: usize) -> DVec3 {
        self.tangent_x[i]
    }

    pub fn height(&self, row: usize, col: usize) -> f64 {
        self.curr[self.grid.index(row, col)].y
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.curr
    }

    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    pub fn row_count(&self) -> usize {
        self.grid.rows
    }

    pub fn column_count(&self) -> usize {
        self.grid.cols
    }

    pub fn vertex_count(&self) -> usize {
        self.grid.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.grid.triangle_count()
    }

    pub fn width(&self) -> f64 {
        self.grid.width()
    }

    pub fn depth(&self) -> f64 {
        self.grid.depth()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn coefficients(&self) -> StencilCoefficients {
        self.coefficients
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn simulated_time(&self) -> f64 {
        self.step_count as f64 * self.params.time_step
    }

    pub fn time_since_last_step(&self) -> f64 {
        self.time_since_last_step
    }

    pub fn sum_squared_heights(&self) -> f64 {
        self.curr.iter().map(|p| p.y * p.y).sum()
    }

    pub fn max_abs_height(&self) -> f64 {
        self.curr.iter().map(|p| p.y.abs()).fold(0.0_f64, f64::max)
    }

    /// Energy of the discrete scheme:
    /// `|h[n+1] - h[n]|^2 + e * <A h[n+1], h[n]>` with `A` the negated
    /// 5-point Laplacian and `e` the Courant term.
    ///
    /// Between disturbances it changes by `-(damping * dt / 2) * |h[n+1] - h[n-1]|^2`
    /// per step, so it never grows while `damping >= 0`.
    pub fn discrete_energy(&self) -> f64 {
        let Grid { rows, cols, .. } = self.grid;
        let e = self.params.courant();

        let kinetic: f64 = self
            .curr
            .iter()
            .zip(&self.prev)
            .map(|(c, p)| (c.y - p.y).powi(2))
            .sum();

        let mut potential = 0.0;
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let idx = i * cols + j;
                let laplacian = 4.0 * self.curr[idx].y
                    - self.curr[idx + cols].y
                    - self.curr[idx - cols].y
                    - self.curr[idx + 1].y
                    - self.curr[idx - 1].y;
                potential += laplacian * self.prev[idx].y;
            }
        }

        kinetic + e * potential
    }

    /// Current heights as a `rows x cols` array.
    pub fn height_map(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.grid.rows, self.grid.cols), |(row, col)| {
            self.height(row, col)
        })
    }
}

/// Next-generation heights for interior row `i`, written over the `prev` row.
#[inline]
fn integrate_row(
    curr: &[DVec3],
    prev_row: &mut [DVec3],
    i: usize,
    cols: usize,
    k: StencilCoefficients,
) {
    let row_start = i * cols;
    for j in 1..cols - 1 {
        let idx = row_start + j;
        let neighbours =
            curr[idx + cols].y + curr[idx - cols].y + curr[idx + 1].y + curr[idx - 1].y;
        prev_row[j].y = k.k1 * prev_row[j].y + k.k2 * curr[idx].y + k.k3 * neighbours;
    }
}

/// Central-difference normal and x-tangent for interior row `i`.
#[inline]
fn shade_row(
    curr: &[DVec3],
    normal_row: &mut [DVec3],
    tangent_row: &mut [DVec3],
    i: usize,
    cols: usize,
    two_dx: f64,
) {
    let row_start = i * cols;
    for j in 1..cols - 1 {
        let idx = row_start + j;
        let left = curr[idx - 1].y;
        let right = curr[idx + 1].y;
        let top = curr[idx - cols].y;
        let bottom = curr[idx + cols].y;

        normal_row[j] = DVec3::new(left - right, two_dx, bottom - top).normalize();
        tangent_row[j] = DVec3::new(two_dx, right - left, 0.0).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_params(rows: usize, cols: usize) -> WaveParams {
        WaveParams::new(rows, cols, 1.0, 0.03, 4.0, 0.2)
    }

    fn boundary_heights(field: &WaveField) -> Vec<f64> {
        let grid = *field.grid();
        (0..grid.vertex_count())
            .filter(|&idx| {
                let (row, col) = grid.row_col(idx);
                grid.is_boundary(row, col)
            })
            .map(|idx| field.position(idx).y)
            .collect()
    }

    #[test]
    fn test_initial_state_is_flat() {
        let field = WaveField::new(demo_params(6, 9)).unwrap();
        assert_eq!(field.vertex_count(), 54);
        assert_eq!(field.triangle_count(), 5 * 8 * 2);
        for i in 0..field.vertex_count() {
            assert_eq!(field.position(i).y, 0.0);
            assert_eq!(field.normal(i), DVec3::Y);
            assert_eq!(field.tangent_x(i), DVec3::X);
        }
        assert_eq!(field.position(0), DVec3::new(-4.0, 0.0, 2.5));
        assert_eq!(field.position(53), DVec3::new(4.0, 0.0, -2.5));
    }

    #[test]
    fn test_rejects_degenerate_params() {
        assert!(WaveField::new(demo_params(1, 9)).is_err());
        assert!(WaveField::new(WaveParams::new(5, 5, 1.0, 0.0, 4.0, 0.2)).is_err());
    }

    #[test]
    fn test_disturb_shape() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        field.disturb(3, 4, 0.8).unwrap();

        let grid = *field.grid();
        for row in 0..8 {
            for col in 0..8 {
                let expected = match (row, col) {
                    (3, 4) => 0.8,
                    (2, 4) | (4, 4) | (3, 3) | (3, 5) => 0.4,
                    _ => 0.0,
                };
                assert_eq!(
                    field.position(grid.index(row, col)).y,
                    expected,
                    "at ({row}, {col})"
                );
            }
        }
    }

    #[test]
    fn test_disturb_accumulates() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        field.disturb(3, 3, 0.5).unwrap();
        let before = field.height(3, 4);
        field.disturb(3, 4, 0.25).unwrap();
        assert_eq!(field.height(3, 4), before + 0.25);
        assert_eq!(field.height(3, 3), 0.5 + 0.125);
    }

    #[test]
    fn test_disturb_near_edge_is_rejected() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        for &(row, col) in &[(1, 4), (4, 1), (6, 4), (4, 6), (0, 0), (7, 7), (20, 3)] {
            let err = field.disturb(row, col, 1.0).unwrap_err();
            assert!(matches!(err, WaveError::DisturbanceOutOfRange { .. }));
        }
        assert_eq!(field.max_abs_height(), 0.0);

        // Smallest valid window: rows 2..=5 on an 8x8 grid
        assert!(field.disturb(2, 2, 1.0).is_ok());
        assert!(field.disturb(5, 5, 1.0).is_ok());
    }

    #[test]
    fn test_disturb_rejected_on_tiny_grid() {
        let mut field = WaveField::new(demo_params(4, 4)).unwrap();
        assert!(field.disturb(2, 2, 1.0).is_err());
    }

    #[test]
    fn test_accumulator_waits_for_full_step() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        field.disturb(4, 4, 1.0).unwrap();
        let before = field.height_map();

        assert!(!field.update(0.01));
        assert!(!field.update(0.01));
        assert!(!field.update(0.005));
        assert_eq!(field.height_map(), before);
        assert_eq!(field.step_count(), 0);

        assert!(field.update(0.01));
        assert_eq!(field.step_count(), 1);
        assert_eq!(field.time_since_last_step(), 0.0);
        assert_ne!(field.height_map(), before);
    }

    #[test]
    fn test_single_step_per_update() {
        let mut stepped = WaveField::new(demo_params(8, 8)).unwrap();
        let mut reference = WaveField::new(demo_params(8, 8)).unwrap();
        stepped.disturb(4, 4, 1.0).unwrap();
        reference.disturb(4, 4, 1.0).unwrap();

        // Ten steps worth of time still advances only once
        assert!(stepped.update(0.3));
        reference.step();

        assert_eq!(stepped.step_count(), 1);
        assert_eq!(stepped.height_map(), reference.height_map());
        assert_eq!(stepped.time_since_last_step(), 0.0);
    }

    #[test]
    fn test_invalid_frame_times_are_ignored() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        field.disturb(4, 4, 1.0).unwrap();

        assert!(!field.update(0.02));
        assert!(!field.update(f64::NAN));
        assert!(!field.update(-10.0));
        assert!(!field.update(f64::INFINITY));
        assert_eq!(field.time_since_last_step(), 0.02);
        assert_eq!(field.step_count(), 0);

        // Valid frames keep stepping afterwards
        assert!(field.update(0.015));
        for _ in 0..100 {
            assert!(field.update(0.03));
        }
        assert_eq!(field.step_count(), 101);
        assert!(field.time_since_last_step().is_finite());
    }

    #[test]
    fn test_five_by_five_scenario() {
        let mut field = WaveField::new(demo_params(5, 5)).unwrap();
        field.disturb(2, 2, 1.0).unwrap();
        assert!(field.update(0.03));

        let k = field.coefficients();
        let expected = k.k1 * 0.0 + k.k2 * 1.0 + k.k3 * (4.0 * 0.5);
        assert!((field.height(2, 2) - expected).abs() < 1e-12);
        assert!((field.height(2, 2) - 1.9653040877367896).abs() < 1e-12);

        let expected_edge = k.k2 * 0.5 + k.k3 * 1.0;
        assert!((field.height(1, 2) - expected_edge).abs() < 1e-12);

        assert!(boundary_heights(&field).iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_boundary_stays_fixed() {
        let mut field = WaveField::new(demo_params(12, 10)).unwrap();
        for n in 0..200 {
            if n % 10 == 0 {
                field.disturb(2 + n % 7, 2 + (n / 10) % 5, 0.5).unwrap();
            }
            field.update(0.03);
        }
        assert!(field.max_abs_height() > 0.0);
        assert!(boundary_heights(&field).iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_boundary_shading_untouched() {
        let mut field = WaveField::new(demo_params(9, 9)).unwrap();
        field.disturb(2, 2, 2.0).unwrap();
        for _ in 0..20 {
            field.step();
        }
        let grid = *field.grid();
        for idx in 0..grid.vertex_count() {
            let (row, col) = grid.row_col(idx);
            if grid.is_boundary(row, col) {
                assert_eq!(field.normal(idx), DVec3::Y);
                assert_eq!(field.tangent_x(idx), DVec3::X);
            }
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let mut field = WaveField::new(demo_params(16, 16)).unwrap();
        field.disturb(7, 8, 1.5).unwrap();
        field.disturb(4, 11, -0.7).unwrap();
        for _ in 0..15 {
            field.step();
            for idx in 0..field.vertex_count() {
                assert!((field.normal(idx).length() - 1.0).abs() < 1e-12);
                assert!((field.tangent_x(idx).length() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_normal_leans_away_from_slope() {
        let mut field = WaveField::new(demo_params(9, 9)).unwrap();
        field.disturb(4, 4, 1.0).unwrap();
        field.step();

        // Surface rises towards +x on the left of the crest
        let grid = *field.grid();
        let left_of_crest = grid.index(4, 3);
        assert!(field.normal(left_of_crest).x < 0.0);
        assert!(field.tangent_x(left_of_crest).y > 0.0);
        assert!(field.normal(left_of_crest).y > 0.0);
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let mut parallel = WaveField::new(demo_params(33, 17)).unwrap();
        let mut serial = WaveField::new(demo_params(33, 17)).unwrap();
        for field in [&mut parallel, &mut serial] {
            field.disturb(10, 8, 1.0).unwrap();
            field.disturb(20, 5, -0.5).unwrap();
        }
        for _ in 0..25 {
            parallel.step();
            serial.step_serial();
        }
        assert_eq!(parallel.positions(), serial.positions());
        assert_eq!(parallel.normals(), serial.normals());
        assert_eq!(parallel.step_count(), serial.step_count());
    }

    #[test]
    fn test_flat_surface_stays_flat() {
        let mut field = WaveField::new(demo_params(10, 10)).unwrap();
        for _ in 0..50 {
            field.step();
        }
        assert_eq!(field.max_abs_height(), 0.0);
        assert_eq!(field.discrete_energy(), 0.0);
    }

    #[test]
    fn test_discrete_energy_decays() {
        let mut field = WaveField::new(demo_params(24, 24)).unwrap();
        field.disturb(11, 12, 1.0).unwrap();

        let mut energy = field.discrete_energy();
        assert!(energy > 0.0);
        for _ in 0..400 {
            field.step();
            let next = field.discrete_energy();
            assert!(next <= energy + 1e-12 * energy.max(1.0), "{next} > {energy}");
            energy = next;
        }
    }

    #[test]
    fn test_undamped_energy_is_conserved() {
        let mut field = WaveField::new(WaveParams::new(20, 20, 1.0, 0.03, 4.0, 0.0)).unwrap();
        field.disturb(9, 9, 1.0).unwrap();
        let initial = field.discrete_energy();
        for _ in 0..300 {
            field.step();
        }
        assert!((field.discrete_energy() - initial).abs() < 1e-9 * initial);
    }

    #[test]
    fn test_reset() {
        let mut field = WaveField::new(demo_params(8, 8)).unwrap();
        field.disturb(4, 4, 1.0).unwrap();
        field.update(0.02);
        field.step();
        field.reset();

        assert_eq!(field.max_abs_height(), 0.0);
        assert_eq!(field.step_count(), 0);
        assert_eq!(field.time_since_last_step(), 0.0);
        assert!(field.normals().iter().all(|&n| n == DVec3::Y));
        field.step();
        assert_eq!(field.max_abs_height(), 0.0);
    }

    #[test]
    fn test_height_map_layout() {
        let mut field = WaveField::new(demo_params(7, 9)).unwrap();
        field.disturb(2, 5, 1.0).unwrap();
        let map = field.height_map();
        assert_eq!(map.dim(), (7, 9));
        assert_eq!(map[[2, 5]], 1.0);
        assert_eq!(map[[1, 5]], 0.5);
        assert_eq!(map[[2, 6]], 0.5);
    }

    #[test]
    fn test_two_row_grid_is_inert() {
        let mut field = WaveField::new(demo_params(2, 2)).unwrap();
        assert!(field.update(1.0));
        assert_eq!(field.max_abs_height(), 0.0);
        assert_eq!(field.triangle_count(), 2);
    }
}
