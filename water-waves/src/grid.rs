/// Fixed lattice of `rows x cols` sample points, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub rows: usize, // Number of points along z
    pub cols: usize, // Number of points along x
    pub dx: f64,     // Spacing between adjacent samples (world units)
}

impl Grid {
    pub fn new(rows: usize, cols: usize, dx: f64) -> Self {
        Grid { rows, cols, dx }
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    pub fn x_coord(&self, col: usize) -> f64 {
        // Columns run along +x, centred on the origin
        let half_width = (self.cols - 1) as f64 * self.dx * 0.5;
        -half_width + col as f64 * self.dx
    }

    pub fn z_coord(&self, row: usize) -> f64 {
        // Row 0 is the far edge (+z), rows advance towards -z
        let half_depth = (self.rows - 1) as f64 * self.dx * 0.5;
        half_depth - row as f64 * self.dx
    }

    pub fn is_boundary(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0 || row == self.rows - 1 || col == self.cols - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn triangle_count(&self) -> usize {
        (self.rows - 1) * (self.cols - 1) * 2
    }

    pub fn width(&self) -> f64 {
        self.cols as f64 * self.dx
    }

    pub fn depth(&self) -> f64 {
        self.rows as f64 * self.dx
    }
}
