use na::DMatrix;

use crate::{error::ConfigError, types::Float};

/// Moving window over a reference trajectory.
///
/// The trajectory holds one sample per row. Each call to [`advance`] moves
/// the read cursor one sample forward; the cursor is never reset. Rows
/// requested past the end of the trajectory repeat its final sample.
///
/// [`advance`]: ReferenceWindow::advance
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceWindow {
    trajectory: DMatrix<Float>,
    cursor: usize,
}

impl ReferenceWindow {
    pub fn new(trajectory: DMatrix<Float>) -> Result<Self, ConfigError> {
        if trajectory.nrows() == 0 || trajectory.ncols() == 0 {
            return Err(ConfigError::EmptyTrajectory);
        }
        Ok(ReferenceWindow {
            trajectory,
            cursor: 0,
        })
    }

    pub fn trajectory(&self) -> &DMatrix<Float> {
        &self.trajectory
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of samples in the trajectory.
    pub fn len(&self) -> usize {
        self.trajectory.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components per sample.
    pub fn width(&self) -> usize {
        self.trajectory.ncols()
    }

    /// True once a window of `h` samples needs padding.
    pub fn is_exhausted(&self, h: usize) -> bool {
        self.cursor + h > self.len()
    }

    /// The h x width window at the cursor, without moving it.
    pub fn peek(&self, h: usize) -> DMatrix<Float> {
        let last = self.len() - 1;
        DMatrix::from_fn(h, self.width(), |i, j| {
            self.trajectory[((self.cursor + i).min(last), j)]
        })
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// The window at the cursor, then move the cursor by one sample.
    pub fn next_window(&mut self, h: usize) -> DMatrix<Float> {
        let window = self.peek(h);
        self.advance();
        window
    }
}
