//! Device-side application of the ILU(0) preconditioner.
//!
//! Factorization happens on the host first (`lithos_solver::Ilu0`); the
//! packed factors are uploaded once, and two analysis passes turn each
//! triangle's row-dependency graph into a [`LevelSchedule`]: rows grouped
//! into levels such that every row depends only on rows in earlier levels.
//! Applying the preconditioner then launches one kernel per level: rows
//! within a level solve in parallel, and levels run in dependency order.

use cudarc::driver::{CudaFunction, LaunchConfig, PushKernelArg};

use lithos_core::CsrMatrix;
use lithos_solver::{Ilu0, IluError, Preconditioner};

use crate::array::DeviceArray;
use crate::context::GpuContext;
use crate::descriptor::{DiagKind, FillMode, MatrixDescriptor, MatrixKind};
use crate::error::{device_index, Result};

/// Row-dependency levels of one triangle of the factors.
///
/// `level_ptr[l]..level_ptr[l+1]` indexes the device `rows` list for level
/// `l`. The schedule is built once per matrix and reused by every `apply`.
pub struct LevelSchedule {
    level_ptr: Vec<usize>,
    rows: DeviceArray<i32>,
}

impl LevelSchedule {
    /// Number of sequential launches one solve takes.
    pub fn levels(&self) -> usize {
        self.level_ptr.len().saturating_sub(1)
    }

    fn build(
        context: &GpuContext,
        dependencies: impl Fn(usize) -> (usize, usize),
        column_indices: &[usize],
        order: impl Iterator<Item = usize>,
        n: usize,
    ) -> Result<Self> {
        let mut level_of = vec![0usize; n];
        let mut level_count = 0usize;
        for row in order {
            let (start, end) = dependencies(row);
            let mut level = 0;
            for position in start..end {
                level = level.max(level_of[column_indices[position]] + 1);
            }
            level_of[row] = level;
            level_count = level_count.max(level + 1);
        }

        let mut level_ptr = vec![0usize; level_count + 1];
        for &level in &level_of {
            level_ptr[level + 1] += 1;
        }
        for index in 1..level_ptr.len() {
            level_ptr[index] += level_ptr[index - 1];
        }
        let mut cursor = level_ptr.clone();
        let mut ordered = vec![0i32; n];
        // rows ascend within a level, so the launch order is deterministic
        for row in 0..n {
            let slot = cursor[level_of[row]];
            ordered[slot] = device_index(row)?;
            cursor[level_of[row]] += 1;
        }

        Ok(Self {
            level_ptr,
            rows: DeviceArray::from_host(context, &ordered)?,
        })
    }
}

/// ILU(0) preconditioner applied with device triangular solves.
pub struct DeviceIlu0 {
    context: &'static GpuContext,
    n: usize,
    row_offsets: DeviceArray<i32>,
    column_indices: DeviceArray<i32>,
    factors: DeviceArray<f64>,
    diag_positions: DeviceArray<i32>,
    lower: LevelSchedule,
    upper: LevelSchedule,
    lower_descriptor: MatrixDescriptor,
    upper_descriptor: MatrixDescriptor,
    /// Device staging, resized to match the most recent `apply` input.
    rhs: DeviceArray<f64>,
    intermediate: DeviceArray<f64>,
    solution: DeviceArray<f64>,
    lower_kernel: CudaFunction,
    upper_kernel: CudaFunction,
}

impl DeviceIlu0 {
    /// Factorize on the host, then move the factors and their solve
    /// schedules to the device.
    pub fn new(matrix: &CsrMatrix) -> std::result::Result<Self, IluError> {
        let factor = Ilu0::new(matrix)?;
        Self::from_factor(&factor).map_err(|error| IluError::Backend(error.into()))
    }

    /// Upload an existing host factorization.
    pub fn from_factor(factor: &Ilu0) -> Result<Self> {
        let context = GpuContext::global()?;
        let n = factor.dim();

        let offsets = factor.row_offsets();
        let columns = factor.column_indices();
        let diagonals = factor.diag_positions();

        // lower triangle: row i depends on columns left of the diagonal
        let lower = LevelSchedule::build(
            context,
            |row| (offsets[row], diagonals[row]),
            columns,
            0..n,
            n,
        )?;
        // upper triangle: dependencies sit right of the diagonal, so rows
        // resolve bottom-up
        let upper = LevelSchedule::build(
            context,
            |row| (diagonals[row] + 1, offsets[row + 1]),
            columns,
            (0..n).rev(),
            n,
        )?;
        log::debug!(
            "solve schedules: {} lower levels, {} upper levels for n = {n}",
            lower.levels(),
            upper.levels()
        );

        let offsets_device: Vec<i32> = offsets
            .iter()
            .map(|&offset| device_index(offset))
            .collect::<Result<_>>()?;
        let columns_device: Vec<i32> = columns
            .iter()
            .map(|&column| device_index(column))
            .collect::<Result<_>>()?;
        let diagonals_device: Vec<i32> = diagonals
            .iter()
            .map(|&position| device_index(position))
            .collect::<Result<_>>()?;

        Ok(Self {
            context,
            n,
            row_offsets: DeviceArray::from_host(context, &offsets_device)?,
            column_indices: DeviceArray::from_host(context, &columns_device)?,
            factors: DeviceArray::from_host(context, factor.factors())?,
            diag_positions: DeviceArray::from_host(context, &diagonals_device)?,
            lower,
            upper,
            lower_descriptor: MatrixDescriptor::new()
                .with_kind(MatrixKind::Triangular)
                .with_fill_mode(FillMode::Lower)
                .with_diag_kind(DiagKind::Unit),
            upper_descriptor: MatrixDescriptor::new()
                .with_kind(MatrixKind::Triangular)
                .with_fill_mode(FillMode::Upper)
                .with_diag_kind(DiagKind::NonUnit),
            rhs: DeviceArray::zeroed(context, 0)?,
            intermediate: DeviceArray::zeroed(context, 0)?,
            solution: DeviceArray::zeroed(context, 0)?,
            lower_kernel: context.function("lower_solve_level")?,
            upper_kernel: context.function("upper_solve_level")?,
        })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn lower_descriptor(&self) -> &MatrixDescriptor {
        &self.lower_descriptor
    }

    pub fn upper_descriptor(&self) -> &MatrixDescriptor {
        &self.upper_descriptor
    }

    /// Lower solve schedule (unit-diagonal triangle).
    pub fn lower_schedule(&self) -> &LevelSchedule {
        &self.lower
    }

    /// Upper solve schedule.
    pub fn upper_schedule(&self) -> &LevelSchedule {
        &self.upper
    }

    /// Launch one triangle's levels in order: the lower solve reads `rhs`
    /// into `intermediate`, the upper solve reads `intermediate` into
    /// `solution`.
    fn solve_triangle(&mut self, lower: bool) -> Result<()> {
        let (kernel, schedule) = if lower {
            (&self.lower_kernel, &self.lower)
        } else {
            (&self.upper_kernel, &self.upper)
        };
        let stream = self.context.stream();
        for level in 0..schedule.levels() {
            let start = schedule.level_ptr[level];
            let end = schedule.level_ptr[level + 1];
            if start == end {
                continue;
            }
            let count = device_index(end - start)?;
            let level_rows = schedule.rows.buffer().slice(start..end);
            let mut launch = stream.launch_builder(kernel);
            launch
                .arg(&count)
                .arg(&level_rows)
                .arg(self.row_offsets.buffer())
                .arg(self.column_indices.buffer())
                .arg(self.factors.buffer())
                .arg(self.diag_positions.buffer());
            if lower {
                launch.arg(self.rhs.buffer()).arg(self.intermediate.buffer_mut());
            } else {
                launch.arg(self.intermediate.buffer()).arg(self.solution.buffer_mut());
            }
            unsafe {
                launch.launch(LaunchConfig::for_num_elems((end - start) as u32))?;
            }
        }
        stream.synchronize()?;
        Ok(())
    }

    /// `y = (L·U)⁻¹ x`: upload, solve L then U level by level, download.
    pub fn apply_device(&mut self, x: &[f64], y: &mut [f64]) -> Result<()> {
        debug_assert_eq!(x.len(), self.n);
        debug_assert_eq!(y.len(), self.n);
        if self.rhs.len() != x.len() {
            self.rhs.resize(x.len())?;
            self.intermediate.resize(x.len())?;
            self.solution.resize(x.len())?;
        }
        self.rhs.copy_from_host(0, x)?;
        self.solve_triangle(true)?;
        self.solve_triangle(false)?;
        self.solution.copy_to_host(0, y)?;
        Ok(())
    }
}

impl Preconditioner for DeviceIlu0 {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> lithos_solver::error::Result<()> {
        self.apply_device(x, y)
            .map_err(|error| IluError::Backend(error.into()))
    }
}
