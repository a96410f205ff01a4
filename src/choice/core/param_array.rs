//! Parameter arrays — slot-indexed bindings consumed by the estimator.
//!
//! A [`ParamArray`] is the compiled form of one term list: a 1D array indexed
//! by variable slot (CA terms, logsums) or a 2D array indexed by variable slot
//! and alternative/edge slot (CO and allocation terms). Each cell optionally
//! holds a [`ParamBinding`], i.e. a registry parameter and the multiplier it
//! is scaled by.
//!
//! Notes
//! -----
//! - The shape is fixed at construction; [`ParamArray::bind`] only writes
//!   cells and reports whether an existing binding was replaced.
//! - [`ParamArray::coefficients`] evaluates `value * multiplier` for each cell
//!   against a registry, with `0.0` for empty cells.
use crate::choice::{
    core::params::{ParameterId, ParameterRegistry},
    errors::ParamResult,
};
use ndarray::{Array1, Array2, ArrayD, IxDyn};

/// One populated cell: a parameter and the multiplier applied to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamBinding {
    pub param: ParameterId,
    pub multiplier: f64,
}

/// Cell storage of a parameter array.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamCells {
    Vector(Array1<Option<ParamBinding>>),
    Matrix(Array2<Option<ParamBinding>>),
}

/// Slot-indexed parameter bindings for one aspect.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamArray {
    cells: ParamCells,
    /// Row labels in slot order (variables, or nest names for logsums).
    variables: Vec<String>,
}

impl ParamArray {
    /// Empty 1D array with one cell per label.
    pub fn vector(variables: Vec<String>) -> ParamArray {
        let cells = ParamCells::Vector(Array1::from_elem(variables.len(), None));
        ParamArray { cells, variables }
    }

    /// Empty 2D array of `variables.len() x n_cols` cells.
    pub fn matrix(variables: Vec<String>, n_cols: usize) -> ParamArray {
        let cells = ParamCells::Matrix(Array2::from_elem((variables.len(), n_cols), None));
        ParamArray { cells, variables }
    }

    pub fn shape(&self) -> &[usize] {
        match &self.cells {
            ParamCells::Vector(cells) => cells.shape(),
            ParamCells::Matrix(cells) => cells.shape(),
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn cells(&self) -> &ParamCells {
        &self.cells
    }

    /// Binding at `(row, col)`; `col` is ignored for 1D arrays.
    ///
    /// Panics if the index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<ParamBinding> {
        match &self.cells {
            ParamCells::Vector(cells) => cells[row],
            ParamCells::Matrix(cells) => cells[[row, col]],
        }
    }

    /// Write `binding` at `(row, col)`, returning the binding it replaced.
    ///
    /// Panics if the index is out of bounds.
    pub fn bind(&mut self, row: usize, col: usize, binding: ParamBinding) -> Option<ParamBinding> {
        let cell = match &mut self.cells {
            ParamCells::Vector(cells) => &mut cells[row],
            ParamCells::Matrix(cells) => &mut cells[[row, col]],
        };
        cell.replace(binding)
    }

    /// Number of populated cells.
    pub fn n_bound(&self) -> usize {
        match &self.cells {
            ParamCells::Vector(cells) => cells.iter().flatten().count(),
            ParamCells::Matrix(cells) => cells.iter().flatten().count(),
        }
    }

    /// `value * multiplier` per cell, `0.0` where unbound.
    pub fn coefficients(&self, registry: &ParameterRegistry) -> ParamResult<ArrayD<f64>> {
        let mut out = ArrayD::zeros(IxDyn(self.shape()));
        let cells: Box<dyn Iterator<Item = &Option<ParamBinding>>> = match &self.cells {
            ParamCells::Vector(cells) => Box::new(cells.iter()),
            ParamCells::Matrix(cells) => Box::new(cells.iter()),
        };
        for (slot, cell) in out.iter_mut().zip(cells) {
            if let Some(binding) = cell {
                *slot = registry.value(binding.param)? * binding.multiplier;
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for ParamArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let render = |cell: &Option<ParamBinding>| match cell {
            Some(b) if b.multiplier == 1.0 => format!("{}", b.param),
            Some(b) => format!("{}*{}", b.param, b.multiplier),
            None => "-".to_string(),
        };
        match &self.cells {
            ParamCells::Vector(cells) => {
                for (name, cell) in self.variables.iter().zip(cells.iter()) {
                    writeln!(f, "{name}: {}", render(cell))?;
                }
            }
            ParamCells::Matrix(cells) => {
                for (name, row) in self.variables.iter().zip(cells.rows()) {
                    let row = row.iter().map(render).collect::<Vec<_>>().join(" ");
                    writeln!(f, "{name}: {row}")?;
                }
            }
        }
        Ok(())
    }
}
