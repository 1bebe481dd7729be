/// Dense row-major feature matrix: [rows, columns]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub data: Vec<f64>,
    pub shape: (usize, usize), // [rows, columns]
}

impl FeatureMatrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            data: vec![0.0; rows * columns],
            shape: (rows, columns),
        }
    }

    /// Build from row vectors. Returns `None` when the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let num_rows = rows.len();
        let num_columns = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != num_columns) {
            return None;
        }

        let mut data = Vec::with_capacity(num_rows * num_columns);
        for row in rows {
            data.extend(row);
        }

        Some(Self {
            data,
            shape: (num_rows, num_columns),
        })
    }

    pub fn rows(&self) -> usize {
        self.shape.0
    }

    pub fn columns(&self) -> usize {
        self.shape.1
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let columns = self.columns();
        &self.data[index * columns..(index + 1) * columns]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let columns = self.columns();
        &mut self.data[index * columns..(index + 1) * columns]
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.columns() + column]
    }

    /// Copy the given columns, in the given order, into a new matrix.
    /// Callers guarantee every index is below `self.columns()`.
    pub fn select_columns(&self, indices: &[usize]) -> FeatureMatrix {
        let (num_rows, _) = self.shape;
        let mut data = Vec::with_capacity(num_rows * indices.len());

        for r in 0..num_rows {
            let row = self.row(r);
            data.extend(indices.iter().map(|&c| row[c]));
        }

        FeatureMatrix {
            data,
            shape: (num_rows, indices.len()),
        }
    }
}
