use crate::correlation::{r_squared, PairwiseResult};
use crate::variant::VariantRecord;
use crate::window::{Window, WindowPolicy};

/// Identity of a matrix row/column
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixVariant {
    pub chrom: String,
    pub pos: u64,
    pub id: Option<String>,
}

/// Square r² matrix over every admitted record.
///
/// Cells live in a lower-triangular store (`i >= j`); the matrix is symmetric.
/// Pairs are only computed within a chromosome, through an unbounded
/// [`Window`] that a chromosome change clears; cells across chromosomes stay
/// `NA`.
pub struct LdMatrix {
    variants: Vec<MatrixVariant>,
    cells: Vec<Option<f64>>,
    window: Window,
}

impl Default for LdMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl LdMatrix {
    pub fn new() -> Self {
        LdMatrix {
            variants: Vec::new(),
            cells: Vec::new(),
            window: Window::new(WindowPolicy::Unbounded),
        }
    }

    fn offset(row: usize, col: usize) -> usize {
        let (i, j) = if row >= col { (row, col) } else { (col, row) };
        i * (i + 1) / 2 + j
    }

    /// Add the next record in arrival order, computing its row against every
    /// earlier record on the same chromosome
    pub fn push(&mut self, record: VariantRecord) {
        let row = self.variants.len();
        self.variants.push(MatrixVariant {
            chrom: record.chrom.clone(),
            pos: record.pos,
            id: record.id.clone(),
        });
        self.cells.resize(Self::offset(row, row) + 1, None);
        self.cells[Self::offset(row, row)] = r_squared(&record.dosages, &record.dosages);

        self.window.admit(record);
        let Some(newest) = self.window.newest() else {
            return;
        };
        // The window holds every row of this chromosome, the newest last
        let chrom_start = row + 1 - self.window.len();
        for (offset, candidate) in self.window.candidates_for(newest).enumerate() {
            let pair = PairwiseResult::compute(candidate, newest);
            self.cells[Self::offset(row, chrom_start + offset)] = pair.r2;
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variants(&self) -> &[MatrixVariant] {
        &self.variants
    }

    /// r² between rows `i` and `j`; `None` when undefined or across chromosomes
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.cells.get(Self::offset(i, j)).copied().flatten()
    }

    /// Every defined-or-not pair `(i, j)` with `i < j` on one chromosome,
    /// sorted by first then second index
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        (0..self.len()).flat_map(move |i| {
            ((i + 1)..self.len())
                .filter(move |&j| self.variants[i].chrom == self.variants[j].chrom)
                .map(move |j| (i, j, self.get(i, j)))
        })
    }
}
