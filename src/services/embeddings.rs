use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Sparse TF-IDF payload in compressed sparse row layout
#[derive(Debug, Deserialize)]
struct CsrPayload {
    shape: (usize, usize),
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

/// On-disk layout of the embedding cache
#[derive(Debug, Deserialize)]
struct EmbeddingCacheFile {
    tfidf_matrix: CsrPayload,
    bert_embeddings: Vec<Vec<f32>>,
    title_to_idx: HashMap<String, usize>,
    idx_to_title: BTreeMap<usize, String>,
}

/// Row-major sparse matrix (CSR) with precomputed row norms
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
    norms: Vec<f64>,
}

impl SparseMatrix {
    fn from_csr(payload: CsrPayload) -> AppResult<Self> {
        let (rows, cols) = payload.shape;

        if payload.indptr.len() != rows + 1 {
            return Err(AppError::EmbeddingCache(format!(
                "tfidf indptr has {} entries, expected {}",
                payload.indptr.len(),
                rows + 1
            )));
        }
        if payload.indices.len() != payload.data.len() {
            return Err(AppError::EmbeddingCache(
                "tfidf indices and data lengths differ".to_string(),
            ));
        }
        if payload.indptr.windows(2).any(|w| w[0] > w[1])
            || payload.indptr.last().copied() != Some(payload.data.len())
        {
            return Err(AppError::EmbeddingCache(
                "tfidf indptr is not a valid row pointer".to_string(),
            ));
        }
        if payload.data.iter().any(|v| !v.is_finite()) {
            return Err(AppError::EmbeddingCache(
                "tfidf data contains a non-finite value".to_string(),
            ));
        }
        if let Some(bad) = payload.indices.iter().find(|&&c| c >= cols) {
            return Err(AppError::EmbeddingCache(format!(
                "tfidf column index {} out of range for {} columns",
                bad, cols
            )));
        }

        let mut matrix = Self {
            cols,
            indptr: payload.indptr,
            indices: payload.indices,
            data: payload.data,
            norms: Vec::new(),
        };
        matrix.norms = (0..rows)
            .map(|i| matrix.row(i).1.iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect();
        if matrix.norms.iter().any(|n| !n.is_finite()) {
            return Err(AppError::EmbeddingCache(
                "tfidf row norm overflows".to_string(),
            ));
        }
        Ok(matrix)
    }

    /// Builds a sparse matrix from dense rows, dropping zeros
    pub fn from_rows(rows: &[Vec<f64>]) -> AppResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();

        for row in rows {
            if row.len() != cols {
                return Err(AppError::EmbeddingCache(
                    "tfidf rows have different lengths".to_string(),
                ));
            }
            for (col, value) in row.iter().enumerate() {
                if *value != 0.0 {
                    indices.push(col);
                    data.push(*value);
                }
            }
            indptr.push(data.len());
        }

        Self::from_csr(CsrPayload {
            shape: (rows.len(), cols),
            indptr,
            indices,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.norms.len()
    }

    fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    /// Cosine similarity between row `i` and every row
    ///
    /// Rows with zero norm have similarity 0 with everything.
    pub fn cosine_with_all(&self, i: usize) -> Vec<f64> {
        let mut query = vec![0.0; self.cols];
        let (cols, values) = self.row(i);
        for (&c, &v) in cols.iter().zip(values) {
            query[c] += v;
        }
        let query_norm = self.norms[i];

        (0..self.rows())
            .map(|j| {
                let denom = query_norm * self.norms[j];
                if denom == 0.0 {
                    return 0.0;
                }
                let (cols, values) = self.row(j);
                let dot: f64 = cols.iter().zip(values).map(|(&c, &v)| query[c] * v).sum();
                dot / denom
            })
            .collect()
    }
}

/// Row-major dense matrix with precomputed row norms
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    dim: usize,
    data: Vec<f32>,
    norms: Vec<f64>,
}

impl DenseMatrix {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> AppResult<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != dim) {
            return Err(AppError::EmbeddingCache(
                "embedding rows have different dimensions".to_string(),
            ));
        }
        if let Some(row) = rows.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(AppError::EmbeddingCache(format!(
                "embedding row {} contains a non-finite value",
                row
            )));
        }

        let norms = rows
            .iter()
            .map(|r| r.iter().map(|&v| f64::from(v) * f64::from(v)).sum::<f64>().sqrt())
            .collect();
        let data = rows.into_iter().flatten().collect();

        Ok(Self { dim, data, norms })
    }

    pub fn rows(&self) -> usize {
        self.norms.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Cosine similarity between row `i` and every row
    pub fn cosine_with_all(&self, i: usize) -> Vec<f64> {
        let query = self.row(i);
        let query_norm = self.norms[i];

        (0..self.rows())
            .map(|j| {
                let denom = query_norm * self.norms[j];
                if denom == 0.0 {
                    return 0.0;
                }
                let dot: f64 = query
                    .iter()
                    .zip(self.row(j))
                    .map(|(&a, &b)| f64::from(a) * f64::from(b))
                    .sum();
                dot / denom
            })
            .collect()
    }
}

/// Precomputed text representations of every movie
///
/// Row `i` of both matrices belongs to `index_to_title[i]`. Immutable once
/// loaded; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    title_to_index: HashMap<String, usize>,
    index_to_title: Vec<String>,
    tfidf: SparseMatrix,
    embeddings: DenseMatrix,
}

impl EmbeddingStore {
    /// Loads the embedding cache from a JSON file
    ///
    /// Blocking; call from `spawn_blocking` inside the runtime.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::EmbeddingCache(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let store = Self::from_json(&bytes)?;

        tracing::info!(
            path = %path.display(),
            movies = store.len(),
            embedding_dim = store.embeddings.dim(),
            "Loaded embedding cache"
        );

        Ok(store)
    }

    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let file: EmbeddingCacheFile = serde_json::from_slice(bytes)
            .map_err(|e| AppError::EmbeddingCache(format!("Malformed cache: {}", e)))?;

        let mut index_to_title = Vec::with_capacity(file.idx_to_title.len());
        for (expected, (idx, title)) in file.idx_to_title.into_iter().enumerate() {
            if idx != expected {
                return Err(AppError::EmbeddingCache(format!(
                    "idx_to_title is missing index {}",
                    expected
                )));
            }
            index_to_title.push(title);
        }

        for (title, &idx) in &file.title_to_idx {
            if index_to_title.get(idx) != Some(title) {
                return Err(AppError::EmbeddingCache(format!(
                    "title_to_idx maps '{}' to {}, which idx_to_title does not agree with",
                    title, idx
                )));
            }
        }

        let unreachable = index_to_title.len().saturating_sub(file.title_to_idx.len());
        if unreachable > 0 {
            tracing::warn!(
                count = unreachable,
                "Duplicate titles in embedding cache; only the last row per title is queryable"
            );
        }

        let store = Self {
            title_to_index: file.title_to_idx,
            index_to_title,
            tfidf: SparseMatrix::from_csr(file.tfidf_matrix)?,
            embeddings: DenseMatrix::from_rows(file.bert_embeddings)?,
        };
        store.check_shapes()?;
        Ok(store)
    }

    /// Builds a store from in-memory parts
    ///
    /// For repeated titles the last row wins the title lookup.
    pub fn from_parts(
        index_to_title: Vec<String>,
        tfidf: SparseMatrix,
        embeddings: DenseMatrix,
    ) -> AppResult<Self> {
        let title_to_index = index_to_title
            .iter()
            .enumerate()
            .map(|(idx, title)| (title.clone(), idx))
            .collect();

        let store = Self {
            title_to_index,
            index_to_title,
            tfidf,
            embeddings,
        };
        store.check_shapes()?;
        Ok(store)
    }

    fn check_shapes(&self) -> AppResult<()> {
        let n = self.index_to_title.len();
        if self.tfidf.rows() != n || self.embeddings.rows() != n {
            return Err(AppError::EmbeddingCache(format!(
                "row counts disagree: {} titles, {} tfidf rows, {} embedding rows",
                n,
                self.tfidf.rows(),
                self.embeddings.rows()
            )));
        }
        Ok(())
    }

    pub fn contains(&self, title: &str) -> bool {
        self.title_to_index.contains_key(title)
    }

    pub fn index_of(&self, title: &str) -> Option<usize> {
        self.title_to_index.get(title).copied()
    }

    pub fn title_at(&self, index: usize) -> Option<&str> {
        self.index_to_title.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.index_to_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_title.is_empty()
    }

    pub fn tfidf(&self) -> &SparseMatrix {
        &self.tfidf
    }

    pub fn embeddings(&self) -> &DenseMatrix {
        &self.embeddings
    }
}
