//! File-persisted exact nearest-neighbor index.
//!
//! The whole index lives in one JSON file and is rebuilt wholesale on
//! every ingestion. Writes go through a temporary file in the target
//! directory followed by an atomic rename, so readers either see the
//! previous complete index or the new one, never a partial write.

use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{RagError, Result};
use crate::types::{IndexEntry, ScoredChunk};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Immutable in-memory index over a fixed set of entries. All vectors
/// share one dimension; queries score every entry by cosine similarity.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    /// Precomputed L2 norms, parallel to `entries`.
    norms: Vec<f32>,
}

impl VectorIndex {
    /// Validate `entries` against `dimension`, persist them to `path`
    /// and return the loaded index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if any entry's vector
    /// has the wrong width, or an IO error from the persist step.
    pub fn build(entries: Vec<IndexEntry>, dimension: usize, path: &Path) -> Result<Self> {
        for entry in &entries {
            if entry.vector.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    got: entry.vector.len(),
                });
            }
        }

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            std::fs::create_dir_all(dir)?;
        }

        let file = IndexFile {
            version: FORMAT_VERSION,
            dimension,
            entries,
        };
        let mut tmp = NamedTempFile::new_in(parent.unwrap_or_else(|| Path::new(".")))?;
        serde_json::to_writer(&mut tmp, &file)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| RagError::Io(e.error))?;

        tracing::info!(
            path = %path.display(),
            entries = file.entries.len(),
            dimension,
            "vector index persisted"
        );
        Ok(Self::from_file(file))
    }

    /// Load a previously persisted index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotFound`] when `path` does not exist
    /// and [`RagError::IndexCorrupt`] when the file fails to parse or
    /// violates its own declared dimension.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let file: IndexFile = serde_json::from_slice(&raw)
            .map_err(|e| RagError::IndexCorrupt(e.to_string()))?;

        if file.version != FORMAT_VERSION {
            return Err(RagError::IndexCorrupt(format!(
                "unsupported index version {}",
                file.version
            )));
        }
        if let Some(bad) = file.entries.iter().find(|e| e.vector.len() != file.dimension) {
            return Err(RagError::IndexCorrupt(format!(
                "entry {} has dimension {} but index declares {}",
                bad.id,
                bad.vector.len(),
                file.dimension
            )));
        }

        tracing::debug!(
            path = %path.display(),
            entries = file.entries.len(),
            "vector index opened"
        );
        Ok(Self::from_file(file))
    }

    fn from_file(file: IndexFile) -> Self {
        let norms = file
            .entries
            .iter()
            .map(|e| e.vector.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect();
        Self {
            dimension: file.dimension,
            entries: file.entries,
            norms,
        }
    }

    /// The `k` entries most similar to `vector`, best first. Ties break
    /// by insertion order, so identical inputs always rank identically.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] when `vector` does not
    /// match the index dimension.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let query_norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine(vector, query_norm, &entry.vector, self.norms[i])))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn entry(content: &str, seq: usize, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            Chunk {
                content: content.to_owned(),
                source: "doc.txt".to_owned(),
                seq,
            },
            vector,
        )
    }

    fn index_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("data").join("index.json")
    }

    #[test]
    fn build_then_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path(&dir);
        let entries = vec![
            entry("alpha", 0, vec![1.0, 0.0, 0.0]),
            entry("beta", 1, vec![0.0, 1.0, 0.0]),
        ];

        let built = VectorIndex::build(entries, 3, &path).unwrap();
        assert_eq!(built.len(), 2);

        let opened = VectorIndex::open(&path).unwrap();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened.dimension(), 3);
    }

    #[test]
    fn build_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![entry("a", 0, vec![1.0, 0.0])];
        let err = VectorIndex::build(entries, 3, &index_path(&dir)).unwrap_err();
        match err {
            RagError::DimensionMismatch { expected: 3, got: 2 } => {}
            other => panic!("expected DimensionMismatch, got {other}"),
        }
    }

    #[test]
    fn missing_index_is_not_found() {
        let err = VectorIndex::open(Path::new("/nonexistent/index.json")).unwrap_err();
        assert!(matches!(err, RagError::IndexNotFound(_)));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{\"version\":1,\"dimension\":3,\"ent").unwrap();

        let err = VectorIndex::open(&path).unwrap_err();
        assert!(matches!(err, RagError::IndexCorrupt(_)));
    }

    #[test]
    fn inconsistent_entry_dimension_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let doctored = serde_json::json!({
            "version": 1,
            "dimension": 3,
            "entries": [{
                "id": "x",
                "vector": [1.0, 2.0],
                "chunk": {"content": "c", "source": "s", "seq": 0},
            }],
        });
        std::fs::write(&path, doctored.to_string()).unwrap();

        let err = VectorIndex::open(&path).unwrap_err();
        assert!(matches!(err, RagError::IndexCorrupt(_)));
    }

    #[test]
    fn rebuild_replaces_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path(&dir);

        VectorIndex::build(vec![entry("old", 0, vec![1.0, 0.0])], 2, &path).unwrap();
        VectorIndex::build(
            vec![
                entry("new-a", 0, vec![1.0, 0.0]),
                entry("new-b", 1, vec![0.0, 1.0]),
            ],
            2,
            &path,
        )
        .unwrap();

        let opened = VectorIndex::open(&path).unwrap();
        assert_eq!(opened.len(), 2);
        let top = opened.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(top[0].chunk.content, "new-a");
    }

    #[test]
    fn failed_build_leaves_previous_index_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path(&dir);
        VectorIndex::build(vec![entry("kept", 0, vec![1.0, 0.0])], 2, &path).unwrap();

        // Wrong-width entries fail validation before anything is written.
        let err =
            VectorIndex::build(vec![entry("bad", 0, vec![1.0, 0.0, 0.0])], 2, &path).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));

        let opened = VectorIndex::open(&path).unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened.query(&[1.0, 0.0], 1).unwrap()[0].chunk.content, "kept");
    }

    #[test]
    fn stray_temp_file_does_not_affect_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path(&dir);
        VectorIndex::build(vec![entry("only", 0, vec![1.0, 0.0])], 2, &path).unwrap();

        // An interrupted write leaves a temp sibling behind; open reads
        // only the published file.
        std::fs::write(path.parent().unwrap().join(".tmpXYZ"), "half an ind").unwrap();
        let opened = VectorIndex::open(&path).unwrap();
        assert_eq!(opened.len(), 1);
    }

    #[test]
    fn query_ranks_by_cosine_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            vec![
                entry("east", 0, vec![1.0, 0.0]),
                entry("north", 1, vec![0.0, 1.0]),
                entry("northeast", 2, vec![1.0, 1.0]),
            ],
            2,
            &index_path(&dir),
        )
        .unwrap();

        let results = index.query(&[1.0, 0.1], 3).unwrap();
        assert_eq!(results[0].chunk.content, "east");
        assert_eq!(results[1].chunk.content, "northeast");
        assert_eq!(results[2].chunk.content, "north");
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            vec![
                entry("first", 0, vec![1.0, 0.0]),
                entry("second", 1, vec![2.0, 0.0]),
                entry("third", 2, vec![0.5, 0.0]),
            ],
            2,
            &index_path(&dir),
        )
        .unwrap();

        // All three are colinear with the query, so every score ties.
        let results = index.query(&[3.0, 0.0], 3).unwrap();
        assert_eq!(results[0].chunk.content, "first");
        assert_eq!(results[1].chunk.content, "second");
        assert_eq!(results[2].chunk.content, "third");
    }

    #[test]
    fn k_larger_than_index_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            vec![entry("only", 0, vec![1.0, 0.0])],
            2,
            &index_path(&dir),
        )
        .unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 1);
    }

    #[test]
    fn top_k_is_a_prefix_of_top_k_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let vectors = [
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.5, 0.5],
            vec![0.7, 0.3],
        ];
        let entries = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| entry(&format!("c{i}"), i, v.clone()))
            .collect();
        let index = VectorIndex::build(entries, 2, &index_path(&dir)).unwrap();

        let query = [0.6, 0.4];
        for k in 1..4 {
            let small: Vec<String> = index
                .query(&query, k)
                .unwrap()
                .into_iter()
                .map(|s| s.chunk.content)
                .collect();
            let large: Vec<String> = index
                .query(&query, k + 1)
                .unwrap()
                .into_iter()
                .take(k)
                .map(|s| s.chunk.content)
                .collect();
            assert_eq!(small, large);
        }
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            vec![entry("a", 0, vec![1.0, 0.0, 0.0])],
            3,
            &index_path(&dir),
        )
        .unwrap();
        let err = index.query(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch { expected: 3, got: 2 }
        ));
    }

    #[test]
    fn empty_index_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(Vec::new(), 4, &index_path(&dir)).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&[0.0; 4], 5).unwrap().is_empty());
    }

    #[test]
    fn zero_vector_scores_zero_instead_of_nan() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            vec![entry("zero", 0, vec![0.0, 0.0])],
            2,
            &index_path(&dir),
        )
        .unwrap();
        let results = index.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].score, 0.0);
    }
}
