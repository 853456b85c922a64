use std::fs::{File, OpenOptions};
use std::io::Write;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, info};

use super::error::GraphError;
use super::page::PageGraph;

/// Alignment `rkyv` expects at the start of an archive.
pub const RKYV_ALIGNMENT: usize = 16;

/// A collection of page graphs persisted together in a single file.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct GraphBundle {
    pub pages: Vec<PageGraph>,
}

impl GraphBundle {
    pub fn new(pages: Vec<PageGraph>) -> Self {
        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Validates every page; the first malformed page fails the whole bundle.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.pages.iter().try_for_each(PageGraph::validate)
    }

    /// Writes the bundle as a single `rkyv` archive.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        self.validate()?;

        let bytes = rkyv::to_bytes::<RkyvError>(self)
            .map_err(|e| GraphError::InvalidArchive(e.to_string()))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&bytes)?;
        file.flush()?;

        debug!(
            path = %path.display(),
            pages = self.len(),
            bytes = bytes.len(),
            "Graph bundle written"
        );
        Ok(())
    }

    /// Maps the bundle read-only, validates the archive and every page, and
    /// deserializes it into plain page graphs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        if file.metadata()?.len() == 0 {
            return Err(GraphError::EmptyBundle {
                path: path.to_path_buf(),
            });
        }

        // SAFETY: the mapping is read-only and dropped before returning; the
        // caller must not truncate the file concurrently.
        let mmap = unsafe { Mmap::map(&file)? };
        let data: &[u8] = mmap.deref();

        if !(data.as_ptr() as usize).is_multiple_of(RKYV_ALIGNMENT) {
            return Err(GraphError::Misaligned {
                alignment: RKYV_ALIGNMENT,
            });
        }

        let bundle = rkyv::from_bytes::<GraphBundle, RkyvError>(data)
            .map_err(|e| GraphError::InvalidArchive(e.to_string()))?;

        if bundle.is_empty() {
            return Err(GraphError::EmptyBundle {
                path: path.to_path_buf(),
            });
        }
        bundle.validate()?;

        info!(
            path = %path.display(),
            pages = bundle.len(),
            "Graph bundle loaded"
        );
        Ok(bundle)
    }

    /// Splits into a leading training part and a trailing validation part.
    ///
    /// The first `floor(ratio * len)` pages go to training, in stored order.
    pub fn split(self, ratio: f32) -> (Vec<PageGraph>, Vec<PageGraph>) {
        let ratio = ratio.clamp(0.0, 1.0);
        let last_train = ((self.pages.len() as f64) * ratio as f64).floor() as usize;

        let mut train = self.pages;
        let val = train.split_off(last_train.min(train.len()));
        (train, val)
    }
}

impl From<Vec<PageGraph>> for GraphBundle {
    fn from(pages: Vec<PageGraph>) -> Self {
        Self::new(pages)
    }
}
