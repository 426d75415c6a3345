//! MNIST IDX file loading
//!
//! Reads the standard IDX format: a big-endian magic number, big-endian
//! dimension sizes, then raw `u8` payload. Images come back as `[1, 28, 28]`
//! tensors with pixels scaled to `[0, 1]`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::DataError;
use crate::tensor::Tensor;

/// Image height in pixels.
pub const IMG_H: usize = 28;
/// Image width in pixels.
pub const IMG_W: usize = 28;
/// Flattened input size seen by the first layer.
pub const NUM_INPUTS: usize = IMG_H * IMG_W;
/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

const IMAGE_MAGIC: u32 = 0x0000_0803;
const LABEL_MAGIC: u32 = 0x0000_0801;

/// A labelled image set; `images.len() == labels.len()` always holds.
#[derive(Debug)]
pub struct Dataset {
    pub images: Vec<Tensor>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn read_be_u32(reader: &mut impl Read, path: &Path) -> Result<u32, DataError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| DataError::Truncated {
            path: path.to_path_buf(),
        })?;
    Ok(u32::from_be_bytes(buf))
}

/// Load an IDX image file into one tensor per image.
///
/// Pixels are scaled from `[0, 255]` to `[0.0, 1.0]`; every tensor has shape
/// `[1, 28, 28]` (single channel, ready for the convolution layer).
pub fn load_images<P: AsRef<Path>>(path: P) -> Result<Vec<Tensor>, DataError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let magic = read_be_u32(&mut file, path)?;
    if magic != IMAGE_MAGIC {
        return Err(DataError::BadMagic {
            path: path.to_path_buf(),
            expected: IMAGE_MAGIC,
            got: magic,
        });
    }

    let count = read_be_u32(&mut file, path)? as usize;
    let rows = read_be_u32(&mut file, path)? as usize;
    let cols = read_be_u32(&mut file, path)? as usize;
    if rows != IMG_H || cols != IMG_W {
        return Err(DataError::UnexpectedShape {
            path: path.to_path_buf(),
            rows,
            cols,
        });
    }

    let mut raw = vec![0u8; count * rows * cols];
    file.read_exact(&mut raw).map_err(|_| DataError::Truncated {
        path: path.to_path_buf(),
    })?;

    let mut images = Vec::with_capacity(count);
    for chunk in raw.chunks_exact(rows * cols) {
        let pixels: Vec<f32> = chunk.iter().map(|&p| p as f32 / 255.0).collect();
        images.push(Tensor::from_vec(pixels, &[1, IMG_H, IMG_W]));
    }
    Ok(images)
}

/// Load an IDX label file; every label is checked against `[0, 10)`.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, DataError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let magic = read_be_u32(&mut file, path)?;
    if magic != LABEL_MAGIC {
        return Err(DataError::BadMagic {
            path: path.to_path_buf(),
            expected: LABEL_MAGIC,
            got: magic,
        });
    }

    let count = read_be_u32(&mut file, path)? as usize;
    let mut labels = vec![0u8; count];
    file.read_exact(&mut labels)
        .map_err(|_| DataError::Truncated {
            path: path.to_path_buf(),
        })?;

    for &label in &labels {
        if label as usize >= NUM_CLASSES {
            return Err(DataError::InvalidLabel { label });
        }
    }
    Ok(labels)
}

/// Load a matched image/label pair into a [`Dataset`].
pub fn load_dataset<P: AsRef<Path>>(
    image_path: P,
    label_path: P,
) -> Result<Dataset, DataError> {
    let images = load_images(image_path)?;
    let labels = load_labels(label_path)?;
    if images.len() != labels.len() {
        return Err(DataError::CountMismatch {
            images: images.len(),
            labels: labels.len(),
        });
    }
    Ok(Dataset { images, labels })
}
