//! # DICOM-stitch library
//!
//! This crate stitches the slices of a tomographic DICOM series into a
//! single 3D array and computes the affine transform from voxel indices to
//! patient coordinates.

//!
//! Slices can be handed in as already decoded [`SliceRecord`]s or loaded
//! from [`FileDicomObject<InMemDicomObject>`]s, file paths or a folder of
//! ".dcm" files. Before anything is stacked the slices are checked to form
//! a single evenly spaced grid:
//!  - Modality, SOP Class UID, Rows, Columns, Pixel Spacing, Image
//!    Orientation (Patient) and the pixel encoding attributes agree across
//!    slices (numbers within 0.001)
//!  - The direction cosines are perpendicular and of unit length within
//!    1e-4 (warned about above 1e-8)
//!  - The distances between consecutive slices along the slice normal
//!    deviate from their mean by less than 10% (warned about above 1e-5).
//!    Missing slices at either end of the series are not detected.
//!
//! Warnings are handed to a [`WarningSink`]. [`combine_slices`] uses
//! [`TracingSink`], which emits them as `tracing` events.
//!
//! The volume is shaped (columns, rows, slices). Its sample type is kept
//! unless a slice carries Rescale Slope or Rescale Intercept, in which case
//! every slice is rescaled into `f32`.
//!
//! # Examples
//!
//! ## Stitching decoded slices
//!
//! ```
//! # use dicom_stitch::{PixelData, SliceRecord, Voxels, combine_slices};
//! # use ndarray::array;
//! let slices = vec![
//!     SliceRecord::new(PixelData::U16(array![[1, 2], [3, 4]])).with_position([0.0, 0.0, 5.0]),
//!     SliceRecord::new(PixelData::U16(array![[5, 6], [7, 8]])).with_position([0.0, 0.0, 0.0]),
//! ];
//! let (voxels, transform) = combine_slices(&slices)
//!     .expect("slices should form a grid")
//!     .into_parts();
//! assert_eq!(voxels.dim(), (2, 2, 2));
//! assert_eq!(transform.column(2), [0.0, 0.0, 5.0]);
//! ```
//!
//! ## Reading a folder of DICOM files into a volume
//!
//! ```no_run
//! # use dicom_stitch::{TracingSink, VolumeLoader};
//! let volume = VolumeLoader::new()
//!     .load_from_directory("dicom", &TracingSink)
//!     .expect("should have loaded files from directory");
//! println!("{:?}", volume.transform.matrix());
//! ```
//!
//! [`FileDicomObject<InMemDicomObject>`]: https://docs.rs/dicom-object/latest/dicom_object/struct.FileDicomObject.html

pub mod enums;
pub mod error;
pub mod slice;
pub mod sorter;
pub mod validation;
pub mod volume;
pub mod volume_loader;
pub mod warnings;

pub use enums::{Attribute, CosineAxis, ElementType, PixelRepresentation, ToleranceKind};
pub use error::CombineError;
pub use slice::{AttributeValue, PixelData, Rescale, SliceRecord};
pub use sorter::SliceOrder;
pub use validation::GridTolerances;
pub use volume::{Affine, Volume, Voxels, combine_slices, combine_slices_with};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use warnings::{GridWarning, TracingSink, WarningLog, WarningSink};
