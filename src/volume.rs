use crate::{
    enums::ElementType,
    error::CombineError,
    slice::{PixelData, Sample, SliceRecord},
    sorter::SliceOrder,
    validation::{GridTolerances, extract_cosines, validate_attributes, validate_orientation},
    warnings::{TracingSink, WarningSink},
};

use nalgebra::{Matrix4, Vector3, Vector4};
use ndarray::{Array2, Array3, ArrayViewMut2, Axis};
use rayon::prelude::*;

/// Assembled voxels, shaped (columns, rows, slices).
#[derive(Clone, Debug, PartialEq)]
pub enum Voxels {
    U8(Array3<u8>),
    I8(Array3<i8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    U32(Array3<u32>),
    I32(Array3<i32>),
    F32(Array3<f32>),
}

impl Voxels {
    /// Get the dimensions of the volume (columns, rows, slices)
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Voxels::U8(data) => data.dim(),
            Voxels::I8(data) => data.dim(),
            Voxels::U16(data) => data.dim(),
            Voxels::I16(data) => data.dim(),
            Voxels::U32(data) => data.dim(),
            Voxels::I32(data) => data.dim(),
            Voxels::F32(data) => data.dim(),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Voxels::U8(_) => ElementType::U8,
            Voxels::I8(_) => ElementType::I8,
            Voxels::U16(_) => ElementType::U16,
            Voxels::I16(_) => ElementType::I16,
            Voxels::U32(_) => ElementType::U32,
            Voxels::I32(_) => ElementType::I32,
            Voxels::F32(_) => ElementType::F32,
        }
    }
}

macro_rules! impl_voxels_from {
    ($ty:ty, $variant:ident) => {
        impl From<Array3<$ty>> for Voxels {
            fn from(data: Array3<$ty>) -> Self {
                Voxels::$variant(data)
            }
        }
    };
}

impl_voxels_from!(u8, U8);
impl_voxels_from!(i8, I8);
impl_voxels_from!(u16, U16);
impl_voxels_from!(i16, I16);
impl_voxels_from!(u32, U32);
impl_voxels_from!(i32, I32);
impl_voxels_from!(f32, F32);

/// Maps voxel indices (i, j, k) to patient coordinates in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine(Matrix4<f64>);

impl Affine {
    /// Build the index-to-patient transform of a series whose first slice in
    /// sorted order is `reference`.
    pub fn from_reference_slice(reference: &SliceRecord, slice_spacing: f64) -> Self {
        let (row_cosine, column_cosine, slice_cosine) =
            extract_cosines(&reference.image_orientation);
        let [row_spacing, column_spacing] = reference.pixel_spacing;

        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 1>(0, 0)
            .copy_from(&(row_cosine * column_spacing));
        matrix
            .fixed_view_mut::<3, 1>(0, 1)
            .copy_from(&(column_cosine * row_spacing));
        matrix
            .fixed_view_mut::<3, 1>(0, 2)
            .copy_from(&(slice_cosine * slice_spacing));
        matrix
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&Vector3::from(reference.image_position));

        Self(matrix)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// The first three rows of column `index`
    pub fn column(&self, index: usize) -> [f64; 3] {
        let column = self.0.column(index);
        [column[0], column[1], column[2]]
    }

    /// Patient position of voxel (0, 0, 0)
    pub fn translation(&self) -> [f64; 3] {
        self.column(3)
    }

    pub fn index_to_patient(&self, index: [f64; 3]) -> [f64; 3] {
        let point = self.0 * Vector4::new(index[0], index[1], index[2], 1.0);
        [point[0], point[1], point[2]]
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((4, 4), |(r, c)| self.0[(r, c)])
    }
}

impl From<Affine> for Matrix4<f64> {
    fn from(affine: Affine) -> Self {
        affine.0
    }
}

/// A stitched series together with its geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub voxels: Voxels,
    pub transform: Affine,
    /// Mean distance between consecutive slices
    pub slice_spacing: f64,
}

impl Volume {
    /// Get the dimensions of the volume (columns, rows, slices)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.voxels.dim()
    }

    pub fn into_parts(self) -> (Voxels, Affine) {
        (self.voxels, self.transform)
    }
}

/// Stitch slices of one series into a volume with the default tolerances,
/// reporting warnings through `tracing`.
///
/// # Errors
///
/// Returns an error if the slices don't form a single evenly spaced grid.
pub fn combine_slices(slices: &[SliceRecord]) -> Result<Volume, CombineError> {
    combine_slices_with(slices, &GridTolerances::default(), &TracingSink)
}

/// Stitch slices of one series into a volume.
///
/// The slices may come in any order. They are validated, sorted along the
/// slice normal and stacked into an array shaped (columns, rows, slices).
/// If any slice carries a rescale slope or intercept, all slices are
/// rescaled into `f32` voxels. Otherwise the native sample type is kept.
///
/// # Errors
///
/// Returns an error if the slices don't form a single evenly spaced grid or
/// their pixel buffers don't agree with their metadata.
pub fn combine_slices_with(
    slices: &[SliceRecord],
    tolerances: &GridTolerances,
    sink: &dyn WarningSink,
) -> Result<Volume, CombineError> {
    let first = slices.first().ok_or(CombineError::EmptyInput)?;

    validate_attributes(slices, tolerances)?;
    validate_orientation(&first.image_orientation, tolerances, sink)?;

    let order = SliceOrder::new(slices)?;
    let slice_spacing = order.check_spacing(tolerances, sink)?;

    let sorted = order.sorted(slices);
    let voxels = merge_pixel_data(&sorted)?;
    let transform = Affine::from_reference_slice(sorted[0], slice_spacing);

    tracing::debug!(
        slices = sorted.len(),
        slice_spacing,
        element_type = %voxels.element_type(),
        "Combined slices into volume"
    );

    Ok(Volume {
        voxels,
        transform,
        slice_spacing,
    })
}

/// Stack sorted slices into (columns, rows, slices), transposing each.
fn merge_pixel_data(sorted: &[&SliceRecord]) -> Result<Voxels, CombineError> {
    let first = sorted.first().ok_or(CombineError::EmptyInput)?;
    let expected = (usize::from(first.rows), usize::from(first.columns));
    for (index, slice) in sorted.iter().enumerate() {
        let actual = slice.pixel_data.dim();
        if actual != expected {
            return Err(CombineError::PixelShapeMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    if sorted.iter().any(|slice| slice.requires_rescaling()) {
        return Ok(Voxels::F32(merge_rescaled(sorted, expected)));
    }

    match &first.pixel_data {
        PixelData::U8(_) => merge_native::<u8>(sorted, expected),
        PixelData::I8(_) => merge_native::<i8>(sorted, expected),
        PixelData::U16(_) => merge_native::<u16>(sorted, expected),
        PixelData::I16(_) => merge_native::<i16>(sorted, expected),
        PixelData::U32(_) => merge_native::<u32>(sorted, expected),
        PixelData::I32(_) => merge_native::<i32>(sorted, expected),
        PixelData::F32(_) => merge_native::<f32>(sorted, expected),
    }
}

fn merge_native<T>(
    sorted: &[&SliceRecord],
    (rows, columns): (usize, usize),
) -> Result<Voxels, CombineError>
where
    T: Sample,
    Voxels: From<Array3<T>>,
{
    let views = sorted
        .iter()
        .enumerate()
        .map(|(index, slice)| {
            T::view(&slice.pixel_data).ok_or(CombineError::PixelTypeMismatch {
                index,
                expected: T::ELEMENT_TYPE,
                actual: slice.pixel_data.element_type(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut voxels = Array3::<T>::from_elem((columns, rows, sorted.len()), T::default());
    fill_depth_lanes(&mut voxels, |k, mut lane| lane.assign(&views[k].t()));

    Ok(voxels.into())
}

fn merge_rescaled(sorted: &[&SliceRecord], (rows, columns): (usize, usize)) -> Array3<f32> {
    let mut voxels = Array3::<f32>::zeros((columns, rows, sorted.len()));
    fill_depth_lanes(&mut voxels, |k, mut lane| {
        let slice = sorted[k];
        let rescale = slice.rescale();
        let pixels = slice.pixel_data.to_f32();
        lane.zip_mut_with(&pixels.t(), |voxel, &value| *voxel = rescale.apply(value));
    });
    voxels
}

/// Run `fill` for every depth index in parallel. Each call owns a disjoint
/// (columns, rows) lane of the destination.
fn fill_depth_lanes<T, F>(voxels: &mut Array3<T>, fill: F)
where
    T: Send + Sync,
    F: Fn(usize, ArrayViewMut2<'_, T>) + Send + Sync,
{
    voxels
        .axis_iter_mut(Axis(2))
        .into_par_iter()
        .enumerate()
        .for_each(|(k, lane)| fill(k, lane));
}
