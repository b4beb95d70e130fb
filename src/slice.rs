use crate::enums::{Attribute, ElementType, PixelRepresentation};

use ndarray::{Array2, ArrayView2};
use std::fmt;

/// Decoded pixel samples of one slice, shaped (rows, columns).
#[derive(Clone, Debug, PartialEq)]
pub enum PixelData {
    U8(Array2<u8>),
    I8(Array2<i8>),
    U16(Array2<u16>),
    I16(Array2<i16>),
    U32(Array2<u32>),
    I32(Array2<i32>),
    F32(Array2<f32>),
}

macro_rules! for_each_pixel_type {
    ($pixels:expr, $array:ident => $body:expr) => {
        match $pixels {
            PixelData::U8($array) => $body,
            PixelData::I8($array) => $body,
            PixelData::U16($array) => $body,
            PixelData::I16($array) => $body,
            PixelData::U32($array) => $body,
            PixelData::I32($array) => $body,
            PixelData::F32($array) => $body,
        }
    };
}

impl PixelData {
    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        for_each_pixel_type!(self, array => array.dim())
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            PixelData::U8(_) => ElementType::U8,
            PixelData::I8(_) => ElementType::I8,
            PixelData::U16(_) => ElementType::U16,
            PixelData::I16(_) => ElementType::I16,
            PixelData::U32(_) => ElementType::U32,
            PixelData::I32(_) => ElementType::I32,
            PixelData::F32(_) => ElementType::F32,
        }
    }

    /// Widen the samples to `f32` so calibration can be applied.
    pub fn to_f32(&self) -> Array2<f32> {
        for_each_pixel_type!(self, array => array.mapv(|v| v as f32))
    }

    fn encoding(&self) -> (u16, PixelRepresentation) {
        match self {
            PixelData::U8(_) => (8, PixelRepresentation::Unsigned),
            PixelData::I8(_) => (8, PixelRepresentation::Signed),
            PixelData::U16(_) => (16, PixelRepresentation::Unsigned),
            PixelData::I16(_) => (16, PixelRepresentation::Signed),
            PixelData::U32(_) => (32, PixelRepresentation::Unsigned),
            PixelData::I32(_) | PixelData::F32(_) => (32, PixelRepresentation::Signed),
        }
    }
}

/// Native sample types a volume can be assembled from without rescaling.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn view(pixels: &PixelData) -> Option<ArrayView2<'_, Self>>;
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn view(pixels: &PixelData) -> Option<ArrayView2<'_, Self>> {
                match pixels {
                    PixelData::$variant(array) => Some(array.view()),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(u8, U8);
impl_sample!(i8, I8);
impl_sample!(u16, U16);
impl_sample!(i16, I16);
impl_sample!(u32, U32);
impl_sample!(i32, I32);
impl_sample!(f32, F32);

/// Linear calibration `value * slope + intercept` of a slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rescale {
    pub slope: f32,
    pub intercept: f32,
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl Rescale {
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        value * self.slope + self.intercept
    }
}

/// One 2-D image of a series together with the metadata needed to place it.
///
/// `pixel_spacing` is (row spacing, column spacing) as in the PixelSpacing
/// attribute. `image_orientation` holds the row cosine followed by the
/// column cosine.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceRecord {
    pub modality: Option<String>,
    pub sop_class_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub rows: u16,
    pub columns: u16,
    pub pixel_spacing: [f64; 2],
    pub image_orientation: [f64; 6],
    pub image_position: [f64; 3],
    pub pixel_representation: PixelRepresentation,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    pub rescale_slope: Option<f64>,
    pub rescale_intercept: Option<f64>,
    pub pixel_data: PixelData,
}

impl SliceRecord {
    /// Axial slice at the origin with unit spacing. Rows, columns and the
    /// encoding attributes are taken from the pixel buffer.
    ///
    /// Rows and Columns are 16-bit attributes. Larger buffers saturate them
    /// at `u16::MAX`, so assembly rejects the slice with a shape mismatch.
    pub fn new(pixel_data: PixelData) -> Self {
        let (rows, columns) = pixel_data.dim();
        let saturate = |extent: usize| u16::try_from(extent).unwrap_or(u16::MAX);
        let (bits_allocated, pixel_representation) = pixel_data.encoding();
        Self {
            modality: None,
            sop_class_uid: None,
            series_instance_uid: None,
            rows: saturate(rows),
            columns: saturate(columns),
            pixel_spacing: [1.0, 1.0],
            image_orientation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            image_position: [0.0, 0.0, 0.0],
            pixel_representation,
            bits_allocated,
            bits_stored: bits_allocated,
            high_bit: bits_allocated - 1,
            rescale_slope: None,
            rescale_intercept: None,
            pixel_data,
        }
    }

    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.image_position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: [f64; 6]) -> Self {
        self.image_orientation = orientation;
        self
    }

    pub fn with_pixel_spacing(mut self, row_spacing: f64, column_spacing: f64) -> Self {
        self.pixel_spacing = [row_spacing, column_spacing];
        self
    }

    pub fn with_rescale(mut self, slope: f64, intercept: f64) -> Self {
        self.rescale_slope = Some(slope);
        self.rescale_intercept = Some(intercept);
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn with_sop_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.sop_class_uid = Some(uid.into());
        self
    }

    pub fn with_series_instance_uid(mut self, uid: impl Into<String>) -> Self {
        self.series_instance_uid = Some(uid.into());
        self
    }

    /// Whether either calibration attribute is present on this slice.
    pub fn requires_rescaling(&self) -> bool {
        self.rescale_slope.is_some() || self.rescale_intercept.is_some()
    }

    /// Calibration of this slice, with slope 1 and intercept 0 standing in
    /// for absent values.
    pub fn rescale(&self) -> Rescale {
        let default = Rescale::default();
        Rescale {
            slope: self.rescale_slope.map_or(default.slope, |s| s as f32),
            intercept: self.rescale_intercept.map_or(default.intercept, |i| i as f32),
        }
    }

    pub fn row_cosine(&self) -> [f64; 3] {
        let o = &self.image_orientation;
        [o[0], o[1], o[2]]
    }

    pub fn column_cosine(&self) -> [f64; 3] {
        let o = &self.image_orientation;
        [o[3], o[4], o[5]]
    }

    pub fn attribute(&self, attribute: Attribute) -> AttributeValue<'_> {
        match attribute {
            Attribute::Modality => AttributeValue::text(self.modality.as_deref()),
            Attribute::SopClassUid => AttributeValue::text(self.sop_class_uid.as_deref()),
            Attribute::SeriesInstanceUid => {
                AttributeValue::text(self.series_instance_uid.as_deref())
            }
            Attribute::Rows => AttributeValue::Number(self.rows.into()),
            Attribute::Columns => AttributeValue::Number(self.columns.into()),
            Attribute::ImageOrientationPatient => AttributeValue::Numbers(&self.image_orientation),
            Attribute::PixelSpacing => AttributeValue::Numbers(&self.pixel_spacing),
            Attribute::PixelRepresentation => {
                AttributeValue::Number(self.pixel_representation.value().into())
            }
            Attribute::BitsAllocated => AttributeValue::Number(self.bits_allocated.into()),
            Attribute::BitsStored => AttributeValue::Number(self.bits_stored.into()),
            Attribute::HighBit => AttributeValue::Number(self.high_bit.into()),
        }
    }
}

/// Borrowed value of an invariant attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttributeValue<'a> {
    Absent,
    Text(&'a str),
    Number(f64),
    Numbers(&'a [f64]),
}

impl<'a> AttributeValue<'a> {
    fn text(value: Option<&'a str>) -> Self {
        value.map_or(AttributeValue::Absent, AttributeValue::Text)
    }

    /// Compare numbers (or sequences of numbers) with an absolute tolerance.
    /// Anything else, including a number against a sequence, must match
    /// exactly. Absent equals absent.
    pub fn roughly_equal(&self, other: &AttributeValue<'_>, tolerance: f64) -> bool {
        match (self, other) {
            (AttributeValue::Number(a), AttributeValue::Number(b)) => (a - b).abs() <= tolerance,
            (AttributeValue::Numbers(a), AttributeValue::Numbers(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(a, b)| (a - b).abs() <= tolerance)
            }
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a == b,
            (AttributeValue::Absent, AttributeValue::Absent) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AttributeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Absent => f.write_str("None"),
            AttributeValue::Text(text) => write!(f, "{text:?}"),
            AttributeValue::Number(number) => write!(f, "{number}"),
            AttributeValue::Numbers(numbers) => write!(f, "{numbers:?}"),
        }
    }
}
