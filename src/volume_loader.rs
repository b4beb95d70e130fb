use crate::{
    enums::PixelRepresentation,
    error::CombineError,
    slice::{PixelData, SliceRecord},
    validation::GridTolerances,
    volume::{Volume, combine_slices_with},
    warnings::WarningSink,
};

use dicom::{
    core::Tag,
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Ix2, s};
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Missing attribute {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid value for attribute {0}")]
    InvalidAttribute(&'static str),

    #[error("Unsupported pixels: {bits_allocated} bits, representation {pixel_representation}")]
    UnsupportedPixelFormat {
        bits_allocated: u16,
        pixel_representation: u16,
    },

    #[error("Unexpected pixel data shape: {0}")]
    PixelShape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error(transparent)]
    Combine(#[from] CombineError),
}

type DicomObject = FileDicomObject<InMemDicomObject>;

impl SliceRecord {
    /// Read the slice attributes and the first frame of pixel data from a
    /// DICOM object. Samples are kept as stored; rescaling happens when the
    /// volume is assembled.
    pub fn from_dicom_object(dicom_object: &DicomObject) -> Result<Self, VolumeLoaderError> {
        let pixel_representation =
            get_u16(dicom_object, tags::PIXEL_REPRESENTATION, "PixelRepresentation")?;
        let pixel_representation = PixelRepresentation::from_value(pixel_representation)
            .ok_or(VolumeLoaderError::InvalidAttribute("PixelRepresentation"))?;
        let bits_allocated = get_u16(dicom_object, tags::BITS_ALLOCATED, "BitsAllocated")?;

        Ok(Self {
            modality: get_string(dicom_object, tags::MODALITY),
            sop_class_uid: get_string(dicom_object, tags::SOP_CLASS_UID),
            series_instance_uid: get_string(dicom_object, tags::SERIES_INSTANCE_UID),
            rows: get_u16(dicom_object, tags::ROWS, "Rows")?,
            columns: get_u16(dicom_object, tags::COLUMNS, "Columns")?,
            pixel_spacing: get_floats(dicom_object, tags::PIXEL_SPACING, "PixelSpacing")?,
            image_orientation: get_floats(
                dicom_object,
                tags::IMAGE_ORIENTATION_PATIENT,
                "ImageOrientationPatient",
            )?,
            image_position: get_floats(
                dicom_object,
                tags::IMAGE_POSITION_PATIENT,
                "ImagePositionPatient",
            )?,
            pixel_representation,
            bits_allocated,
            bits_stored: get_u16(dicom_object, tags::BITS_STORED, "BitsStored")?,
            high_bit: get_u16(dicom_object, tags::HIGH_BIT, "HighBit")?,
            rescale_slope: get_float(dicom_object, tags::RESCALE_SLOPE),
            rescale_intercept: get_float(dicom_object, tags::RESCALE_INTERCEPT),
            pixel_data: decode_image(dicom_object, bits_allocated, pixel_representation)?,
        })
    }
}

/// Loads DICOM files of one series and stitches them into a [`Volume`].
#[derive(Clone, Copy, Debug, Default)]
pub struct VolumeLoader {
    tolerances: GridTolerances,
}

impl VolumeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerances(mut self, tolerances: GridTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects, in any order
    /// * `sink` - Receives warnings about tolerated irregularities
    ///
    /// # Errors
    ///
    /// Returns error if an object lacks required attributes or the objects
    /// don't form a single evenly spaced grid
    pub fn load_from_dicom_objects(
        &self,
        dicom_objects: &[DicomObject],
        sink: &dyn WarningSink,
    ) -> Result<Volume, VolumeLoaderError> {
        if dicom_objects.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        let slices = dicom_objects
            .par_iter()
            .map(SliceRecord::from_dicom_object)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(combine_slices_with(&slices, &self.tolerances, sink)?)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        &self,
        paths: &[impl AsRef<Path> + Sync],
        sink: &dyn WarningSink,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        self.load_from_dicom_objects(&objects?, sink)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        &self,
        path: impl AsRef<Path>,
        sink: &dyn WarningSink,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths = dicom_paths(path.as_ref())?;
        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        self.load_from_file_paths(&paths, sink)
    }
}

fn dicom_paths(directory: &Path) -> Result<Vec<std::path::PathBuf>, std::io::Error> {
    let mut paths: Vec<_> = fs::read_dir(directory)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
        })
        .collect();
    // Directory order is platform dependent
    paths.sort();
    Ok(paths)
}

fn get_string(dicom_object: &DicomObject, tag: Tag) -> Option<String> {
    let value = dicom_object.element(tag).ok()?.to_str().ok()?;
    Some(value.trim_end_matches(['\0', ' ']).to_string())
}

fn get_u16(
    dicom_object: &DicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<u16, VolumeLoaderError> {
    dicom_object
        .element(tag)
        .map_err(|_| VolumeLoaderError::MissingAttribute(name))?
        .to_int::<u16>()
        .map_err(|_| VolumeLoaderError::InvalidAttribute(name))
}

/// Absent and empty values both read as `None`
fn get_float(dicom_object: &DicomObject, tag: Tag) -> Option<f64> {
    dicom_object.element(tag).ok()?.to_float64().ok()
}

fn get_floats<const N: usize>(
    dicom_object: &DicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<[f64; N], VolumeLoaderError> {
    dicom_object
        .element(tag)
        .map_err(|_| VolumeLoaderError::MissingAttribute(name))?
        .to_multi_float64()
        .map_err(|_| VolumeLoaderError::InvalidAttribute(name))?
        .try_into()
        .map_err(|_| VolumeLoaderError::InvalidAttribute(name))
}

fn decode_image(
    dicom_object: &DicomObject,
    bits_allocated: u16,
    pixel_representation: PixelRepresentation,
) -> Result<PixelData, VolumeLoaderError> {
    let pixel_data = dicom_object.decode_pixel_data()?;
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);

    macro_rules! first_frame {
        ($ty:ty) => {{
            let frames = pixel_data.to_ndarray_with_options::<$ty>(&options)?;
            let image: Array2<$ty> = frames
                .slice_move(s![0, .., .., 0])
                .into_dimensionality::<Ix2>()?;
            image
        }};
    }

    let pixels = match (bits_allocated, pixel_representation) {
        (8, PixelRepresentation::Unsigned) => PixelData::U8(first_frame!(u8)),
        (8, PixelRepresentation::Signed) => PixelData::I8(first_frame!(i8)),
        (16, PixelRepresentation::Unsigned) => PixelData::U16(first_frame!(u16)),
        (16, PixelRepresentation::Signed) => PixelData::I16(first_frame!(i16)),
        (32, PixelRepresentation::Unsigned) => PixelData::U32(first_frame!(u32)),
        (32, PixelRepresentation::Signed) => PixelData::I32(first_frame!(i32)),
        _ => {
            return Err(VolumeLoaderError::UnsupportedPixelFormat {
                bits_allocated,
                pixel_representation: pixel_representation.value(),
            });
        }
    };
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::WarningLog;
    use dicom::{
        core::{DataElement, PrimitiveValue, VR, dicom_value},
        object::FileMetaTableBuilder,
    };
    use ndarray::array;
    use std::path::PathBuf;

    const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

    /// 2x3 MONOCHROME2 CT slice, 16 bits unsigned, explicit VR little endian
    fn ct_object(extra: Vec<DataElement<InMemDicomObject>>) -> DicomObject {
        let mut elements = vec![
            DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(CT_IMAGE_STORAGE)),
            DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
            DataElement::new(tags::SERIES_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3.4")),
            DataElement::new(
                tags::IMAGE_POSITION_PATIENT,
                VR::DS,
                dicom_value!(F64, [-10.0, 20.0, 30.5]),
            ),
            DataElement::new(
                tags::IMAGE_ORIENTATION_PATIENT,
                VR::DS,
                dicom_value!(F64, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            ),
            DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)),
            DataElement::new(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("MONOCHROME2"),
            ),
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)),
            DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(3_u16)),
            DataElement::new(tags::PIXEL_SPACING, VR::DS, dicom_value!(F64, [0.5, 0.75])),
            DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)),
            DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(12_u16)),
            DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(11_u16)),
            DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)),
            DataElement::new(tags::PIXEL_DATA, VR::OW, dicom_value!(U16, [1, 2, 3, 4, 5, 6])),
        ];
        elements.extend(extra);

        InMemDicomObject::from_element_iter(elements)
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax("1.2.840.10008.1.2.1")
                    .media_storage_sop_class_uid(CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("1.2.3.4.1"),
            )
            .unwrap()
    }

    #[test]
    fn slice_attributes_are_read_from_object() {
        let slice = SliceRecord::from_dicom_object(&ct_object(Vec::new())).unwrap();
        assert_eq!(slice.modality.as_deref(), Some("CT"));
        assert_eq!((slice.rows, slice.columns), (2, 3));
        assert_eq!(slice.pixel_spacing, [0.5, 0.75]);
        assert_eq!(slice.image_orientation, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(slice.image_position, [-10.0, 20.0, 30.5]);
        assert_eq!((slice.bits_allocated, slice.bits_stored, slice.high_bit), (16, 12, 11));
        assert_eq!(slice.pixel_representation, PixelRepresentation::Unsigned);
        assert_eq!(slice.pixel_data, PixelData::U16(array![[1, 2, 3], [4, 5, 6]]));
    }

    #[test]
    fn empty_rescale_slope_reads_as_absent() {
        let object = ct_object(vec![DataElement::new(
            tags::RESCALE_SLOPE,
            VR::DS,
            PrimitiveValue::from(""),
        )]);
        let slice = SliceRecord::from_dicom_object(&object).unwrap();
        assert_eq!(slice.rescale_slope, None);
        assert_eq!(slice.rescale_intercept, None);
        assert!(!slice.requires_rescaling());
    }

    #[test]
    fn present_rescale_is_kept_but_not_applied() {
        let object = ct_object(vec![
            DataElement::new(tags::RESCALE_SLOPE, VR::DS, dicom_value!(F64, [2.0])),
            DataElement::new(tags::RESCALE_INTERCEPT, VR::DS, dicom_value!(F64, [-1024.0])),
        ]);
        let slice = SliceRecord::from_dicom_object(&object).unwrap();
        assert_eq!(slice.rescale_slope, Some(2.0));
        assert_eq!(slice.rescale_intercept, Some(-1024.0));
        assert_eq!(slice.pixel_data, PixelData::U16(array![[1, 2, 3], [4, 5, 6]]));
    }

    #[test]
    fn loaded_objects_are_stitched() {
        let second = ct_object(Vec::new());
        let mut first = ct_object(Vec::new());
        first.put(DataElement::new(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            dicom_value!(F64, [-10.0, 20.0, 33.0]),
        ));
        let volume = VolumeLoader::new()
            .load_from_dicom_objects(&[first, second], &WarningLog::new())
            .unwrap();
        assert_eq!(volume.dim(), (3, 2, 2));
        assert_eq!(volume.slice_spacing, 2.5);
        assert_eq!(volume.transform.translation(), [-10.0, 20.0, 30.5]);
    }

    #[test]
    fn empty_object_list_has_no_images() {
        let result = VolumeLoader::new().load_from_dicom_objects(&[], &WarningLog::new());
        assert!(matches!(result, Err(VolumeLoaderError::NoValidImages)));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let result = VolumeLoader::new().load_from_directory(
            PathBuf::from("does/not/exist"),
            &WarningLog::new(),
        );
        assert!(matches!(result, Err(VolumeLoaderError::Io(_))));
    }

    #[test]
    fn combine_errors_pass_through() {
        let err = VolumeLoaderError::from(CombineError::EmptyInput);
        assert_eq!(err.to_string(), "Must provide at least one slice");
    }
}
