use std::fmt;

/// Attributes that must agree across every slice of a series, in the order
/// they are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Modality,
    SopClassUid,
    SeriesInstanceUid,
    Rows,
    Columns,
    ImageOrientationPatient,
    PixelSpacing,
    PixelRepresentation,
    BitsAllocated,
    BitsStored,
    HighBit,
}

/// How two values of an [`Attribute`] are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToleranceKind {
    /// Element-wise absolute tolerance for numeric values, exact otherwise
    Numeric,
    Exact,
    /// Present in the invariant list but never compared
    Skipped,
}

impl Attribute {
    pub const INVARIANTS: [Attribute; 11] = [
        Attribute::Modality,
        Attribute::SopClassUid,
        Attribute::SeriesInstanceUid,
        Attribute::Rows,
        Attribute::Columns,
        Attribute::ImageOrientationPatient,
        Attribute::PixelSpacing,
        Attribute::PixelRepresentation,
        Attribute::BitsAllocated,
        Attribute::BitsStored,
        Attribute::HighBit,
    ];

    pub fn tolerance(self) -> ToleranceKind {
        match self {
            // Callers may hand in series they merged themselves
            Attribute::SeriesInstanceUid => ToleranceKind::Skipped,
            Attribute::Modality | Attribute::SopClassUid => ToleranceKind::Exact,
            _ => ToleranceKind::Numeric,
        }
    }

    /// DICOM keyword of the attribute
    pub fn keyword(self) -> &'static str {
        match self {
            Attribute::Modality => "Modality",
            Attribute::SopClassUid => "SOPClassUID",
            Attribute::SeriesInstanceUid => "SeriesInstanceUID",
            Attribute::Rows => "Rows",
            Attribute::Columns => "Columns",
            Attribute::ImageOrientationPatient => "ImageOrientationPatient",
            Attribute::PixelSpacing => "PixelSpacing",
            Attribute::PixelRepresentation => "PixelRepresentation",
            Attribute::BitsAllocated => "BitsAllocated",
            Attribute::BitsStored => "BitsStored",
            Attribute::HighBit => "HighBit",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelRepresentation {
    #[default]
    Unsigned,
    Signed,
}

impl PixelRepresentation {
    /// Value of the (0028,0103) attribute
    pub fn value(self) -> u16 {
        match self {
            PixelRepresentation::Unsigned => 0,
            PixelRepresentation::Signed => 1,
        }
    }

    pub fn from_value(value: u16) -> Option<Self> {
        match value {
            0 => Some(PixelRepresentation::Unsigned),
            1 => Some(PixelRepresentation::Signed),
            _ => None,
        }
    }
}

/// Which in-plane direction cosine a check refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CosineAxis {
    Row,
    Column,
}

impl fmt::Display for CosineAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CosineAxis::Row => f.write_str("row"),
            CosineAxis::Column => f.write_str("column"),
        }
    }
}

/// Sample type of a pixel buffer or an assembled volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I8 => "i8",
            ElementType::U16 => "u16",
            ElementType::I16 => "i16",
            ElementType::U32 => "u32",
            ElementType::I32 => "i32",
            ElementType::F32 => "f32",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_uid_is_the_only_skipped_attribute() {
        let skipped: Vec<_> = Attribute::INVARIANTS
            .iter()
            .filter(|a| a.tolerance() == ToleranceKind::Skipped)
            .collect();
        assert_eq!(skipped, vec![&Attribute::SeriesInstanceUid]);
    }

    #[test]
    fn pixel_representation_round_trips_attribute_value() {
        assert_eq!(PixelRepresentation::from_value(1), Some(PixelRepresentation::Signed));
        assert_eq!(PixelRepresentation::Signed.value(), 1);
        assert_eq!(PixelRepresentation::from_value(2), None);
    }
}
