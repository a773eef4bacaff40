use std::{
    fs,
    path::{Path, PathBuf},
};

use dicom::object::{InMemDicomObject, OpenFileOptions};
use dicom_dictionary_std::{tags, uids};
use ndarray::{Array1, arr1};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dataset::{self, DatasetError},
    six_dof::Point3,
};

#[derive(Debug, Error)]
pub enum ImageStackError {
    #[error("No CT images found")]
    NoValidImages,

    #[error("Expected 6 image orientation values, got {0}")]
    MalformedOrientation(usize),

    #[error("Expected 2 pixel spacing values, got {0}")]
    MalformedPixelSpacing(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Image plane attributes of one slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceGeometry {
    /// Image Orientation (Patient): row direction cosines then column
    /// direction cosines.
    pub orientation: [f64; 6],
    /// Image Position (Patient) of the first transmitted pixel.
    pub position: Point3,
    /// Pixel Spacing as stored: row spacing, then column spacing.
    pub pixel_spacing: [f64; 2],
    pub rows: u16,
    pub columns: u16,
}

impl SliceGeometry {
    pub fn from_object(object: &InMemDicomObject) -> Result<Self, ImageStackError> {
        let orientation_values = dataset::floats(
            object,
            tags::IMAGE_ORIENTATION_PATIENT,
            "ImageOrientationPatient",
        )?;
        let orientation = <[f64; 6]>::try_from(orientation_values.as_slice())
            .map_err(|_| ImageStackError::MalformedOrientation(orientation_values.len()))?;
        let position = dataset::point(
            object,
            tags::IMAGE_POSITION_PATIENT,
            "ImagePositionPatient",
        )?;
        let spacing_values = dataset::floats(object, tags::PIXEL_SPACING, "PixelSpacing")?;
        let pixel_spacing = <[f64; 2]>::try_from(spacing_values.as_slice())
            .map_err(|_| ImageStackError::MalformedPixelSpacing(spacing_values.len()))?;

        Ok(Self {
            orientation,
            position,
            pixel_spacing,
            rows: Self::dimension(object, tags::ROWS, "Rows")?,
            columns: Self::dimension(object, tags::COLUMNS, "Columns")?,
        })
    }

    fn dimension(
        object: &InMemDicomObject,
        tag: dicom::core::Tag,
        name: &'static str,
    ) -> Result<u16, DatasetError> {
        dataset::element(object, tag, name)?
            .to_int::<u16>()
            .map_err(|source| DatasetError::InvalidValue { name, source })
    }

    fn row_direction(&self) -> Array1<f64> {
        arr1(&self.orientation[0..3])
    }

    fn column_direction(&self) -> Array1<f64> {
        arr1(&self.orientation[3..6])
    }

    /// Position along the stack axis, see [`stack_displacement`].
    pub fn displacement(&self) -> f64 {
        stack_displacement(&self.orientation, &self.position)
    }
}

/// Projection of the image position onto the normal of the image plane.
///
/// Sorting by this value orders axial, coronal and sagittal stacks alike,
/// whatever order the files were read in.
pub fn stack_displacement(orientation: &[f64; 6], position: &Point3) -> f64 {
    let [rx, ry, rz, cx, cy, cz] = *orientation;
    let normal = [ry * cz - rz * cy, rz * cx - rx * cz, rx * cy - ry * cx];
    normal
        .iter()
        .zip(position)
        .map(|(n, p)| n * p)
        .sum()
}

/// Geometric center of a sorted stack: the midpoint between the first pixel
/// of the first slice and the last pixel of the last slice.
///
/// Returns `None` for an empty stack.
pub fn stack_center(sorted: &[SliceGeometry]) -> Option<Point3> {
    let first = sorted.first()?;
    let last = sorted.last()?;
    let [row_spacing, column_spacing] = last.pixel_spacing;

    let column_last_pixel =
        last.row_direction() * (f64::from(last.columns) - 1.0) * column_spacing;
    let row_last_pixel = last.column_direction() * (f64::from(last.rows) - 1.0) * row_spacing;
    let last_pixel = arr1(&last.position) + column_last_pixel + row_last_pixel;
    let center = (last_pixel + arr1(&first.position)) * 0.5;

    debug!(
        first = ?first.position,
        last = ?last.position,
        row_spacing,
        column_spacing,
        rows = last.rows,
        columns = last.columns,
        "stack extent"
    );
    Some([center[0], center[1], center[2]])
}

/// A CT slice header, pixel data left out.
#[derive(Debug, Clone)]
pub struct CtSlice {
    pub path: PathBuf,
    pub header: InMemDicomObject,
    pub geometry: SliceGeometry,
}

impl CtSlice {
    pub fn new(path: impl Into<PathBuf>, header: InMemDicomObject) -> Result<Self, ImageStackError> {
        let geometry = SliceGeometry::from_object(&header)?;
        Ok(Self {
            path: path.into(),
            header,
            geometry,
        })
    }
}

/// Slices ordered by descending stack displacement.
#[derive(Debug, Clone)]
pub struct ImageStack {
    slices: Vec<CtSlice>,
}

impl ImageStack {
    pub fn new(mut slices: Vec<CtSlice>) -> Result<Self, ImageStackError> {
        if slices.is_empty() {
            return Err(ImageStackError::NoValidImages);
        }
        slices.sort_by(|a, b| {
            b.geometry
                .displacement()
                .total_cmp(&a.geometry.displacement())
        });
        Ok(Self { slices })
    }

    pub fn slices(&self) -> &[CtSlice] {
        &self.slices
    }

    pub fn first(&self) -> &CtSlice {
        &self.slices[0]
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn center(&self) -> Point3 {
        let geometry: Vec<_> = self.slices.iter().map(|slice| slice.geometry).collect();
        // never empty, see ImageStack::new
        stack_center(&geometry).unwrap_or_default()
    }
}

pub struct ImageStackLoader;

impl ImageStackLoader {
    /// Load CT headers from file paths
    ///
    /// Files are read in parallel up to the pixel data. Objects that are not
    /// CT Image Storage are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be read or a CT header lacks image
    /// plane attributes.
    pub fn load_from_file_paths(paths: &[impl AsRef<Path> + Sync]) -> Result<ImageStack, ImageStackError> {
        let slices: Vec<Option<CtSlice>> = paths
            .par_iter()
            .map(|path| Self::read_ct_header(path.as_ref()))
            .collect::<Result<_, _>>()?;

        let stack = ImageStack::new(slices.into_iter().flatten().collect())?;
        info!(
            slices = stack.len(),
            center = ?stack.center(),
            "loaded CT image stack"
        );
        Ok(stack)
    }

    /// Load CT headers from a directory containing .dcm files
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<ImageStack, ImageStackError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(ImageStackError::NoValidImages);
        }

        Self::load_from_file_paths(&paths)
    }

    fn read_ct_header(path: &Path) -> Result<Option<CtSlice>, ImageStackError> {
        let object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)?;
        let sop_class = dataset::string(&object, tags::SOP_CLASS_UID, "SOPClassUID")?;
        if sop_class != uids::CT_IMAGE_STORAGE {
            debug!(path = %path.display(), %sop_class, "skipping non CT object");
            return Ok(None);
        }
        CtSlice::new(path, object.into_inner()).map(Some)
    }
}
