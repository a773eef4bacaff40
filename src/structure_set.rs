use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use tracing::debug;

use crate::{
    dataset::{self, DatasetError},
    six_dof::Point3,
};

/// ROI names accepted as the in-room setup isocenter.
pub const SETUP_ISOCENTER_LABELS: [&str; 3] = ["SetupIsocenter", "InitMatchIso", "InitLaserIso"];

/// Extract the point named "SetupIsocenter" (or one of the fallback labels)
/// from the structure set of the in-room CT/CBCT.
pub fn extract_setup_isocenter(structure_set: &InMemDicomObject) -> Result<Point3, DatasetError> {
    find_isocenter(structure_set, &SETUP_ISOCENTER_LABELS)
}

/// Looks up the first Structure Set ROI whose name is one of `labels` and
/// returns the first point of its contour.
///
/// Labels are matched in the order of the Structure Set ROI Sequence, not
/// the order of `labels`. When several ROI Contour items reference the ROI,
/// the last one is used.
///
/// # Errors
///
/// [`DatasetError::IsocenterNotFound`] if no ROI carries one of the labels
/// or the ROI has no contour data.
pub fn find_isocenter(
    structure_set: &InMemDicomObject,
    labels: &[impl AsRef<str>],
) -> Result<Point3, DatasetError> {
    let not_found = || DatasetError::IsocenterNotFound {
        labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
    };

    let roi_number = dataset::items(structure_set, tags::STRUCTURE_SET_ROI_SEQUENCE)
        .iter()
        .find(|roi| {
            dataset::string(roi, tags::ROI_NAME, "ROIName")
                .is_ok_and(|name| labels.iter().any(|label| label.as_ref() == name))
        })
        .map(|roi| read_roi_number(roi, tags::ROI_NUMBER, "ROINumber"))
        .transpose()?
        .ok_or_else(not_found)?;

    // several ROI contours may reference the ROI, the last one wins
    let contour = dataset::items(structure_set, tags::ROI_CONTOUR_SEQUENCE)
        .iter()
        .rev()
        .find(|item| {
            read_roi_number(item, tags::REFERENCED_ROI_NUMBER, "ReferencedROINumber")
                .is_ok_and(|number| number == roi_number)
        })
        .and_then(|item| dataset::items(item, tags::CONTOUR_SEQUENCE).first())
        .ok_or_else(not_found)?;

    let values = dataset::floats(contour, tags::CONTOUR_DATA, "ContourData")?;
    if values.is_empty() {
        return Err(not_found());
    }
    let isocenter = <[f64; 3]>::try_from(&values[..3.min(values.len())]).map_err(|_| {
        DatasetError::MalformedPoint {
            name: "ContourData",
            len: values.len(),
        }
    })?;

    debug!(roi_number, ?isocenter, "setup isocenter");
    Ok(isocenter)
}

fn read_roi_number(
    item: &InMemDicomObject,
    tag: dicom::core::Tag,
    name: &'static str,
) -> Result<i32, DatasetError> {
    dataset::element(item, tag, name)?
        .to_int::<i32>()
        .map_err(|source| DatasetError::InvalidValue { name, source })
}
