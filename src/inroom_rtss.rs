//! RT Structure Set describing the setup isocenter of an in-room CT/CBCT.
//!
//! Positioning systems that follow IHE-RO IFSSEQ0099 expect the in-room
//! volume to come with a structure set holding an `InitMatchIso` and a
//! `SetupIsocenter` point. Both are placed at the geometric center of the
//! image stack.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use dicom::{
    core::{Tag, VR},
    object::{InMemDicomObject, meta::FileMetaTableBuilder},
};
use dicom_dictionary_std::{tags, uids};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dataset::{self, DatasetError, decimals, object, sequence, text},
    image_stack::ImageStack,
    plan,
    six_dof::Point3,
};

/// Attributes copied verbatim from the CT when present.
const PATIENT_AND_STUDY: [(Tag, &str); 14] = [
    (tags::STUDY_DATE, "StudyDate"),
    (tags::STUDY_TIME, "StudyTime"),
    (tags::ACCESSION_NUMBER, "AccessionNumber"),
    (tags::MANUFACTURER, "Manufacturer"),
    (tags::INSTITUTION_NAME, "InstitutionName"),
    (tags::INSTITUTION_ADDRESS, "InstitutionAddress"),
    (tags::REFERRING_PHYSICIAN_NAME, "ReferringPhysicianName"),
    (tags::OPERATORS_NAME, "OperatorsName"),
    (tags::PATIENT_NAME, "PatientName"),
    (tags::PATIENT_ID, "PatientID"),
    (tags::PATIENT_BIRTH_DATE, "PatientBirthDate"),
    (tags::PATIENT_SEX, "PatientSex"),
    (tags::STUDY_INSTANCE_UID, "StudyInstanceUID"),
    (tags::STUDY_ID, "StudyID"),
];

/// ROI number, ROI name and RT ROI Interpreted Type of the two points.
pub const ISOCENTER_ROIS: [(u32, &str, &str); 2] = [
    (1, "InitMatchIso", "INITMATCHISO"),
    (2, "SetupIsocenter", "SETUPISOCENTER"),
];

#[derive(Debug, Error)]
pub enum InRoomRtssError {
    #[error("Referenced RT SS in plan: {plan} doesn't match RT SS UID: {structure_set}")]
    ReferenceMismatch { plan: String, structure_set: String },

    #[error("Could not build file meta group: {0}")]
    Meta(String),

    #[error("DICOM write error: {0}")]
    Write(#[from] dicom::object::WriteError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// New UID under the UUID derived root `2.25`.
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Check that the plan was made on the given reference structure set.
pub fn verify_plan_reference(
    plan: &InMemDicomObject,
    reference_structure_set: &InMemDicomObject,
) -> Result<(), InRoomRtssError> {
    let plan_reference = plan::referenced_structure_set_uid(plan)?;
    let structure_set_uid =
        dataset::string(reference_structure_set, tags::SOP_INSTANCE_UID, "SOPInstanceUID")?;
    if plan_reference != structure_set_uid {
        return Err(InRoomRtssError::ReferenceMismatch {
            plan: plan_reference,
            structure_set: structure_set_uid,
        });
    }
    Ok(())
}

fn copy_patient_and_study(ct: &InMemDicomObject, rtss: &mut InMemDicomObject) {
    for (tag, name) in PATIENT_AND_STUDY {
        match ct.element(tag) {
            Ok(element) => {
                rtss.put(element.clone());
            }
            Err(_) => debug!(name, "not found in CT"),
        }
    }
}

fn ds(value: f64) -> String {
    let formatted = format!("{value:.6}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn referenced_frame_of_reference(stack: &ImageStack) -> Result<InMemDicomObject, DatasetError> {
    let first = &stack.first().header;
    let contour_images = stack
        .slices()
        .iter()
        .map(|slice| {
            Ok(object([
                text(
                    tags::REFERENCED_SOP_CLASS_UID,
                    VR::UI,
                    &dataset::string(&slice.header, tags::SOP_CLASS_UID, "SOPClassUID")?,
                ),
                text(
                    tags::REFERENCED_SOP_INSTANCE_UID,
                    VR::UI,
                    &dataset::string(&slice.header, tags::SOP_INSTANCE_UID, "SOPInstanceUID")?,
                ),
            ]))
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;

    let series = object([
        text(
            tags::SERIES_INSTANCE_UID,
            VR::UI,
            &dataset::string(first, tags::SERIES_INSTANCE_UID, "SeriesInstanceUID")?,
        ),
        sequence(tags::CONTOUR_IMAGE_SEQUENCE, contour_images),
    ]);
    let study = object([
        text(
            tags::REFERENCED_SOP_CLASS_UID,
            VR::UI,
            &dataset::string(first, tags::SOP_CLASS_UID, "SOPClassUID")?,
        ),
        text(
            tags::REFERENCED_SOP_INSTANCE_UID,
            VR::UI,
            &dataset::string(first, tags::STUDY_INSTANCE_UID, "StudyInstanceUID")?,
        ),
        sequence(tags::RT_REFERENCED_SERIES_SEQUENCE, vec![series]),
    ]);
    Ok(object([
        text(
            tags::FRAME_OF_REFERENCE_UID,
            VR::UI,
            &dataset::string(first, tags::FRAME_OF_REFERENCE_UID, "FrameOfReferenceUID")?,
        ),
        sequence(tags::RT_REFERENCED_STUDY_SEQUENCE, vec![study]),
    ]))
}

/// Build the in-room structure set for a sorted CT stack.
///
/// Patient and study attributes come from the first slice. Both isocenter
/// points are placed at `center`, usually [`ImageStack::center`].
///
/// # Errors
///
/// Returns error if the first slice lacks the frame of reference, study or
/// series UIDs, or any slice lacks its SOP UIDs.
pub fn build_inroom_rtss(
    stack: &ImageStack,
    center: Point3,
    now: DateTime<Local>,
) -> Result<InMemDicomObject, InRoomRtssError> {
    let first = &stack.first().header;
    let frame_of_reference =
        dataset::string(first, tags::FRAME_OF_REFERENCE_UID, "FrameOfReferenceUID")?;
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();
    let sop_instance_uid = generate_uid();

    let mut rtss = InMemDicomObject::new_empty();
    copy_patient_and_study(first, &mut rtss);

    for element in [
        text(tags::INSTANCE_CREATION_DATE, VR::DA, &date),
        text(tags::INSTANCE_CREATION_TIME, VR::TM, &time),
        text(tags::SOP_CLASS_UID, VR::UI, uids::RT_STRUCTURE_SET_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid),
        text(tags::SERIES_INSTANCE_UID, VR::UI, &generate_uid()),
        text(tags::MODALITY, VR::CS, "RTSTRUCT"),
        text(tags::STRUCTURE_SET_LABEL, VR::SH, "InRoom Isocenter"),
        text(tags::STRUCTURE_SET_NAME, VR::LO, "RTSS for Setup CBCT"),
        text(
            tags::STRUCTURE_SET_DESCRIPTION,
            VR::ST,
            "IFSSEQ0099 compliant RT SS for positioning CT",
        ),
        text(tags::STRUCTURE_SET_DATE, VR::DA, &date),
        text(tags::STRUCTURE_SET_TIME, VR::TM, &time),
        sequence(
            tags::REFERENCED_FRAME_OF_REFERENCE_SEQUENCE,
            vec![referenced_frame_of_reference(stack)?],
        ),
    ] {
        rtss.put(element);
    }

    let contour_data = center.map(ds);
    let mut structure_set_rois = Vec::new();
    let mut roi_contours = Vec::new();
    let mut observations = Vec::new();
    for (number, name, interpreted_type) in ISOCENTER_ROIS {
        let number = number.to_string();
        structure_set_rois.push(object([
            text(tags::ROI_NUMBER, VR::IS, &number),
            text(tags::REFERENCED_FRAME_OF_REFERENCE_UID, VR::UI, &frame_of_reference),
            text(tags::ROI_NAME, VR::LO, name),
            text(tags::ROI_DESCRIPTION, VR::ST, "Isocenter of Treatment Machine"),
            text(tags::ROI_GENERATION_ALGORITHM, VR::CS, "AUTOMATIC"),
            text(
                tags::ROI_GENERATION_DESCRIPTION,
                VR::LO,
                "Extracted from Center of CBCT Image Volume",
            ),
        ]));

        let contour = object([
            text(tags::CONTOUR_NUMBER, VR::IS, "1"),
            text(tags::CONTOUR_GEOMETRIC_TYPE, VR::CS, "POINT"),
            text(tags::NUMBER_OF_CONTOUR_POINTS, VR::IS, "1"),
            decimals(tags::CONTOUR_DATA, &contour_data),
        ]);
        roi_contours.push(object([
            text(tags::REFERENCED_ROI_NUMBER, VR::IS, &number),
            sequence(tags::CONTOUR_SEQUENCE, vec![contour]),
        ]));

        observations.push(object([
            text(tags::OBSERVATION_NUMBER, VR::IS, &number),
            text(tags::REFERENCED_ROI_NUMBER, VR::IS, &number),
            text(tags::RTROI_INTERPRETED_TYPE, VR::CS, interpreted_type),
            text(tags::ROI_INTERPRETER, VR::PN, ""),
        ]));
    }
    rtss.put(sequence(tags::STRUCTURE_SET_ROI_SEQUENCE, structure_set_rois));
    rtss.put(sequence(tags::ROI_CONTOUR_SEQUENCE, roi_contours));
    rtss.put(sequence(tags::RTROI_OBSERVATIONS_SEQUENCE, observations));

    info!(uid = %sop_instance_uid, ?center, "built in-room structure set");
    Ok(rtss)
}

/// Write the structure set as `RS_<SOPInstanceUID>.dcm` in `directory`,
/// implicit VR little endian.
pub fn write_inroom_rtss(
    rtss: InMemDicomObject,
    directory: impl AsRef<Path>,
) -> Result<PathBuf, InRoomRtssError> {
    let sop_instance_uid = dataset::string(&rtss, tags::SOP_INSTANCE_UID, "SOPInstanceUID")?;
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::RT_STRUCTURE_SET_STORAGE)
        .media_storage_sop_instance_uid(sop_instance_uid.as_str())
        .transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)
        .build()
        .map_err(|e| InRoomRtssError::Meta(e.to_string()))?;

    let path = directory
        .as_ref()
        .join(format!("RS_{sop_instance_uid}.dcm"));
    rtss.with_exact_meta(meta).write_to_file(&path)?;
    info!(path = %path.display(), "wrote in-room structure set");
    Ok(path)
}
