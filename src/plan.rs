use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use tracing::{debug, info};

use crate::{
    dataset::{self, DatasetError},
    enums::PatientPosition,
    six_dof::Point3,
};

/// Setup geometry of a treatment plan, taken from its first beam which is
/// presumed to be a setup beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanSetup {
    pub isocenter: Point3,
    pub patient_position: PatientPosition,
    /// Couch angle of the first control point, informational only.
    pub patient_support_angle: Option<f64>,
}

fn first_control_point(plan: &InMemDicomObject) -> Result<&InMemDicomObject, DatasetError> {
    // Ion plans first, photon plans as fallback
    if plan.element(tags::ION_BEAM_SEQUENCE).is_ok() {
        let beam = dataset::first_item(plan, tags::ION_BEAM_SEQUENCE, "IonBeamSequence")?;
        return dataset::first_item(
            beam,
            tags::ION_CONTROL_POINT_SEQUENCE,
            "IonControlPointSequence",
        );
    }
    let beam = dataset::first_item(plan, tags::BEAM_SEQUENCE, "BeamSequence")?;
    dataset::first_item(beam, tags::CONTROL_POINT_SEQUENCE, "ControlPointSequence")
}

/// Isocenter of the first control point of the first beam.
pub fn extract_setup_beam_isocenter(plan: &InMemDicomObject) -> Result<Point3, DatasetError> {
    dataset::point(
        first_control_point(plan)?,
        tags::ISOCENTER_POSITION,
        "IsocenterPosition",
    )
}

/// Patient Position of the first Patient Setup.
///
/// Unsupported codes are reported, never replaced by a default.
pub fn extract_patient_position(plan: &InMemDicomObject) -> Result<PatientPosition, DatasetError> {
    let setup = dataset::first_item(plan, tags::PATIENT_SETUP_SEQUENCE, "PatientSetupSequence")?;
    dataset::patient_position(setup, tags::PATIENT_POSITION, "PatientPosition")
}

pub fn extract_plan_setup(plan: &InMemDicomObject) -> Result<PlanSetup, DatasetError> {
    let isocenter = extract_setup_beam_isocenter(plan)?;
    let patient_position = extract_patient_position(plan)?;
    let patient_support_angle = first_control_point(plan)?
        .element(tags::PATIENT_SUPPORT_ANGLE)
        .ok()
        .and_then(|angle| angle.to_float64().ok());

    info!(?isocenter, %patient_position, ?patient_support_angle, "plan setup");
    Ok(PlanSetup {
        isocenter,
        patient_position,
        patient_support_angle,
    })
}

/// SOP Instance UID of the structure set the plan was made on.
pub fn referenced_structure_set_uid(plan: &InMemDicomObject) -> Result<String, DatasetError> {
    let reference = dataset::first_item(
        plan,
        tags::REFERENCED_STRUCTURE_SET_SEQUENCE,
        "ReferencedStructureSetSequence",
    )?;
    let uid = dataset::string(
        reference,
        tags::REFERENCED_SOP_INSTANCE_UID,
        "ReferencedSOPInstanceUID",
    )?;
    debug!(%uid, "referenced structure set");
    Ok(uid)
}
