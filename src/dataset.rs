//! Element lookups and builders shared by the registration, structure set
//! and plan readers and the in-room structure set writer.

use dicom::{
    core::{
        DataElement, PrimitiveValue, Tag, VR,
        value::{ConvertValueError, DataSetSequence},
    },
    object::{InMemDicomObject, mem::InMemElement},
};
use thiserror::Error;

use crate::{
    enums::{PatientPosition, UnsupportedPatientPosition},
    plan, registration,
    six_dof::{Point3, SixDof, SixDofError, SixDofOptions, compute_six_dof},
    structure_set,
};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Missing element {0}")]
    MissingElement(&'static str),

    #[error("Sequence {0} is empty")]
    EmptySequence(&'static str),

    #[error("Invalid value in {name}: {source}")]
    InvalidValue {
        name: &'static str,
        #[source]
        source: ConvertValueError,
    },

    #[error("Expected 3 coordinates in {name}, got {len}")]
    MalformedPoint { name: &'static str, len: usize },

    #[error("No ROIName '{labels:?}' found in StructureSetROISequence")]
    IsocenterNotFound { labels: Vec<String> },

    #[error(transparent)]
    PatientPosition(#[from] UnsupportedPatientPosition),

    #[error(transparent)]
    SixDof(#[from] SixDofError),
}

pub(crate) fn element<'a>(
    object: &'a InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<&'a InMemElement, DatasetError> {
    object
        .element(tag)
        .map_err(|_| DatasetError::MissingElement(name))
}

/// Items of a sequence, or an empty slice if the sequence is absent.
pub(crate) fn items<'a>(object: &'a InMemDicomObject, tag: Tag) -> &'a [InMemDicomObject] {
    object
        .element(tag)
        .ok()
        .and_then(|element| element.items())
        .unwrap_or(&[])
}

pub(crate) fn first_item<'a>(
    object: &'a InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<&'a InMemDicomObject, DatasetError> {
    element(object, tag, name)?
        .items()
        .and_then(|items| items.first())
        .ok_or(DatasetError::EmptySequence(name))
}

pub(crate) fn string(
    object: &InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<String, DatasetError> {
    let value = element(object, tag, name)?
        .to_str()
        .map_err(|source| DatasetError::InvalidValue { name, source })?;
    Ok(value.trim_end_matches(['\0', ' ']).to_string())
}

pub(crate) fn floats(
    object: &InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<Vec<f64>, DatasetError> {
    element(object, tag, name)?
        .to_multi_float64()
        .map_err(|source| DatasetError::InvalidValue { name, source })
}

/// Reads a three valued decimal string such as an isocenter position.
pub(crate) fn point(
    object: &InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<Point3, DatasetError> {
    let values = floats(object, tag, name)?;
    <[f64; 3]>::try_from(values.as_slice()).map_err(|_| DatasetError::MalformedPoint {
        name,
        len: values.len(),
    })
}

pub(crate) fn patient_position(
    object: &InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<PatientPosition, DatasetError> {
    Ok(string(object, tag, name)?.parse::<PatientPosition>()?)
}

/// Compute the 6DOF correction straight from the three DICOM objects.
///
/// # Arguments
///
/// * `registration` - Spatial Registration object
/// * `structure_set` - RT Structure Set of the in-room image volume
/// * `plan` - RT (Ion) Plan holding the planned isocenter
/// * `labels` - ROI names accepted as setup isocenter
/// * `options` - numeric tolerances
pub fn compute_from_datasets(
    registration: &InMemDicomObject,
    structure_set: &InMemDicomObject,
    plan: &InMemDicomObject,
    labels: &[impl AsRef<str>],
    options: &SixDofOptions,
) -> Result<SixDof, DatasetError> {
    let transform = registration::extract_transform(registration)?;
    let setup_isocenter = structure_set::find_isocenter(structure_set, labels)?;
    let plan_setup = plan::extract_plan_setup(plan)?;

    Ok(compute_six_dof(
        &transform,
        setup_isocenter,
        plan_setup.isocenter,
        plan_setup.patient_position,
        options,
    )?)
}

pub(crate) fn sequence(tag: Tag, items: Vec<InMemDicomObject>) -> InMemElement {
    DataElement::new(tag, VR::SQ, DataSetSequence::from(items))
}

pub(crate) fn text(tag: Tag, vr: VR, value: &str) -> InMemElement {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

/// Multi-valued decimal string (DS) element.
pub(crate) fn decimals(tag: Tag, values: &[impl ToString]) -> InMemElement {
    DataElement::new(
        tag,
        VR::DS,
        PrimitiveValue::Strs(values.iter().map(ToString::to_string).collect()),
    )
}

pub(crate) fn object<const N: usize>(elements: [InMemElement; N]) -> InMemDicomObject {
    InMemDicomObject::from_element_iter(elements)
}
