use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use ndarray::Array2;
use tracing::debug;

use crate::{
    dataset::{self, DatasetError},
    six_dof::TransformMatrix,
};

fn matrix_item(registration: &InMemDicomObject) -> Result<&InMemDicomObject, DatasetError> {
    let registration_item =
        dataset::first_item(registration, tags::REGISTRATION_SEQUENCE, "RegistrationSequence")?;
    let matrix_registration = dataset::first_item(
        registration_item,
        tags::MATRIX_REGISTRATION_SEQUENCE,
        "MatrixRegistrationSequence",
    )?;
    dataset::first_item(matrix_registration, tags::MATRIX_SEQUENCE, "MatrixSequence")
}

/// Frame of Reference Transformation Matrix of the first registration, as
/// the 16 row-major values stored in the object.
pub fn extract_matrix_elements(registration: &InMemDicomObject) -> Result<Vec<f64>, DatasetError> {
    dataset::floats(
        matrix_item(registration)?,
        tags::FRAME_OF_REFERENCE_TRANSFORMATION_MATRIX,
        "FrameOfReferenceTransformationMatrix",
    )
}

/// Extract the 4x4 transform of the first registration in a Spatial
/// Registration object.
///
/// # Errors
///
/// Returns an error if the nested sequences are missing or the matrix does
/// not hold exactly 16 values.
pub fn extract_transform(registration: &InMemDicomObject) -> Result<TransformMatrix, DatasetError> {
    let elements = extract_matrix_elements(registration)?;
    let transform = TransformMatrix::from_row_major(&elements)?;
    debug!(matrix = %transform.matrix(), "registration matrix");
    Ok(transform)
}

/// Rotation block of the first registration.
pub fn extract_rotation(registration: &InMemDicomObject) -> Result<Array2<f64>, DatasetError> {
    Ok(extract_transform(registration)?.rotation())
}
