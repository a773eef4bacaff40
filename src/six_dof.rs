use std::fmt;

use ndarray::{Array1, Array2, ArrayView2, arr1, s};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    enums::{PatientPosition, UnsupportedPatientPosition},
    euler::{EulerError, rotation_matrix_to_euler_angles},
};

/// A point or displacement in a DICOM patient coordinate system, in mm.
pub type Point3 = [f64; 3];

/// Orthonormality tolerance used for registration matrices unless the caller
/// overrides it.
pub const REGISTRATION_ORTHONORMALITY_TOLERANCE: f64 = 6e-3;

#[derive(Debug, Error)]
pub enum SixDofError {
    #[error("Expected 16 transform matrix elements, got {0}")]
    MalformedTransform(usize),

    #[error(transparent)]
    Rotation(#[from] EulerError),

    #[error(transparent)]
    PatientPosition(#[from] UnsupportedPatientPosition),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SixDofOptions {
    /// Largest accepted Frobenius norm of `I - RᵗR` for the registration
    /// rotation.
    pub orthonormality_tolerance: f64,
}

impl Default for SixDofOptions {
    fn default() -> Self {
        Self {
            orthonormality_tolerance: REGISTRATION_ORTHONORMALITY_TOLERANCE,
        }
    }
}

/// 4x4 rigid transform between two frames of reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMatrix(Array2<f64>);

impl TransformMatrix {
    /// Builds the transform from the 16 row-major values of a Frame of
    /// Reference Transformation Matrix.
    pub fn from_row_major(elements: &[f64]) -> Result<Self, SixDofError> {
        if elements.len() != 16 {
            return Err(SixDofError::MalformedTransform(elements.len()));
        }
        let matrix = Array2::from_shape_vec((4, 4), elements.to_vec())
            .map_err(|_| SixDofError::MalformedTransform(elements.len()))?;
        Ok(Self(matrix))
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    /// Top-left 3x3 block.
    pub fn rotation(&self) -> Array2<f64> {
        self.0.slice(s![0..3, 0..3]).to_owned()
    }

    /// First three elements of the last column.
    pub fn translation(&self) -> Point3 {
        [self.0[[0, 3]], self.0[[1, 3]], self.0[[2, 3]]]
    }
}

/// Reshape the flat registration matrix and keep the rotation block.
pub fn extract_rotation(elements: &[f64]) -> Result<Array2<f64>, SixDofError> {
    Ok(TransformMatrix::from_row_major(elements)?.rotation())
}

pub fn extract_transform(elements: &[f64]) -> Result<TransformMatrix, SixDofError> {
    TransformMatrix::from_row_major(elements)
}

/// Rotation angles in degrees. Yaw is about Z (couch rotation), pitch about
/// X and roll about Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YawPitchRoll {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl YawPitchRoll {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.yaw, self.pitch, self.roll]
    }

    /// Re-express patient frame angles in the table top frame for the given
    /// patient position.
    pub fn for_position(self, patient_position: PatientPosition) -> Self {
        let [yaw_sign, pitch_sign, roll_sign] = patient_position.rotation_signs();
        Self {
            yaw: yaw_sign * self.yaw,
            pitch: pitch_sign * self.pitch,
            roll: roll_sign * self.roll,
        }
    }
}

impl fmt::Display for YawPitchRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.yaw, self.pitch, self.roll)
    }
}

/// IEC 61217 table top translation in mm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TableTopTranslation {
    pub lateral: f64,
    pub longitudinal: f64,
    pub vertical: f64,
}

impl TableTopTranslation {
    pub fn from_patient(translation: Point3, patient_position: PatientPosition) -> Self {
        let [lateral, longitudinal, vertical] = patient_position.patient_to_table_top(translation);
        Self {
            lateral,
            longitudinal,
            vertical,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.lateral, self.longitudinal, self.vertical]
    }
}

impl fmt::Display for TableTopTranslation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]",
            self.lateral, self.longitudinal, self.vertical
        )
    }
}

/// Correction to apply to the patient support, in table top coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SixDof {
    pub rotation: YawPitchRoll,
    pub translation: TableTopTranslation,
}

/// Rounds the exact binary value to one decimal, ties to even. `0.25` gives
/// `0.2` and `0.35` (stored just below) gives `0.3`.
fn round_to_tenth(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

impl SixDof {
    /// Lateral, longitudinal and vertical shift in cm, one decimal, the way
    /// treatment consoles display it.
    pub fn console_translation_cm(&self) -> [f64; 3] {
        self.translation
            .to_array()
            .map(|mm| round_to_tenth(mm / 10.0))
    }

    /// Rotation about the X, Y and Z axes (pitch, roll, yaw), one decimal.
    pub fn console_rotation_xyz(&self) -> [f64; 3] {
        [self.rotation.pitch, self.rotation.roll, self.rotation.yaw].map(round_to_tenth)
    }
}

/// Decompose a registration rotation into yaw/pitch/roll degrees, still
/// relative to the DICOM patient frame.
///
/// The Euler extraction runs in roll, pitch, yaw order because IEC 61217
/// applies translation, then yaw, then pitch, then roll. The result is
/// relabelled as yaw = -pitch, pitch = roll, roll = yaw.
pub fn rotation_to_patient_ypr(
    rotation: ArrayView2<'_, f64>,
    tolerance: Option<f64>,
) -> Result<YawPitchRoll, EulerError> {
    let euler = rotation_matrix_to_euler_angles(rotation, tolerance)?.to_degrees();
    debug!(
        roll = euler.roll,
        pitch = euler.pitch,
        yaw = euler.yaw,
        "euler angles in degrees"
    );
    Ok(YawPitchRoll {
        yaw: -euler.pitch,
        pitch: euler.roll,
        roll: euler.yaw,
    })
}

/// Apply the per patient position sign table to patient frame angles.
pub fn orientation_adjust_ypr(
    ypr: YawPitchRoll,
    patient_position: &str,
) -> Result<YawPitchRoll, UnsupportedPatientPosition> {
    let position: PatientPosition = patient_position.parse()?;
    Ok(ypr.for_position(position))
}

/// Map a DICOM patient translation to table top axes for the given patient
/// position.
pub fn orientation_adjust_translation(
    translation: Point3,
    patient_position: &str,
) -> Result<TableTopTranslation, UnsupportedPatientPosition> {
    let position: PatientPosition = patient_position.parse()?;
    Ok(TableTopTranslation::from_patient(translation, position))
}

/// Compute the 6DOF correction from a registration, the in-room setup
/// isocenter and the planned isocenter.
///
/// # Arguments
///
/// * `registration` - transform from the planning frame to the in-room frame
/// * `reference_isocenter` - setup isocenter in the in-room patient frame
/// * `planned_isocenter` - isocenter of the first beam in the planning frame
/// * `patient_position` - patient position of the plan
/// * `options` - numeric tolerances
///
/// # Errors
///
/// Fails if the rotation block does not pass the orthonormality check.
pub fn compute_six_dof(
    registration: &TransformMatrix,
    reference_isocenter: Point3,
    planned_isocenter: Point3,
    patient_position: PatientPosition,
    options: &SixDofOptions,
) -> Result<SixDof, SixDofError> {
    let rotation = registration.rotation();
    let patient_ypr =
        rotation_to_patient_ypr(rotation.view(), Some(options.orthonormality_tolerance))?;
    let ypr = patient_ypr.for_position(patient_position);

    debug!(matrix = %registration.matrix(), "registration transform");
    info!(isocenter = ?reference_isocenter, "setup isocenter (in room)");
    info!(isocenter = ?planned_isocenter, "plan isocenter (reference)");
    info!(%patient_position, "patient position");

    let registration_translation = arr1(&registration.translation());
    let delta_plan = arr1(&planned_isocenter) - &registration_translation;
    // Rᵗ is the inverse of an orthonormal R
    let rotated_delta: Array1<f64> = rotation.t().dot(&delta_plan);
    debug!(delta = %delta_plan, rotated = %rotated_delta, "plan isocenter delta");

    let reference = arr1(&reference_isocenter);
    let mut patient_translation = &reference - &rotated_delta;
    // TODO: confirm the additive prone correction on lateral and AP against
    // measured HFP/FFP treatment records.
    if patient_position.is_prone() {
        patient_translation[0] = reference[0] + rotated_delta[0];
        patient_translation[1] = reference[1] + rotated_delta[1];
    }
    debug!(translation = %patient_translation, "translation in DICOM patient frame");

    let translation = TableTopTranslation::from_patient(
        [
            patient_translation[0],
            patient_translation[1],
            patient_translation[2],
        ],
        patient_position,
    );

    Ok(SixDof {
        rotation: ypr,
        translation,
    })
}
