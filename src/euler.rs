use ndarray::{Array2, ArrayView2, array};
use thiserror::Error;
use tracing::debug;

/// Largest accepted Frobenius norm of `I - RᵗR` when the caller does not
/// provide a tolerance.
pub const DEFAULT_ORTHONORMALITY_TOLERANCE: f64 = 2e-6;

// Below this `sqrt(R00² + R10²)` the yaw axis is degenerate.
const GIMBAL_LOCK_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum EulerError {
    #[error("Not a rotation matrix: deviation from identity {deviation} exceeds tolerance {tolerance}")]
    NotARotationMatrix { deviation: f64, tolerance: f64 },

    #[error("Expected a 3x3 matrix, got {rows}x{cols}")]
    Shape { rows: usize, cols: usize },
}

/// Tait-Bryan angles in radians, in extraction order roll (X), pitch (Y),
/// yaw (Z).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn to_degrees(self) -> Self {
        Self {
            roll: self.roll.to_degrees(),
            pitch: self.pitch.to_degrees(),
            yaw: self.yaw.to_degrees(),
        }
    }
}

fn check_shape(matrix: &ArrayView2<'_, f64>) -> Result<(), EulerError> {
    let (rows, cols) = matrix.dim();
    if (rows, cols) != (3, 3) {
        return Err(EulerError::Shape { rows, cols });
    }
    Ok(())
}

/// Frobenius norm of `I - RᵗR`.
///
/// Returns `None` if the matrix is not 3x3.
pub fn orthonormality_deviation(matrix: ArrayView2<'_, f64>) -> Option<f64> {
    check_shape(&matrix).ok()?;
    let should_be_identity = matrix.t().dot(&matrix);
    let difference = Array2::<f64>::eye(3) - should_be_identity;
    Some(difference.iter().map(|v| v * v).sum::<f64>().sqrt())
}

/// Checks if a matrix is close enough to a rotation matrix to be decomposed.
///
/// `tolerance` defaults to [`DEFAULT_ORTHONORMALITY_TOLERANCE`]. Matrices
/// coming out of a registration usually need a looser bound.
pub fn is_rotation_matrix(matrix: ArrayView2<'_, f64>, tolerance: Option<f64>) -> bool {
    let tolerance = tolerance.unwrap_or(DEFAULT_ORTHONORMALITY_TOLERANCE);
    match orthonormality_deviation(matrix) {
        Some(deviation) => {
            debug!(deviation, tolerance, "difference from identity");
            deviation < tolerance
        }
        None => false,
    }
}

/// Decompose a rotation matrix into roll, pitch and yaw (radians).
///
/// The extraction is the inverse of [`euler_angles_to_rotation_matrix`],
/// i.e. it assumes `R = Rz(yaw) · Ry(pitch) · Rx(roll)`.
///
/// In the gimbal lock configuration (`pitch = ±90°`) only the combined
/// rotation is observable. Yaw is then reported as exactly zero and the
/// whole remaining rotation is attributed to roll.
///
/// # Errors
///
/// Returns [`EulerError::Shape`] for anything but a 3x3 matrix and
/// [`EulerError::NotARotationMatrix`] when the orthonormality check fails
/// for the given tolerance. No decomposition is attempted in either case.
pub fn rotation_matrix_to_euler_angles(
    matrix: ArrayView2<'_, f64>,
    tolerance: Option<f64>,
) -> Result<EulerAngles, EulerError> {
    check_shape(&matrix)?;
    let tolerance = tolerance.unwrap_or(DEFAULT_ORTHONORMALITY_TOLERANCE);
    if !is_rotation_matrix(matrix, Some(tolerance)) {
        return Err(EulerError::NotARotationMatrix {
            deviation: orthonormality_deviation(matrix).unwrap_or(f64::NAN),
            tolerance,
        });
    }

    let sy = matrix[[0, 0]].hypot(matrix[[1, 0]]);

    let angles = if sy >= GIMBAL_LOCK_THRESHOLD {
        EulerAngles {
            roll: matrix[[2, 1]].atan2(matrix[[2, 2]]),
            pitch: (-matrix[[2, 0]]).atan2(sy),
            yaw: matrix[[1, 0]].atan2(matrix[[0, 0]]),
        }
    } else {
        EulerAngles {
            roll: (-matrix[[1, 2]]).atan2(matrix[[1, 1]]),
            pitch: (-matrix[[2, 0]]).atan2(sy),
            yaw: 0.0,
        }
    };

    Ok(angles)
}

/// Build `Rz(yaw) · Ry(pitch) · Rx(roll)` from angles in radians.
pub fn euler_angles_to_rotation_matrix(angles: EulerAngles) -> Result<Array2<f64>, EulerError> {
    let (sin_r, cos_r) = angles.roll.sin_cos();
    let (sin_p, cos_p) = angles.pitch.sin_cos();
    let (sin_y, cos_y) = angles.yaw.sin_cos();

    let r_x = array![[1.0, 0.0, 0.0], [0.0, cos_r, -sin_r], [0.0, sin_r, cos_r]];
    let r_y = array![[cos_p, 0.0, sin_p], [0.0, 1.0, 0.0], [-sin_p, 0.0, cos_p]];
    let r_z = array![[cos_y, -sin_y, 0.0], [sin_y, cos_y, 0.0], [0.0, 0.0, 1.0]];

    let rotation = r_z.dot(&r_y.dot(&r_x));
    check_shape(&rotation.view())?;
    Ok(rotation)
}
