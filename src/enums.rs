use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Patient position {0} not supported")]
pub struct UnsupportedPatientPosition(pub String);

/// DICOM Patient Position (0018,5100), restricted to the codes the table top
/// conversions know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientPosition {
    /// HFS
    HeadFirstSupine,
    /// HFP
    HeadFirstProne,
    /// FFP
    FeetFirstProne,
    /// FFS
    FeetFirstSupine,
}

impl PatientPosition {
    pub const ALL: [PatientPosition; 4] = [
        PatientPosition::HeadFirstSupine,
        PatientPosition::HeadFirstProne,
        PatientPosition::FeetFirstProne,
        PatientPosition::FeetFirstSupine,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PatientPosition::HeadFirstSupine => "HFS",
            PatientPosition::HeadFirstProne => "HFP",
            PatientPosition::FeetFirstProne => "FFP",
            PatientPosition::FeetFirstSupine => "FFS",
        }
    }

    pub fn is_prone(&self) -> bool {
        matches!(
            self,
            PatientPosition::HeadFirstProne | PatientPosition::FeetFirstProne
        )
    }

    /// Signs applied to (yaw, pitch, roll) when going from the DICOM patient
    /// frame to the IEC 61217 table top frame.
    pub fn rotation_signs(&self) -> [f64; 3] {
        match self {
            PatientPosition::HeadFirstSupine => [1.0, 1.0, 1.0],
            PatientPosition::HeadFirstProne => [-1.0, -1.0, 1.0],
            PatientPosition::FeetFirstProne => [-1.0, 1.0, -1.0],
            PatientPosition::FeetFirstSupine => [1.0, -1.0, -1.0],
        }
    }

    /// Maps a DICOM patient vector (x, y, z) to table top
    /// (lateral, longitudinal, vertical).
    pub fn patient_to_table_top(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        match self {
            PatientPosition::HeadFirstSupine => [x, z, -y],
            PatientPosition::HeadFirstProne => [-x, z, y],
            PatientPosition::FeetFirstProne => [-x, -z, y],
            PatientPosition::FeetFirstSupine => [-x, -z, -y],
        }
    }
}

impl FromStr for PatientPosition {
    type Err = UnsupportedPatientPosition;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim() {
            "HFS" => Ok(PatientPosition::HeadFirstSupine),
            "HFP" => Ok(PatientPosition::HeadFirstProne),
            "FFP" => Ok(PatientPosition::FeetFirstProne),
            "FFS" => Ok(PatientPosition::FeetFirstSupine),
            _ => Err(UnsupportedPatientPosition(code.to_string())),
        }
    }
}

impl fmt::Display for PatientPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
