//! In-memory DICOM fixtures shared by the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR, value::DataSetSequence};
use dicom::object::{InMemDicomObject, mem::InMemElement, meta::FileMetaTableBuilder};
use dicom_dictionary_std::{tags, uids};

pub const REGISTRATION: [f64; 16] = [
    0.999, 0.012, 0.008, 10.0, //
    -0.010, 0.998, 0.015, -5.0, //
    -0.009, -0.014, 0.999, 2.5, //
    0.0, 0.0, 0.0, 1.0,
];

pub fn sequence(tag: Tag, items: Vec<InMemDicomObject>) -> InMemElement {
    DataElement::new(tag, VR::SQ, DataSetSequence::from(items))
}

pub fn text(tag: Tag, vr: VR, value: &str) -> InMemElement {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

pub fn decimals(tag: Tag, values: &[f64]) -> InMemElement {
    DataElement::new(
        tag,
        VR::DS,
        PrimitiveValue::Strs(values.iter().map(f64::to_string).collect()),
    )
}

pub fn object<const N: usize>(elements: [InMemElement; N]) -> InMemDicomObject {
    InMemDicomObject::from_element_iter(elements)
}

pub fn spatial_registration(matrix: &[f64]) -> InMemDicomObject {
    let matrix_item = object([DataElement::new(
        tags::FRAME_OF_REFERENCE_TRANSFORMATION_MATRIX,
        VR::DS,
        PrimitiveValue::Strs(matrix.iter().map(f64::to_string).collect()),
    )]);
    let matrix_registration = object([sequence(tags::MATRIX_SEQUENCE, vec![matrix_item])]);
    let registration = object([sequence(
        tags::MATRIX_REGISTRATION_SEQUENCE,
        vec![matrix_registration],
    )]);
    object([
        text(tags::SOP_CLASS_UID, VR::UI, uids::SPATIAL_REGISTRATION_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, "1.2.826.0.1.3680043.2.1"),
        sequence(tags::REGISTRATION_SEQUENCE, vec![registration]),
    ])
}

/// Structure set with a body contour and one point ROI per `(name, point)`.
pub fn structure_set(sop_instance_uid: &str, points: &[(&str, [f64; 3])]) -> InMemDicomObject {
    let mut rois = vec![object([
        text(tags::ROI_NUMBER, VR::IS, "1"),
        text(tags::ROI_NAME, VR::LO, "BODY"),
    ])];
    let mut contours = vec![object([
        text(tags::REFERENCED_ROI_NUMBER, VR::IS, "1"),
        sequence(
            tags::CONTOUR_SEQUENCE,
            vec![object([decimals(tags::CONTOUR_DATA, &[0.0, 0.0, 0.0])])],
        ),
    ])];
    for (i, (name, point)) in points.iter().enumerate() {
        let number = (i + 2).to_string();
        rois.push(object([
            text(tags::ROI_NUMBER, VR::IS, &number),
            text(tags::ROI_NAME, VR::LO, name),
        ]));
        contours.push(object([
            text(tags::REFERENCED_ROI_NUMBER, VR::IS, &number),
            sequence(
                tags::CONTOUR_SEQUENCE,
                vec![object([
                    text(tags::CONTOUR_GEOMETRIC_TYPE, VR::CS, "POINT"),
                    decimals(tags::CONTOUR_DATA, point),
                ])],
            ),
        ]));
    }
    object([
        text(tags::SOP_CLASS_UID, VR::UI, uids::RT_STRUCTURE_SET_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, sop_instance_uid),
        sequence(tags::STRUCTURE_SET_ROI_SEQUENCE, rois),
        sequence(tags::ROI_CONTOUR_SEQUENCE, contours),
    ])
}

pub fn ion_plan(
    isocenter: [f64; 3],
    patient_position: &str,
    structure_set_uid: &str,
) -> InMemDicomObject {
    let control_point = object([
        decimals(tags::ISOCENTER_POSITION, &isocenter),
        decimals(tags::PATIENT_SUPPORT_ANGLE, &[0.0]),
    ]);
    let beam = object([sequence(
        tags::ION_CONTROL_POINT_SEQUENCE,
        vec![control_point],
    )]);
    object([
        text(tags::SOP_CLASS_UID, VR::UI, uids::RT_ION_PLAN_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, "1.2.826.0.1.3680043.2.3"),
        sequence(tags::ION_BEAM_SEQUENCE, vec![beam]),
        sequence(
            tags::PATIENT_SETUP_SEQUENCE,
            vec![object([text(tags::PATIENT_POSITION, VR::CS, patient_position)])],
        ),
        sequence(
            tags::REFERENCED_STRUCTURE_SET_SEQUENCE,
            vec![object([
                text(tags::REFERENCED_SOP_CLASS_UID, VR::UI, uids::RT_STRUCTURE_SET_STORAGE),
                text(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI, structure_set_uid),
            ])],
        ),
    ])
}

/// Axial CT slice header of a 512x512 image with 0.5 mm pixels.
pub fn ct_slice(sop_instance_uid: &str, z: f64) -> InMemDicomObject {
    object([
        text(tags::SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, sop_instance_uid),
        text(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.826.0.1.3680043.2.10"),
        text(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.826.0.1.3680043.2.11"),
        text(tags::FRAME_OF_REFERENCE_UID, VR::UI, "1.2.826.0.1.3680043.2.12"),
        text(tags::PATIENT_NAME, VR::PN, "PHANTOM^HEAD"),
        text(tags::PATIENT_ID, VR::LO, "PH0001"),
        text(tags::STUDY_ID, VR::SH, "42"),
        text(tags::MODALITY, VR::CS, "CT"),
        decimals(
            tags::IMAGE_ORIENTATION_PATIENT,
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        ),
        decimals(tags::IMAGE_POSITION_PATIENT, &[-127.75, -127.75, z]),
        decimals(tags::PIXEL_SPACING, &[0.5, 0.5]),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(512_u16)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(512_u16)),
    ])
}

/// Writes `object` as a DICOM file with explicit VR little endian.
pub fn write_file(object: InMemDicomObject, directory: &Path, name: &str) -> PathBuf {
    let sop_class = object
        .element(tags::SOP_CLASS_UID)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let sop_instance = object
        .element(tags::SOP_INSTANCE_UID)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(sop_class)
        .media_storage_sop_instance_uid(sop_instance)
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        .build()
        .unwrap();
    let path = directory.join(name);
    object.with_exact_meta(meta).write_to_file(&path).unwrap();
    path
}
