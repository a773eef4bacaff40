mod common;

use std::fs;

use common::{ct_slice, ion_plan, structure_set, write_file};
use dicom_dictionary_std::{tags, uids};
use rt_six_dof::{
    image_stack::{ImageStackError, ImageStackLoader},
    inroom_rtss::{self, InRoomRtssError},
    structure_set::find_isocenter,
};

#[test]
fn writes_stack_center_as_isocenter() {
    let ct_dir = tempfile::tempdir().unwrap();
    for (i, z) in [0.0, 5.0, 2.5].into_iter().enumerate() {
        let uid = format!("1.2.826.0.1.3680043.2.20.{}", i + 1);
        write_file(ct_slice(&uid, z), ct_dir.path(), &format!("CT{i}.dcm"));
    }
    // skipped: not CT, not .dcm
    write_file(
        structure_set("1.2.3", &[]),
        ct_dir.path(),
        "RS_planning.dcm",
    );
    fs::write(ct_dir.path().join("notes.txt"), "not dicom").unwrap();

    let stack = ImageStackLoader::load_from_directory(ct_dir.path()).unwrap();
    assert_eq!(stack.len(), 3);
    let center = stack.center();
    assert_eq!(center, [0.0, 0.0, 2.5]);

    let out_dir = tempfile::tempdir().unwrap();
    let rtss = inroom_rtss::build_inroom_rtss(&stack, center, chrono::Local::now()).unwrap();
    let path = inroom_rtss::write_inroom_rtss(rtss, out_dir.path()).unwrap();

    let written = dicom::object::open_file(&path).unwrap();
    let sop_instance_uid = written
        .element(tags::SOP_INSTANCE_UID)
        .unwrap()
        .to_str()
        .unwrap()
        .trim_end_matches('\0')
        .to_string();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("RS_{sop_instance_uid}.dcm")
    );
    assert_eq!(
        written.meta().transfer_syntax(),
        uids::IMPLICIT_VR_LITTLE_ENDIAN
    );
    assert_eq!(
        written.element(tags::PATIENT_ID).unwrap().to_str().unwrap(),
        "PH0001"
    );
    assert_eq!(find_isocenter(&written, &["SetupIsocenter"]).unwrap(), center);
    assert_eq!(find_isocenter(&written, &["InitMatchIso"]).unwrap(), center);

    let observations = written
        .element(tags::RTROI_OBSERVATIONS_SEQUENCE)
        .unwrap()
        .items()
        .unwrap();
    let interpreted_types: Vec<String> = observations
        .iter()
        .map(|item| {
            item.element(tags::RTROI_INTERPRETED_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .trim_end()
                .to_string()
        })
        .collect();
    assert_eq!(interpreted_types, ["INITMATCHISO", "SETUPISOCENTER"]);

    let frame = &written
        .element(tags::REFERENCED_FRAME_OF_REFERENCE_SEQUENCE)
        .unwrap()
        .items()
        .unwrap()[0];
    let study = &frame
        .element(tags::RT_REFERENCED_STUDY_SEQUENCE)
        .unwrap()
        .items()
        .unwrap()[0];
    let series = &study
        .element(tags::RT_REFERENCED_SERIES_SEQUENCE)
        .unwrap()
        .items()
        .unwrap()[0];
    assert_eq!(
        series
            .element(tags::CONTOUR_IMAGE_SEQUENCE)
            .unwrap()
            .items()
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn plan_cross_check() {
    let reference = structure_set("1.2.3", &[]);
    assert!(inroom_rtss::verify_plan_reference(&ion_plan([0.0; 3], "HFS", "1.2.3"), &reference).is_ok());

    let err = inroom_rtss::verify_plan_reference(&ion_plan([0.0; 3], "HFS", "4.5.6"), &reference)
        .unwrap_err();
    assert!(matches!(err, InRoomRtssError::ReferenceMismatch { .. }));
    assert_eq!(
        err.to_string(),
        "Referenced RT SS in plan: 4.5.6 doesn't match RT SS UID: 1.2.3"
    );
}

#[test]
fn directory_without_ct_images() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ImageStackLoader::load_from_directory(dir.path()),
        Err(ImageStackError::NoValidImages)
    ));

    write_file(structure_set("1.2.3", &[]), dir.path(), "RS.dcm");
    assert!(matches!(
        ImageStackLoader::load_from_directory(dir.path()),
        Err(ImageStackError::NoValidImages)
    ));
}
