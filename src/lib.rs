//! # RT six degree of freedom library
//!
//! This crate computes the patient setup correction a radiotherapy treatment
//! console applies to the patient support before beam-on.

//!
//! It builds on the dicom-rs ecosystem and reads three DICOM objects:
//!  - Spatial Registration between the planning CT and the in-room CT/CBCT
//!  - RT Structure Set of the in-room image volume holding the setup isocenter
//!  - RT (Ion) Plan holding the planned isocenter and the patient position
//!
//! The rotation of the registration is split into Euler angles, relabelled
//! as yaw, pitch and roll and mapped onto the IEC 61217 table top axes
//! together with the isocenter shift. Supported patient positions are:
//!  - HFS (Head First Supine)
//!  - HFP (Head First Prone)
//!  - FFP (Feet First Prone)
//!  - FFS (Feet First Supine)
//!
//! The crate can also synthesize the RT Structure Set for an in-room CT
//! series: the CT headers are loaded in parallel using rayon, sorted along the
//! stack axis and the geometric center of the volume is stored as
//! `InitMatchIso` and `SetupIsocenter` points.
//!
//! Intermediate values are reported as `tracing` events, install a
//! subscriber to see them.
//!
//! # Examples
//!
//! ## Computing the correction from files
//!
//! ```no_run
//! # use rt_six_dof::{dataset::compute_from_datasets, six_dof::SixDofOptions, structure_set::SETUP_ISOCENTER_LABELS};
//! let registration = dicom::object::open_file("SRO.dcm").expect("should have read registration");
//! let structure_set = dicom::object::open_file("RS.dcm").expect("should have read structure set");
//! let plan = dicom::object::open_file("RP.dcm").expect("should have read plan");
//! let six_dof = compute_from_datasets(
//!     &registration,
//!     &structure_set,
//!     &plan,
//!     &SETUP_ISOCENTER_LABELS,
//!     &SixDofOptions::default(),
//! )
//! .expect("should have computed the correction");
//! println!("{} {}", six_dof.rotation, six_dof.translation);
//! ```
//!
//! ## Generating the in-room structure set
//!
//! ```no_run
//! # use rt_six_dof::{image_stack::ImageStackLoader, inroom_rtss};
//! let stack = ImageStackLoader::load_from_directory("cbct").expect("should have loaded CT headers");
//! let rtss = inroom_rtss::build_inroom_rtss(&stack, stack.center(), chrono::Local::now())
//!     .expect("should have built structure set");
//! inroom_rtss::write_inroom_rtss(rtss, ".").expect("should have written structure set");
//! ```

pub mod dataset;
pub mod enums;
pub mod euler;
pub mod image_stack;
pub mod inroom_rtss;
pub mod plan;
pub mod registration;
pub mod six_dof;
pub mod structure_set;
