use std::{error::Error, path::PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use rt_six_dof::{
    dataset::compute_from_datasets,
    image_stack::ImageStackLoader,
    inroom_rtss,
    six_dof::{REGISTRATION_ORTHONORMALITY_TOLERANCE, SixDofOptions},
    structure_set::SETUP_ISOCENTER_LABELS,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rt-six-dof")]
#[command(about = "Patient setup corrections from DICOM registration, structure set and plan")]
struct Cli {
    /// More log output (-v debug, -vv trace), ignored when RUST_LOG is set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the 6DOF correction in IEC 61217 table top coordinates
    Compute {
        /// Spatial Registration object
        registration: PathBuf,
        /// RT Structure Set of the in-room CT/CBCT
        structure_set: PathBuf,
        /// RT (Ion) Plan
        plan: PathBuf,
        /// Accepted deviation of the registration rotation from orthonormal
        #[arg(long, default_value_t = REGISTRATION_ORTHONORMALITY_TOLERANCE)]
        tolerance: f64,
        /// ROI name of the setup isocenter, repeatable
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Generate the RT Structure Set for an in-room CT series
    InroomRtss {
        /// Directory holding the CT slices (.dcm)
        ct_directory: PathBuf,
        /// Plan to cross-check against the reference structure set
        #[arg(requires = "reference_rtss")]
        plan: Option<PathBuf>,
        /// Structure set the plan was made on
        reference_rtss: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compute {
            registration,
            structure_set,
            plan,
            tolerance,
            labels,
        } => {
            let labels = if labels.is_empty() {
                SETUP_ISOCENTER_LABELS.map(String::from).to_vec()
            } else {
                labels
            };
            let registration = dicom::object::open_file(&registration)?;
            let structure_set = dicom::object::open_file(&structure_set)?;
            let plan = dicom::object::open_file(&plan)?;
            let six_dof = compute_from_datasets(
                &registration,
                &structure_set,
                &plan,
                &labels,
                &SixDofOptions {
                    orthonormality_tolerance: tolerance,
                },
            )?;

            println!("IEC Rotation [Yaw, Pitch, Roll]: {}", six_dof.rotation);
            println!(
                "IEC Translation in mm [Lateral, Longitudinal, Vertical]: {}",
                six_dof.translation
            );
            println!("Console display:");
            let [lateral, longitudinal, vertical] = six_dof.console_translation_cm();
            println!(
                "IEC Translation in cm [Lateral, Longitudinal, Vertical]: [{lateral:.1}, {longitudinal:.1}, {vertical:.1}]"
            );
            let [x, y, z] = six_dof.console_rotation_xyz();
            println!("IEC Rotation [X axis, Y axis, Z axis]: [{x:.1}, {y:.1}, {z:.1}]");
        }
        Commands::InroomRtss {
            ct_directory,
            plan,
            reference_rtss,
            output,
        } => {
            let stack = ImageStackLoader::load_from_directory(&ct_directory)?;
            let center = stack.center();
            println!("Image stack center: {center:?}");

            if let (Some(plan), Some(reference_rtss)) = (plan, reference_rtss) {
                let plan = dicom::object::open_file(&plan)?;
                let reference_rtss = dicom::object::open_file(&reference_rtss)?;
                inroom_rtss::verify_plan_reference(&plan, &reference_rtss)?;
                let rtss = inroom_rtss::build_inroom_rtss(&stack, center, chrono::Local::now())?;
                let path = inroom_rtss::write_inroom_rtss(rtss, &output)?;
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}
