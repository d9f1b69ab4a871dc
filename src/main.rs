use std::path::{Path, PathBuf};

use clap::Parser;
use mocap_retarget::{
    config::{self, ConfigError, RigDef},
    math,
    retarget::{Mapping, RetargetOptions},
    skeleton::{Armature, ConstraintPolicy, RoleTable},
    tpose::TPoseTable,
};
use tracing::{error, info, warn};

#[derive(clap::Parser)]
#[command(version, about = "Inspect retargeting definition files")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the bones of an armature file with their retargeting policies.
    Inspect {
        /// Armature definition file.
        #[arg(long)]
        armature: PathBuf,
        /// Rig definition file, mapping the armature's bones to roles.
        #[arg(long)]
        rig: Option<PathBuf>,
        /// Retarget settings file. Its limit setting decides which policies are printed.
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Print a T-pose table.
    TPose {
        /// A `.tpose` file.
        path: PathBuf,
    },
}

fn inspect(
    armature_path: &Path,
    rig_path: Option<&Path>,
    settings_path: Option<&Path>,
) -> Result<(), ConfigError> {
    let armature: Armature = config::load(armature_path)?;
    info!("Loaded {} ({} bones)", armature.name, armature.len());

    let options: RetargetOptions = match settings_path {
        Some(path) => config::load(path)?,
        None => RetargetOptions::default(),
    };

    let roles = match rig_path {
        Some(path) => {
            let rig_def: RigDef = config::load(path)?;
            for (bone, _) in rig_def.bones.iter() {
                if armature.find(bone).is_none() {
                    warn!("{} maps {bone}, which {} does not have", rig_def.name, armature.name);
                }
            }
            Mapping::from_rig_def(&rig_def).target_roles(&armature)
        }
        None => RoleTable::identity(&armature),
    };

    println!(
        "{} (limits {}, clear locks {}, batch {}, source {}, target {})",
        armature.name,
        options.use_limits,
        options.clear_locks,
        options.batch_size,
        options.source_t_pose,
        options.target_t_pose,
    );
    for (index, bone) in armature.bones().iter().enumerate() {
        let policy = ConstraintPolicy::for_bone(bone, options.use_limits);
        let parent = bone
            .parent
            .map(|p| armature.bone(p).name.as_str())
            .unwrap_or("-");
        println!(
            "  {:<24} parent {:<24} role {:<16} order {} locks {:?} roll {:>8.2} constraints {}",
            bone.name,
            parent,
            roles.role(index).unwrap_or("-"),
            policy.order,
            policy.locks,
            math::roll(&bone.rest).to_degrees(),
            bone.constraints.len(),
        );
    }

    if armature.is_mhx() {
        println!("  MHX rig");
    } else if armature.is_rigify() {
        println!("  Rigify rig");
    }
    if armature.stored_t_pose.is_some() {
        println!("  stored T-pose");
    }

    Ok(())
}

fn print_t_pose(path: &Path) -> Result<(), ConfigError> {
    let mut table: TPoseTable = config::load(path)?;
    if table.name.is_empty() {
        table.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    println!("{}", table.name);
    for (role, rotation) in table.bones.iter() {
        let (axis, angle) = rotation.to_axis_angle();
        println!(
            "  {:<16} {:>8.2} deg about ({:.3}, {:.3}, {:.3})",
            role,
            angle.to_degrees(),
            axis.x,
            axis.y,
            axis.z
        );
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();

    let result = match opts.command {
        Command::Inspect {
            armature,
            rig,
            settings,
        } => inspect(&armature, rig.as_deref(), settings.as_deref()),
        Command::TPose { path } => print_t_pose(&path),
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
