use crate::{retarget::RetargetOptions, tpose::TPoseChoice};

use super::{ConfigError, ConfigLines};

impl TryFrom<ConfigLines> for RetargetOptions {
    type Error = ConfigError;

    fn try_from(value: ConfigLines) -> Result<Self, Self::Error> {
        let mut options = RetargetOptions::default();

        for line in value.into_lines() {
            match line.key.as_str() {
                "USE_LIMITS" => options.use_limits = line.param(0),
                "CLEAR_LOCKS" => options.clear_locks = line.param(0),
                "BATCH_SIZE" => {
                    let batch_size = line.param::<i64>(0);
                    if batch_size < 1 {
                        return Err(line.error("BATCH_SIZE must be a positive integer"));
                    }
                    options.batch_size = batch_size as usize;
                }
                "SOURCE_T_POSE" => {
                    let Ok(choice) = line.require_string(0)?.parse::<TPoseChoice>();
                    options.source_t_pose = choice;
                }
                "TARGET_T_POSE" => {
                    let Ok(choice) = line.require_string(0)?.parse::<TPoseChoice>();
                    options.target_t_pose = choice;
                }
                _ => return Err(line.error(format!("Unknown key ({})", line.key))),
            }
        }

        Ok(options)
    }
}
