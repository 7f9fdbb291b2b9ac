//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.analysis_workers == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.analysis_workers must be > 0".into(),
            ));
        }
        if self.pipeline.conversion_workers == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.conversion_workers must be > 0".into(),
            ));
        }

        let dirs = [
            ("output.success_dir", &self.output.success_dir),
            ("output.fail_dir", &self.output.fail_dir),
            ("output.temp_dir", &self.output.temp_dir),
            ("output.log_file", &self.output.log_file),
        ];
        for (key, value) in dirs {
            let plain = !value.is_empty()
                && !value.contains('/')
                && !value.contains('\\')
                && value != "."
                && value != "..";
            if !plain {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be a plain file name, got {value:?}"
                )));
            }
        }
        for (i, (a_key, a)) in dirs.iter().enumerate() {
            for (b_key, b) in &dirs[i + 1..] {
                if a == b {
                    return Err(ConfigError::ValidationError(format!(
                        "{a_key} and {b_key} must differ"
                    )));
                }
            }
        }

        if self.tools.exiftool.is_empty()
            || self.tools.ffprobe.is_empty()
            || self.tools.ffmpeg.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "tools.* paths must not be empty".into(),
            ));
        }
        Ok(())
    }
}
