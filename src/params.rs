//! # Plugin Parameters
//!
//! Five global controls. Each maps directly onto one of the engine's
//! update methods, so the ranges are the engine's ranges:
//!
//! | Parameter    | Engine call                          | Range          |
//! |--------------|--------------------------------------|----------------|
//! | Size         | `update_global_size_parameter`       | 0.01 – 2.0     |
//! | Feedback     | `update_feedback_parameter`          | 0 – 0.95       |
//! | Density      | `update_global_density_parameter`    | 0 – 0.95       |
//! | Shelf Cutoff | `update_global_shelf_parameters`     | 20 – 20000 Hz  |
//! | Shelf Gain   | `update_global_shelf_parameters`     | −12 – 0 dB     |
//!
//! ## No Smoothing
//!
//! Values are read once per block and handed to the engine, which changes
//! delay lengths and coefficients in one step. The parameters therefore
//! carry no smoother. Moving Size while audio plays can click; the
//! modulated delays already blur small jumps.

use nih_plug::prelude::*;

use crate::reverb::ReverbSettings;

#[derive(Params)]
pub struct ReverbParams {
    /// **Size**: scales every size-flagged delay. 1.0 is the preset as
    /// tuned, 2.0 doubles the room.
    #[id = "size"]
    pub size: FloatParam,

    /// **Feedback**: multiplies the tank's recirculation edge. Capped below
    /// 1.0 so the loop always decays.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Density**: scales allpass coefficients. Higher values smear
    /// transients into a smoother wash.
    #[id = "dens"]
    pub density: FloatParam,

    /// **Shelf Cutoff**: corner of the high shelf inside the tank.
    #[id = "shcut"]
    pub shelf_cutoff: FloatParam,

    /// **Shelf Gain**: how much the shelf darkens each recirculation.
    #[id = "shgain"]
    pub shelf_gain: FloatParam,
}

impl ReverbParams {
    /// Snapshot of the current values for [`crate::Reverb::apply_settings`].
    pub fn settings(&self) -> ReverbSettings {
        ReverbSettings {
            size: self.size.value(),
            feedback: self.feedback.value(),
            density: self.density.value(),
            shelf_cutoff_hz: self.shelf_cutoff.value(),
            shelf_gain_db: self.shelf_gain.value(),
        }
    }
}

impl Default for ReverbParams {
    fn default() -> Self {
        let defaults = ReverbSettings::default();

        Self {
            size: FloatParam::new(
                "Size",
                defaults.size,
                FloatRange::Linear {
                    min: 0.01,
                    max: 2.0,
                },
            )
            .with_step_size(0.01),

            feedback: FloatParam::new(
                "Feedback",
                defaults.feedback,
                FloatRange::Linear {
                    min: 0.0,
                    max: 0.95,
                },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            density: FloatParam::new(
                "Density",
                defaults.density,
                FloatRange::Linear {
                    min: 0.0,
                    max: 0.95,
                },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            shelf_cutoff: FloatParam::new(
                "Shelf Cutoff",
                defaults.shelf_cutoff_hz,
                FloatRange::Linear {
                    min: 20.0,
                    max: 20000.0,
                },
            )
            .with_unit(" Hz")
            .with_step_size(1.0),

            shelf_gain: FloatParam::new(
                "Shelf Gain",
                defaults.shelf_gain_db,
                FloatRange::Linear {
                    min: -12.0,
                    max: 0.0,
                },
            )
            .with_unit(" dB")
            .with_step_size(0.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reverb_settings() {
        let params = ReverbParams::default();
        assert_eq!(params.settings(), ReverbSettings::default());
    }
}
