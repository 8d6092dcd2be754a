//! Solver configuration.
use serde::Deserialize;
use thiserror::Error;

/// Error emitted when a configuration update contains an out of range value.
#[derive(Debug, Error)]
#[error("value {value} for option '{option}' is outside the allowed range {range}")]
pub struct ConfigError {
    pub option: &'static str,
    pub value: String,
    pub range: &'static str,
}

/// Declares the solver options in one place.
///
/// Generates [`SolverConfig`] with the given defaults, the partial [`SolverConfigUpdate`] used to
/// change options at runtime, and a listing of all options for the command line help.
macro_rules! config_options {
    ( $( #[doc = $doc:literal] $name:ident : $ty:ty = $default:expr ; range $range:literal check $valid:expr ; )* ) => {
        /// Configurable parameters used during solving.
        #[derive(Clone, Debug)]
        pub struct SolverConfig {
            $( #[doc = $doc] pub $name : $ty , )*
        }

        impl Default for SolverConfig {
            fn default() -> SolverConfig {
                SolverConfig {
                    $( $name : $default , )*
                }
            }
        }

        /// A partial update of the solver configuration.
        #[derive(Clone, Debug, Default, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct SolverConfigUpdate {
            $( #[doc = $doc] #[serde(default)] pub $name : Option<$ty> , )*
        }

        impl SolverConfigUpdate {
            /// Create an empty update.
            pub fn new() -> SolverConfigUpdate {
                SolverConfigUpdate::default()
            }

            /// Combine two updates, with values of `other` taking precedence.
            pub fn merge(&mut self, other: SolverConfigUpdate) {
                $( if other.$name.is_some() { self.$name = other.$name; } )*
            }

            /// Apply the update to a configuration, checking each value's allowed range.
            pub fn apply(&self, config: &mut SolverConfig) -> Result<(), ConfigError> {
                $(
                    if let Some(value) = self.$name.clone() {
                        let valid: fn(&$ty) -> bool = $valid;
                        if !valid(&value) {
                            return Err(ConfigError {
                                option: stringify!($name),
                                value: format!("{:?}", value),
                                range: $range,
                            });
                        }
                        config.$name = value;
                    }
                )*
                Ok(())
            }
        }

        impl SolverConfig {
            /// A listing of all options with defaults and allowed ranges.
            pub fn help() -> String {
                let mut listing = String::new();
                let default = SolverConfig::default();
                $(
                    listing.push_str(&format!(
                        "{} = {:?}  [{}]\n   {}\n",
                        stringify!($name),
                        default.$name,
                        $range,
                        $doc.trim(),
                    ));
                )*
                listing
            }
        }
    };
}

config_options! {
    /// Enable deletion of low quality learned clauses.
    reduce: bool = true;
        range "bool" check |_| true;

    /// Base number of conflicts between learned clause reductions.
    reduce_interval: u64 = 1000;
        range "100.." check |&v| v >= 100;

    /// Upper bound of the deleted fraction of reduction candidates, in tenths of a percent.
    reduce_high: u64 = 900;
        range "0..=1000" check |&v| v <= 1000;

    /// Lower bound of the deleted fraction of reduction candidates, in tenths of a percent.
    reduce_low: u64 = 500;
        range "0..=1000" check |&v| v <= 1000;

    /// Adapt the reduce interval to the measured reduction overhead.
    reduce_adaptive: bool = true;
        range "bool" check |_| true;

    /// Scales how far the adaptive reduce interval may deviate from its base, in percent.
    reduce_factor: u64 = 100;
        range "50..=200" check |&v| (50..=200).contains(&v);

    /// Enable restarts.
    restart: bool = true;
        range "bool" check |_| true;

    /// Minimum number of conflicts between restarts.
    restart_interval: u64 = 50;
        range "1.." check |&v| v >= 1;

    /// Restart when the fast glue average exceeds the slow average by this margin, in percent.
    restart_margin: u64 = 10;
        range "0..=100" check |&v| v <= 100;

    /// Keep the part of the trail that agrees with the decision heuristic across restarts.
    restart_reuse_trail: bool = true;
        range "bool" check |_| true;

    /// Adapt the restart interval to the search behavior.
    restart_adaptive: bool = true;
        range "bool" check |_| true;

    /// Conflicts between restarts in the stable phase, scaling the reluctant doubling sequence.
    restart_stable_scale: u64 = 1024;
        range "1.." check |&v| v >= 1;

    /// Alternate between a focused and a stable search mode.
    stable: bool = true;
        range "bool" check |_| true;

    /// Number of conflicts between search mode switches.
    switch_interval: u64 = 3000;
        range "1.." check |&v| v >= 1;

    /// When to use target phases: 0 = never, 1 = during stable mode, 2 = always.
    target: u64 = 1;
        range "0..=2" check |&v| v <= 2;

    /// Remember the last assigned polarity of each variable and reuse it for decisions.
    phase_saving: bool = true;
        range "bool" check |_| true;

    /// Ignore remembered polarities and always decide the initial phase.
    force_phase: bool = false;
        range "bool" check |_| true;

    /// Initial decision polarity of every variable.
    initial_phase: bool = true;
        range "bool" check |_| true;

    /// Periodically make a bounded sequence of random decisions.
    random_decisions: bool = false;
        range "bool" check |_| true;

    /// Number of conflicts between random decision sequences.
    random_decision_interval: u64 = 500;
        range "1.." check |&v| v >= 1;

    /// Length of each random decision sequence.
    random_decision_length: u64 = 50;
        range "1.." check |&v| v >= 1;

    /// Seed for the pseudo random sequences used during the search.
    random_seed: u64 = 0;
        range "u64" check |_| true;

    /// Multiplicative decay for the variable activities of the decision heuristic.
    vsids_decay: f32 = 0.95;
        range "0.0625..1.0" check |&v| v > 0.0625 && v < 1.0;

    /// Learned clauses with a glue up to this value are never deleted.
    tier1_glue: u64 = 2;
        range "1.." check |&v| v >= 1;

    /// Learned clauses with a glue up to this value get an extra round of protection.
    tier2_glue: u64 = 6;
        range "1.." check |&v| v >= 1;

    /// Enable recursive minimization of learned clauses.
    minimize: bool = true;
        range "bool" check |_| true;

    /// Enable the binary resolution shrinking pass for learned clauses.
    shrink: bool = true;
        range "bool" check |_| true;
}
