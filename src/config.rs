//! The handful of knobs the legacy `tune.h` fixed at compile time. A Rust
//! library serving more than one caller has to carry these at runtime
//! instead; defaults mirror the shipped `tune.h` values.

/// LMS Winternitz parameter: trades signature size against signing speed.
/// Does not affect security, and does not invalidate existing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedSetting {
    /// W=4, p=51, smaller signatures, slower to generate.
    Slow,
    /// W=2, p=101, larger signatures, faster to generate.
    Fast,
}

/// Algorithm used to expand secret seeds into per-leaf private values.
/// Changing this invalidates existing secret keys (it does not affect
/// already-issued signatures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeygenStrategy {
    Sha256,
    Aes256,
}

/// Defends against the hash-fault forgery described in eprint 2018/102 by
/// redundantly recomputing the hashes that feed the next WOTS+ signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStrategy {
    /// No redundancy.
    None,
    /// Redundant computation; a mismatch latches a fatal error.
    Fatal,
    /// Redundant computation; a mismatch triggers a local restart.
    Restart,
}

impl FaultStrategy {
    pub(crate) fn extra_lms_levels(self) -> usize {
        match self {
            FaultStrategy::None => 0,
            FaultStrategy::Fatal => 1,
            FaultStrategy::Restart => 2,
        }
    }
}

/// Runtime configuration for a `Signer`. Constructed once at load time.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub speed_setting: SpeedSetting,
    pub keygen_strategy: KeygenStrategy,
    pub fault_strategy: FaultStrategy,
    /// Pad cheap steps with throwaway work so step latency is more uniform.
    pub dummy_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        // Mirrors tune.h's shipped defaults: SPEED_SETTING=1, KEYGEN_STRATEGY=1,
        // FAULT_STRATEGY=0, DUMMY_LOAD=0.
        Config {
            speed_setting: SpeedSetting::Fast,
            keygen_strategy: KeygenStrategy::Aes256,
            fault_strategy: FaultStrategy::None,
            dummy_load: false,
        }
    }
}

impl Config {
    pub fn new(
        speed_setting: SpeedSetting,
        keygen_strategy: KeygenStrategy,
        fault_strategy: FaultStrategy,
        dummy_load: bool,
    ) -> Self {
        Config {
            speed_setting,
            keygen_strategy,
            fault_strategy,
            dummy_load,
        }
    }

    pub(crate) fn lms_fake(&self) -> usize {
        let speed_bump = match self.speed_setting {
            SpeedSetting::Fast => 1,
            SpeedSetting::Slow => 0,
        };
        7 - speed_bump - self.fault_strategy.extra_lms_levels()
    }

    pub(crate) fn lms_actual(&self) -> usize {
        crate::params::LMS_H - self.lms_fake()
    }

    pub(crate) fn lms_top(&self) -> usize {
        (self.lms_actual() + 1) / 2
    }

    pub(crate) fn lms_bottom(&self) -> usize {
        self.lms_actual() / 2
    }

    pub(crate) fn ots_w(&self) -> u32 {
        match self.speed_setting {
            SpeedSetting::Slow => crate::params::LM_OTS_W4_W,
            SpeedSetting::Fast => crate::params::LM_OTS_W2_W,
        }
    }

    pub(crate) fn ots_p(&self) -> usize {
        match self.speed_setting {
            SpeedSetting::Slow => crate::params::LM_OTS_W4_P,
            SpeedSetting::Fast => crate::params::LM_OTS_W2_P,
        }
    }

    pub(crate) fn ots_ls(&self) -> u32 {
        match self.speed_setting {
            SpeedSetting::Slow => crate::params::LM_OTS_W4_LS,
            SpeedSetting::Fast => crate::params::LM_OTS_W2_LS,
        }
    }

    pub(crate) fn ots_param_id(&self) -> u32 {
        match self.speed_setting {
            SpeedSetting::Slow => crate::params::LM_OTS_W4_PARAM_ID,
            SpeedSetting::Fast => crate::params::LM_OTS_W2_PARAM_ID,
        }
    }

    pub(crate) fn merkle_chains_per_iter(&self) -> usize {
        match self.speed_setting {
            SpeedSetting::Slow => 2,
            SpeedSetting::Fast => 1,
        }
    }

    pub(crate) fn fors_leafs_per_iter(&self) -> usize {
        match self.speed_setting {
            SpeedSetting::Slow => 410,
            SpeedSetting::Fast => 220,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shipped_tune_h() {
        let cfg = Config::default();
        assert_eq!(cfg.speed_setting, SpeedSetting::Fast);
        assert_eq!(cfg.keygen_strategy, KeygenStrategy::Aes256);
        assert_eq!(cfg.fault_strategy, FaultStrategy::None);
        assert!(!cfg.dummy_load);
    }

    #[test]
    fn fault_strategy_only_shrinks_lms_actual() {
        let none = Config::new(SpeedSetting::Fast, KeygenStrategy::Sha256, FaultStrategy::None, false);
        let fatal = Config::new(SpeedSetting::Fast, KeygenStrategy::Sha256, FaultStrategy::Fatal, false);
        let restart = Config::new(SpeedSetting::Fast, KeygenStrategy::Sha256, FaultStrategy::Restart, false);
        assert!(none.lms_actual() > fatal.lms_actual());
        assert!(fatal.lms_actual() > restart.lms_actual());
        assert_eq!(none.lms_actual() + none.lms_fake(), crate::params::LMS_H);
    }

    #[test]
    fn lms_top_and_bottom_split_cover_actual_height() {
        let cfg = Config::default();
        assert_eq!(cfg.lms_top() + cfg.lms_bottom(), cfg.lms_actual());
    }

    #[test]
    fn speed_setting_selects_matching_ots_geometry() {
        let slow = Config::new(SpeedSetting::Slow, KeygenStrategy::Sha256, FaultStrategy::None, false);
        let fast = Config::new(SpeedSetting::Fast, KeygenStrategy::Sha256, FaultStrategy::None, false);
        assert_eq!(slow.ots_param_id(), crate::params::LM_OTS_W4_PARAM_ID);
        assert_eq!(fast.ots_param_id(), crate::params::LM_OTS_W2_PARAM_ID);
        assert_ne!(slow.ots_p(), fast.ots_p());
    }
}
