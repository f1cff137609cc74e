use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("supplied buffer is too short: need {needed}, have {have}")]
    ShortBuffer { needed: usize, have: usize },

    #[error("unsupported parameter set")]
    UnsupportedParameter,

    #[error("signer has not been loaded")]
    NotInitialized,

    #[error("signer has latched a fatal error and cannot be used further")]
    Fatal,

    #[error("system randomness source failed")]
    Entropy,

    #[error("DRBG reseed limit reached")]
    DrbgExhausted,

    #[error("redundant hash computation mismatch in {where_}")]
    FaultMismatch { where_: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_their_context() {
        let err = Error::ShortBuffer { needed: 10, have: 3 };
        assert_eq!(err.to_string(), "supplied buffer is too short: need 10, have 3");

        let err = Error::FaultMismatch { where_: "lm-ots signing" };
        assert_eq!(
            err.to_string(),
            "redundant hash computation mismatch in lm-ots signing"
        );
    }

    #[test]
    fn fatal_and_not_initialized_are_distinct() {
        assert_ne!(Error::Fatal.to_string(), Error::NotInitialized.to_string());
    }
}
