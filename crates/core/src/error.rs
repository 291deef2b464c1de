//! Ledger rejections

use thiserror::Error;

/// `startSession` while the previous session is unexpired
pub const SESSION_STARTED: &str = "Seascape Staking: Session is started";

/// `claim` with nothing accrued
pub const NOTHING_TO_CLAIM: &str = "Seascape Staking: Nothing was generated to claim";

/// `claim` without any staked balance
pub const NO_STAKE_TO_CLAIM: &str = "Seascape Staking: No LP Staking tokens to claim";

/// `withdraw` above the staked balance
pub const EXCEEDS_STAKED: &str = "Seascape Staking: Exceeds the staked amount";

/// `deposit` without a sufficient token approval
pub const EXCEEDS_ALLOWANCE: &str = "ERC20: transfer amount exceeds allowance";

/// Checked addition overflowed
pub const ADDITION_OVERFLOW: &str = "SafeMath: addition overflow";

/// Checked subtraction underflowed
pub const SUBTRACTION_OVERFLOW: &str = "SafeMath: subtraction overflow";

/// Checked multiplication overflowed
pub const MULTIPLICATION_OVERFLOW: &str = "SafeMath: multiplication overflow";

/// Failure of a single ledger round-trip
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A session for the token is still running
    #[error("{}", SESSION_STARTED)]
    SessionActive,
    /// Staked, but no reward accrued yet
    #[error("{}", NOTHING_TO_CLAIM)]
    NothingToClaim,
    /// No staked balance to claim against
    #[error("{}", NO_STAKE_TO_CLAIM)]
    NoStake,
    /// Any other revert, reason kept verbatim
    #[error("{0}")]
    Rejected(String),
    /// The call never reached a verdict (HTTP, JSON-RPC or decoding failure)
    #[error("ledger transport failure: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Classify a revert reason returned by the ledger
    ///
    /// Surrounding whitespace is ignored for matching; unknown reasons are
    /// kept exactly as received.
    pub fn from_reason(reason: &str) -> Self {
        match reason.trim() {
            SESSION_STARTED => Self::SessionActive,
            NOTHING_TO_CLAIM => Self::NothingToClaim,
            NO_STAKE_TO_CLAIM => Self::NoStake,
            _ => Self::Rejected(reason.to_string()),
        }
    }

    /// Revert reason as the ledger reported it, `None` for transport failures
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::SessionActive => Some(SESSION_STARTED),
            Self::NothingToClaim => Some(NOTHING_TO_CLAIM),
            Self::NoStake => Some(NO_STAKE_TO_CLAIM),
            Self::Rejected(reason) => Some(reason),
            Self::Transport(_) => None,
        }
    }

    /// Whether the ledger reached a verdict (anything but a transport failure)
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }

    /// Wrap any displayable failure as a transport error
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result of a ledger round-trip
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_reasons_are_classified() {
        assert_eq!(LedgerError::from_reason(SESSION_STARTED), LedgerError::SessionActive);
        assert_eq!(LedgerError::from_reason(NOTHING_TO_CLAIM), LedgerError::NothingToClaim);
        assert_eq!(LedgerError::from_reason(NO_STAKE_TO_CLAIM), LedgerError::NoStake);
        assert_eq!(
            LedgerError::from_reason(&format!(" {NO_STAKE_TO_CLAIM}\n")),
            LedgerError::NoStake
        );
        assert_eq!(
            LedgerError::from_reason("NFT Rush: already set or too early"),
            LedgerError::Rejected("NFT Rush: already set or too early".to_string())
        );
    }

    #[test]
    fn test_unknown_reason_keeps_whitespace() {
        let raw = "  Ownable: caller is not the owner ";
        let err = LedgerError::from_reason(raw);
        assert_eq!(err, LedgerError::Rejected(raw.to_string()));
        assert_eq!(err.reason(), Some(raw));
    }

    #[test]
    fn test_reason_is_verbatim() {
        assert_eq!(LedgerError::NoStake.to_string(), NO_STAKE_TO_CLAIM);
        assert_eq!(LedgerError::SessionActive.reason(), Some(SESSION_STARTED));
        assert_eq!(LedgerError::transport("connection refused").reason(), None);
        assert!(!LedgerError::transport("timeout").is_rejection());
    }
}
