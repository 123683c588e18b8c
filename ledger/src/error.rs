use thiserror::Error;

/// EIP-1193 code for a request the user declined in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no wallet provider available: {0}")]
    Unavailable(String),

    #[error("user rejected the transaction")]
    Rejected,

    #[error("insufficient funds for gas and value")]
    InsufficientFunds,

    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid contract call: {0}")]
    Encoding(String),
}

impl LedgerError {
    /// Classify a JSON-RPC error object returned by a wallet or node.
    ///
    /// Providers signal rejection and low balance inconsistently: some use
    /// the EIP-1193 code, others only put it in the message text.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        if code == USER_REJECTED_CODE
            || lower.contains("user rejected")
            || lower.contains("user denied")
        {
            Self::Rejected
        } else if lower.contains("insufficient funds") {
            Self::InsufficientFunds
        } else {
            Self::Rpc { code, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rejection_by_code() {
        assert_eq!(LedgerError::from_rpc(4001, "whatever"), LedgerError::Rejected);
    }

    #[test]
    fn classifies_rejection_by_message() {
        assert_eq!(
            LedgerError::from_rpc(
                -32000,
                "MetaMask Tx Signature: User denied transaction signature."
            ),
            LedgerError::Rejected
        );
    }

    #[test]
    fn classifies_insufficient_funds() {
        assert_eq!(
            LedgerError::from_rpc(-32000, "insufficient funds for gas * price + value"),
            LedgerError::InsufficientFunds
        );
    }

    #[test]
    fn other_errors_keep_code_and_message() {
        assert_eq!(
            LedgerError::from_rpc(-32603, "nonce too low"),
            LedgerError::Rpc {
                code: -32603,
                message: "nonce too low".into()
            }
        );
    }
}
