use solana_client::client_error::ClientError;
use thiserror::Error;

/// Failures reported by the ledger boundary
///
/// Every variant carries the endpoint so a log line is enough to tell which
/// cluster misbehaved.
#[derive(Debug, Clone, Error)]
pub enum RpcManagerError {
    /// Could not reach the node at all
    #[error("Endpoint {endpoint} unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Request to {endpoint} timed out")]
    TimedOut { endpoint: String },

    /// The node answered with an error (preflight failure, bad params, 5xx)
    #[error("Request rejected by {endpoint}: {message} (code: {code:?})")]
    Rejected {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Blockhash not found by {endpoint}")]
    BlockhashNotFound { endpoint: String },

    /// Block height passed the snapshot's last valid height
    #[error("Transaction expired before confirmation ({endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Fee payer has insufficient funds ({endpoint})")]
    InsufficientFunds { endpoint: String },
}

/// Lowercased message fragment and the variant it maps to
type Matcher = (&'static [&'static str], fn(String) -> RpcManagerError);

const MATCHERS: &[Matcher] = &[
    (&["blockhash not found"], |endpoint| {
        RpcManagerError::BlockhashNotFound { endpoint }
    }),
    (&["transaction expired", "block height exceeded"], |endpoint| {
        RpcManagerError::TransactionExpired { endpoint }
    }),
    (&["insufficient funds", "insufficient lamports"], |endpoint| {
        RpcManagerError::InsufficientFunds { endpoint }
    }),
    (&["timed out", "timeout"], |endpoint| RpcManagerError::TimedOut { endpoint }),
];

const UNREACHABLE_HINTS: &[&str] = &["connection refused", "error sending request", "dns error"];

impl RpcManagerError {
    /// Whether the same request could succeed if sent again unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::TimedOut { .. } | Self::BlockhashNotFound { .. } => true,
            Self::Rejected { code, .. } => matches!(code, Some(c) if (500..600).contains(c)),
            Self::TransactionExpired { .. } | Self::InsufficientFunds { .. } => false,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Unreachable { endpoint, .. }
            | Self::TimedOut { endpoint }
            | Self::Rejected { endpoint, .. }
            | Self::BlockhashNotFound { endpoint }
            | Self::TransactionExpired { endpoint }
            | Self::InsufficientFunds { endpoint } => endpoint,
        }
    }

    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        Self::classify(&err.to_string(), endpoint)
    }

    /// Classify an RPC failure by its message text
    pub fn classify(message: &str, endpoint: &str) -> Self {
        let lowered = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if let Some((_, build)) = MATCHERS
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        {
            return build(endpoint);
        }

        if UNREACHABLE_HINTS.iter().any(|n| lowered.contains(n)) {
            return Self::Unreachable {
                endpoint,
                message: message.to_string(),
            };
        }

        Self::Rejected {
            endpoint,
            message: message.to_string(),
            code: response_code(&lowered),
        }
    }
}

/// Numeric code following `code:` in a JSON-RPC error message
fn response_code(lowered: &str) -> Option<i64> {
    let rest = lowered.split("code:").nth(1)?;
    let token = rest.split_whitespace().next()?;
    token
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: &str = "https://api.devnet.solana.com";

    #[test]
    fn test_classify_known_failures() {
        assert!(matches!(
            RpcManagerError::classify("Blockhash not found", EP),
            RpcManagerError::BlockhashNotFound { .. }
        ));
        assert!(matches!(
            RpcManagerError::classify(
                "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit. insufficient lamports",
                EP
            ),
            RpcManagerError::InsufficientFunds { .. }
        ));
        assert!(matches!(
            RpcManagerError::classify("operation timed out", EP),
            RpcManagerError::TimedOut { .. }
        ));
        assert!(matches!(
            RpcManagerError::classify("error sending request for url", EP),
            RpcManagerError::Unreachable { .. }
        ));
    }

    #[test]
    fn test_classify_extracts_code() {
        match RpcManagerError::classify("RPC response error code: 503 service unavailable", EP) {
            RpcManagerError::Rejected { code, endpoint, .. } => {
                assert_eq!(code, Some(503));
                assert_eq!(endpoint, EP);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(response_code("no code here"), None);
    }

    #[test]
    fn test_retryable() {
        let ep = || EP.to_string();
        assert!(RpcManagerError::TimedOut { endpoint: ep() }.is_retryable());
        assert!(RpcManagerError::Rejected {
            endpoint: ep(),
            message: "bad gateway".to_string(),
            code: Some(502),
        }
        .is_retryable());

        assert!(!RpcManagerError::Rejected {
            endpoint: ep(),
            message: "invalid params".to_string(),
            code: Some(-32602),
        }
        .is_retryable());
        assert!(!RpcManagerError::TransactionExpired { endpoint: ep() }.is_retryable());
        assert_eq!(RpcManagerError::InsufficientFunds { endpoint: ep() }.endpoint(), EP);
    }
}
