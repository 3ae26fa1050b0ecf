// ---------------------------------------------------------------------------
// Numeric Constants
// ---------------------------------------------------------------------------

/// Fractional digits of the protocol's own stablecoin.
pub const STABLECOIN_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Wallet (EIP-1193)
// ---------------------------------------------------------------------------

/// EIP-1193 `userRejectedRequest` error code.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 `unauthorized` error code (account not exposed to the dapp).
pub const UNAUTHORIZED_CODE: i64 = 4100;

// ---------------------------------------------------------------------------
// Timing defaults
// ---------------------------------------------------------------------------

/// Seconds an inclusion may stay outstanding before the UI is told it is
/// still pending.
pub const DEFAULT_PENDING_NOTICE_SECONDS: u64 = 30;

/// Interval for polling the wallet for account/chain changes.
pub const DEFAULT_WALLET_POLL_SECONDS: u64 = 4;
