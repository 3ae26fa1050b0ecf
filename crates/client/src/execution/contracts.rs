//! Compile-time ABI definitions for the StableFi contracts via Alloy `sol!`.
//!
//! This module and `engine_client` are the only places that know the wire
//! shape of the protocol.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

// ---------------------------------------------------------------------------
// StableFi Engine
// ---------------------------------------------------------------------------

sol! {
    /// StableFi engine: collateral vault, stablecoin minter and liquidator.
    #[sol(rpc)]
    interface IStableEngine {
        error StableEngine__NeedsMoreThanZero();
        error StableEngine__TokenNotAllowed(address token);
        error StableEngine__TransferFailed();
        error StableEngine__BreaksHealthFactor(uint256 healthFactor);
        error StableEngine__MintFailed();
        error StableEngine__HealthFactorOk();
        error StableEngine__HealthFactorNotImproved();

        /// Stablecoin balance (the engine fronts its own token).
        function balanceOf(address account) external view returns (uint256);

        /// Debt and collateral value (USD, 18 decimals) of `user`.
        function getAccountInformation(address user) external view returns (
            uint256 totalMinted,
            uint256 collateralValueInUsd
        );

        /// Health factor in WAD; `type(uint256).max` when the user has no debt.
        function getHealthFactor(address user) external view returns (uint256);

        function getCollateralTokens() external view returns (address[] memory);

        function getCollateralBalanceOfUser(address user, address token) external view returns (uint256);

        function depositCollateral(address tokenCollateralAddress, uint256 amountCollateral) external;

        function mintStablecoin(uint256 amountToMint) external;

        function depositCollateralAndMint(
            address tokenCollateralAddress,
            uint256 amountCollateral,
            uint256 amountToMint
        ) external;

        function burnStablecoin(uint256 amount) external;

        function redeemCollateral(address tokenCollateralAddress, uint256 amountCollateral) external;

        function redeemCollateralForBurn(
            address tokenCollateralAddress,
            uint256 amountCollateral,
            uint256 amountToBurn
        ) external;

        function liquidate(address collateral, address user, uint256 debtToCover) external;
    }
}

// ---------------------------------------------------------------------------
// ERC20 (collateral tokens)
// ---------------------------------------------------------------------------

sol! {
    /// Minimal ERC20 surface used for allowance and decimals.
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}
