//! Solidity ABI bindings for the yield farm and its LP token.

use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IYieldFarming {
        function userInfo(address user)
            external
            view
            returns (uint256 amount, uint256 rewardDebt);

        function pendingRewards(address user) external view returns (uint256);

        function withdraw(uint256 amount) external;

        function claimRewards() external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}
