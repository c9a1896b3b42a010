//! Contract interfaces used by the gateway.

use alloy::primitives::U256;
use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct PoolKey {
        address base;
        address quote;
        address oracleAdapter;
        uint256 strike;
        uint256 maturity;
        bool isCallPool;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct QuoteOB {
        address provider;
        address taker;
        uint256 price;
        uint256 size;
        bool isBuy;
        uint256 deadline;
        uint256 salt;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Signature {
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    interface IPoolFactory {
        function getPoolAddress(PoolKey calldata k) external view returns (address pool, bool isDeployed);
    }

    interface IPool {
        function fillQuoteOB(QuoteOB calldata quoteOB, uint256 size, Signature calldata signature, address referrer) external;
        function cancelQuotesOB(bytes32[] calldata hashes) external;
        function settle() external;
        function exercise() external;
        function annihilate(uint256 size) external;
        function balanceOf(address account, uint256 id) external view returns (uint256);
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IOracleAdapter {
        function getPrice(address tokenIn, address tokenOut) external view returns (uint256);
    }
}

impl From<&premia_core::PoolKey> for PoolKey {
    fn from(key: &premia_core::PoolKey) -> Self {
        Self {
            base: key.base,
            quote: key.quote,
            oracleAdapter: key.oracle_adapter,
            strike: key.strike,
            maturity: U256::from(key.maturity),
            isCallPool: key.is_call_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_selectors() {
        // keccak256("cancelQuotesOB(bytes32[])")[..4]
        let call = IPool::cancelQuotesOBCall { hashes: vec![] };
        let data = call.abi_encode();
        assert_eq!(&data[..4], &IPool::cancelQuotesOBCall::SELECTOR);

        // keccak256("balanceOf(address)") = 0x70a08231
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        // keccak256("approve(address,uint256)") = 0x095ea7b3
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        // keccak256("balanceOf(address,uint256)") = 0x00fdd58e
        assert_eq!(IPool::balanceOfCall::SELECTOR, [0x00, 0xfd, 0xd5, 0x8e]);
    }

    #[test]
    fn test_pool_key_conversion() {
        let key = premia_core::PoolKey {
            base: Address::repeat_byte(1),
            quote: Address::repeat_byte(2),
            oracle_adapter: Address::repeat_byte(3),
            strike: U256::from(1500u64),
            maturity: 1_774_598_400,
            is_call_pool: false,
        };
        let abi_key = PoolKey::from(&key);
        assert_eq!(abi_key.maturity, U256::from(1_774_598_400u64));
        assert_eq!(abi_key.oracleAdapter, Address::repeat_byte(3));
        assert!(!abi_key.isCallPool);
    }
}
