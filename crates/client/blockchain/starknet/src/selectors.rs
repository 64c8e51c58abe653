//! Entry point selectors of the game contract and account.
//!
//! A selector is `starknet_keccak(name)`: keccak-256 of the ASCII name masked
//! to its low 250 bits.

use client_blockchain_core::{LedgerCall, Word};

/// `get_game_state` = `0x2305fda54e31f8525bf15eaf4f22b11a7d1d2a03f1b4d0602b9ead3c29533e`
pub const GET_GAME_STATE: Word = Word::from_bytes([
    0x00, 0x23, 0x05, 0xfd, 0xa5, 0x4e, 0x31, 0xf8, 0x52, 0x5b, 0xf1, 0x5e, 0xaf, 0x4f, 0x22, 0xb1,
    0x1a, 0x7d, 0x1d, 0x2a, 0x03, 0xf1, 0xb4, 0xd0, 0x60, 0x2b, 0x9e, 0xad, 0x3c, 0x29, 0x53, 0x3e,
]);

/// `get_highest_score` = `0xad8831cea21b1e0dd0d21d27870477e1ccb9ee83c0990047747f05d580ed53`
pub const GET_HIGHEST_SCORE: Word = Word::from_bytes([
    0x00, 0xad, 0x88, 0x31, 0xce, 0xa2, 0x1b, 0x1e, 0x0d, 0xd0, 0xd2, 0x1d, 0x27, 0x87, 0x04, 0x77,
    0xe1, 0xcc, 0xb9, 0xee, 0x83, 0xc0, 0x99, 0x00, 0x47, 0x74, 0x7f, 0x05, 0xd5, 0x80, 0xed, 0x53,
]);

/// `spawn` = `0x217c73ea9ef26581623f20edd45571c1d024612b70d0af3e0842c5b0dc253cd`
pub const SPAWN: Word = Word::from_bytes([
    0x02, 0x17, 0xc7, 0x3e, 0xa9, 0xef, 0x26, 0x58, 0x16, 0x23, 0xf2, 0x0e, 0xdd, 0x45, 0x57, 0x1c,
    0x1d, 0x02, 0x46, 0x12, 0xb7, 0x0d, 0x0a, 0xf3, 0xe0, 0x84, 0x2c, 0x5b, 0x0d, 0xc2, 0x53, 0xcd,
]);

/// `move` = `0x239e4c8fbd11b680d7214cfc26d1780d5c099453f0832beb15fd040aebd4ebb`
pub const MOVE: Word = Word::from_bytes([
    0x02, 0x39, 0xe4, 0xc8, 0xfb, 0xd1, 0x1b, 0x68, 0x0d, 0x72, 0x14, 0xcf, 0xc2, 0x6d, 0x17, 0x80,
    0xd5, 0xc0, 0x99, 0x45, 0x3f, 0x08, 0x32, 0xbe, 0xb1, 0x5f, 0xd0, 0x40, 0xae, 0xbd, 0x4e, 0xbb,
]);

/// `register_score` = `0x3566d0e92bdb2d2b96b481893c1a23f1526a9009dbc1d59cc137b805bf1ef09`
pub const REGISTER_SCORE: Word = Word::from_bytes([
    0x03, 0x56, 0x6d, 0x0e, 0x92, 0xbd, 0xb2, 0xd2, 0xb9, 0x6b, 0x48, 0x18, 0x93, 0xc1, 0xa2, 0x3f,
    0x15, 0x26, 0xa9, 0x00, 0x9d, 0xbc, 0x1d, 0x59, 0xcc, 0x13, 0x7b, 0x80, 0x5b, 0xf1, 0xef, 0x09,
]);

/// `__execute__` = `0x15d40a3d6ca2ac30f4031e42be28da9b056fef9bb7357ac5e85627ee876e5ad`
pub const EXECUTE: Word = Word::from_bytes([
    0x01, 0x5d, 0x40, 0xa3, 0xd6, 0xca, 0x2a, 0xc3, 0x0f, 0x40, 0x31, 0xe4, 0x2b, 0xe2, 0x8d, 0xa9,
    0xb0, 0x56, 0xfe, 0xf9, 0xbb, 0x73, 0x57, 0xac, 0x5e, 0x85, 0x62, 0x7e, 0xe8, 0x76, 0xe5, 0xad,
]);

/// Selector of the contract entry point `call` invokes.
pub fn for_call(call: &LedgerCall) -> Word {
    match call {
        LedgerCall::Spawn => SPAWN,
        LedgerCall::Move { .. } => MOVE,
        LedgerCall::RegisterScore { .. } => REGISTER_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_published_hex() {
        assert_eq!(
            MOVE.to_hex(),
            "0x239e4c8fbd11b680d7214cfc26d1780d5c099453f0832beb15fd040aebd4ebb"
        );
        assert_eq!(
            EXECUTE.to_hex(),
            "0x15d40a3d6ca2ac30f4031e42be28da9b056fef9bb7357ac5e85627ee876e5ad"
        );
    }

    #[test]
    fn calls_map_to_their_entry_points() {
        assert_eq!(for_call(&LedgerCall::Spawn), SPAWN);
    }
}
