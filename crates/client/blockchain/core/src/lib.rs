//! Ledger abstraction layer for the hexed client.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: GameLedger (composite trait)
//!          └── LedgerReader
//!
//! Layer 1: SessionAccount (signs and submits call batches)
//!
//! Layer 0: Word / LogRecord / Receipt (wire vocabulary)
//! ```
//!
//! On top of the traits sit the two pieces of ledger plumbing every backend
//! shares: the [`EventCodec`], which turns opaque receipt records into
//! [`game_core::DomainEvent`]s, and the [`TransactionExecutor`], which walks a
//! call batch through submit, poll and classify.
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_core::{ExecutorConfig, LedgerCall, TransactionExecutor};
//!
//! let executor = TransactionExecutor::new(reader, codec, ExecutorConfig::from_env())
//!     .with_account(account);
//! let events = executor
//!     .execute(&[LedgerCall::Spawn], || rollback(), || mark_pending_done())
//!     .await?;
//! ```

pub mod codec;
pub mod executor;
pub mod traits;
pub mod types;
pub mod word;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use codec::{
    DecodeError, EventCodec, EventKind, EventSchema, FieldSpec, SchemaTable, decode_game_state,
    decode_highest_score, encode_game_state,
};
pub use executor::{Executed, ExecutorConfig, ExecutorError, TransactionExecutor, WaitMode};
pub use traits::{GameLedger, LedgerReader, SessionAccount, TransportError};
pub use types::{
    BlockTag, BlockchainConfig, ExecutionStatus, FinalityStatus, HighestScore, LedgerCall,
    LogRecord, OnChainGameState, Receipt, TransactionHandle, TransactionHash, TransactionPhase,
};
pub use word::{FIELD_PRIME, Word, WordError};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockLedger;
