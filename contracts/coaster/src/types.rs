//! Core data types for the Coaster contract.

use soroban_sdk::{contracttype, Address, String};

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LedgerStatus {
    Active = 0,
    Terminated = 1,
}

#[soroban_sdk::contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    Unauthorized = 1,
    AlreadyInitialized = 2,
    NotInitialized = 3,
    LedgerTerminated = 4,
    InvalidAmount = 5,
    OverLimit = 6,
    Overpayment = 7,
    InsufficientAllowance = 8,
    TokenTransferFailed = 9,
    Overflow = 10,
    Reentrancy = 11,
    NothingOwed = 12,
    GuestIsOwner = 13,
}

/// Parameters fixed at `init`. Never rewritten afterwards.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoasterConfig {
    pub owner: Address,
    pub guest: Address,
    pub guest_alias: String,
    /// Token contract the guest settles in.
    pub token: Address,
    pub debts_limit: i128,
    /// Ledger timestamp of `init`.
    pub created: u64,
}

/// The part of the ledger that operations mutate.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoasterState {
    pub debts_amount: i128,
    pub status: LedgerStatus,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    State,
    Reentrancy,
    EventCount,
    Event(u64),
}
