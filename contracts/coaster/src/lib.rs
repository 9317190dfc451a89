#![no_std]

//! Coaster contract: a debt ledger between one host and one guest.
//!
//! The host (owner) records purchases as debt of the guest up to a fixed
//! limit. The guest settles in a Soroban token, either by paying directly or
//! by approving an allowance the host collects. The host sweeps the collected
//! balance with `withdraw`.
//!
//! Every mutating entry point takes the acting `caller`, requires its
//! authorization, and compares it with the stored owner or guest.
//!
//! # Reentrancy
//! Token transfers go through an external contract. Each mutating call holds
//! a reentrancy flag in instance storage while it runs, and debt is reduced
//! only after the token call has succeeded. A call that returns an error is
//! rolled back by the host together with the flag.

mod events;
mod types;


use soroban_sdk::{contract, contractimpl, log, token, Address, Env, String, Vec};

pub use events::{
    AllowanceRequestEvent, DebtsAddedEvent, DebtsCollectedEvent, DebtsPayedEvent, EventKind,
    EventPayload, LedgerEvent, TerminatedEvent, WithdrawnEvent, MAX_HISTORY_PAGE,
};
pub use types::{CoasterConfig, CoasterState, ContractError, DataKey, LedgerStatus};

use events::publish_event;

// ~1 day / ~30 days in ledgers
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 518_400;

fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn load_config(env: &Env) -> Result<CoasterConfig, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(ContractError::NotInitialized)
}

fn load_state(env: &Env) -> Result<CoasterState, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(ContractError::NotInitialized)
}

fn save_state(env: &Env, state: &CoasterState) {
    env.storage().instance().set(&DataKey::State, state);
}

fn require_owner(config: &CoasterConfig, caller: &Address) -> Result<(), ContractError> {
    caller.require_auth();
    if *caller != config.owner {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

fn require_guest(config: &CoasterConfig, caller: &Address) -> Result<(), ContractError> {
    caller.require_auth();
    if *caller != config.guest {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

fn require_active(state: &CoasterState) -> Result<(), ContractError> {
    if state.status != LedgerStatus::Active {
        return Err(ContractError::LedgerTerminated);
    }
    Ok(())
}

fn set_reentrancy_guard(env: &Env) -> Result<(), ContractError> {
    let busy: bool = env
        .storage()
        .instance()
        .get(&DataKey::Reentrancy)
        .unwrap_or(false);
    if busy {
        return Err(ContractError::Reentrancy);
    }
    env.storage().instance().set(&DataKey::Reentrancy, &true);
    Ok(())
}

fn clear_reentrancy_guard(env: &Env) {
    env.storage().instance().remove(&DataKey::Reentrancy);
}

/// Shared prologue of owner operations. The caller must clear the guard on success.
fn begin_owner_call(env: &Env, caller: &Address) -> Result<CoasterConfig, ContractError> {
    let config = load_config(env)?;
    require_owner(&config, caller)?;
    set_reentrancy_guard(env)?;
    extend_instance_ttl(env);
    Ok(config)
}

fn allowance_of_guest(env: &Env, config: &CoasterConfig) -> i128 {
    token::Client::new(env, &config.token)
        .allowance(&config.guest, &env.current_contract_address())
}

fn ledger_balance(env: &Env, config: &CoasterConfig) -> i128 {
    token::Client::new(env, &config.token).balance(&env.current_contract_address())
}

/// Pull `amount` from the guest into the ledger using the guest's allowance.
fn pull_from_guest(env: &Env, config: &CoasterConfig, amount: i128) -> Result<(), ContractError> {
    let ledger = env.current_contract_address();
    let client = token::Client::new(env, &config.token);
    match client.try_transfer_from(&ledger, &config.guest, &ledger, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => {
            log!(env, "transfer_from guest failed", amount);
            Err(ContractError::TokenTransferFailed)
        }
    }
}

fn push_to(
    env: &Env,
    config: &CoasterConfig,
    to: &Address,
    amount: i128,
) -> Result<(), ContractError> {
    let client = token::Client::new(env, &config.token);
    match client.try_transfer(&env.current_contract_address(), to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => {
            log!(env, "transfer from ledger failed", amount);
            Err(ContractError::TokenTransferFailed)
        }
    }
}

#[contract]
pub struct Coaster;

#[contractimpl]
impl Coaster {
    /// Set up the ledger. `owner` becomes the host and must authorize.
    ///
    /// # Errors
    /// * `AlreadyInitialized` – called a second time
    /// * `InvalidAmount` – `debts_limit` is zero or negative
    /// * `GuestIsOwner` – host and guest are the same identity
    pub fn init(
        env: Env,
        owner: Address,
        token: Address,
        guest: Address,
        guest_alias: String,
        debts_limit: i128,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(ContractError::AlreadyInitialized);
        }
        owner.require_auth();

        if debts_limit <= 0 {
            return Err(ContractError::InvalidAmount);
        }
        if guest == owner {
            return Err(ContractError::GuestIsOwner);
        }

        let config = CoasterConfig {
            owner,
            guest,
            guest_alias,
            token,
            debts_limit,
            created: env.ledger().timestamp(),
        };
        env.storage().instance().set(&DataKey::Config, &config);
        save_state(
            &env,
            &CoasterState {
                debts_amount: 0,
                status: LedgerStatus::Active,
            },
        );
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Record `quantity` units of `product_name` at `unit_price` as debt of the guest (owner only).
    /// Returns the outstanding debt after the purchase.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the owner
    /// - `LedgerTerminated` – ledger was terminated
    /// - `InvalidAmount` – negative `unit_price`
    /// - `Overflow` – `quantity * unit_price` or the new total does not fit in i128
    /// - `OverLimit` – the new total would exceed `debts_limit`
    pub fn add_debts(
        env: Env,
        caller: Address,
        quantity: u32,
        product_name: String,
        unit_price: i128,
    ) -> Result<i128, ContractError> {
        let config = begin_owner_call(&env, &caller)?;
        let mut state = load_state(&env)?;
        require_active(&state)?;

        if unit_price < 0 {
            return Err(ContractError::InvalidAmount);
        }

        let total = i128::from(quantity)
            .checked_mul(unit_price)
            .ok_or(ContractError::Overflow)?;
        let new_debts = state
            .debts_amount
            .checked_add(total)
            .ok_or(ContractError::Overflow)?;
        if new_debts > config.debts_limit {
            log!(&env, "debts limit exceeded", new_debts, config.debts_limit);
            return Err(ContractError::OverLimit);
        }

        state.debts_amount = new_debts;
        save_state(&env, &state);
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::DebtsAdded(DebtsAddedEvent {
                quantity,
                product_name,
                unit_price,
                total_debts: new_debts,
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(new_debts)
    }

    /// Guest pays `amount` of the outstanding debt out of a prior token approval.
    /// Returns the remaining debt.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the guest
    /// - `LedgerTerminated` – ledger was terminated
    /// - `InvalidAmount` – `amount` is zero or negative
    /// - `Overpayment` – `amount` is larger than the outstanding debt
    /// - `InsufficientAllowance` – the guest approved less than `amount` for this ledger
    /// - `TokenTransferFailed` – the token refused the transfer
    pub fn pay_debts(env: Env, caller: Address, amount: i128) -> Result<i128, ContractError> {
        let config = load_config(&env)?;
        require_guest(&config, &caller)?;
        set_reentrancy_guard(&env)?;
        extend_instance_ttl(&env);

        let mut state = load_state(&env)?;
        require_active(&state)?;

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }
        if amount > state.debts_amount {
            log!(&env, "overpayment", amount, state.debts_amount);
            return Err(ContractError::Overpayment);
        }
        let allowance = allowance_of_guest(&env, &config);
        if allowance < amount {
            log!(&env, "allowance too low", allowance, amount);
            return Err(ContractError::InsufficientAllowance);
        }

        pull_from_guest(&env, &config, amount)?;

        state.debts_amount -= amount;
        save_state(&env, &state);
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::DebtsPayed(DebtsPayedEvent {
                amount,
                remaining_debts: state.debts_amount,
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(state.debts_amount)
    }

    /// Pull as much of the debt as the guest's current allowance covers (owner only).
    /// Returns the amount collected; zero is a successful no-op that is still recorded.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the owner
    /// - `LedgerTerminated` – ledger was terminated
    /// - `TokenTransferFailed` – the token refused the transfer
    pub fn collect_debts(env: Env, caller: Address) -> Result<i128, ContractError> {
        let config = begin_owner_call(&env, &caller)?;
        let mut state = load_state(&env)?;
        require_active(&state)?;

        let transferable = allowance_of_guest(&env, &config)
            .min(state.debts_amount)
            .max(0);

        let success = transferable > 0;
        if success {
            pull_from_guest(&env, &config, transferable)?;
            state.debts_amount -= transferable;
            save_state(&env, &state);
        }
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::DebtsCollected(DebtsCollectedEvent {
                success,
                amount: transferable,
                remaining_debts: state.debts_amount,
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(transferable)
    }

    /// Ask the guest to approve the outstanding debt for this ledger (owner only).
    /// Returns the requested amount.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the owner
    /// - `LedgerTerminated` – ledger was terminated
    /// - `NothingOwed` – there is no outstanding debt
    pub fn request_allowance(env: Env, caller: Address) -> Result<i128, ContractError> {
        let config = begin_owner_call(&env, &caller)?;
        let state = load_state(&env)?;
        require_active(&state)?;

        if state.debts_amount == 0 {
            return Err(ContractError::NothingOwed);
        }
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::AllowanceRequest(AllowanceRequestEvent {
                to: config.guest,
                amount: state.debts_amount,
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(state.debts_amount)
    }

    /// Close the ledger for good (owner only). Debt is frozen at its current value;
    /// `withdraw` stays available.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the owner
    /// - `LedgerTerminated` – ledger was already terminated
    pub fn terminate(env: Env, caller: Address) -> Result<(), ContractError> {
        begin_owner_call(&env, &caller)?;
        let mut state = load_state(&env)?;
        require_active(&state)?;

        state.status = LedgerStatus::Terminated;
        save_state(&env, &state);
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::Terminated(TerminatedEvent {
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(())
    }

    /// Move the ledger's whole token balance to the owner (owner only).
    /// Returns the amount moved. An empty balance is a no-op and emits nothing.
    ///
    /// # Errors
    /// - `Unauthorized` – caller is not the owner
    /// - `TokenTransferFailed` – the token refused the transfer
    pub fn withdraw(env: Env, caller: Address) -> Result<i128, ContractError> {
        let config = begin_owner_call(&env, &caller)?;

        let balance = ledger_balance(&env, &config);
        if balance <= 0 {
            clear_reentrancy_guard(&env);
            return Ok(0);
        }

        push_to(&env, &config, &config.owner, balance)?;
        clear_reentrancy_guard(&env);

        publish_event(
            &env,
            EventPayload::Withdrawn(WithdrawnEvent {
                to: config.owner,
                amount: balance,
                timestamp: env.ledger().timestamp(),
            }),
        );
        Ok(balance)
    }

    pub fn owner(env: Env) -> Result<Address, ContractError> {
        Ok(load_config(&env)?.owner)
    }

    pub fn guest(env: Env) -> Result<Address, ContractError> {
        Ok(load_config(&env)?.guest)
    }

    pub fn guest_alias(env: Env) -> Result<String, ContractError> {
        Ok(load_config(&env)?.guest_alias)
    }

    pub fn token(env: Env) -> Result<Address, ContractError> {
        Ok(load_config(&env)?.token)
    }

    pub fn debts_amount(env: Env) -> Result<i128, ContractError> {
        Ok(load_state(&env)?.debts_amount)
    }

    pub fn debts_limit(env: Env) -> Result<i128, ContractError> {
        Ok(load_config(&env)?.debts_limit)
    }

    pub fn created(env: Env) -> Result<u64, ContractError> {
        Ok(load_config(&env)?.created)
    }

    pub fn status(env: Env) -> Result<LedgerStatus, ContractError> {
        Ok(load_state(&env)?.status)
    }

    /// Token balance currently held by the ledger (collected but not yet withdrawn).
    pub fn balance(env: Env) -> Result<i128, ContractError> {
        Ok(ledger_balance(&env, &load_config(&env)?))
    }

    pub fn config(env: Env) -> Result<CoasterConfig, ContractError> {
        load_config(&env)
    }

    /// Number of events recorded; the next event gets this sequence number.
    pub fn event_count(env: Env) -> u64 {
        events::event_count(&env)
    }

    /// Recorded events with sequence numbers in `[from_seq, from_seq + min(limit, 100))`,
    /// oldest first, keeping only `kind` when one is given.
    pub fn history(
        env: Env,
        from_seq: u64,
        limit: u32,
        kind: Option<EventKind>,
    ) -> Vec<LedgerEvent> {
        events::read_history(&env, from_seq, limit, kind)
    }
}
