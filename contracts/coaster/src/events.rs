//! Event types and topic constants for the Coaster contract.
//!
//! Every event is published on the Soroban event stream under
//! `("coaster", <kind>)` and appended to an on-ledger history so that
//! off-ledger observers can replay it by sequence number and filter by kind.

use soroban_sdk::{contracttype, symbol_short, Address, Env, String, Symbol, Vec};

use crate::types::DataKey;

/// Upper bound on the window scanned by a single `history` query.
pub const MAX_HISTORY_PAGE: u32 = 100;

// ~1 day / ~30 days in ledgers
const EVENT_LIFETIME_THRESHOLD: u32 = 17_280;
const EVENT_BUMP_AMOUNT: u32 = 518_400;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    DebtsAdded = 0,
    DebtsPayed = 1,
    DebtsCollected = 2,
    AllowanceRequest = 3,
    Terminated = 4,
    Withdrawn = 5,
}

impl EventKind {
    pub fn topic(&self) -> Symbol {
        match self {
            EventKind::DebtsAdded => symbol_short!("added"),
            EventKind::DebtsPayed => symbol_short!("payed"),
            EventKind::DebtsCollected => symbol_short!("collected"),
            EventKind::AllowanceRequest => symbol_short!("allow_req"),
            EventKind::Terminated => symbol_short!("terminate"),
            EventKind::Withdrawn => symbol_short!("withdrawn"),
        }
    }
}

/// Emitted when the host records a purchase.
/// `total_debts` is the outstanding debt after the purchase.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebtsAddedEvent {
    pub quantity: u32,
    pub product_name: String,
    pub unit_price: i128,
    pub total_debts: i128,
    pub timestamp: u64,
}

/// Emitted when the guest pays part or all of the debt.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebtsPayedEvent {
    pub amount: i128,
    pub remaining_debts: i128,
    pub timestamp: u64,
}

/// Emitted on every successful `collect_debts`. `success` is false when there
/// was nothing to pull, in which case `amount` is zero.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebtsCollectedEvent {
    pub success: bool,
    pub amount: i128,
    pub remaining_debts: i128,
    pub timestamp: u64,
}

/// Asks `to` (the guest) to approve `amount` for the ledger.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllowanceRequestEvent {
    pub to: Address,
    pub amount: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TerminatedEvent {
    pub timestamp: u64,
}

/// Emitted when the host sweeps the ledger's token balance.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawnEvent {
    pub to: Address,
    pub amount: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventPayload {
    DebtsAdded(DebtsAddedEvent),
    DebtsPayed(DebtsPayedEvent),
    DebtsCollected(DebtsCollectedEvent),
    AllowanceRequest(AllowanceRequestEvent),
    Terminated(TerminatedEvent),
    Withdrawn(WithdrawnEvent),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::DebtsAdded(_) => EventKind::DebtsAdded,
            EventPayload::DebtsPayed(_) => EventKind::DebtsPayed,
            EventPayload::DebtsCollected(_) => EventKind::DebtsCollected,
            EventPayload::AllowanceRequest(_) => EventKind::AllowanceRequest,
            EventPayload::Terminated(_) => EventKind::Terminated,
            EventPayload::Withdrawn(_) => EventKind::Withdrawn,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            EventPayload::DebtsAdded(e) => e.timestamp,
            EventPayload::DebtsPayed(e) => e.timestamp,
            EventPayload::DebtsCollected(e) => e.timestamp,
            EventPayload::AllowanceRequest(e) => e.timestamp,
            EventPayload::Terminated(e) => e.timestamp,
            EventPayload::Withdrawn(e) => e.timestamp,
        }
    }
}

/// One entry of the append-only history.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedgerEvent {
    pub seq: u64,
    pub kind: EventKind,
    pub timestamp: u64,
    pub payload: EventPayload,
}

fn topics(kind: EventKind) -> (Symbol, Symbol) {
    (symbol_short!("coaster"), kind.topic())
}

/// Number of events recorded so far; also the sequence number of the next one.
pub fn event_count(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::EventCount)
        .unwrap_or(0)
}

/// Publish an event on the event stream and append it to the history.
/// Returns the sequence number assigned to it.
pub fn publish_event(env: &Env, payload: EventPayload) -> u64 {
    let kind = payload.kind();
    match &payload {
        EventPayload::DebtsAdded(e) => env.events().publish(topics(kind), e.clone()),
        EventPayload::DebtsPayed(e) => env.events().publish(topics(kind), e.clone()),
        EventPayload::DebtsCollected(e) => env.events().publish(topics(kind), e.clone()),
        EventPayload::AllowanceRequest(e) => env.events().publish(topics(kind), e.clone()),
        EventPayload::Terminated(e) => env.events().publish(topics(kind), e.clone()),
        EventPayload::Withdrawn(e) => env.events().publish(topics(kind), e.clone()),
    }

    let seq = event_count(env);
    let key = DataKey::Event(seq);
    let entry = LedgerEvent {
        seq,
        kind,
        timestamp: payload.timestamp(),
        payload,
    };
    env.storage().persistent().set(&key, &entry);
    env.storage()
        .persistent()
        .extend_ttl(&key, EVENT_LIFETIME_THRESHOLD, EVENT_BUMP_AMOUNT);
    env.storage()
        .instance()
        .set(&DataKey::EventCount, &(seq + 1));
    seq
}

/// Events with sequence numbers in `[from_seq, from_seq + min(limit, MAX_HISTORY_PAGE))`,
/// in order, optionally restricted to one kind.
pub fn read_history(
    env: &Env,
    from_seq: u64,
    limit: u32,
    kind: Option<EventKind>,
) -> Vec<LedgerEvent> {
    let mut out = Vec::new(env);
    let count = event_count(env);
    if from_seq >= count {
        return out;
    }

    let end = from_seq
        .saturating_add(u64::from(MAX_HISTORY_PAGE.min(limit)))
        .min(count);
    for seq in from_seq..end {
        let entry: Option<LedgerEvent> = env.storage().persistent().get(&DataKey::Event(seq));
        if let Some(entry) = entry {
            if kind.map_or(true, |k| k == entry.kind) {
                out.push_back(entry);
            }
        }
    }
    out
}
