//! # bundl-ledger
//!
//! The credit ledger (component C1): a per-user non-negative integer
//! balance with transactional debit/credit, serialized against concurrent
//! mutation of the same user.
//!
//! Two implementations share the [`CreditLedger`] trait:
//! - [`memory::InMemoryCreditLedger`] — `tokio::sync::Mutex`-guarded map,
//!   used by tests and in-process deployments.
//! - [`postgres::PgCreditLedger`] — `SELECT ... FOR UPDATE` row lock against
//!   the `"user"` table, used in production.

pub mod ledger;
pub mod memory;
pub mod postgres;

pub use ledger::CreditLedger;
pub use memory::InMemoryCreditLedger;
pub use postgres::PgCreditLedger;
