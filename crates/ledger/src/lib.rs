pub use commands::{
    ContactCmd, RepaymentCmd, TransactionCmd, UpdateRepaymentCmd, UpdateTransactionCmd,
};
pub use contact_groups::GroupNode;
pub use contacts::ContactDetail;
pub use error::{LedgerError, ValidationReport, Violation, ViolationKind};
pub use money::MoneyCents;
pub use ops::{ContactBalance, Ledger, LedgerBuilder, TransactionFilter};
pub use payment_methods::PaymentMethod;
pub use payment_sources::PaymentSource;
pub use repayments::Repayment;
pub use transactions::{EntryKind, TransactionDetail};
pub use util::EDIT_LOCK_DAYS;

mod commands;
mod contact_group_members;
mod contact_groups;
mod contacts;
mod error;
mod money;
mod ops;
mod payment_methods;
mod payment_sources;
mod repayments;
mod transactions;
mod users;
mod util;

type ResultLedger<T> = Result<T, LedgerError>;
