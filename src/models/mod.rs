mod category;
mod id;
mod transaction;

pub use category::Category;
pub use id::Id;
pub use transaction::{Transaction, TransactionKind, TransactionSource};
