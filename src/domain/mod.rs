pub mod creator;
pub mod fraud;
pub mod ledger;
pub mod pick;

pub use creator::*;
pub use fraud::*;
pub use ledger::*;
pub use pick::*;
