mod commit;
mod issue;
mod person;

pub use commit::*;
pub use issue::*;
pub use person::*;
