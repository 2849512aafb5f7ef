mod collection;
mod order;
mod plan;
mod product;
mod user;

pub use collection::*;
pub use order::*;
pub use plan::*;
pub use product::*;
pub use user::*;
