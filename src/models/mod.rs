mod customer;
mod page;

pub use customer::{Customer, CustomerId, CustomerPayload, CustomerUpdate, NewCustomer};
pub use page::Page;
