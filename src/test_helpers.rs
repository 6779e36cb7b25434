use chrono::{TimeZone, Utc};

use crate::{database::CustomerRepository, models::NewCustomer};

pub fn new_customer(member_number: i64, name: &str, interests: &str) -> NewCustomer {
    NewCustomer {
        name: name.to_owned(),
        date_of_birth: Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
        member_number,
        interests: interests.to_owned(),
    }
}

/// Stores members `1..=count`, inserted in reverse so ordering is not free
pub async fn seed(db: &dyn CustomerRepository, count: i64) {
    for member_number in (1..=count).rev() {
        db.create(new_customer(
            member_number,
            &format!("Member {}", member_number),
            "reading, hiking",
        ))
        .await
        .expect("failed to seed customer");
    }
}
