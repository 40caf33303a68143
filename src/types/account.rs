//! Inbound account ingestion payload

/// Account entering the recovery pipeline, produced by the ingestion service.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountIngested {
    /// Opaque account identifier
    #[prost(string, tag = "1")]
    pub account_id: String,

    /// Amount still owed
    #[prost(double, tag = "2")]
    pub outstanding_balance: f64,

    /// Days since the first missed payment
    #[prost(int32, tag = "3")]
    pub days_past_due: i32,
}

impl AccountIngested {
    pub fn new(account_id: impl Into<String>, outstanding_balance: f64, days_past_due: i32) -> Self {
        Self {
            account_id: account_id.into(),
            outstanding_balance,
            days_past_due,
        }
    }
}
