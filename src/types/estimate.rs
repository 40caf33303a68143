//! Outbound estimate payload

/// Model estimate for a single ingested account.
///
/// Built fresh for every processed inbound event and published immediately;
/// nothing keeps a copy after the publish is confirmed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InternalEstimateGenerated {
    /// Identifier of the deployed model version
    #[prost(string, tag = "1")]
    pub model_id: String,

    /// Copy of the inbound `account_id`
    #[prost(string, tag = "2")]
    pub target_account_id: String,

    /// Sigmoid output of the model, in (0, 1)
    #[prost(double, tag = "3")]
    pub raw_recovery_probability: f64,

    /// Heuristic collection effort, not model-derived
    #[prost(double, tag = "4")]
    pub estimated_effort_hours: f64,
}
