/// What the intent detector found in one assistant reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedIntent {
    /// First catalog item whose display name occurs in the reply, in catalog
    /// order. Documented tie-break; not a relevance ranking.
    pub item_id: Option<String>,
    pub wants_checkout: bool,
    pub ready_immediately: bool,
}
