/// A stored quote. Scoped by the guild it was added in; the channel is
/// recorded but only consulted by the history import's duplicate check.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Quote {
    pub id: i64,
    pub server_id: String,
    pub channel_id: String,
    pub quote: String,
}
