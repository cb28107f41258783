use serde::{Deserialize, Serialize};

/// A user record. `id` is chosen by the caller and is the primary key.
///
/// Fields missing from a request body decode to their zero value; unknown
/// fields are ignored. Nothing else is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}
