use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The author of a message. The system instruction is not a message of its own,
/// providers receive it separately and always place it first.
pub enum Role {
    User,
    Assistant,
}
