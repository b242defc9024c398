use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Mood attached to a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    #[default]
    Neutral,
    Bad,
}

/// Whether a transaction adds or removes money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// Spending category. Only meaningful when the transaction type is `expense`;
/// income rows conventionally carry `income`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Bills,
    Income,
    #[default]
    Other,
}

/// A mood-tagged journal reflection. Immutable once created except for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub mood: Mood,
    /// Creation time as second-granularity Unix epoch.
    pub created_at: i64,
}

/// A categorized income or expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// Positive by convention, not enforced. Non-finite values are rejected
    /// at the write boundary; see [`validate_amount`].
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub category: Category,
    /// Creation time as second-granularity Unix epoch.
    pub created_at: i64,
}

/// The single persisted document: both collections, most-recent-first.
///
/// Both arrays default to empty so bare or partial documents (older exports,
/// hand-edited files) still parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl LocalState {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.transactions.is_empty()
    }
}

/// Portable export wrapper: the local state plus the instance identifier it
/// was scoped to and the moment it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub app_id: String,
    /// RFC 3339 timestamp of the export.
    pub exported_at: String,
    pub data: LocalState,
}

/// Anything with a unique string identifier. Used by the import reconciler
/// to de-duplicate collections generically.
pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for JournalEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Generate a locally-unique document identifier of the form
/// `local-<epoch secs>-<random 0..=9999>`.
pub fn local_document_id(now_secs: i64) -> String {
    let nonce: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("local-{}-{}", now_secs, nonce)
}

/// Current second-granularity epoch timestamp used for `created_at` stamps.
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Validation errors raised at the write boundary, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Amount is NaN or infinite and would silently corrupt aggregates.
    NonFiniteAmount,
    EmptyDescription,
    EmptyText,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NonFiniteAmount => write!(f, "amount must be a finite number"),
            ValidationError::EmptyDescription => write!(f, "description must not be empty"),
            ValidationError::EmptyText => write!(f, "entry text must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a transaction amount before it is persisted.
///
/// Rejects non-finite values outright. Zero and negative amounts are allowed:
/// amounts are positive by convention only, and the sign of the contribution
/// to the balance comes from the transaction type.
pub fn validate_amount(amount: f64) -> Result<f64, ValidationError> {
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(ValidationError::NonFiniteAmount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_document_id_format() {
        let id = local_document_id(1702516122);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "local");
        assert_eq!(parts[1], "1702516122");

        let nonce: u32 = parts[2].parse().unwrap();
        assert!(nonce < 10_000);
    }

    #[test]
    fn test_local_document_ids_vary() {
        // Same timestamp, different nonces. Fifty draws from a 10,000-value
        // space yielding a single value would mean the RNG is broken.
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| local_document_id(1702516122)).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(12.5), Ok(12.5));
        assert_eq!(validate_amount(0.0), Ok(0.0));
        assert_eq!(validate_amount(-3.0), Ok(-3.0));
        assert_eq!(
            validate_amount(f64::NAN),
            Err(ValidationError::NonFiniteAmount)
        );
        assert_eq!(
            validate_amount(f64::INFINITY),
            Err(ValidationError::NonFiniteAmount)
        );
    }

    #[test]
    fn test_mood_parse_and_display() {
        assert_eq!("great".parse::<Mood>().unwrap(), Mood::Great);
        assert_eq!("neutral".parse::<Mood>().unwrap(), Mood::Neutral);
        assert_eq!(Mood::Bad.to_string(), "bad");
        assert!("ecstatic".parse::<Mood>().is_err());
        assert_eq!(Mood::default(), Mood::Neutral);
    }

    #[test]
    fn test_transaction_serializes_camel_case() {
        let tx = Transaction {
            id: "local-1702516122-42".to_string(),
            amount: 20.0,
            description: "coffee".to_string(),
            kind: TransactionType::Expense,
            category: Category::Food,
            created_at: 1702516122,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["category"], "food");
        assert_eq!(json["createdAt"], 1702516122);
    }

    #[test]
    fn test_local_state_accepts_partial_documents() {
        // A bare document with only entries still parses; the missing
        // transactions array is treated as empty.
        let state: LocalState = serde_json::from_str(
            r#"{"entries": [{"id": "e1", "text": "hi", "mood": "good", "createdAt": 1}]}"#,
        )
        .unwrap();
        assert_eq!(state.entries.len(), 1);
        assert!(state.transactions.is_empty());

        let empty: LocalState = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_transaction_defaults_missing_category() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id": "t1", "amount": 5.0, "description": "x", "type": "income", "createdAt": 7}"#,
        )
        .unwrap();
        assert_eq!(tx.category, Category::Other);
    }

    #[test]
    fn test_export_payload_round_trip() {
        let payload = ExportPayload {
            app_id: "orbit-default".to_string(),
            exported_at: "2026-08-27T12:00:00Z".to_string(),
            data: LocalState::default(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"appId\""));
        assert!(json.contains("\"exportedAt\""));

        let back: ExportPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
