//! State cells: persisted per-component state addressed by [`CellId`]
//!
//! A component declares cells in a fixed order on every invocation. Each kind
//! persists a small record in the store and is manipulated through the
//! [`Context`](crate::Context) trait.

use crate::error::FormError;
use crate::identity::CellId;
use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Shortest interval a timer cell may be declared with
pub const MIN_TIMER_DURATION_MS: u64 = 100;

/// Persisted contents of one cell, one variant per cell kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellState {
    /// Simple persisted value
    Value(Value),
    /// Repeating timer
    Timer(TimerState),
    /// Modal form binding
    Form(FormState),
    /// Subscribed realtime channel
    Channel(ChannelState),
}

impl CellState {
    /// Name of the cell kind, used in usage errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            CellState::Value(_) => "value",
            CellState::Timer(_) => "timer",
            CellState::Form(_) => "form",
            CellState::Channel(_) => "channel",
        }
    }
}

/// Timer bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub duration_ms: u64,
    pub running: bool,
    /// When the timer was last armed or fired, in host milliseconds
    pub last_fired_ms: Option<i64>,
}

impl TimerState {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            running: false,
            last_fired_ms: None,
        }
    }

    /// Check whether a fire at `now_ms` is due
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.running && self.remaining_ms(now_ms).is_none()
    }

    /// Time left until the next fire, or `None` once the interval has elapsed
    ///
    /// A clock behind `last_fired_ms` waits at most one full interval.
    pub fn remaining_ms(&self, now_ms: i64) -> Option<u64> {
        let last = self.last_fired_ms?;
        let elapsed = now_ms.saturating_sub(last);
        if elapsed >= self.duration_ms as i64 {
            return None;
        }
        let remaining = self.duration_ms as i64 - elapsed.max(0);
        Some(remaining as u64)
    }
}

/// Form binding: the schema shown and whether a submission is awaited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub schema: FormSchema,
    pub pending: bool,
}

/// Realtime channel subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub name: String,
    pub status: ChannelStatus,
    pub active: bool,
}

impl ChannelState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ChannelStatus::Disconnected,
            active: false,
        }
    }
}

/// Connection status of a channel cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Unknown,
}

/// Schema of a modal form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub accept_label: Option<String>,
    pub fields: Vec<FormField>,
}

/// One input of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Input type of a form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    String,
    Paragraph,
    Number,
    Boolean,
    Select { options: Vec<String> },
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Paragraph | FieldKind::Select { .. } => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "bool",
        }
    }
}

impl FormSchema {
    pub fn new() -> Self {
        Self {
            title: None,
            accept_label: None,
            fields: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn accept_label(mut self, label: impl Into<String>) -> Self {
        self.accept_label = Some(label.into());
        self
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Decode submitted values against this schema
    ///
    /// Output follows schema order. Unknown fields are dropped; optional fields
    /// that are missing or null are omitted; numeric strings are accepted for
    /// number fields.
    pub fn decode(&self, submitted: &ValueMap) -> Result<ValueMap, FormError> {
        let mut decoded = ValueMap::new();

        for field in &self.fields {
            let raw = match submitted.get(&field.name) {
                Some(Value::Null) | None => {
                    if field.required {
                        return Err(FormError::MissingField(field.name.clone()));
                    }
                    continue;
                }
                Some(value) => value,
            };

            let mismatch = || FormError::InvalidField {
                field: field.name.clone(),
                expected: field.kind.expected(),
                got: raw.kind_name(),
            };

            if field.required && raw.is_blank() {
                return Err(FormError::MissingField(field.name.clone()));
            }

            let value = match (&field.kind, raw) {
                (FieldKind::String | FieldKind::Paragraph, Value::String(s)) => Value::String(s.clone()),
                (FieldKind::Number, Value::Int(i)) => Value::Int(*i),
                (FieldKind::Number, Value::Float(f)) => Value::Float(*f),
                (FieldKind::Number, Value::String(s)) => {
                    let s = s.trim();
                    if let Ok(i) = s.parse::<i64>() {
                        Value::Int(i)
                    } else {
                        s.parse::<f64>().map(Value::Float).map_err(|_| mismatch())?
                    }
                }
                (FieldKind::Boolean, Value::Bool(b)) => Value::Bool(*b),
                (FieldKind::Select { options }, Value::String(s)) => {
                    if !options.iter().any(|o| o == s) {
                        return Err(FormError::UnknownOption {
                            field: field.name.clone(),
                            value: s.clone(),
                        });
                    }
                    Value::String(s.clone())
                }
                _ => return Err(mismatch()),
            };

            decoded.insert(field.name.clone(), value);
        }

        Ok(decoded)
    }
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Handle to a value cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueCell {
    id: CellId,
}

/// Handle to a timer cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerCell {
    id: CellId,
}

/// Handle to a form cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormCell {
    id: CellId,
}

/// Handle to a channel cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelCell {
    id: CellId,
}

macro_rules! cell_handle {
    ($($handle:ident),*) => {
        $(
            impl $handle {
                pub(crate) fn new(id: CellId) -> Self {
                    Self { id }
                }

                /// Address of this cell in the store
                pub fn id(&self) -> &CellId {
                    &self.id
                }
            }
        )*
    };
}

cell_handle!(ValueCell, TimerCell, FormCell, ChannelCell);

/// Result of declaring a cell whose initial value may still be loading
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// The cell holds a value
    Ready(T),
    /// The initializer is being resolved; the render pass will restart
    Pending,
}

impl<T> Loaded<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Loaded::Ready(cell) => Some(cell),
            Loaded::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Loaded::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentKey;

    fn feedback_schema() -> FormSchema {
        FormSchema::new()
            .title("Feedback")
            .field(FormField::new("name", "Name", FieldKind::String).required())
            .field(FormField::new("score", "Score", FieldKind::Number))
            .field(FormField::new(
                "mood",
                "Mood",
                FieldKind::Select {
                    options: vec!["happy".into(), "sad".into()],
                },
            ))
    }

    #[test]
    fn test_decode_coerces_and_orders() {
        let mut submitted = ValueMap::new();
        submitted.insert("mood".into(), "happy".into());
        submitted.insert("score".into(), "7".into());
        submitted.insert("name".into(), "Ada".into());
        submitted.insert("extra".into(), Value::Bool(true));

        let decoded = feedback_schema().decode(&submitted).unwrap();
        let keys: Vec<_> = decoded.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "score", "mood"]);
        assert_eq!(decoded["score"], Value::Int(7));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let schema = feedback_schema();

        let empty = ValueMap::new();
        assert_eq!(
            schema.decode(&empty),
            Err(FormError::MissingField("name".into()))
        );

        let mut blank = ValueMap::new();
        blank.insert("name".into(), "   ".into());
        assert_eq!(
            schema.decode(&blank),
            Err(FormError::MissingField("name".into()))
        );

        let mut bad_number = ValueMap::new();
        bad_number.insert("name".into(), "Ada".into());
        bad_number.insert("score".into(), "lots".into());
        assert!(matches!(
            schema.decode(&bad_number),
            Err(FormError::InvalidField { .. })
        ));

        let mut bad_option = ValueMap::new();
        bad_option.insert("name".into(), "Ada".into());
        bad_option.insert("mood".into(), "angry".into());
        assert!(matches!(
            schema.decode(&bad_option),
            Err(FormError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_timer_due() {
        let mut timer = TimerState::new(1000);
        assert!(!timer.is_due(5000));

        timer.running = true;
        timer.last_fired_ms = Some(1000);
        assert!(!timer.is_due(1500));
        assert!(timer.is_due(2000));

        assert_eq!(timer.remaining_ms(1999), Some(1));
        assert_eq!(timer.remaining_ms(1500), Some(500));
        assert_eq!(timer.remaining_ms(2500), None);
        // Clock behind the last fire
        assert_eq!(timer.remaining_ms(400), Some(1000));
    }

    #[test]
    fn test_loaded() {
        let cell = ValueCell::new(CellId::new(ComponentKey::new("0.App"), 0));
        assert_eq!(Loaded::Ready(cell.clone()).ready(), Some(cell));
        assert!(Loaded::<ValueCell>::Pending.is_pending());
    }
}
