//! Reduced and full views of records.
//!
//! Listings use the reduced view; retrieve, create and update respond with the
//! full one.

use serde::Serialize;
use serde_json::Value;

use crate::errors::BlogError;
use crate::permissions::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Reduced,
    Full,
}

impl Projection {
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::List => Projection::Reduced,
            _ => Projection::Full,
        }
    }

    pub fn render<T: Project>(self, record: &T) -> Result<Value, BlogError> {
        let value = match self {
            Projection::Reduced => serde_json::to_value(record.reduced())?,
            Projection::Full => serde_json::to_value(record.full())?,
        };
        Ok(value)
    }

    pub fn render_all<T: Project>(self, records: &[T]) -> Result<Value, BlogError> {
        records
            .iter()
            .map(|record| self.render(record))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// A record with a list view and a detail view.
pub trait Project {
    type Reduced: Serialize;
    type Full: Serialize;

    fn reduced(&self) -> Self::Reduced;
    fn full(&self) -> Self::Full;
}
