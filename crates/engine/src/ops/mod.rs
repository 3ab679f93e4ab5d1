use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, ResultEngine,
    events::{EventEmitter, NoopEmitter, SettlementEvent},
};

mod balances;
mod drafts;
mod expenses;
mod settlements;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    emitter: Arc<dyn EventEmitter>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Best-effort event emission; failures are logged, never returned.
    fn emit_event(&self, event: SettlementEvent) {
        if let Err(err) = self.emitter.emit(&event) {
            tracing::warn!(
                "failed to emit {} event for transfer {}: {err}",
                event.kind.as_str(),
                event.transfer_id
            );
        }
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    emitter: Option<Arc<dyn EventEmitter>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the event emitter used for realtime fan-out.
    pub fn emitter(mut self, emitter: Arc<dyn EventEmitter>) -> EngineBuilder {
        self.emitter = Some(emitter);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            emitter: self.emitter.unwrap_or_else(|| Arc::new(NoopEmitter)),
        })
    }
}
