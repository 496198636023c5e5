use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::ServiceRequest;

/// Transitions that notify the invoicing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceTrigger {
    DepositRequired,
    PartiallyCompleted,
    CompletedSuccessfully,
}

/// Invoice/estimate calculation boundary.
///
/// The engine stores only the returned reference. These calls are *required*:
/// a failure is a `Dependency` error and rolls the use case back.
#[async_trait]
pub trait InvoiceCollaborator: Send + Sync {
    /// Called inside the use case for transitions that mandate an invoice.
    /// Returns the invoice id to store on the request, or `None` when the
    /// collaborator decides no invoice applies.
    async fn invoice_for(
        &self,
        request: &ServiceRequest,
        trigger: InvoiceTrigger,
    ) -> EngineResult<Option<i64>>;

    /// Called on vendor release to detach whatever invoice linkage exists.
    async fn reset_linkage(&self, request_id: i64, invoice_id: Option<i64>) -> EngineResult<()>;
}
