//! Ledger handlers
//!
//! All routes are scoped to one distributor. Writes run as the token's
//! subject, which is stamped on every entry created.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use tokio_stream::{Stream, StreamExt};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ActorId, DistributorId, LedgerEntryId};
use domain_ledger::{
    FixedIdentity, LedgerEntry, LedgerService, LedgerSnapshot, PaymentReceipt, PaymentRegistration,
    RevertQuote,
};

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::ledger::*;
use crate::error::ApiError;
use crate::AppState;

/// The ledger service acting as the authenticated user
fn acting_service(state: &AppState, claims: &Claims, permission: &str) -> Result<LedgerService, ApiError> {
    require_permission(claims, permission)?;
    let actor = ActorId::new(claims.sub.clone())
        .ok_or_else(|| ApiError::Unauthorized("token has no subject".to_string()))?;
    Ok(state.service.for_identity(Arc::new(FixedIdentity::new(actor))))
}

/// Current entries, newest first
#[instrument(skip(state, claims))]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
) -> Result<Json<LedgerEntriesResponse>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;
    let distributor_id = DistributorId::from(distributor_id);
    let entries = state.service.ledger_snapshot(distributor_id).await?;
    Ok(Json(LedgerEntriesResponse {
        distributor_id,
        total: entries.len(),
        entries,
    }))
}

/// Live ledger as server-sent events, one full snapshot per event
pub async fn stream_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;
    let subscription = state
        .service
        .get_ledger_entries(DistributorId::from(distributor_id))
        .await?;
    let events = subscription
        .into_stream()
        .map(|snapshot| Ok::<_, Infallible>(snapshot_event(&snapshot)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Encodes one snapshot as a `snapshot` event
pub fn snapshot_event(snapshot: &LedgerSnapshot) -> Event {
    match Event::default().event("snapshot").json_data(snapshot.as_slice()) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "failed to encode ledger snapshot");
            Event::default().event("error").data("snapshot could not be encoded")
        }
    }
}

/// Enhanced summary and return-adjusted debit views
#[instrument(skip(state, claims))]
pub async fn summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;
    let distributor_id = DistributorId::from(distributor_id);
    let entries = state.service.ledger_snapshot(distributor_id).await?;
    let summary = state.service.calculate_enhanced_summary(&entries);
    let debits = state.service.debit_views(distributor_id).await?;
    Ok(Json(SummaryResponse {
        distributor_id,
        summary,
        debits,
    }))
}

#[instrument(skip(state, claims, request))]
pub async fn register_debit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
    Json(request): Json<RegisterDebitRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let service = acting_service(&state, &claims, permissions::LEDGER_WRITE)?;
    request.validate()?;
    let entry = service
        .register_debit(request.into_command(DistributorId::from(distributor_id)))
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state, claims, request))]
pub async fn register_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
    Json(request): Json<RegisterPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRegistration>), ApiError> {
    let service = acting_service(&state, &claims, permissions::LEDGER_WRITE)?;
    request.validate()?;
    let registration = service
        .register_payment(request.into_command(DistributorId::from(distributor_id)))
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Pays (part of) a debit
#[instrument(skip(state, claims, request))]
pub async fn pay_debit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((distributor_id, entry_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<PayDebitRequest>,
) -> Result<Json<PaymentReceipt>, ApiError> {
    let service = acting_service(&state, &claims, permissions::LEDGER_WRITE)?;
    request.validate()?;
    let command = request.into_command(DistributorId::from(distributor_id), LedgerEntryId::from(entry_id));
    match service.register_payment(command).await? {
        PaymentRegistration::AgainstDebit { receipt } => Ok(Json(*receipt)),
        PaymentRegistration::OnAccount { credit } => Err(ApiError::Internal(format!(
            "payment {} was not linked to debit {}",
            credit.id, entry_id
        ))),
    }
}

/// Quote for a stock reversal; moves nothing
#[instrument(skip(state, claims, request))]
pub async fn check_revert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
    Json(request): Json<RevertItemRequest>,
) -> Result<Json<RevertQuote>, ApiError> {
    require_permission(&claims, permissions::LEDGER_REVERT)?;
    request.validate()?;
    let quote = state
        .service
        .can_revert(DistributorId::from(distributor_id), &request.line_item(), request.quantity)
        .await?;
    Ok(Json(quote))
}

/// Validates and executes a stock reversal
///
/// `201` when stock moved and every per-debit credit is booked, `202` with
/// `status: "degraded"` when stock moved but some credits still have to be
/// booked by hand.
#[instrument(skip(state, claims, request))]
pub async fn revert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(distributor_id): Path<Uuid>,
    Json(request): Json<RevertItemRequest>,
) -> Result<(StatusCode, Json<RevertResponse>), ApiError> {
    let service = acting_service(&state, &claims, permissions::LEDGER_REVERT)?;
    request.validate()?;
    let outcome = service
        .revert_transfer(request.into_command(DistributorId::from(distributor_id)))
        .await?;
    let status = if outcome.is_degraded() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(RevertResponse::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{Currency, Money};
    use domain_ledger::{NewEntry, SourceType};
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_event_encodes_entries() {
        let entry = NewEntry::debit(
            DistributorId::new(),
            Money::new(dec!(57.50), Currency::USD),
            "Transferencia de 2 x Pantalón Sendero (Negro/M)",
            SourceType::Transfer,
            Uuid::new_v4(),
        )
        .into_entry(LedgerEntryId::new_v7(), Utc::now(), ActorId::new("admin-1").unwrap());
        let snapshot: LedgerSnapshot = Arc::new(vec![entry]);
        let _ = snapshot_event(&snapshot);
    }
}
