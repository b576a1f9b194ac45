use actix_web::{HttpResponse, post, web};
use payloads::{TripId, requests};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::receipt::{self, ReceiptConfig};

use super::{APIError, get_validated_member};

/// Parse raw OCR text into a candidate itemization. No state is mutated;
/// the client resubmits the reviewed result as an itemized expense.
#[tracing::instrument(
    skip(user, details, pool, receipt_config),
    fields(user_id = tracing::field::Empty)
)]
#[post("/trips/{trip_id}/receipt/ocr")]
pub async fn parse_receipt(
    user: AuthedUser,
    path: web::Path<TripId>,
    details: web::Json<requests::ParseReceipt>,
    pool: web::Data<PgPool>,
    receipt_config: web::Data<ReceiptConfig>,
) -> Result<HttpResponse, APIError> {
    let _member = get_validated_member(&user.user_id, &path, &pool).await?;
    let parsed = receipt::parse_with_verifier(
        &details.raw_text,
        receipt_config.verifier.as_ref(),
    )
    .await;
    Ok(HttpResponse::Ok().json(parsed))
}
