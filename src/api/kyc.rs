//! KYC document intake and review.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::store::{KycRecord, KycStatus};

#[derive(Debug, Serialize)]
pub struct KycSubmitResponse {
    pub success: bool,
    pub data: KycRecord,
}

#[derive(Debug, Serialize)]
pub struct KycStatusResponse {
    pub success: bool,
    pub data: KycStatusBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusBody {
    pub status: String,
    #[serde(rename = "kycID")]
    pub kyc_id: Option<String>,
    pub address_proof: Option<String>,
    pub site_photo: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKycStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct KycRecordResponse {
    pub success: bool,
    pub data: KycRecord,
}

#[derive(Default)]
struct KycForm {
    first_name: Option<String>,
    last_name: Option<String>,
    father_name: Option<String>,
    mother_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    pin_code: Option<String>,
    kyc_id: Option<Vec<u8>>,
    address_proof: Option<Vec<u8>>,
    site_photo: Option<Vec<u8>>,
}

impl KycForm {
    async fn parse(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("firstName") => form.first_name = Some(text(field).await?),
                Some("lastName") => form.last_name = Some(text(field).await?),
                Some("fatherName") => form.father_name = Some(text(field).await?),
                Some("motherName") => form.mother_name = Some(text(field).await?),
                Some("email") => form.email = Some(text(field).await?),
                Some("phoneNumber") => form.phone_number = Some(text(field).await?),
                Some("address") => form.address = Some(text(field).await?),
                Some("pinCode") => form.pin_code = Some(text(field).await?),
                Some("kycID") => form.kyc_id = Some(bytes(field).await?),
                Some("addressProof") => form.address_proof = Some(bytes(field).await?),
                Some("sitePhoto") => form.site_photo = Some(bytes(field).await?),
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable form field: {}", e)))
}

async fn bytes(field: axum::extract::multipart::Field<'_>) -> Result<Vec<u8>> {
    Ok(field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable file field: {}", e)))?
        .to_vec())
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Submit KYC documents (multipart: text fields + kycID, addressProof,
/// sitePhoto files)
#[tracing::instrument(name = "http.submit_kyc", skip(state, claims, multipart), fields(user_id = %claims.sub))]
pub async fn submit_kyc(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<KycSubmitResponse>)> {
    let form = KycForm::parse(multipart).await?;

    let first_name = required(form.first_name, "firstName")?;
    let last_name = required(form.last_name, "lastName")?;
    let email = required(form.email, "email")?.to_lowercase();
    let phone_number = required(form.phone_number, "phoneNumber")?;

    if phone_number.len() != 10 || !phone_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Phone number must be 10 digits".to_string(),
        ));
    }

    let pin_code = form.pin_code.unwrap_or_default().trim().to_string();
    if !pin_code.is_empty() && (pin_code.len() != 6 || !pin_code.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(AppError::Validation("Pincode must be 6 digits".to_string()));
    }

    let (kyc_id, address_proof, site_photo) =
        match (form.kyc_id, form.address_proof, form.site_photo) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                return Err(AppError::Validation(
                    "kycID, addressProof and sitePhoto are required files".to_string(),
                ))
            }
        };

    // Upload all three documents in parallel
    let (kyc_id_url, address_proof_url, site_photo_url) = tokio::try_join!(
        state.media.upload(kyc_id, "kyc_id"),
        state.media.upload(address_proof, "address_proof"),
        state.media.upload(site_photo, "site_photo"),
    )
    .map_err(|e| AppError::Internal(format!("Document upload failed: {}", e)))?;

    let now = Utc::now();
    let record = state
        .stores
        .kyc
        .create(KycRecord {
            id: Uuid::new_v4().to_string(),
            user_id: claims.sub,
            first_name,
            last_name,
            father_name: form.father_name.unwrap_or_default(),
            mother_name: form.mother_name.unwrap_or_default(),
            email,
            phone_number,
            address: form.address.unwrap_or_default(),
            pin_code,
            kyc_id_url,
            address_proof_url,
            site_photo_url,
            status: KycStatus::Pending,
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(KycSubmitResponse {
            success: true,
            data: record,
        }),
    ))
}

/// Latest KYC status for the logged-in user
#[tracing::instrument(name = "http.kyc_status", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn kyc_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<KycStatusResponse>> {
    let body = match state.stores.kyc.latest_by_email(&claims.email).await? {
        Some(record) => KycStatusBody {
            status: record.status.as_str().to_string(),
            kyc_id: Some(record.kyc_id_url),
            address_proof: Some(record.address_proof_url),
            site_photo: Some(record.site_photo_url),
            submitted_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        },
        None => KycStatusBody {
            status: "not_submitted".to_string(),
            kyc_id: None,
            address_proof: None,
            site_photo: None,
            submitted_at: None,
            updated_at: None,
        },
    };

    Ok(Json(KycStatusResponse {
        success: true,
        data: body,
    }))
}

/// Admin route: verify or reject a KYC submission
#[tracing::instrument(name = "http.update_kyc_status", skip(state, request), fields(kyc_id = %id))]
pub async fn update_kyc_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateKycStatusRequest>,
) -> Result<Json<KycRecordResponse>> {
    let status = match request.status.as_str() {
        "verified" => KycStatus::Verified,
        "rejected" => KycStatus::Rejected,
        _ => return Err(AppError::Validation("Invalid status value".to_string())),
    };

    let record = state.stores.kyc.update_status(&id, status).await?;

    Ok(Json(KycRecordResponse {
        success: true,
        data: record,
    }))
}
