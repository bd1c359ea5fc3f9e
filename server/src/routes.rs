use chrono::{DateTime, Utc};
use file_share::storage::JsonFileBackend;
use file_share::{AccessError, DroppedFile, NewShare, ShareRegistry, SharedFile, StorageError, UploadRequest};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::{catch, catchers, delete, get, post, routes, Build, Request, Rocket, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::uploads::{UploadStore, UploadStoreError};

pub struct AppState {
    pub registry: ShareRegistry<JsonFileBackend>,
    pub uploads: UploadStore,
}

#[derive(Debug)]
pub struct ApiError {
    status: Status,
    message: String,
}

impl ApiError {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(ErrorBody { error: self.message })).respond_to(request)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        error!(error = %e, "share store failure");
        ApiError::new(Status::InternalServerError, "share store unavailable")
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        let status = match &e {
            AccessError::NotFound(_) => Status::NotFound,
            AccessError::Expired(_) => Status::Gone,
            AccessError::PasswordRequired(_) | AccessError::InvalidPassword(_) => Status::Unauthorized,
            AccessError::Storage(storage) => {
                error!(error = %storage, "share store failure");
                return ApiError::new(Status::InternalServerError, "share store unavailable");
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<UploadStoreError> for ApiError {
    fn from(e: UploadStoreError) -> Self {
        match e {
            UploadStoreError::InvalidName(_) | UploadStoreError::Unsupported(_) => {
                ApiError::new(Status::BadRequest, e.to_string())
            }
            UploadStoreError::Io(io) => {
                error!(error = %io, "upload store failure");
                ApiError::new(Status::InternalServerError, "file storage unavailable")
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// A grant as returned over HTTP: derived URL and expiry flag included, password withheld.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: String,
    pub original_filename: String,
    pub share_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub is_password_protected: bool,
    pub created_by: String,
    pub expired: bool,
}

impl From<&SharedFile> for ShareView {
    fn from(record: &SharedFile) -> Self {
        Self {
            id: record.id.clone(),
            original_filename: record.original_filename.clone(),
            share_url: record.share_url(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            access_count: record.access_count,
            is_password_protected: record.is_password_protected,
            created_by: record.created_by.clone(),
            expired: record.is_expired(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareBody {
    pub filename: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedContent {
    pub filename: String,
    pub content: String,
    pub access_count: u64,
}

#[get("/api/files")]
async fn list_files(state: &State<AppState>) -> Result<Json<Vec<DroppedFile>>, ApiError> {
    Ok(Json(state.uploads.list().await?))
}

#[post("/api/upload", data = "<body>")]
async fn upload(state: &State<AppState>, body: Json<UploadRequest>) -> Result<Json<SuccessBody>, ApiError> {
    let UploadRequest { filename, content } = body.into_inner();
    state.uploads.save(&filename, &content).await.inspect_err(|e| {
        warn!(file = %filename, error = %e, "upload refused");
    })?;
    info!(file = %filename, bytes = content.len(), "file uploaded");
    Ok(Json(SuccessBody { success: true }))
}

#[delete("/api/files/<filename>")]
async fn delete_file(state: &State<AppState>, filename: &str) -> Result<Json<SuccessBody>, ApiError> {
    if !state.uploads.remove(filename).await? {
        return Err(ApiError::new(Status::NotFound, format!("file not found: {}", filename)));
    }
    info!(file = %filename, "file deleted");
    Ok(Json(SuccessBody { success: true }))
}

#[get("/api/shares")]
async fn list_shares(state: &State<AppState>) -> Result<Json<Vec<ShareView>>, ApiError> {
    let records = state.registry.list_all().await?;
    Ok(Json(records.iter().map(ShareView::from).collect()))
}

#[post("/api/shares", data = "<body>")]
async fn create_share(
    state: &State<AppState>,
    body: Json<CreateShareBody>,
) -> Result<status::Created<Json<ShareView>>, ApiError> {
    let body = body.into_inner();
    if !state.uploads.contains(&body.filename).await? {
        return Err(ApiError::new(
            Status::NotFound,
            format!("file not found: {}", body.filename),
        ));
    }

    let mut share = NewShare::new(body.filename, body.created_by.unwrap_or_else(|| "anonymous".to_string()));
    if let Some(expires_at) = body.expires_at {
        share = share.expires_at(expires_at);
    }
    if let Some(password) = body.password.filter(|p| !p.is_empty()) {
        share = share.with_password(password);
    }

    let record = state.registry.create(share).await?;
    Ok(status::Created::new(record.share_url()).body(Json(ShareView::from(&record))))
}

#[delete("/api/shares/<id>")]
async fn delete_share(state: &State<AppState>, id: &str) -> Result<Status, ApiError> {
    if state.registry.delete(id).await? {
        Ok(Status::NoContent)
    } else {
        Err(ApiError::new(Status::NotFound, format!("share not found: {}", id)))
    }
}

#[get("/shared/<id>?<password>")]
async fn open_share(
    state: &State<AppState>,
    id: &str,
    password: Option<&str>,
) -> Result<Json<SharedContent>, ApiError> {
    // A grant whose file is gone is refused before the access is counted.
    if let Some(existing) = state.registry.get_by_id(id).await? {
        if !state.uploads.contains(&existing.original_filename).await? {
            return Err(ApiError::new(Status::NotFound, "shared file is no longer available"));
        }
    }

    let record = state.registry.resolve(id, password).await?;
    let content = state
        .uploads
        .read(&record.original_filename)
        .await?
        .ok_or_else(|| ApiError::new(Status::NotFound, "shared file is no longer available"))?;

    Ok(Json(SharedContent {
        filename: record.original_filename,
        content,
        access_count: record.access_count,
    }))
}

#[catch(404)]
fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "not found".to_string(),
    })
}

pub fn build(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                list_files,
                upload,
                delete_file,
                list_shares,
                create_share,
                delete_share,
                open_share
            ],
        )
        .register("/", catchers![not_found])
}
