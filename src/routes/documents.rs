use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::OwnerKey;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentSecret, NewDocument};
use crate::schema::documents;
use crate::state::AppState;

pub const TAGS_PER_FILENAME: usize = 3;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ContentAccessQuery {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct TagRequest {
    pub filenames: Vec<String>,
}

#[derive(Deserialize)]
pub struct ProtectRequest {
    pub email: Option<String>,
    pub protect: bool,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub owner_email: String,
    pub original_name: String,
    pub storage_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub protected: bool,
    pub tags: Vec<String>,
    pub created_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            owner_email: doc.owner_email,
            original_name: doc.original_name,
            storage_name: doc.storage_name,
            content_type: doc.content_type,
            size_bytes: doc.size_bytes,
            checksum: doc.checksum,
            protected: doc.protected,
            tags: doc.tags,
            created_at: to_iso(doc.created_at),
        }
    }
}

struct UploadFile {
    bytes: Vec<u8>,
    original_name: String,
    content_type: String,
}

enum Disposition {
    ByContentType,
    Attachment,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let owner = state.owners.resolve(params.email.as_deref())?;
    let mut conn = state.db()?;

    let docs: Vec<Document> = documents::table
        .filter(documents::owner_email.eq(owner.as_str()))
        .select(Document::as_select())
        .order(documents::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> AppResult<Json<DocumentResponse>> {
    let owner = state.owners.resolve(params.email.as_deref())?;
    let mut conn = state.db()?;
    let doc = find_owned_document(&mut conn, &owner, document_id)?;
    Ok(Json(DocumentResponse::from(doc)))
}

pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Vec<DocumentResponse>>)> {
    let mut email: Option<String> = None;
    let mut files: Vec<(String, Option<String>, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("documents") => {
                let original_name = field
                    .file_name()
                    .map(|n| n.to_string())
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| AppError::bad_request("every file must have a filename"))?;
                let content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                files.push((original_name, content_type, data.to_vec()));
            }
            Some("email") => {
                let value = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid email field: {err}"))
                })?;
                email = Some(value);
            }
            _ => {}
        }
    }

    let owner = state.owners.resolve(email.as_deref())?;

    if files.is_empty() {
        return Err(AppError::bad_request("at least one file is required"));
    }

    // The whole batch is rejected before any blob is written when a
    // single file lacks a content type.
    let files: Vec<UploadFile> = files
        .into_iter()
        .map(|(original_name, content_type, bytes)| match content_type {
            Some(content_type) => Ok(UploadFile {
                bytes,
                original_name,
                content_type,
            }),
            None => Err(AppError::bad_request(format!(
                "file '{original_name}' is missing a content type"
            ))),
        })
        .collect::<AppResult<_>>()?;

    let created = process_upload_batch(&state, &owner, files).await?;
    info!(owner = %owner, count = created.len(), "document upload succeeded");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> AppResult<StatusCode> {
    let owner = state.owners.resolve(params.email.as_deref())?;
    let mut conn = state.db()?;

    let doc = find_owned_document(&mut conn, &owner, document_id)?;
    diesel::delete(
        documents::table
            .filter(documents::id.eq(document_id))
            .filter(documents::owner_email.eq(owner.as_str())),
    )
    .execute(&mut conn)?;
    drop(conn);

    // The record is gone either way; a failed blob delete leaves an
    // orphan, which we log and accept.
    if let Err(err) = state.storage.delete_object(&doc.storage_path).await {
        warn!(document_id = %doc.id, key = %doc.storage_path, error = %err,
            "failed to delete blob after record removal");
    }

    info!(document_id = %doc.id, owner = %owner, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn view_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<ContentAccessQuery>,
) -> AppResult<Response> {
    serve_document(&state, document_id, params, Disposition::ByContentType).await
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<ContentAccessQuery>,
) -> AppResult<Response> {
    serve_document(&state, document_id, params, Disposition::Attachment).await
}

pub async fn tag_documents(Json(payload): Json<TagRequest>) -> Json<Vec<Vec<String>>> {
    Json(payload.filenames.iter().map(|f| derive_tags(f)).collect())
}

pub async fn protect_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<ProtectRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let owner = state.owners.resolve(payload.email.as_deref())?;

    let mut conn = state.db()?;
    find_owned_document(&mut conn, &owner, document_id)?;

    if payload.protect {
        let password = payload
            .password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::bad_request("password required when protecting"))?;
        let password_hash = hash_password(password)?;
        diesel::update(
            documents::table
                .filter(documents::id.eq(document_id))
                .filter(documents::owner_email.eq(owner.as_str())),
        )
        .set((
            documents::protected.eq(true),
            documents::password_hash.eq(Some(password_hash)),
        ))
        .execute(&mut conn)?;
    } else {
        // Removing protection never asks for the old password.
        diesel::update(
            documents::table
                .filter(documents::id.eq(document_id))
                .filter(documents::owner_email.eq(owner.as_str())),
        )
        .set((
            documents::protected.eq(false),
            documents::password_hash.eq::<Option<String>>(None),
        ))
        .execute(&mut conn)?;
    }

    let updated = find_owned_document(&mut conn, &owner, document_id)?;
    info!(document_id = %document_id, owner = %owner, protected = payload.protect,
        "document protection updated");
    Ok(Json(DocumentResponse::from(updated)))
}

pub async fn verify_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let owner = state.owners.resolve(payload.email.as_deref())?;
    let mut conn = state.db()?;
    let secret = find_owned_secret(&mut conn, &owner, document_id)?;
    drop(conn);

    if !secret.protected {
        return Ok(Json(VerifyResponse { valid: true }));
    }

    let password = payload
        .password
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("password is required"))?;

    let password_hash = secret
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::internal("protected document has no password hash"))?;

    let valid = verify_password(password, password_hash)?;
    Ok(Json(VerifyResponse { valid }))
}

async fn serve_document(
    state: &AppState,
    document_id: Uuid,
    params: ContentAccessQuery,
    disposition: Disposition,
) -> AppResult<Response> {
    let owner = state.owners.resolve(params.email.as_deref())?;
    let mut conn = state.db()?;

    let doc = find_owned_document(&mut conn, &owner, document_id)?;
    let secret = find_owned_secret(&mut conn, &owner, document_id)?;
    drop(conn);

    enforce_protection(&secret, params.password.as_deref())?;

    let bytes = state
        .storage
        .get_object(&doc.storage_path)
        .await
        .map_err(|err| {
            error!(document_id = %doc.id, key = %doc.storage_path, error = %err,
                "failed to read document from storage");
            AppError::internal("failed to read document content")
        })?;

    let kind = match disposition {
        Disposition::ByContentType if is_inline_viewable(&doc.content_type) => "inline",
        _ => "attachment",
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, doc.content_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(kind, &doc.original_name),
        )
        .body(Body::from(bytes))
        .map_err(AppError::internal)
}

fn enforce_protection(secret: &DocumentSecret, supplied: Option<&str>) -> AppResult<()> {
    if !secret.protected {
        return Ok(());
    }

    let supplied = supplied
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::forbidden("document is password protected"))?;

    let password_hash = secret
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::internal("protected document has no password hash"))?;

    if !verify_password(supplied, password_hash)? {
        return Err(AppError::forbidden("invalid document password"));
    }

    Ok(())
}

async fn process_upload_batch(
    state: &AppState,
    owner: &OwnerKey,
    files: Vec<UploadFile>,
) -> AppResult<Vec<DocumentResponse>> {
    let mut rows: Vec<NewDocument> = Vec::with_capacity(files.len());
    let mut written: Vec<String> = Vec::new();

    for file in files {
        let id = Uuid::new_v4();
        let storage_name = storage_name_for(&file.original_name, id);
        let storage_path = format!("documents/{storage_name}");
        let checksum = hex::encode(Sha256::digest(&file.bytes));
        let size_bytes = file.bytes.len() as i64;

        if let Err(err) = state
            .storage
            .put_object(&storage_path, file.bytes, Some(file.content_type.clone()))
            .await
        {
            error!(key = %storage_path, error = %err, "failed to store uploaded file");
            cleanup_blobs(state, &written).await;
            return Err(AppError::internal(format!(
                "failed to store uploaded file: {err}"
            )));
        }
        written.push(storage_path.clone());

        rows.push(NewDocument {
            id,
            owner_email: owner.as_str().to_string(),
            original_name: file.original_name,
            storage_name,
            content_type: file.content_type,
            size_bytes,
            storage_path,
            checksum,
            protected: false,
            tags: Vec::new(),
        });
    }

    match insert_batch(state, &rows) {
        Ok(docs) => Ok(docs),
        Err(err) => {
            cleanup_blobs(state, &written).await;
            Err(err)
        }
    }
}

/// Inserts every record of the batch in one transaction; either all of
/// them commit or none do.
fn insert_batch(state: &AppState, rows: &[NewDocument]) -> AppResult<Vec<DocumentResponse>> {
    let mut conn = state.db()?;

    let docs: Vec<Document> = conn.transaction(|conn| {
        diesel::insert_into(documents::table)
            .values(rows)
            .execute(conn)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        documents::table
            .filter(documents::id.eq_any(&ids))
            .select(Document::as_select())
            .load(conn)
    })?;

    let mut by_id: HashMap<Uuid, Document> = docs.into_iter().map(|doc| (doc.id, doc)).collect();
    Ok(rows
        .iter()
        .filter_map(|row| by_id.remove(&row.id))
        .map(DocumentResponse::from)
        .collect())
}

async fn cleanup_blobs(state: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(err) = state.storage.delete_object(key).await {
            warn!(key = %key, error = %err, "failed to remove blob during upload rollback");
        }
    }
}

/// Every read goes through an `(id, owner_email)` scope; a document
/// owned by someone else is indistinguishable from a missing one.
fn find_owned_document(
    conn: &mut PgConnection,
    owner: &OwnerKey,
    document_id: Uuid,
) -> AppResult<Document> {
    Ok(documents::table
        .filter(documents::id.eq(document_id))
        .filter(documents::owner_email.eq(owner.as_str()))
        .select(Document::as_select())
        .first(conn)?)
}

fn find_owned_secret(
    conn: &mut PgConnection,
    owner: &OwnerKey,
    document_id: Uuid,
) -> AppResult<DocumentSecret> {
    Ok(documents::table
        .filter(documents::id.eq(document_id))
        .filter(documents::owner_email.eq(owner.as_str()))
        .select(DocumentSecret::as_select())
        .first(conn)?)
}

/// Lowercases and splits on runs of underscores, hyphens, and
/// whitespace; dots are not separators, so the extension stays attached
/// to the last token.
pub(crate) fn derive_tags(filename: &str) -> Vec<String> {
    filename
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .take(TAGS_PER_FILENAME)
        .map(str::to_string)
        .collect()
}

fn storage_name_for(original_name: &str, id: Uuid) -> String {
    match FsPath::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
    {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn is_inline_viewable(content_type: &str) -> bool {
    content_type.contains("image") || content_type.contains("pdf")
}

fn content_disposition(kind: &str, filename: &str) -> String {
    if filename.is_empty() {
        return kind.to_string();
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!("{kind}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
