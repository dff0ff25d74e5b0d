/// Media uploads - bucket provisioning, upload validation and object paths
use super::profiles::ProfileResolver;
use crate::domain::models::{Profile, ProfileImageKind};
use crate::error::{ServiceError, ServiceResult, StorageError};
use crate::metrics::social::{outcome, record_action};
use crate::middleware::{require_session, Session};
use crate::storage::{BucketSpec, ObjectStorage, POST_IMAGES, POST_VIDEOS, PROFILE_IMAGES};
use dashmap::DashSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const AUTH_REQUIRED: &str = "Authentication required to upload files";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Avatar,
    Cover,
}

impl MediaKind {
    /// `fileType` of a post media upload; defaults to image.
    pub fn for_post(raw: Option<&str>) -> ServiceResult<Self> {
        match raw.map(str::trim).unwrap_or("image") {
            "" | "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(ServiceError::Validation(format!(
                "Unsupported file type '{}'",
                other
            ))),
        }
    }

    /// `fileType` of a profile image upload; defaults to avatar.
    pub fn for_profile(raw: Option<&str>) -> ServiceResult<Self> {
        match raw.map(str::trim).unwrap_or("avatar") {
            "" | "avatar" => Ok(MediaKind::Avatar),
            "cover" => Ok(MediaKind::Cover),
            other => Err(ServiceError::Validation(format!(
                "Unsupported file type '{}'",
                other
            ))),
        }
    }

    pub fn bucket(self) -> &'static BucketSpec {
        match self {
            MediaKind::Image => &POST_IMAGES,
            MediaKind::Video => &POST_VIDEOS,
            MediaKind::Avatar | MediaKind::Cover => &PROFILE_IMAGES,
        }
    }

    pub fn profile_image(self) -> Option<ProfileImageKind> {
        match self {
            MediaKind::Avatar => Some(ProfileImageKind::Avatar),
            MediaKind::Cover => Some(ProfileImageKind::Cover),
            MediaKind::Image | MediaKind::Video => None,
        }
    }
}

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMedia {
    pub url: String,
    pub path: String,
}

/// Extension for the stored object: from the file name, else the mime subtype.
fn extension(file: &FileUpload) -> String {
    let from_name = file
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name
        .or_else(|| {
            file.content_type
                .split_once('/')
                .map(|(_, sub)| sub.split(['+', ';']).next().unwrap_or(sub).to_ascii_lowercase())
                .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// `{user}/{uuid}.{ext}` for post media, `{user}/{avatar|cover}/{uuid}.{ext}`
/// for profile images.
pub fn object_path(user_id: Uuid, kind: MediaKind, file: &FileUpload) -> String {
    let name = format!("{}.{}", Uuid::new_v4(), extension(file));
    match kind {
        MediaKind::Image | MediaKind::Video => format!("{}/{}", user_id, name),
        MediaKind::Avatar => format!("{}/avatar/{}", user_id, name),
        MediaKind::Cover => format!("{}/cover/{}", user_id, name),
    }
}

fn validate(spec: &BucketSpec, file: &FileUpload) -> ServiceResult<()> {
    if file.bytes.len() > spec.max_bytes {
        return Err(ServiceError::Validation(format!(
            "File is too large. Maximum size is {}MB",
            spec.max_bytes / (1024 * 1024)
        )));
    }
    if !file.content_type.starts_with(spec.content_type_prefix) {
        return Err(ServiceError::Validation(format!(
            "Invalid file type. Expected {}*",
            spec.content_type_prefix
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn ObjectStorage>,
    provisioned: Arc<DashSet<&'static str>>,
    profiles: ProfileResolver,
}

impl MediaService {
    pub fn new(storage: Arc<dyn ObjectStorage>, profiles: ProfileResolver) -> Self {
        Self {
            storage,
            provisioned: Arc::new(DashSet::new()),
            profiles,
        }
    }

    /// Make sure the bucket exists with one create call.
    pub async fn ensure_bucket(&self, spec: &BucketSpec) -> ServiceResult<()> {
        if self.provisioned.contains(spec.name) {
            return Ok(());
        }

        match self.storage.create_bucket(spec).await {
            Ok(()) | Err(StorageError::BucketAlreadyExists(_)) => {
                self.provisioned.insert(spec.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Upload post media for the session user.
    pub async fn upload(
        &self,
        session: Option<&Session>,
        kind: MediaKind,
        file: Option<FileUpload>,
    ) -> ServiceResult<StoredMedia> {
        let result = self.store(session, kind, file).await;
        record_action("upload", outcome(&result));
        result
    }

    /// Upload a new avatar or cover and point the profile at it.
    pub async fn upload_profile_image(
        &self,
        session: Option<&Session>,
        kind: MediaKind,
        file: Option<FileUpload>,
    ) -> ServiceResult<(StoredMedia, Profile)> {
        let image_kind = kind.profile_image().ok_or_else(|| {
            ServiceError::Validation("Profile uploads must be an avatar or a cover".to_string())
        })?;

        let stored = self.upload(session, kind, file).await?;
        let session = require_session(session, AUTH_REQUIRED)?;
        let profile = self
            .profiles
            .update_profile_image(&session.identity(), image_kind, &stored.url)
            .await?;

        Ok((stored, profile))
    }

    async fn store(
        &self,
        session: Option<&Session>,
        kind: MediaKind,
        file: Option<FileUpload>,
    ) -> ServiceResult<StoredMedia> {
        let file = file
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| ServiceError::Validation("No file provided".to_string()))?;
        let session = require_session(session, AUTH_REQUIRED)?;

        let spec = kind.bucket();
        validate(spec, &file)?;
        self.ensure_bucket(spec).await?;

        let path = object_path(session.user_id, kind, &file);
        let size = file.bytes.len();
        let url = self
            .storage
            .put_object(spec.name, &path, file.bytes, &file.content_type)
            .await?;

        info!(user_id = %session.user_id, bucket = spec.name, %path, size, "media uploaded");
        Ok(StoredMedia { url, path })
    }
}
