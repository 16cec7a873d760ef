//! Gallery collections: ordered images, each an inline URL or a stored blob.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::require_admin;
use super::content::{assert_within_limit, release_blob, release_blobs};
use super::{resolve_url, SharedBlobs};
use crate::db::models::{GalleryCollection, GalleryImage};
use crate::error::AppError;
use crate::store::{BlobRef, GalleryFilter, GalleryRepository, UserRepository};

const SIZE_KIND: &str = "Gallery collection";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryImageInput {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    pub storage_id: Option<BlobRef>,
}

impl GalleryImageInput {
    fn into_image(self) -> Result<GalleryImage, AppError> {
        if self.url.trim().is_empty() && self.storage_id.is_none() {
            return Err(AppError::Validation(
                "Each image needs a url or a storage_id".to_string(),
            ));
        }
        Ok(GalleryImage {
            url: self.url,
            alt_text: self.alt_text,
            storage_id: self.storage_id,
        })
    }
}

fn into_images(inputs: Vec<GalleryImageInput>) -> Result<Vec<GalleryImage>, AppError> {
    inputs.into_iter().map(GalleryImageInput::into_image).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGalleryInput {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub images: Vec<GalleryImageInput>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGalleryInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Replaces the whole image list.
    pub images: Option<Vec<GalleryImageInput>>,
    pub featured: Option<bool>,
}

/// A collection whose image URLs point at stored blobs where available.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryView {
    #[serde(flatten)]
    pub collection: GalleryCollection,
}

fn stored_refs(images: &[GalleryImage]) -> HashSet<BlobRef> {
    images.iter().filter_map(|img| img.storage_id.clone()).collect()
}

#[derive(Clone)]
pub struct GalleryService {
    users: Arc<dyn UserRepository>,
    gallery: Arc<dyn GalleryRepository>,
    blobs: SharedBlobs,
}

impl GalleryService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        gallery: Arc<dyn GalleryRepository>,
        blobs: SharedBlobs,
    ) -> Self {
        Self {
            users,
            gallery,
            blobs,
        }
    }

    pub async fn create_collection(
        &self,
        actor_email: &str,
        input: CreateGalleryInput,
    ) -> Result<GalleryView, AppError> {
        let admin = require_admin(
            self.users.as_ref(),
            actor_email,
            "create gallery collections",
        )
        .await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if input.category.trim().is_empty() {
            return Err(AppError::Validation("Category is required".to_string()));
        }

        let now = Utc::now();
        let collection = GalleryCollection {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: input.description,
            category: input.category.trim().to_string(),
            images: into_images(input.images)?,
            featured: input.featured,
            created_by: admin.id,
            created_at: now,
            updated_at: now,
        };
        assert_within_limit(SIZE_KIND, &collection)?;
        self.gallery.insert(&collection).await?;

        tracing::info!(
            gallery_id = %collection.id,
            images = collection.images.len(),
            "gallery collection created"
        );
        Ok(self.view(collection).await)
    }

    /// Blobs dropped by a wholesale image replacement are released after
    /// the write.
    pub async fn update_collection(
        &self,
        actor_email: &str,
        gallery_id: Uuid,
        patch: UpdateGalleryInput,
    ) -> Result<GalleryView, AppError> {
        require_admin(
            self.users.as_ref(),
            actor_email,
            "update gallery collections",
        )
        .await?;
        let mut collection = self.find(gallery_id).await?;

        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Title is required".to_string()));
            }
            collection.title = title.to_string();
        }
        if let Some(description) = patch.description {
            collection.description = Some(description);
        }
        if let Some(category) = patch.category {
            collection.category = category.trim().to_string();
        }
        if let Some(featured) = patch.featured {
            collection.featured = featured;
        }

        let mut dropped: Vec<BlobRef> = Vec::new();
        if let Some(images) = patch.images {
            let images = into_images(images)?;
            let kept = stored_refs(&images);
            dropped = stored_refs(&collection.images)
                .into_iter()
                .filter(|blob| !kept.contains(blob))
                .collect();
            collection.images = images;
        }
        collection.updated_at = Utc::now();

        assert_within_limit(SIZE_KIND, &collection)?;
        self.gallery.save(&collection).await?;
        release_blobs(self.blobs.as_ref(), &dropped).await;

        tracing::info!(gallery_id = %gallery_id, released = dropped.len(), "gallery collection updated");
        Ok(self.view(collection).await)
    }

    pub async fn delete_collection(
        &self,
        actor_email: &str,
        gallery_id: Uuid,
    ) -> Result<Uuid, AppError> {
        require_admin(
            self.users.as_ref(),
            actor_email,
            "delete gallery collections",
        )
        .await?;
        let collection = self.find(gallery_id).await?;

        let refs: Vec<BlobRef> = stored_refs(&collection.images).into_iter().collect();
        release_blobs(self.blobs.as_ref(), &refs).await;
        self.gallery.delete(gallery_id).await?;

        tracing::info!(gallery_id = %gallery_id, "gallery collection deleted");
        Ok(gallery_id)
    }

    pub async fn add_image(
        &self,
        actor_email: &str,
        gallery_id: Uuid,
        image: GalleryImageInput,
    ) -> Result<GalleryView, AppError> {
        require_admin(self.users.as_ref(), actor_email, "add images to gallery").await?;
        let mut collection = self.find(gallery_id).await?;

        collection.images.push(image.into_image()?);
        collection.updated_at = Utc::now();
        assert_within_limit(SIZE_KIND, &collection)?;
        self.gallery.save(&collection).await?;

        Ok(self.view(collection).await)
    }

    pub async fn remove_image(
        &self,
        actor_email: &str,
        gallery_id: Uuid,
        index: usize,
    ) -> Result<GalleryView, AppError> {
        require_admin(
            self.users.as_ref(),
            actor_email,
            "remove images from gallery",
        )
        .await?;
        let mut collection = self.find(gallery_id).await?;

        if index >= collection.images.len() {
            return Err(AppError::Validation("Invalid image index".to_string()));
        }
        let removed = collection.images.remove(index);
        collection.updated_at = Utc::now();
        self.gallery.save(&collection).await?;

        if let Some(blob) = removed.storage_id.as_ref() {
            if !stored_refs(&collection.images).contains(blob) {
                release_blob(self.blobs.as_ref(), blob).await;
            }
        }
        Ok(self.view(collection).await)
    }

    pub async fn get_featured(&self) -> Result<Vec<GalleryView>, AppError> {
        self.views(GalleryFilter::Featured).await
    }

    pub async fn get_by_category(&self, category: &str) -> Result<Vec<GalleryView>, AppError> {
        self.views(GalleryFilter::Category(category.to_string()))
            .await
    }

    pub async fn get_all(&self, actor_email: &str) -> Result<Vec<GalleryView>, AppError> {
        require_admin(
            self.users.as_ref(),
            actor_email,
            "view all gallery collections",
        )
        .await?;
        self.views(GalleryFilter::All).await
    }

    async fn find(&self, gallery_id: Uuid) -> Result<GalleryCollection, AppError> {
        self.gallery
            .get(gallery_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Gallery collection not found".to_string()))
    }

    async fn views(&self, filter: GalleryFilter) -> Result<Vec<GalleryView>, AppError> {
        let collections = self.gallery.list(filter).await?;
        let mut views = Vec::with_capacity(collections.len());
        for collection in collections {
            views.push(self.view(collection).await);
        }
        Ok(views)
    }

    async fn view(&self, mut collection: GalleryCollection) -> GalleryView {
        for image in collection.images.iter_mut() {
            let inline = (!image.url.is_empty()).then(|| image.url.clone());
            if let Some(url) =
                resolve_url(self.blobs.as_ref(), image.storage_id.as_ref(), inline.as_ref()).await
            {
                image.url = url;
            }
        }
        GalleryView { collection }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::services::test_support::seed_user;
    use crate::store::{BlobStore, MemoryBlobStore, MemoryStore};
    use bytes::Bytes;

    const ADMIN: &str = "admin@example.org";

    async fn fixture() -> (Arc<MemoryStore>, Arc<MemoryBlobStore>, GalleryService) {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        seed_user(&store, ADMIN, "secret1", Role::Admin).await;
        let service = GalleryService::new(store.clone(), store.clone(), blobs.clone());
        (store, blobs, service)
    }

    fn stored(blob: &BlobRef) -> GalleryImageInput {
        GalleryImageInput {
            url: String::new(),
            alt_text: "stored".to_string(),
            storage_id: Some(blob.clone()),
        }
    }

    fn linked(url: &str) -> GalleryImageInput {
        GalleryImageInput {
            url: url.to_string(),
            alt_text: "linked".to_string(),
            storage_id: None,
        }
    }

    fn collection(images: Vec<GalleryImageInput>, featured: bool) -> CreateGalleryInput {
        CreateGalleryInput {
            title: "Outreach".to_string(),
            description: None,
            category: "community".to_string(),
            images,
            featured,
        }
    }

    #[tokio::test]
    async fn test_views_resolve_stored_images() {
        let (_, blobs, service) = fixture().await;
        let blob = blobs.store(Bytes::from_static(b"img"), "image/png").await.unwrap();

        let view = service
            .create_collection(
                ADMIN,
                collection(vec![stored(&blob), linked("https://cdn.example.org/a.jpg")], true),
            )
            .await
            .unwrap();
        assert_eq!(view.collection.images[0].url, format!("memory://{}", blob));
        assert_eq!(view.collection.images[1].url, "https://cdn.example.org/a.jpg");

        assert_eq!(service.get_featured().await.unwrap().len(), 1);
        assert_eq!(service.get_by_category("community").await.unwrap().len(), 1);
        assert!(service.get_by_category("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_without_source_is_rejected() {
        let (_, _, service) = fixture().await;
        let err = service
            .create_collection(ADMIN, collection(vec![GalleryImageInput::default()], false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_replacing_images_releases_dropped_blobs() {
        let (_, blobs, service) = fixture().await;
        let keep = blobs.store(Bytes::from_static(b"k"), "image/png").await.unwrap();
        let gone = blobs.store(Bytes::from_static(b"d"), "image/png").await.unwrap();

        let view = service
            .create_collection(ADMIN, collection(vec![stored(&keep), stored(&gone)], false))
            .await
            .unwrap();
        service
            .update_collection(
                ADMIN,
                view.collection.id,
                UpdateGalleryInput {
                    images: Some(vec![stored(&keep)]),
                    ..UpdateGalleryInput::default()
                },
            )
            .await
            .unwrap();

        assert!(blobs.contains(&keep).await);
        assert!(!blobs.contains(&gone).await);
    }

    #[tokio::test]
    async fn test_add_and_remove_image() {
        let (_, blobs, service) = fixture().await;
        let blob = blobs.store(Bytes::from_static(b"x"), "image/png").await.unwrap();
        let view = service
            .create_collection(ADMIN, collection(vec![], false))
            .await
            .unwrap();
        let id = view.collection.id;

        service.add_image(ADMIN, id, linked("https://cdn.example.org/1.jpg")).await.unwrap();
        let view = service.add_image(ADMIN, id, stored(&blob)).await.unwrap();
        assert_eq!(view.collection.images.len(), 2);

        let err = service.remove_image(ADMIN, id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let view = service.remove_image(ADMIN, id, 1).await.unwrap();
        assert_eq!(view.collection.images.len(), 1);
        assert!(!blobs.contains(&blob).await);
    }

    #[tokio::test]
    async fn test_delete_releases_all_blobs_and_checks_admin() {
        let (store, blobs, service) = fixture().await;
        seed_user(&store, "user@example.org", "secret1", Role::User).await;
        let a = blobs.store(Bytes::from_static(b"a"), "image/png").await.unwrap();
        let b = blobs.store(Bytes::from_static(b"b"), "image/png").await.unwrap();
        let view = service
            .create_collection(ADMIN, collection(vec![stored(&a), stored(&b)], false))
            .await
            .unwrap();

        let err = service
            .delete_collection("user@example.org", view.collection.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(blobs.len().await, 2);

        service.delete_collection(ADMIN, view.collection.id).await.unwrap();
        assert_eq!(blobs.len().await, 0);
        assert!(service.get_all(ADMIN).await.unwrap().is_empty());
    }
}
