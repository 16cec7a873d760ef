//! Blog posts.
//!
//! The body goes through the spill policy in [`super::content`]; the
//! featured image is either an inline URL or a blob written by the upload
//! endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::require_admin;
use super::content::{assert_within_limit, persist_large_field, release_blob, release_blobs};
use super::{resolve_url, SharedBlobs};
use crate::db::models::{Blog, BlogStatus};
use crate::error::AppError;
use crate::store::{BlobRef, BlogFilter, BlogRepository, StoreError, UserRepository};

const SIZE_KIND: &str = "Blog content";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub(crate) fn validate_slug(slug: &str) -> Result<(), AppError> {
    if !SLUG_REGEX.is_match(slug) {
        return Err(AppError::Validation(
            "Slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }
    Ok(())
}

/// Sanitize HTML content using ammonia
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBlogInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub featured_image_storage_id: Option<BlobRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<BlogStatus>,
    pub author_name: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlogInput {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub featured_image_storage_id: Option<BlobRef>,
    pub tags: Option<Vec<String>>,
    pub status: Option<BlogStatus>,
    pub author_name: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
}

/// A blog with its storage-backed fields resolved to URLs. `featured_image`
/// prefers the stored image over the inline URL.
#[derive(Debug, Clone, Serialize)]
pub struct BlogView {
    #[serde(flatten)]
    pub blog: Blog,
    pub content_url: Option<String>,
    pub featured_image_url: Option<String>,
}

#[derive(Clone)]
pub struct BlogService {
    users: Arc<dyn UserRepository>,
    blogs: Arc<dyn BlogRepository>,
    blobs: SharedBlobs,
}

impl BlogService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        blogs: Arc<dyn BlogRepository>,
        blobs: SharedBlobs,
    ) -> Self {
        Self {
            users,
            blogs,
            blobs,
        }
    }

    pub async fn create_blog(
        &self,
        actor_email: &str,
        input: CreateBlogInput,
    ) -> Result<BlogView, AppError> {
        let author = require_admin(self.users.as_ref(), actor_email, "create blogs").await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        validate_slug(&input.slug)?;
        if self.blogs.find_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Conflict(
                "A blog with this slug already exists".to_string(),
            ));
        }

        let content = input.content.as_deref().map(sanitize_html);
        let stored =
            persist_large_field(self.blobs.as_ref(), content.as_deref(), None, "text/html").await?;

        let status = input.status.unwrap_or(BlogStatus::Draft);
        let published_at = match status {
            BlogStatus::Published => Some(input.publish_date.unwrap_or_else(Utc::now)),
            _ => input.publish_date,
        };
        let (featured_image, featured_image_storage_id) = match input.featured_image_storage_id {
            Some(blob) => (None, Some(blob)),
            None => (non_empty(input.featured_image), None),
        };

        let now = Utc::now();
        let blog = Blog {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: input.slug,
            excerpt: input.excerpt,
            content: stored.inline,
            content_storage_id: stored.blob.clone(),
            author_id: author.id,
            author_name: non_empty(input.author_name),
            featured_image,
            featured_image_storage_id,
            tags: input.tags,
            status,
            published_at,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.write(&blog, true).await {
            if let (true, Some(blob)) = (stored.spilled, stored.blob.as_ref()) {
                release_blob(self.blobs.as_ref(), blob).await;
            }
            return Err(e);
        }

        tracing::info!(
            blog_id = %blog.id,
            slug = %blog.slug,
            status = blog.status.as_str(),
            spilled = stored.spilled,
            "blog created"
        );
        Ok(self.view(blog).await)
    }

    pub async fn update_blog(
        &self,
        actor_email: &str,
        blog_id: Uuid,
        patch: UpdateBlogInput,
    ) -> Result<BlogView, AppError> {
        require_admin(self.users.as_ref(), actor_email, "update blogs").await?;
        let mut blog = self
            .blogs
            .get(blog_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;
        let mut stale: Vec<BlobRef> = Vec::new();

        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Title is required".to_string()));
            }
            blog.title = title.to_string();
        }
        if let Some(excerpt) = patch.excerpt {
            blog.excerpt = excerpt;
        }
        if let Some(author_name) = patch.author_name {
            blog.author_name = non_empty(Some(author_name));
        }
        if let Some(tags) = patch.tags {
            blog.tags = tags;
        }

        // Unsent content is re-evaluated from the current inline value.
        let current = patch
            .content
            .as_deref()
            .map(sanitize_html)
            .or_else(|| blog.content.clone());
        let stored = persist_large_field(
            self.blobs.as_ref(),
            current.as_deref(),
            blog.content_storage_id.as_ref(),
            "text/html",
        )
        .await?;
        let spilled_blob = stored.blob.clone().filter(|_| stored.spilled);
        stale.extend(stored.stale);
        match stored.inline {
            Some(inline) => {
                blog.content = Some(inline);
                if let Some(old) = blog.content_storage_id.take() {
                    stale.push(old);
                }
            }
            None => {
                if stored.spilled {
                    blog.content = None;
                }
                blog.content_storage_id = stored.blob;
            }
        }

        if let Some(blob) = patch.featured_image_storage_id {
            if blog.featured_image_storage_id.as_ref() != Some(&blob) {
                if let Some(old) = blog.featured_image_storage_id.replace(blob) {
                    stale.push(old);
                }
            }
            blog.featured_image = None;
        } else if let Some(url) = patch.featured_image {
            if let Some(old) = blog.featured_image_storage_id.take() {
                stale.push(old);
            }
            blog.featured_image = non_empty(Some(url));
        }

        let now = Utc::now();
        if let Some(date) = patch.publish_date {
            blog.published_at = Some(date);
        }
        if let Some(status) = patch.status {
            blog.status = status;
            if status == BlogStatus::Published && blog.published_at.is_none() {
                blog.published_at = Some(now);
            }
        }
        blog.updated_at = now;

        if let Err(e) = self.write(&blog, false).await {
            if let Some(blob) = spilled_blob.as_ref() {
                release_blob(self.blobs.as_ref(), blob).await;
            }
            return Err(e);
        }
        release_blobs(self.blobs.as_ref(), &stale).await;

        tracing::info!(blog_id = %blog.id, released = stale.len(), "blog updated");
        Ok(self.view(blog).await)
    }

    async fn write(&self, blog: &Blog, is_new: bool) -> Result<(), AppError> {
        assert_within_limit(SIZE_KIND, blog)?;
        let result = if is_new {
            self.blogs.insert(blog).await
        } else {
            self.blogs.save(blog).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(StoreError::Duplicate(_)) => Err(AppError::Conflict(
                "A blog with this slug already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Releases the blog's blobs, then removes the record.
    pub async fn delete_blog(&self, actor_email: &str, blog_id: Uuid) -> Result<Uuid, AppError> {
        require_admin(self.users.as_ref(), actor_email, "delete blogs").await?;
        let blog = self
            .blogs
            .get(blog_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

        let refs: Vec<BlobRef> = blog
            .content_storage_id
            .iter()
            .chain(blog.featured_image_storage_id.iter())
            .cloned()
            .collect();
        release_blobs(self.blobs.as_ref(), &refs).await;

        self.blogs.delete(blog_id).await?;
        tracing::info!(blog_id = %blog_id, slug = %blog.slug, "blog deleted");
        Ok(blog_id)
    }

    /// Published posts, newest first, with author names resolved.
    pub async fn get_published_blogs(&self) -> Result<Vec<BlogView>, AppError> {
        let blogs = self
            .blogs
            .list(BlogFilter::Status(BlogStatus::Published))
            .await?;
        let mut views = Vec::with_capacity(blogs.len());
        for blog in blogs {
            views.push(self.public_view(blog).await?);
        }
        Ok(views)
    }

    /// Any status; callers serving the public site must check it.
    pub async fn get_blog_by_slug(&self, slug: &str) -> Result<Option<BlogView>, AppError> {
        match self.blogs.find_by_slug(slug).await? {
            Some(blog) => Ok(Some(self.public_view(blog).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_all_blogs(&self, actor_email: &str) -> Result<Vec<BlogView>, AppError> {
        require_admin(self.users.as_ref(), actor_email, "view all blogs").await?;
        self.views(BlogFilter::All).await
    }

    pub async fn get_blogs_by_author(
        &self,
        actor_email: &str,
        author_id: Uuid,
    ) -> Result<Vec<BlogView>, AppError> {
        require_admin(self.users.as_ref(), actor_email, "filter blogs by author").await?;
        self.views(BlogFilter::Author(author_id)).await
    }

    async fn views(&self, filter: BlogFilter) -> Result<Vec<BlogView>, AppError> {
        let blogs = self.blogs.list(filter).await?;
        let mut views = Vec::with_capacity(blogs.len());
        for blog in blogs {
            views.push(self.view(blog).await);
        }
        Ok(views)
    }

    async fn view(&self, mut blog: Blog) -> BlogView {
        let content_url = match blog.content_storage_id.as_ref() {
            Some(blob) => resolve_url(self.blobs.as_ref(), Some(blob), None).await,
            None => None,
        };
        let featured_image_url = match blog.featured_image_storage_id.as_ref() {
            Some(blob) => resolve_url(self.blobs.as_ref(), Some(blob), None).await,
            None => None,
        };
        if featured_image_url.is_some() {
            blog.featured_image = featured_image_url.clone();
        }
        BlogView {
            blog,
            content_url,
            featured_image_url,
        }
    }

    async fn public_view(&self, mut blog: Blog) -> Result<BlogView, AppError> {
        if blog.author_name.is_none() {
            let author = self.users.find_by_id(blog.author_id).await?;
            blog.author_name = Some(
                author
                    .map(|a| a.name)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            );
        }
        Ok(self.view(blog).await)
    }
}
